/// Serves a value from the key-value store, computing and storing it on a miss.
///
/// The stored value is used only when `$fresh` accepts it. Unreadable entries
/// count as a miss, and a failed write is logged without failing the caller.
///
/// # Arguments
/// * `$store`: an `Arc<dyn KeyValueStore>` (or anything dereferencing to one).
/// * `$key`: the `StoreKey` to read and write.
/// * `$fresh`: closure taking `&T` and returning whether it may be served.
/// * `$block`: future producing `AppResult<T>` when the store cannot serve.
///
/// # Example
/// ```rust,ignore
/// let snapshot = cached!(store, StoreKey::CatalogSnapshot, |s: &CatalogSnapshot| s.is_fresh(ttl), async {
///     Ok(CatalogSnapshot::new(source.fetch().await?))
/// })?;
/// ```
#[macro_export]
macro_rules! cached {
    ($store:expr, $key:expr, $fresh:expr, $block:expr) => {{
        let hit = match $store.get_json(&$key) {
            Ok(Some(cached)) if ($fresh)(&cached) => Some(cached),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(error = %e, key = %$key, "Unreadable cache entry, recomputing");
                None
            }
        };

        if let Some(cached) = hit {
            tracing::debug!(key = %$key, "Cache hit");
            Ok::<_, $crate::error::AppError>(cached)
        } else {
            let value = $block.await?;
            if let Err(e) = $store.set_json(&$key, &value) {
                tracing::warn!(error = %e, key = %$key, "Failed to store cache entry");
            }
            Ok(value)
        }
    }};
}
