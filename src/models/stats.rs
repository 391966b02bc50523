use serde::Serialize;

/// Display counters derived from a stable seed rather than real telemetry
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct VideoStats {
    pub views: u64,
    pub likes: u64,
}

impl VideoStats {
    /// Derives counters from a seed string (the media URL in practice)
    ///
    /// The hash is `h * 31 + c` over UTF-16 code units with 32-bit wrap-around.
    pub fn from_seed(seed: &str) -> Self {
        if seed.is_empty() {
            return Self { views: 0, likes: 0 };
        }

        let hash = seed
            .encode_utf16()
            .fold(0i32, |h, unit| h.wrapping_mul(31).wrapping_add(i32::from(unit)));

        let views = i64::from(hash % 10_000).abs() + 500;
        let likes = (views as f64 * 0.15 + f64::from(hash % 100)).floor().abs();

        Self {
            views: views as u64,
            likes: likes as u64,
        }
    }
}

/// Renders a counter as `1.2M`, `3.4K` or the plain integer
pub fn format_big_number(num: u64) -> String {
    if num >= 1_000_000 {
        format!("{:.1}M", num as f64 / 1_000_000.0)
    } else if num >= 1_000 {
        format!("{:.1}K", num as f64 / 1_000.0)
    } else {
        num.to_string()
    }
}
