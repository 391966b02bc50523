pub mod continuation;
pub mod feed;
pub mod interactions;
pub mod providers;
pub mod sampler;
pub mod search;
pub mod views;
