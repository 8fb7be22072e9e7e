pub mod client;
pub mod rate_limit;

pub use client::KucoinRest;
pub use rate_limit::{RateLimitSnapshot, RateLimitTracker};
