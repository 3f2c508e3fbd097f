pub mod metadata;
pub mod rate_limiter;
pub mod recommendations;

pub use metadata::{MetadataProvider, TmdbClient};
pub use rate_limiter::RateLimiter;
