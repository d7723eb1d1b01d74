mod collector_cache;
mod credentials;

pub use collector_cache::CollectorCache;
pub use credentials::Credentials;
