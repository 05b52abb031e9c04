/// Application name
pub const APP_NAME: &str = "Alumlink";

/// Default number of posts returned per feed page
pub const DEFAULT_FEED_PAGE_SIZE: usize = 20;

/// Default capacity of the store change-event broadcast bus
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Default per-subscription delivery queue depth
pub const DEFAULT_SUBSCRIPTION_BUFFER: usize = 64;

/// Default number of snapshot attempts before a live subscription gives up
pub const DEFAULT_SNAPSHOT_RETRY_ATTEMPTS: u32 = 3;

/// Default delay between snapshot retries in milliseconds
pub const DEFAULT_SNAPSHOT_RETRY_DELAY_MS: u64 = 50;

/// Lowest star value the rating aggregator accepts
pub const MIN_RATING_STARS: u8 = 1;

/// Highest star value the rating aggregator accepts
pub const MAX_RATING_STARS: u8 = 5;
