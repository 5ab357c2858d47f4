pub mod realtime;

pub use realtime::{FeedError, run_feed, spawn_feed};
