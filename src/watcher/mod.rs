// Payment watcher: poll cycle, filters and message formatting
pub mod filter;
pub mod message;
pub mod poll;

pub use filter::default_filters;
pub use poll::Watcher;
