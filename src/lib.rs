//! Countdown notifier library: re-exports modules for the binary and integration tests.

pub mod countdown;
pub mod daemon;
pub mod gateway;
pub mod http;
pub mod notify;
pub mod occasion;
pub mod quotes;
pub mod scheduler;
pub mod watchdog;
