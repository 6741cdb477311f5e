pub mod config;
pub mod format;
pub mod report;
pub mod units;
pub mod util;
