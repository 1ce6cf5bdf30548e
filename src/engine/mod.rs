//! Core engine: the batch scan that ties the strategy pipeline together.

pub mod scanner;

pub use scanner::{run_scan, ScanReport, Scanner};
