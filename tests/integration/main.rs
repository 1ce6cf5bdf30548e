//! End-to-end tests driving full scans through the public API.

mod common;
mod pipeline;
mod scenarios;
