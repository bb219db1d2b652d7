//! HTTP implementation of the core's upgrade checker seam.
mod client;
pub use client::{DEFAULT_CHECK_URL, DEFAULT_TIMEOUT, HttpChecker};
