//! # Rate Limiting Feature
//!
//! Per-user limit on button clicks and form submits.
//!
//! - **Version**: 2.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false

pub mod limiter;

pub use limiter::RateLimiter;
