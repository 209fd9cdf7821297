//! Domain model for the two preference domains.
//!
//! # Responsibility
//! - `reminder`: hydration reminder settings, keys and time arithmetic.
//! - `mood`: mood log keys, blob codec and summaries.
//!
//! Everything here is pure; persistence lives in `service`.

pub mod mood;
pub mod reminder;
