//! Use-case services for the two preference domains.
//!
//! # Responsibility
//! - `reminder_service`: hydration reminder settings and task registration.
//! - `mood_service`: dual-layer mood log persistence.
//!
//! Services depend only on the `KeyValueStore`, `TaskScheduler` and `Clock`
//! seams, never on a concrete backend.

pub mod mood_service;
pub mod reminder_service;
