//! Flutter bridge surface over `pulseup_core`.

pub mod api;
