//! HTTP middleware components.

pub mod logging;
