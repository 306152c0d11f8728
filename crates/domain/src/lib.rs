//! Domain layer for the Trace backend.
//!
//! This crate contains:
//! - Domain models (Device, LocationSample, Geofence, Alert, RemoteCommand)
//! - Pure business logic services (geographic math, geofence evaluation)
//! - Domain error types

pub mod models;
pub mod services;
