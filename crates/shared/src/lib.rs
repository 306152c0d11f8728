//! Shared utilities and common types for the Trace backend.
//!
//! This crate provides common functionality used across all other crates:
//! - JWT issuance and validation for user and agent tokens
//! - Cryptographic utilities (token fingerprints)
//! - Common validation logic

pub mod crypto;
pub mod jwt;
pub mod validation;
