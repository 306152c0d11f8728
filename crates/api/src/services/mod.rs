//! Application services.

pub mod ping;

pub use ping::PingOrchestrator;
