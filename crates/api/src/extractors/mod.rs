//! Custom Axum extractors.
//!
//! Extractors for authenticating agent and operator requests.

pub mod agent_auth;
pub mod operator_auth;

pub use agent_auth::AgentAuth;
pub use operator_auth::OperatorAuth;
