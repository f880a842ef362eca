//! Telebridge API Data Models
//!
//! - Session: live telephony bridges
//! - Orchestrator: contact-center call tracking and transfers
//! - Tools: agent webhook payloads

mod orchestrator;
mod session;
mod tools;

pub use orchestrator::*;
pub use session::*;
pub use tools::*;
