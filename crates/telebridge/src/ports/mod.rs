//! Ports (Interfaces)
//!
//! Abstract interfaces that define how the domain layer
//! interacts with external systems (agent, carrier, contact center).
//!
//! Implementations of these traits live in the server and integration crates.

mod agent;
mod call_control;
mod contact_center;
mod conversation_hook;
mod directory;

pub use agent::*;
pub use call_control::*;
pub use contact_center::*;
pub use conversation_hook::*;
pub use directory::*;
