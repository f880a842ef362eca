//! Domain Entities
//!
//! Core domain models with identity.

mod active_call;
mod call_session;
mod contact_center;
mod customer;
mod tool_call;

pub use active_call::*;
pub use call_session::*;
pub use contact_center::*;
pub use customer::*;
pub use tool_call::*;
