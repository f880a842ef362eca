//! Value Objects
//!
//! Immutable objects defined by their attributes rather than identity.

mod call_state;
mod telephony_provider;
mod transfer_reason;

pub use call_state::*;
pub use telephony_provider::*;
pub use transfer_reason::*;
