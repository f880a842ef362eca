//! Domain Services
//!
//! Stateless functions shared by the server and integrations.

pub mod audio;
pub mod handoff;
pub mod xml;
