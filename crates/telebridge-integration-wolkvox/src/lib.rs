//! Wolkvox Integration for Telebridge
//!
//! Implements the [`ContactCenter`](telebridge::ports::ContactCenter) port over
//! the Wolkvox REST API: real-time agent listing, skill transfers and
//! interaction logging.
//!
//! # Usage
//!
//! ```rust,ignore
//! use telebridge_integration_wolkvox::{WolkvoxConfig, WolkvoxContactCenter};
//!
//! let config = WolkvoxConfig::new("token", "0042").with_max_attempts(3);
//! let contact_center = WolkvoxContactCenter::new(config)?;
//! let on_call = contact_center.list_agents(Some("Talk")).await?;
//! ```

mod client;
mod config;
mod error;
mod integration;

pub use client::WolkvoxClient;
pub use config::WolkvoxConfig;
pub use error::WolkvoxError;
pub use integration::WolkvoxContactCenter;
