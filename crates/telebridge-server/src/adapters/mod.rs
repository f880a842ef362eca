//! Infrastructure adapters implementing the domain ports.

pub mod call_control;
pub mod directory;
pub mod elevenlabs;
pub mod media_stream;

pub use call_control::{TelnyxCallControl, TwilioCallControl};
pub use directory::JsonCustomerDirectory;
pub use elevenlabs::{ElevenLabsConfig, ElevenLabsConnector};
pub use media_stream::{MediaStreamProtocol, MediaTrack, StreamStart, TelephonyEvent};
