//! Channel model and wave delivery
//!
//! The capture collaborator hands the core interleaved float frames and a
//! channel layout; this module splits them into per-channel waves and
//! provides the Auto mono-mix pseudo-channel.

mod channel;
mod mixer;
mod resample;

pub use channel::{Channel, ChannelLayout};
pub use mixer::ChannelMixer;
pub use resample::Decimator;
