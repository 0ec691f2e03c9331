//! Thread management for the fusion daemon.
//!
//! - Channel receivers (`io::ChannelReceiver`): one per inbound channel
//! - [`FusionThread`]: correlation, tracking, eviction, publication
//! - Object publisher (`io::ObjectPublisher`): PUB socket for the tracked-objects feed

mod fusion_thread;

pub use fusion_thread::{Diagnostics, FusionService, FusionStats, FusionThread};
