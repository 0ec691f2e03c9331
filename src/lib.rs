//! Drishti - camera/lidar fusion and object tracking for a bicycle
//! rider-assistance rig.
//!
//! Camera detections carry a label and a bearing but no range; the lidar
//! carries range but no label. Drishti pairs each detection with the nearest
//! scan return, smooths the result into a short-lived table of tracked
//! objects, and republishes that table for the heads-up display.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                  main / bin/                        │  ← Daemon, simulator
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                    threads/                         │  ← Fusion worker
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                      io/                            │  ← Wire messages,
//! │    (messages, mailbox, zmq subscriber/publisher)    │    transport
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                    fusion/                          │  ← Core algorithms
//! │          (scan_index, correlator, tracker)          │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                     core/                           │  ← Foundation
//! │                (types, math)                        │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! # Data Flow
//!
//! ```text
//! detections ──► ChannelReceiver ──► Mailbox ──┐
//!                                              ├──► FusionService ──► Mailbox ──► ObjectPublisher ──► tracked-objects
//! scan ───────► ChannelReceiver ──► Mailbox ──┘     (ScanIndex → Correlator → Tracker)
//! ```
//!
//! Every mailbox holds one message and overwrites it when a newer one
//! arrives: consumers only ever see the latest value.
//!
//! # Example
//!
//! ```
//! use drishti::config::{CorrelationConfig, TrackerConfig};
//! use drishti::core::types::{DetectionFrame, DetectionObservation, Scan, ScanPoint};
//! use drishti::threads::FusionService;
//! use std::time::Instant;
//!
//! let mut service = FusionService::new(&CorrelationConfig::default(), TrackerConfig::default());
//!
//! let scan = Scan::new(vec![ScanPoint::new(10.0, 2000.0)]);
//! let frame = DetectionFrame {
//!     timestamp: None,
//!     frame: None,
//!     observations: vec![DetectionObservation::new("bicycle", 0.9, 11.0, 40000.0)],
//! };
//!
//! let message = service
//!     .process_cycle(Some(&scan), Some(&frame), Instant::now())
//!     .unwrap();
//! assert_eq!(message.objects[0].distance_mm, Some(2000.0));
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod fusion;
pub mod io;
pub mod threads;

pub use config::Config;
pub use error::{Error, Result};
