//! # touchtrack
//!
//! Touch point tracking and filtering engine. Raw per-frame samples from a
//! capacitive touch controller go in, a stable, de-noised and id-tracked set
//! of screen points comes out.
//!
//! The pipeline runs once per raw frame:
//!
//! 1. history rotation (`history`)
//! 2. motion prediction (`predict`)
//! 3. identity matching (`matching`)
//! 4. jitter damping (`stretch`)
//! 5. coordinate filtering (`filter`)
//! 6. delayed reveal and reporting (`report`)
//! 7. screen mapping (`mapping`)
//!
//! [`TouchTracker`] owns all state. [`processor::TouchProcessor`] drives a
//! tracker from embassy channels, by default the ones in [`channel`].

#![no_std]

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

pub mod channel;
pub mod config;
pub(crate) mod filter;
pub(crate) mod geometry;
pub(crate) mod history;
pub(crate) mod mapping;
pub(crate) mod matching;
pub(crate) mod predict;
pub mod processor;
pub(crate) mod report;
pub(crate) mod stretch;
pub mod tracker;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
pub use touchtrack_types::POINT_MAX;
pub use touchtrack_types::flags::PolicyFlags;
pub use touchtrack_types::frame::{FrameControl, RawFrame, TouchFrame, TouchPoint};
pub use touchtrack_types::point::{Point, RAW_KEY_FLAG, RAW_TRACK_ONLY_FLAG};

pub use config::{ConfigError, TouchConfig};
pub use processor::TouchProcessor;
pub use tracker::TouchTracker;

/// Mutex type used by the channels of [`TouchProcessor`]
pub type RawMutex = CriticalSectionRawMutex;

/// Capacity of [`channel::RAW_FRAME_CHANNEL`]
pub const RAW_FRAME_CHANNEL_SIZE: usize = 4;
/// Capacity of [`channel::TOUCH_FRAME_CHANNEL`]
pub const TOUCH_FRAME_CHANNEL_SIZE: usize = 4;
