//! Exposed channels connecting the transport, the tracker and the input sink

use embassy_sync::channel::Channel;
pub use embassy_sync::{blocking_mutex, channel, signal};
use embassy_sync::signal::Signal;
use touchtrack_types::frame::{RawFrame, TouchFrame};

use crate::config::TouchConfig;
use crate::{RAW_FRAME_CHANNEL_SIZE, RawMutex, TOUCH_FRAME_CHANNEL_SIZE};

/// Channel for raw frames from the controller transport
pub static RAW_FRAME_CHANNEL: Channel<RawMutex, RawFrame, RAW_FRAME_CHANNEL_SIZE> = Channel::new();
/// Channel for tracked frames to the input sink
pub static TOUCH_FRAME_CHANNEL: Channel<RawMutex, TouchFrame, TOUCH_FRAME_CHANNEL_SIZE> = Channel::new();
/// Signal for replacing the configuration of a running processor
pub static CONFIG_SIGNAL: Signal<RawMutex, TouchConfig> = Signal::new();
