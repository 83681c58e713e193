//! Async driver of a [`TouchTracker`].
//!
//! [`TouchProcessor`] owns a tracker and consumes raw frames from an
//! embassy-sync channel, sending one tracked frame per raw frame. A new
//! configuration can be pushed at any time through a [`Signal`]; it is applied
//! between two frames.

use embassy_futures::select::{Either, select};
use embassy_sync::channel::{Receiver, Sender};
use embassy_sync::signal::Signal;
use touchtrack_types::frame::{RawFrame, TouchFrame};

use crate::channel::{CONFIG_SIGNAL, RAW_FRAME_CHANNEL, TOUCH_FRAME_CHANNEL};
use crate::config::TouchConfig;
use crate::tracker::TouchTracker;
use crate::{RAW_FRAME_CHANNEL_SIZE, RawMutex, TOUCH_FRAME_CHANNEL_SIZE};

pub struct TouchProcessor<'a, const IN: usize, const OUT: usize> {
    tracker: TouchTracker,
    input: Receiver<'a, RawMutex, RawFrame, IN>,
    output: Sender<'a, RawMutex, TouchFrame, OUT>,
    config: Option<&'a Signal<RawMutex, TouchConfig>>,
}

impl TouchProcessor<'static, RAW_FRAME_CHANNEL_SIZE, TOUCH_FRAME_CHANNEL_SIZE> {
    /// Processor wired to the channels in [`crate::channel`]
    pub fn with_default_channels(tracker: TouchTracker) -> Self {
        TouchProcessor::new(tracker, RAW_FRAME_CHANNEL.receiver(), TOUCH_FRAME_CHANNEL.sender()).with_config_signal(&CONFIG_SIGNAL)
    }
}

impl<'a, const IN: usize, const OUT: usize> TouchProcessor<'a, IN, OUT> {
    pub fn new(tracker: TouchTracker, input: Receiver<'a, RawMutex, RawFrame, IN>, output: Sender<'a, RawMutex, TouchFrame, OUT>) -> Self {
        Self {
            tracker,
            input,
            output,
            config: None,
        }
    }

    /// Also listen for configuration updates on `signal`
    pub fn with_config_signal(mut self, signal: &'a Signal<RawMutex, TouchConfig>) -> Self {
        self.config = Some(signal);
        self
    }

    /// Wait for the next raw frame or configuration and handle it
    pub async fn process_next(&mut self) {
        let Some(signal) = self.config else {
            let frame = self.input.receive().await;
            self.process(frame).await;
            return;
        };
        match select(self.input.receive(), signal.wait()).await {
            Either::First(frame) => self.process(frame).await,
            Either::Second(config) => {
                debug!("Touch config updated");
                self.tracker.init(config);
            }
        }
    }

    async fn process(&mut self, frame: RawFrame) {
        let output = self.tracker.process_frame(&frame);
        self.output.send(output).await;
    }

    pub async fn run(&mut self) -> ! {
        info!("Touch processor started");
        loop {
            self.process_next().await;
        }
    }
}
