//! Frame driver.
//!
//! [`TouchTracker`] owns every piece of tracking state and runs the stages
//! once per raw frame. Calls are serialized by `&mut self`; a frame always runs
//! to completion.

use touchtrack_types::POINT_MAX;
use touchtrack_types::frame::{FrameControl, RawFrame, TouchFrame};
use touchtrack_types::point::Point;

use crate::config::TouchConfig;
use crate::geometry::DistanceScale;
use crate::history::History;
use crate::report::DelayState;
use crate::stretch::StretchTrack;
use crate::{filter, mapping, matching, predict, report, stretch};

/// State shared by all stages of one frame
pub(crate) struct Context {
    pub(crate) config: TouchConfig,
    pub(crate) scale: DistanceScale,
    pub(crate) history: History,
    /// Raw points of the current frame that are not matched yet
    pub(crate) now: [Point; POINT_MAX],
    pub(crate) delay: [DelayState; POINT_MAX],
    pub(crate) stretch: [StretchTrack; POINT_MAX],
    /// Raw points on input, tracked points after matching
    pub(crate) point_num: usize,
    pub(crate) control: FrameControl,
    /// No frame has been processed since the last reset
    pub(crate) fresh: bool,
    geometry_valid: bool,
}

impl Context {
    pub(crate) fn new(config: TouchConfig) -> Self {
        Self {
            scale: DistanceScale::new(&config),
            geometry_valid: config.is_valid(),
            config,
            history: History::new(),
            now: [Point::EMPTY; POINT_MAX],
            delay: [DelayState::new(); POINT_MAX],
            stretch: [StretchTrack::default(); POINT_MAX],
            point_num: 0,
            control: FrameControl::new(),
            fresh: true,
        }
    }

    /// Forget every tracked point, keep the configuration
    pub(crate) fn reset(&mut self) {
        self.history.reset();
        self.now = [Point::EMPTY; POINT_MAX];
        self.delay = [DelayState::new(); POINT_MAX];
        self.stretch = [StretchTrack::default(); POINT_MAX];
        self.point_num = 0;
        self.fresh = true;
    }

    /// Validate the geometry, logging on transitions only
    fn data_check(&mut self) -> bool {
        let valid = self.config.is_valid();
        if valid != self.geometry_valid {
            if valid {
                info!("Touch geometry valid again");
            } else {
                warn!(
                    "Invalid touch geometry: lines {}x{} ({}x{} without keys), screen {}x{}",
                    self.config.drv_num,
                    self.config.sen_num,
                    self.config.drv_num_nokey,
                    self.config.sen_num_nokey,
                    self.config.screen_x_max,
                    self.config.screen_y_max
                );
            }
            self.geometry_valid = valid;
        }
        valid
    }

    /// Take the raw samples of `input`, dropping empty and no-data ones
    fn load_raw(&mut self, input: &RawFrame) {
        let extended = self.control.ex();
        self.now = [Point::EMPTY; POINT_MAX];
        let mut n = 0;
        for i in 0..self.control.point_num() {
            let mut point = Point::from_raw(input.x[i], input.y[i], extended);
            if !point.is_present() {
                continue;
            }
            if self.config.cell_correct_able {
                point = mapping::cell_correct(&self.config, point);
            }
            self.now[n] = point;
            n += 1;
        }
        self.point_num = n;
    }

    fn count_tracked(&self) -> usize {
        self.history.pointer()[0].iter().filter(|p| p.is_present()).count()
    }
}

/// The touch tracking engine
pub struct TouchTracker {
    ctx: Context,
}

impl Default for TouchTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl TouchTracker {
    /// Tracker with the default configuration
    pub fn new() -> Self {
        Self {
            ctx: Context::new(TouchConfig::default()),
        }
    }

    /// Load a configuration and reset all tracking state.
    ///
    /// Accepts a word table (`&[u32]`, `&[u32; N]`) or a decoded
    /// [`TouchConfig`]. Never fails: invalid geometry makes every following
    /// frame report no touches.
    pub fn init(&mut self, config: impl Into<TouchConfig>) {
        let config = config.into();
        info!(
            "Touch config loaded: screen {}x{}, lines {}x{}, delay {:#x}, filter {}",
            config.screen_x_max,
            config.screen_y_max,
            config.drv_num_nokey,
            config.sen_num_nokey,
            config.report_delay,
            config.filter_able
        );
        self.ctx = Context::new(config);
        if !self.ctx.geometry_valid {
            warn!("Touch config has invalid geometry, reporting no touches");
        }
    }

    /// Process one raw frame and return the tracked points
    pub fn process_frame(&mut self, input: &RawFrame) -> TouchFrame {
        let ctx = &mut self.ctx;
        let control = input.control();

        if control.reset() {
            debug!("Tracking reset requested");
            ctx.reset();
            return TouchFrame::empty();
        }
        if control.mask() {
            debug!("Tracking reset before frame");
            ctx.reset();
        }
        if !ctx.data_check() {
            ctx.point_num = 0;
            return TouchFrame::empty();
        }

        ctx.control = control;
        ctx.load_raw(input);
        ctx.history.advance();

        predict::point_predict(ctx);
        matching::point_id(ctx);
        matching::point_new_id(ctx);
        matching::point_order(ctx);
        ctx.point_num = ctx.count_tracked();

        stretch::point_stretch(ctx);
        filter::point_filter(ctx);
        report::point_delay(ctx);
        let output = report::point_report(ctx);

        trace!(
            "Frame {}: {} raw, {} tracked, {} reported",
            ctx.history.counter(),
            control.point_num(),
            ctx.point_num,
            output.finger_num
        );
        ctx.fresh = false;
        output
    }
}
