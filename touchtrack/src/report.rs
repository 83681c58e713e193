//! Delayed reveal and reporting.
//!
//! A new point is held back until it was seen for `delay` consecutive real
//! frames. Once revealed it is reported from the report window at depth
//! `report`, and a lifted point keeps its state for `dele` frames.

use bitfield_struct::bitfield;
use touchtrack_types::POINT_MAX;
use touchtrack_types::frame::{TouchFrame, TouchPoint};

use crate::mapping;
use crate::tracker::Context;

/// Per-slot reporting schedule
#[bitfield(u16, order = Lsb, defmt = cfg(feature = "defmt"))]
#[derive(Eq, PartialEq)]
pub(crate) struct DelayState {
    /// Frames to wait before the point is revealed
    #[bits(3)]
    pub(crate) delay: u8,
    /// Depth of the report window that is emitted
    #[bits(3)]
    pub(crate) report: u8,
    /// Depth of the pointer window that keeps the state alive
    #[bits(3)]
    pub(crate) dele: u8,
    /// Reported in the previous frame
    #[bits(1)]
    pub(crate) mask: bool,
    #[bits(1)]
    pub(crate) able: bool,
    /// Schedule loaded for the current touch
    #[bits(1)]
    pub(crate) init: bool,
    #[bits(4)]
    _reserved: u8,
}

/// 3-bit entry of a schedule word for finger-count `bucket`
fn schedule(word: u32, bucket: usize) -> u8 {
    ((word >> (3 * bucket)) & 0x7) as u8
}

/// Squared distance under which the report lag is shortened
const REVISION_DISTANCE: u32 = 9;

pub(crate) fn point_delay(ctx: &mut Context) {
    let bucket = ctx.point_num.clamp(1, POINT_MAX) - 1;
    let config = &ctx.config;
    let pointer = ctx.history.pointer();
    let report = ctx.history.report();

    for (slot, state) in ctx.delay.iter_mut().enumerate() {
        let current = pointer.at(0, slot);
        if config.report_delay == 0 {
            *state = DelayState::new().with_mask(state.mask()).with_able(current.is_present());
            continue;
        }

        if current.is_present() && !state.able() && !state.init() && ctx.point_num > 0 {
            let delay = schedule(config.report_delay, bucket);
            let ahead = schedule(config.report_ahead, bucket).min(delay);
            let dele = schedule(config.report_delete, bucket).min(ahead);
            *state = state.with_delay(delay).with_report(ahead).with_dele(dele).with_init(true);
        }
        if !current.is_present() {
            state.set_init(false);
        }

        if !state.able() && current.is_present() {
            let ready = (0..=state.delay() as usize).all(|depth| {
                let p = pointer.at(depth, slot);
                p.is_present() && !p.fill() && !p.able()
            });
            if ready {
                trace!("Touch id {} revealed after {} frames", slot + 1, state.delay());
                state.set_able(true);
            }
        }

        if pointer.at(state.dele() as usize, slot).is_empty() {
            *state = DelayState::new().with_mask(state.mask());
            continue;
        }

        if config.report_delete == 0 && state.report() > 0 {
            let depth = state.report() as usize;
            let (older, newer) = (report.at(depth, slot), report.at(depth - 1, slot));
            if older.is_present() && newer.is_present() && ctx.scale.distance(older, newer) < REVISION_DISTANCE {
                state.set_report(state.report() - 1);
                if state.dele() > 0 {
                    state.set_dele(state.dele() - 1);
                }
            }
        }
    }
}

/// Build the output frame from the revealed slots
pub(crate) fn point_report(ctx: &mut Context) -> TouchFrame {
    let report = ctx.history.report();
    let masked = ctx.config.flags.over_report_mask() && ctx.point_num > ctx.config.point_num_max as usize;
    if masked {
        trace!("{} points tracked, over the limit of {}", ctx.point_num, ctx.config.point_num_max);
    }

    let mut output = TouchFrame::empty();
    for (slot, state) in ctx.delay.iter_mut().enumerate() {
        let mut reported = false;
        if !masked && state.able() {
            let point = report.at(state.report() as usize, slot);
            if point.is_present()
                && let Some((x, y)) = mapping::screen_resolution(&ctx.config, point)
            {
                output.push(TouchPoint {
                    id: slot as u8 + 1,
                    x,
                    y,
                });
                reported = true;
            }
        }
        if reported != state.mask() {
            if reported {
                debug!("Touch id {} down", slot + 1);
            } else {
                debug!("Touch id {} up", slot + 1);
            }
        }
        state.set_mask(reported);
    }
    output
}
