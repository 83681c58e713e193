//! Distance dependent damping.
//!
//! Each point moves from its previous damped position towards the raw one by
//! a ratio looked up in the stretch table: short steps (jitter) are damped,
//! long steps pass through.

use touchtrack_types::POINT_MAX;
use touchtrack_types::point::Point;

use crate::config::{STRETCH_STEPS, StretchStep};
use crate::geometry::isqrt;
use crate::history::Window;
use crate::tracker::Context;

/// Ratio applying the full movement
const FULL_RATIO: u32 = 128;
/// Finger count above which the table stops widening
const MAX_WIDEN_FINGERS: usize = 5;

/// Per-slot memory of the shortest step seen since the slot became active
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct StretchTrack {
    pub(crate) min_dn: Option<u32>,
    pub(crate) dr: u32,
}

impl StretchTrack {
    /// Ratio for a step of `dn`: the saved one when `dn` is a new minimum
    fn ratio(&mut self, dn: u32, steps: &[StretchStep]) -> u32 {
        match self.min_dn {
            Some(min) if dn < min => {
                self.min_dn = Some(dn);
            }
            Some(_) => {
                self.dr = stretch_ratio(steps, dn);
            }
            None => {
                self.min_dn = Some(dn);
                self.dr = stretch_ratio(steps, dn);
            }
        }
        self.dr
    }
}

pub(crate) fn point_stretch(ctx: &mut Context) {
    let (table, active) = widened_table(&ctx.config.stretch, ctx.config.stretch_mult, ctx.point_num);
    let steps = &table[..active];

    let pointer = ctx.history.pointer();
    let stretch = ctx.history.stretch();
    let mut damped = [Point::EMPTY; POINT_MAX];
    for (slot, out) in damped.iter_mut().enumerate() {
        let raw = pointer.at(0, slot);
        let prev = stretch.at(1, slot);
        if !raw.is_present() || !prev.is_present() {
            ctx.stretch[slot] = StretchTrack::default();
            *out = raw;
            continue;
        }
        if steps.len() < 2 || raw.key() {
            *out = raw;
            continue;
        }
        let dn = isqrt(ctx.scale.distance(prev, raw));
        let dr = ctx.stretch[slot].ratio(dn, steps);
        let x = damp(prev.x() as i64, raw.x() as i64, dr).clamp(0, 0xffff);
        let y = damp(prev.y() as i64, raw.y() as i64, dr).clamp(0, 0xfff);
        *out = raw.with_coords(x as u16, y as u16);
    }
    *ctx.history.current_mut(Window::Stretch) = damped;
}

/// Active part of the stretch table with distances widened for multi-touch.
///
/// Only the entries before the first zero distance are active.
fn widened_table(stretch: &[StretchStep; STRETCH_STEPS], mult: u32, tracked: usize) -> ([StretchStep; STRETCH_STEPS], usize) {
    let active = stretch.iter().take_while(|step| step.distance != 0).count();
    let mut table = *stretch;
    let fingers = tracked.clamp(1, MAX_WIDEN_FINGERS) as u64;
    if mult != 0 && fingers > 1 {
        let factor = mult as u64 * (fingers - 1) + 128;
        for step in table[..active].iter_mut() {
            step.distance = ((step.distance as u64).saturating_mul(factor) / 128).min(u32::MAX as u64) as u32;
        }
    }
    (table, active)
}

/// Ratio for a step of `dn` by linear interpolation between breakpoints.
///
/// Below the first breakpoint the curve starts at `(0, 128)`; beyond the last
/// one the full movement is applied.
pub(crate) fn stretch_ratio(steps: &[StretchStep], dn: u32) -> u32 {
    let Some(last) = steps.last() else {
        return FULL_RATIO;
    };
    if dn > last.distance {
        return FULL_RATIO;
    }
    let mut prior = StretchStep {
        distance: 0,
        coe: FULL_RATIO,
    };
    for step in steps {
        if dn <= step.distance {
            return interpolate(prior, *step, dn);
        }
        prior = *step;
    }
    FULL_RATIO
}

fn interpolate(from: StretchStep, to: StretchStep, dn: u32) -> u32 {
    if to.distance <= from.distance {
        return to.coe;
    }
    let span = (to.distance - from.distance) as i128;
    let ratio = from.coe as i128 + (to.coe as i128 - from.coe as i128) * (dn as i128 - from.distance as i128) / span;
    ratio.clamp(0, u32::MAX as i128) as u32
}

fn damp(prev: i64, raw: i64, dr: u32) -> i64 {
    let step = (raw - prev) * dr as i64;
    prev + ((step + 64) >> 7)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TouchConfig;

    fn point(x: u16, y: u16) -> Point {
        Point::new().with_x(x).with_y(y)
    }

    fn table() -> [StretchStep; STRETCH_STEPS] {
        let mut table = [StretchStep::default(); STRETCH_STEPS];
        table[0] = StretchStep { distance: 4, coe: 32 };
        table[1] = StretchStep { distance: 16, coe: 96 };
        table
    }

    /// One stretched frame at `prev`, then pointer `raw` in a new frame
    fn run(ctx: &mut Context, prev: Point, raw: Point) -> Point {
        ctx.history.advance();
        ctx.history.current_mut(Window::Stretch)[0] = prev;
        ctx.history.advance();
        ctx.history.current_mut(Window::Pointer)[0] = raw;
        ctx.point_num = 1;
        point_stretch(ctx);
        ctx.history.stretch().at(0, 0)
    }

    fn context() -> Context {
        let mut config = TouchConfig::default();
        config.stretch = table();
        Context::new(config)
    }

    #[test]
    fn test_ratio_curve() {
        let table = table();
        let steps = &table[..2];
        // (0, 128) to (4, 32)
        assert_eq!(stretch_ratio(steps, 0), 128);
        assert_eq!(stretch_ratio(steps, 2), 80);
        assert_eq!(stretch_ratio(steps, 4), 32);
        // (4, 32) to (16, 96)
        assert_eq!(stretch_ratio(steps, 10), 64);
        assert_eq!(stretch_ratio(steps, 16), 96);
        assert_eq!(stretch_ratio(steps, 17), 128);
        assert_eq!(stretch_ratio(&[], 3), 128);
    }

    #[test]
    fn test_damped_step() {
        let mut ctx = context();
        // dn = 2, ratio 80: 100 + (2 * 80 + 64) >> 7
        assert_eq!(run(&mut ctx, point(100, 100), point(102, 100)), point(101, 100));

        let mut ctx = context();
        // dn = 10, ratio 64
        assert_eq!(run(&mut ctx, point(100, 100), point(110, 100)), point(105, 100));
    }

    #[test]
    fn test_long_step_passes_through() {
        let mut ctx = context();
        assert_eq!(run(&mut ctx, point(100, 100), point(150, 100)), point(150, 100));
    }

    #[test]
    fn test_pass_through_cases() {
        // First frame of a slot
        let mut ctx = context();
        assert_eq!(run(&mut ctx, Point::EMPTY, point(102, 100)), point(102, 100));
        // Key point
        let mut ctx = context();
        let key = point(102, 100).with_key(true);
        assert_eq!(run(&mut ctx, point(100, 100).with_key(true), key), key);
        // Single entry table
        let mut config = TouchConfig::default();
        config.stretch[0] = StretchStep { distance: 4, coe: 32 };
        let mut ctx = Context::new(config);
        assert_eq!(run(&mut ctx, point(100, 100), point(102, 100)), point(102, 100));
    }

    #[test]
    fn test_smaller_step_reuses_saved_ratio() {
        let mut track = StretchTrack::default();
        let table = table();
        let steps = &table[..2];
        assert_eq!(track.ratio(10, steps), 64);
        assert_eq!(track.min_dn, Some(10));
        // New minimum: the ratio of the previous step is kept
        assert_eq!(track.ratio(2, steps), 64);
        assert_eq!(track.min_dn, Some(2));
        // Not below the minimum: a fresh ratio
        assert_eq!(track.ratio(4, steps), 32);
        assert_eq!(track.min_dn, Some(2));
    }

    #[test]
    fn test_widening_per_finger() {
        let (widened, active) = widened_table(&table(), 64, 3);
        assert_eq!(active, 2);
        // (64 * 2 + 128) / 128 = 2x
        assert_eq!(widened[0].distance, 8);
        assert_eq!(widened[1].distance, 32);

        let (widened, _) = widened_table(&table(), 64, 1);
        assert_eq!(widened[1].distance, 16);
        // Capped at five fingers
        let (widened, _) = widened_table(&table(), 128, 9);
        assert_eq!(widened[0].distance, 20);
    }

    #[test]
    fn test_huge_table_entries_saturate() {
        let mut huge = [StretchStep::default(); STRETCH_STEPS];
        huge[0] = StretchStep { distance: 4, coe: u32::MAX };
        huge[1] = StretchStep { distance: u32::MAX, coe: u32::MAX };
        assert_eq!(stretch_ratio(&huge[..2], 4), u32::MAX);

        let (widened, _) = widened_table(&huge, u32::MAX, 5);
        assert_eq!(widened[1].distance, u32::MAX);

        let mut config = TouchConfig::default();
        config.stretch = huge;
        let mut ctx = Context::new(config);
        // The damped step lands far outside the coordinate range
        assert_eq!(run(&mut ctx, point(100, 100), point(102, 100)), point(0xffff, 100));
    }
}
