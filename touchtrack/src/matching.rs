//! Identity matching.
//!
//! Raw points of the current frame are assigned to the predicted slots by a
//! greedy nearest-neighbor pass over the distance matrix. What is left opens
//! new identities in free slots, and predictions nobody claimed are retired.

use touchtrack_types::POINT_MAX;
use touchtrack_types::point::Point;

use crate::geometry::DISTANCE_NONE;
use crate::history::Window;
use crate::report::DelayState;
use crate::stretch::StretchTrack;
use crate::tracker::Context;

/// Speed class of a squared distance: the highest `i` in `1..=8` with
/// `distance > 0x100 << i`, 0 when none.
pub(crate) fn speed_get(distance: u32) -> u32 {
    (1..=8u32).rev().find(|&i| distance > 0x100 << i).unwrap_or(0)
}

/// Squared distances between raw points (rows) and predicted slots (columns)
struct DistanceMatrix {
    cells: [[u32; POINT_MAX]; POINT_MAX],
}

impl DistanceMatrix {
    fn new() -> Self {
        Self {
            cells: [[DISTANCE_NONE; POINT_MAX]; POINT_MAX],
        }
    }

    /// Smallest cell as `(row, column, distance)`, the first one on ties
    fn min(&self) -> Option<(usize, usize, u32)> {
        let mut best = None;
        let mut best_distance = DISTANCE_NONE;
        for (row, cells) in self.cells.iter().enumerate() {
            for (column, &distance) in cells.iter().enumerate() {
                if distance < best_distance {
                    best_distance = distance;
                    best = Some((row, column));
                }
            }
        }
        best.map(|(row, column)| (row, column, best_distance))
    }

    fn strike(&mut self, row: usize, column: usize) {
        self.cells[row] = [DISTANCE_NONE; POINT_MAX];
        for cells in self.cells.iter_mut() {
            cells[column] = DISTANCE_NONE;
        }
    }
}

/// Assign raw points to the slots predicted for this frame
pub(crate) fn point_id(ctx: &mut Context) {
    if ctx.control.only() {
        point_id_only(ctx);
        return;
    }

    let pointer = ctx.history.pointer();
    let predicted = *pointer.frame(0);

    // Largest distance each slot accepts
    let mut gate = [0u64; POINT_MAX];
    for (slot, gate) in gate.iter_mut().enumerate() {
        let prediction = predicted[slot];
        if !prediction.is_present() {
            continue;
        }
        let h1 = pointer.at(1, slot);
        let h2 = pointer.at(2, slot);
        let mut speed = if !prediction.predict() || h1.fill() {
            ctx.config.id_first_coe
        } else {
            speed_get(ctx.scale.distance(h1, prediction))
        };
        if h1.is_present() && h2.is_present() {
            speed = speed.max(speed_get(ctx.scale.distance(h1, h2)));
        }
        *gate = ctx.config.id_static_coe as u64 + speed as u64 * ctx.config.id_speed_coe as u64;
    }

    let mut matrix = DistanceMatrix::new();
    for (row, raw) in ctx.now.iter().enumerate().take(ctx.point_num) {
        if !raw.is_present() {
            continue;
        }
        for (slot, prediction) in predicted.iter().enumerate() {
            if prediction.is_present() {
                matrix.cells[row][slot] = ctx.scale.distance(*raw, *prediction);
            }
        }
    }

    let current = ctx.history.current_mut(Window::Pointer);
    while let Some((row, slot, distance)) = matrix.min() {
        if distance as u64 >= gate[slot] {
            break;
        }
        current[slot] = ctx.now[row];
        ctx.now[row] = Point::EMPTY;
        matrix.strike(row, slot);
    }
}

/// Single point mode: slot 0 takes the raw point closest to its prediction
/// on the same side of the key boundary, every other point is discarded.
fn point_id_only(ctx: &mut Context) {
    let pointer = ctx.history.pointer();
    let prediction = pointer.at(0, 0);
    let key = pointer.at(1, 0).key();
    let raws = &ctx.now[..ctx.point_num];

    let nearest = if prediction.is_present() {
        raws.iter()
            .enumerate()
            .filter(|(_, raw)| raw.is_present() && raw.key() == key)
            .min_by_key(|(_, raw)| ctx.scale.distance(**raw, prediction))
            .map(|(row, _)| row)
    } else {
        None
    };
    let chosen = nearest.or_else(|| raws.iter().position(|raw| raw.is_present()));

    let mut frame = [Point::EMPTY; POINT_MAX];
    frame[0] = match chosen {
        Some(row) => ctx.now[row],
        None => prediction,
    };
    *ctx.history.current_mut(Window::Pointer) = frame;
    ctx.now = [Point::EMPTY; POINT_MAX];
}

/// Give every unmatched raw point a free slot
pub(crate) fn point_new_id(ctx: &mut Context) {
    for point in ctx.history.current_mut(Window::Pointer).iter_mut() {
        if point.is_no_data() {
            *point = Point::EMPTY;
        }
    }

    for row in 0..ctx.point_num {
        let raw = ctx.now[row];
        if !raw.is_present() {
            continue;
        }
        ctx.now[row] = Point::EMPTY;
        if raw.able() {
            trace!("Track-only point at ({}, {}) dropped", raw.x(), raw.y());
            continue;
        }
        // A slot is reused only after it stayed empty for three frames
        let pointer = ctx.history.pointer();
        let Some(slot) = (0..POINT_MAX).find(|&slot| pointer.clear_len(slot) > 2) else {
            debug!("No free slot for touch at ({}, {})", raw.x(), raw.y());
            continue;
        };
        ctx.history.current_mut(Window::Pointer)[slot] = raw;
        // The departed touch may still be held by its delete schedule
        ctx.delay[slot] = DelayState::new().with_mask(ctx.delay[slot].mask());
        ctx.stretch[slot] = StretchTrack::default();
        debug!("New touch id {} at ({}, {})", slot + 1, raw.x(), raw.y());
    }
}

/// Retire predictions that were not confirmed by a raw point
pub(crate) fn point_order(ctx: &mut Context) {
    let filter_off = ctx.config.filter_able <= 1;
    let pointer = ctx.history.pointer();
    let mut retire = [false; POINT_MAX];
    for (slot, retire) in retire.iter_mut().enumerate() {
        let current = pointer.at(0, slot);
        let h1 = pointer.at(1, slot);
        *retire = current.fill() && (!h1.is_present() || h1.fill() || filter_off);
    }

    let current = ctx.history.current_mut(Window::Pointer);
    for (slot, point) in current.iter_mut().enumerate() {
        if retire[slot] {
            debug!("Touch id {} lifted", slot + 1);
            *point = Point::EMPTY;
        }
    }
}

#[cfg(test)]
mod tests {
    use touchtrack_types::frame::FrameControl;

    use super::*;
    use crate::config::TouchConfig;
    use crate::predict;

    fn point(x: u16, y: u16) -> Point {
        Point::new().with_x(x).with_y(y)
    }

    /// Store `frames` (oldest first) as pointer history, then open a frame
    /// holding `raw` and run prediction on it
    fn setup(ctx: &mut Context, frames: &[&[Point]], raw: &[Point]) {
        for frame in frames {
            ctx.history.advance();
            let current = ctx.history.current_mut(Window::Pointer);
            for (slot, p) in frame.iter().enumerate() {
                current[slot] = *p;
            }
        }
        ctx.history.advance();
        ctx.now = [Point::EMPTY; POINT_MAX];
        ctx.now[..raw.len()].copy_from_slice(raw);
        ctx.point_num = raw.len();
        ctx.fresh = false;
        predict::point_predict(ctx);
    }

    fn context() -> Context {
        Context::new(TouchConfig::default())
    }

    fn current(ctx: &Context, slot: usize) -> Point {
        ctx.history.pointer().at(0, slot)
    }

    #[test]
    fn test_speed_get() {
        assert_eq!(speed_get(0), 0);
        assert_eq!(speed_get(0x200), 0);
        assert_eq!(speed_get(0x201), 1);
        assert_eq!(speed_get(0x801), 3);
        assert_eq!(speed_get(0x1_0000), 7);
        assert_eq!(speed_get(0x1_0001), 8);
        assert_eq!(speed_get(u32::MAX), 8);
    }

    #[test]
    fn test_matrix_tie_break() {
        let mut matrix = DistanceMatrix::new();
        matrix.cells[1][0] = 5;
        matrix.cells[0][3] = 5;
        matrix.cells[2][2] = 7;
        assert_eq!(matrix.min(), Some((0, 3, 5)));
        matrix.strike(0, 3);
        assert_eq!(matrix.min(), Some((1, 0, 5)));
        matrix.strike(1, 0);
        assert_eq!(matrix.min(), Some((2, 2, 7)));
        matrix.strike(2, 2);
        assert_eq!(matrix.min(), None);
    }

    #[test]
    fn test_nearest_points_keep_their_slots() {
        let mut ctx = context();
        setup(&mut ctx, &[&[point(100, 100), point(900, 600)]], &[point(905, 602), point(98, 101)]);
        point_id(&mut ctx);
        assert_eq!(current(&ctx, 0), point(98, 101));
        assert_eq!(current(&ctx, 1), point(905, 602));
        assert!(ctx.now.iter().all(|p| p.is_empty()));
    }

    #[test]
    fn test_far_point_opens_new_slot() {
        let mut ctx = context();
        setup(&mut ctx, &[&[point(100, 100)]], &[point(700, 700)]);
        point_id(&mut ctx);
        // Unmatched: slot 0 still holds its prediction
        assert!(current(&ctx, 0).fill());
        assert_eq!(ctx.now[0], point(700, 700));

        point_new_id(&mut ctx);
        assert_eq!(current(&ctx, 1), point(700, 700));
        point_order(&mut ctx);
        assert!(current(&ctx, 0).is_empty());
        assert_eq!(current(&ctx, 1), point(700, 700));
    }

    #[test]
    fn test_lifted_slot_is_not_reused_at_once() {
        let mut ctx = context();
        setup(&mut ctx, &[&[point(100, 100)], &[]], &[point(300, 300)]);
        point_id(&mut ctx);
        point_new_id(&mut ctx);
        assert_eq!(current(&ctx, 1), point(300, 300));
        assert!(current(&ctx, 0).is_empty());

        let mut ctx = context();
        setup(&mut ctx, &[&[point(100, 100)], &[], &[]], &[point(300, 300)]);
        point_id(&mut ctx);
        point_new_id(&mut ctx);
        assert_eq!(current(&ctx, 0), point(300, 300));
    }

    #[test]
    fn test_reused_slot_starts_with_fresh_state() {
        let mut ctx = context();
        ctx.delay[0] = DelayState::new().with_able(true).with_report(3).with_dele(7).with_mask(true);
        ctx.stretch[0] = StretchTrack { min_dn: Some(3), dr: 50 };
        setup(&mut ctx, &[&[point(100, 100)], &[], &[]], &[point(300, 300)]);
        point_id(&mut ctx);
        point_new_id(&mut ctx);
        assert_eq!(current(&ctx, 0), point(300, 300));
        assert_eq!(ctx.delay[0], DelayState::new().with_mask(true));
        assert_eq!(ctx.stretch[0], StretchTrack::default());
    }

    #[test]
    fn test_track_only_point_continues_but_never_opens() {
        let mut ctx = context();
        let raw = point(102, 101).with_able(true);
        setup(&mut ctx, &[&[point(100, 100)]], &[raw]);
        point_id(&mut ctx);
        assert_eq!(current(&ctx, 0), raw);

        let mut ctx = context();
        setup(&mut ctx, &[], &[raw]);
        point_id(&mut ctx);
        point_new_id(&mut ctx);
        assert!(ctx.history.pointer()[0].iter().all(|p| p.is_empty()));
    }

    #[test]
    fn test_points_beyond_free_slots_are_dropped() {
        let mut ctx = context();
        let full: [Point; POINT_MAX] = core::array::from_fn(|i| point(50 + 70 * i as u16, 50));
        setup(&mut ctx, &[&full], &[point(400, 700)]);
        point_id(&mut ctx);
        point_new_id(&mut ctx);
        assert!(ctx.now.iter().all(|p| p.is_empty()));
        assert!(ctx.history.pointer()[0].iter().all(|p| p.fill()));
    }

    #[test]
    fn test_unconfirmed_prediction_kept_with_filter() {
        let mut ctx = context();
        ctx.config.filter_able = 4;
        setup(&mut ctx, &[&[point(100, 100)]], &[]);
        point_id(&mut ctx);
        point_new_id(&mut ctx);
        point_order(&mut ctx);
        assert!(current(&ctx, 0).fill());

        // A second missing frame retires it
        setup(&mut ctx, &[], &[]);
        point_id(&mut ctx);
        point_new_id(&mut ctx);
        point_order(&mut ctx);
        assert!(current(&ctx, 0).is_empty());
    }

    #[test]
    fn test_only_mode_tracks_slot_zero() {
        let mut ctx = context();
        setup(
            &mut ctx,
            &[&[point(100, 100), point(500, 500)]],
            &[point(600, 600), point(110, 100), point(105, 100).with_key(true)],
        );
        ctx.control = FrameControl::new().with_only(true);
        point_id(&mut ctx);
        assert_eq!(current(&ctx, 0), point(110, 100));
        assert!(current(&ctx, 1).is_empty());
        assert!(ctx.now.iter().all(|p| p.is_empty()));
    }

    #[test]
    fn test_only_mode_without_history_takes_first_point() {
        let mut ctx = context();
        setup(&mut ctx, &[], &[point(300, 200), point(100, 100)]);
        ctx.control = FrameControl::new().with_only(true);
        point_id(&mut ctx);
        point_new_id(&mut ctx);
        assert_eq!(current(&ctx, 0), point(300, 200));
        assert!(current(&ctx, 1).is_empty());
    }
}
