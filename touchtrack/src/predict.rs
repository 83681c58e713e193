//! Motion prediction.
//!
//! Every slot with a point in the previous frame gets a predicted position for
//! the current frame, used as the matching target. Predictions carry the
//! `fill` flag until a raw point replaces them.

use touchtrack_types::POINT_MAX;
use touchtrack_types::point::Point;

use crate::history::Window;
use crate::tracker::Context;

pub(crate) fn point_predict(ctx: &mut Context) {
    let pointer = ctx.history.pointer();
    let hold = ctx.control.interpolation() || ctx.control.only() || ctx.fresh;
    let x_span = ctx.config.x_span();
    let y_span = ctx.config.y_span();

    let mut predicted = [Point::EMPTY; POINT_MAX];
    for (slot, out) in predicted.iter_mut().enumerate() {
        let h1 = pointer.at(1, slot);
        let h2 = pointer.at(2, slot);
        let h3 = pointer.at(3, slot);
        if !h1.is_present() {
            *out = Point::NO_DATA;
            continue;
        }
        let point = if hold || !h2.is_present() || h2.fill() || h3.fill() || h1.key() {
            predict_one(h1)
        } else if !h3.is_present() {
            predict_two(h1, h2, x_span, y_span)
        } else {
            predict_three(h1, h2, h3, x_span, y_span)
        };
        *out = point.with_fill(true).with_key(h1.key());
    }
    *ctx.history.current_mut(Window::Pointer) = predicted;
}

/// Carry the previous position forward
fn predict_one(h1: Point) -> Point {
    Point::new().with_coords(h1.x(), h1.y())
}

/// Linear extrapolation from two frames
fn predict_two(h1: Point, h2: Point, x_span: i32, y_span: i32) -> Point {
    let x = 2 * h1.x() as i32 - h2.x() as i32;
    let y = 2 * h1.y() as i32 - h2.y() as i32;
    extrapolated(h1, (x, y), x_span, y_span)
}

/// Quadratic extrapolation from three frames
fn predict_three(h1: Point, h2: Point, h3: Point, x_span: i32, y_span: i32) -> Point {
    let x = (5 * h1.x() as i32 + h3.x() as i32 - 4 * h2.x() as i32) / 2;
    let y = (5 * h1.y() as i32 + h3.y() as i32 - 4 * h2.y() as i32) / 2;
    extrapolated(h1, (x, y), x_span, y_span)
}

fn extrapolated(h1: Point, target: (i32, i32), x_span: i32, y_span: i32) -> Point {
    let prior = (h1.x() as i32, h1.y() as i32);
    let (x, y) = point_range(prior, target, x_span, y_span);
    Point::new()
        .with_coords(x.min(0xffff) as u16, y.min(0xfff) as u16)
        .with_predict(true)
}

/// Keep an extrapolated point inside `[1, x_span) x [1, y_span)`.
///
/// An axis leaving the range is clamped to the boundary and the other axis is
/// moved along the segment from `prior`, so the predicted direction is kept.
/// When the clamped axis did not move the interpolation is skipped.
pub(crate) fn point_range(prior: (i32, i32), target: (i32, i32), x_span: i32, y_span: i32) -> (i32, i32) {
    let x_max = (x_span as i64 - 1).max(1);
    let y_max = (y_span as i64 - 1).max(1);
    let (x1, y1) = (prior.0 as i64, prior.1 as i64);
    let (mut x0, mut y0) = (target.0 as i64, target.1 as i64);

    if x0 < 1 || x0 > x_max {
        let xb = x0.clamp(1, x_max);
        if x0 != x1 {
            y0 = y1 + (y0 - y1) * (xb - x1) / (x0 - x1);
        }
        x0 = xb;
    }
    if y0 < 1 || y0 > y_max {
        let yb = y0.clamp(1, y_max);
        if y0 != y1 {
            x0 = x1 + (x0 - x1) * (yb - y1) / (y0 - y1);
        }
        y0 = yb;
    }
    (x0.clamp(1, x_max) as i32, y0.clamp(1, y_max) as i32)
}
