//! FIR coordinate filter over the stretch and report windows.

use touchtrack_types::POINT_MAX;
use touchtrack_types::point::Point;

use crate::config::{FILTER_TAPS, FilterCoefficients};
use crate::history::{Window, WindowView};
use crate::tracker::Context;

/// Coefficient row for a slot with `run` consecutive stretch frames
fn filter_row(run: usize) -> usize {
    match run {
        0..=1 => 0,
        2..=3 => 1,
        4..=7 => 2,
        _ => 3,
    }
}

pub(crate) fn point_filter(ctx: &mut Context) {
    let den = ctx.config.filter_able;
    let stretch = ctx.history.stretch();
    let report = ctx.history.report();
    let mut filtered = [Point::EMPTY; POINT_MAX];
    for (slot, out) in filtered.iter_mut().enumerate() {
        let current = stretch.at(0, slot);
        *out = if !current.is_present() || current.key() || den <= 1 {
            current
        } else {
            filter_point(&ctx.config.filter, &stretch, &report, slot, den)
        };
    }
    *ctx.history.current_mut(Window::Report) = filtered;
}

fn filter_point(coe: &FilterCoefficients, stretch: &WindowView<'_>, report: &WindowView<'_>, slot: usize, den: u32) -> Point {
    let current = stretch.at(0, slot);
    let run = stretch.run_len(slot, FILTER_TAPS);
    let row = filter_row(run);

    // Frames past the available history repeat the oldest one
    let ps = |j: usize| stretch.at(j.min(run - 1), slot);
    let reported = (1..=FILTER_TAPS).take_while(|&d| report.at(d, slot).is_present()).count();
    let pr = |j: usize| {
        if reported == 0 {
            current
        } else {
            report.at((j + 1).min(reported), slot)
        }
    };

    let (mut sum_x, mut sum_y) = (0i64, 0i64);
    for j in 0..FILTER_TAPS {
        let (s, r) = (ps(j), pr(j));
        let (cs, cr) = (coe.ps[row][j] as i64, coe.pr[row][j] as i64);
        sum_x += s.x() as i64 * cs + r.x() as i64 * cr;
        sum_y += s.y() as i64 * cs + r.y() as i64 * cr;
    }
    let den = den as i64;
    let x = (sum_x + den / 2).div_euclid(den).clamp(0, 0xffff);
    let y = (sum_y + den / 2).div_euclid(den).clamp(0, 0xfff);
    current.with_coords(x as u16, y as u16)
}
