//! Mapping of tracked points from raw sensor space to screen pixels.

use touchtrack_types::point::Point;

use crate::config::{CELL_SIZE, Calibration, EdgeCut, TouchConfig};

/// Screen coordinate of a tracked point, `None` when the point is not reported.
///
/// Canvas points go through calibration, scaling, ignore zones, edge cut and
/// the axis flips. Key points are only scaled and then snapped to the first
/// key zone containing them.
pub(crate) fn screen_resolution(config: &TouchConfig, point: Point) -> Option<(u16, u16)> {
    let x_span = config.x_span() as i64;
    let y_span = config.y_span() as i64;
    if x_span <= 0 || y_span <= 0 {
        return None;
    }
    let screen_x = config.screen_x_max as i64;
    let screen_y = config.screen_y_max as i64;

    if point.key() {
        let x = (point.x() as i64 * screen_x / x_span).max(0);
        let y = (point.y() as i64 * screen_y / y_span).max(0);
        return key_resolution(config, x, y);
    }

    let x = calibrate(point.x(), config.match_x) * screen_x / x_span;
    let y = calibrate(point.y(), config.match_y) * screen_y / y_span;
    if !config.flags.ignore_bypass() && (ignored(x, config.ignore_x, screen_x) || ignored(y, config.ignore_y, screen_y)) {
        return None;
    }

    let (mut x, mut y) = edge_cut(x, y, &config.edge_cut, screen_x, screen_y);
    if config.flags.flip_x() {
        x = screen_x - x;
    }
    if config.flags.flip_y() {
        y = screen_y - y;
    }
    if config.flags.swap_xy() {
        (x, y) = (y, x);
    }
    Some((saturate(x), saturate(y)))
}

fn key_resolution(config: &TouchConfig, x: i64, y: i64) -> Option<(u16, u16)> {
    let zone = config
        .key_zones
        .iter()
        .filter(|zone| !zone.is_unused())
        .find(|zone| zone.contains(x.min(i32::MAX as i64) as i32, y.min(i32::MAX as i64) as i32));
    match zone {
        Some(zone) => Some((zone.target_x, zone.target_y)),
        None if config.key_map_able => None,
        None => Some((saturate(x), saturate(y))),
    }
}

fn calibrate(value: u16, calibration: Calibration) -> i64 {
    ((value as i64 - calibration.offset as i64) * calibration.scale as i64 + 2048) / 4096
}

/// A zero bound is unset. A high bound up to half the screen is a margin
/// from the far edge, anything larger is absolute.
fn ignored(value: i64, [low, high]: [i32; 2], screen: i64) -> bool {
    let (low, high) = (low as i64, high as i64);
    if low > 0 && value < low {
        return true;
    }
    match high {
        h if h <= 0 => false,
        h if h <= screen / 2 => value > screen - h,
        h => value > h,
    }
}

fn edge_cut(x: i64, y: i64, cut: &EdgeCut, screen_x: i64, screen_y: i64) -> (i64, i64) {
    (
        cut_axis(x, cut.left as i64, cut.right as i64, screen_x),
        cut_axis(y, cut.top as i64, cut.bottom as i64, screen_y),
    )
}

fn cut_axis(value: i64, near: i64, far: i64, screen: i64) -> i64 {
    if value <= near {
        near + 1
    } else if value >= screen - far {
        screen - far - 1
    } else {
        value
    }
}

fn saturate(value: i64) -> u16 {
    value.clamp(0, u16::MAX as i64) as u16
}

/// Sub-cell linearity correction of a raw point
pub(crate) fn cell_correct(config: &TouchConfig, point: Point) -> Point {
    let x = correct_axis(point.x() as u32, &config.cell_correct_x);
    let y = correct_axis(point.y() as u32, &config.cell_correct_y);
    point.with_coords(x as u16, y as u16)
}

fn correct_axis(value: u32, table: &[u8]) -> u32 {
    let cell = CELL_SIZE as u32 - 1;
    let offset = value & cell;
    let corrected = table.get(offset as usize).map_or(offset, |c| *c as u32 & cell);
    (value & !cell) | corrected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KeyZone;

    fn point(x: u16, y: u16) -> Point {
        Point::new().with_x(x).with_y(y)
    }

    /// 40 x 60 lines on a 1080 x 1920 screen
    fn config() -> TouchConfig {
        let mut config = TouchConfig::default();
        config.drv_num = 40;
        config.sen_num = 60;
        config.drv_num_nokey = 40;
        config.sen_num_nokey = 60;
        config.screen_x_max = 1080;
        config.screen_y_max = 1920;
        config
    }

    #[test]
    fn test_scaling() {
        let config = config();
        // 20 * 1080 / 2560 = 8, 30 * 1920 / 3840 = 15
        assert_eq!(screen_resolution(&config, point(20, 30)), Some((8, 15)));
        assert_eq!(screen_resolution(&config, point(1280, 1920)), Some((540, 960)));
    }

    #[test]
    fn test_calibration() {
        let mut config = config();
        config.match_x = Calibration { scale: 2048, offset: 100 };
        // (1380 - 100) * 2048 / 4096 = 640 raw, 270 px
        assert_eq!(screen_resolution(&config, point(1380, 1920)), Some((270, 960)));
    }

    #[test]
    fn test_calibration_truncates_toward_zero() {
        let shift = Calibration { scale: 4096, offset: 10 };
        // -10 * 4096 + 2048 = -9.5 cells
        assert_eq!(calibrate(0, shift), -9);
        assert_eq!(calibrate(30, shift), 20);
        assert_eq!(calibrate(5, Calibration { scale: -4096, offset: 0 }), -4);
    }

    #[test]
    fn test_edge_cut() {
        let mut config = config();
        assert_eq!(screen_resolution(&config, point(0, 3839)), Some((1, 1919)));
        config.edge_cut = EdgeCut {
            left: 10,
            right: 20,
            top: 0,
            bottom: 0,
        };
        assert_eq!(screen_resolution(&config, point(20, 30)), Some((11, 15)));
        assert_eq!(screen_resolution(&config, point(2550, 30)), Some((1059, 15)));
    }

    #[test]
    fn test_flip_and_swap() {
        let mut config = config();
        config.flags = config.flags.with_flip_x(true);
        assert_eq!(screen_resolution(&config, point(20, 30)), Some((1072, 15)));
        config.flags = config.flags.with_flip_y(true).with_swap_xy(true);
        assert_eq!(screen_resolution(&config, point(20, 30)), Some((1905, 1072)));
    }

    #[test]
    fn test_ignore_zones() {
        let mut config = config();
        // Low bound 100 px, high bound a 50 px margin from the right edge
        config.ignore_x = [100, 50];
        assert_eq!(screen_resolution(&config, point(20, 30)), None);
        assert_eq!(screen_resolution(&config, point(1280, 30)), Some((540, 15)));
        assert_eq!(screen_resolution(&config, point(2500, 30)), None);
        // Absolute high bound
        config.ignore_x = [0, 600];
        assert_eq!(screen_resolution(&config, point(1280, 30)), Some((540, 15)));
        assert_eq!(screen_resolution(&config, point(1600, 30)), None);
        // Bypassed
        config.flags = config.flags.with_ignore_bypass(true);
        assert_eq!(screen_resolution(&config, point(1600, 30)), Some((675, 15)));
    }

    #[test]
    fn test_key_zones() {
        let mut config = config();
        config.key_zones[1] = KeyZone {
            x_min: 100,
            x_max: 200,
            y_min: 1900,
            y_max: 2000,
            target_x: 150,
            target_y: 2100,
        };
        // 320 * 1080 / 2560 = 135, 3900 * 1920 / 3840 = 1950
        let key = point(320, 3900).with_key(true);
        assert_eq!(screen_resolution(&config, key), Some((150, 2100)));

        let outside = point(1280, 3900).with_key(true);
        assert_eq!(screen_resolution(&config, outside), Some((540, 1950)));
        config.key_map_able = true;
        assert_eq!(screen_resolution(&config, outside), None);
    }

    #[test]
    fn test_keys_skip_calibration() {
        let mut config = config();
        config.match_x = Calibration { scale: 0, offset: 0 };
        let key = point(320, 3900).with_key(true);
        assert_eq!(screen_resolution(&config, key), Some((135, 1950)));
    }

    #[test]
    fn test_zero_geometry_rejects() {
        let mut config = config();
        config.drv_num_nokey = 0;
        assert_eq!(screen_resolution(&config, point(20, 30)), None);
    }

    #[test]
    fn test_cell_correction() {
        let mut config = config();
        assert_eq!(cell_correct(&config, point(130, 70)), point(130, 70));

        config.cell_correct_x[2] = 10;
        config.cell_correct_y[6] = 0xff;
        let corrected = cell_correct(&config, point(130, 70).with_key(true));
        assert_eq!(corrected, point(128 + 10, 64 + 63).with_key(true));
    }
}
