//! Distance helpers shared by the matching, stretch and report stages.

use touchtrack_types::point::Point;

use crate::config::TouchConfig;

/// Distance value of a cell that must never be matched
pub(crate) const DISTANCE_NONE: u32 = u32::MAX;

/// Integer square root, rounded down
pub(crate) fn isqrt(value: u32) -> u32 {
    if value < 2 {
        return value;
    }
    // Newton iteration starting above the root
    let value = value as u64;
    let mut x = value;
    let mut y = (x + 1) / 2;
    while y < x {
        x = y;
        y = (x + value / x) / 2;
    }
    x as u32
}

/// Anisotropic correction of the distance metric.
///
/// Raw x spans `drv_nokey * 64` and maps to `screen_x` pixels, raw y spans
/// `sen_nokey * 64` and maps to `screen_y` pixels. With `reso_y` the y delta is
/// brought to x units, with `reso_x` the x delta to y units.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct DistanceScale {
    reso_x: bool,
    reso_y: bool,
    /// `screen_y * drv_nokey`
    num: i128,
    /// `screen_x * sen_nokey`
    den: i128,
}

impl DistanceScale {
    pub(crate) fn new(config: &TouchConfig) -> Self {
        Self {
            reso_x: config.flags.reso_x(),
            reso_y: config.flags.reso_y(),
            num: config.screen_y_max as i128 * config.drv_num_nokey as i128,
            den: config.screen_x_max as i128 * config.sen_num_nokey as i128,
        }
    }

    /// Squared distance between two points on their distance view
    pub(crate) fn distance(&self, a: Point, b: Point) -> u32 {
        let a = a.distance_view();
        let b = b.distance_view();
        let mut dx = (a.x - b.x) as i128;
        let mut dy = (a.y - b.y) as i128;
        if self.num > 0 && self.den > 0 {
            if self.reso_y {
                dy = dy * self.num / self.den;
            }
            if self.reso_x {
                dx = dx * self.den / self.num;
            }
        }
        let limit = u32::MAX as i128;
        let (dx, dy) = (dx.clamp(-limit, limit), dy.clamp(-limit, limit));
        let squared = dx * dx + dy * dy;
        squared.min((DISTANCE_NONE - 1) as i128) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(x: u16, y: u16) -> Point {
        Point::new().with_x(x).with_y(y)
    }

    #[test]
    fn test_isqrt() {
        assert_eq!(isqrt(0), 0);
        assert_eq!(isqrt(1), 1);
        assert_eq!(isqrt(3), 1);
        assert_eq!(isqrt(4), 2);
        assert_eq!(isqrt(99), 9);
        assert_eq!(isqrt(100), 10);
        assert_eq!(isqrt(u32::MAX), 65535);
    }

    #[test]
    fn test_plain_distance() {
        let scale = DistanceScale::new(&TouchConfig::default());
        assert_eq!(scale.distance(point(10, 10), point(13, 14)), 25);
        assert_eq!(scale.distance(point(13, 14), point(10, 10)), 25);
        assert_eq!(scale.distance(point(0xffff, 0), point(0, 0xfff)), DISTANCE_NONE - 1);
    }

    #[test]
    fn test_key_points_are_far_from_canvas() {
        let scale = DistanceScale::new(&TouchConfig::default());
        let canvas = point(100, 100);
        assert!(scale.distance(canvas, canvas.with_key(true)) >= 4096 * 4096);
    }

    #[test]
    fn test_reso_y_rescales_y() {
        let mut config = TouchConfig::default();
        // 40 x 60 lines on a 1080 x 1920 screen: one raw y unit is 0.5 px,
        // one raw x unit is 0.421875 px
        config.drv_num_nokey = 40;
        config.sen_num_nokey = 60;
        config.screen_x_max = 1080;
        config.screen_y_max = 1920;
        config.flags = config.flags.with_reso_y(true);
        let scale = DistanceScale::new(&config);
        // dy = 270 * (1920 * 40) / (1080 * 60) = 320
        assert_eq!(scale.distance(point(0, 0), point(0, 270)), 320 * 320);
        assert_eq!(scale.distance(point(0, 0), point(5, 0)), 25);
    }

    #[test]
    fn test_huge_geometry_saturates() {
        let mut config = TouchConfig::default();
        config.screen_x_max = 1;
        config.sen_num_nokey = 1;
        config.screen_y_max = u32::MAX;
        config.drv_num_nokey = u32::MAX;
        config.flags = config.flags.with_reso_x(true).with_reso_y(true);
        let scale = DistanceScale::new(&config);
        assert_eq!(scale.distance(point(0, 0), point(0, 100)), DISTANCE_NONE - 1);
        assert_eq!(scale.distance(point(0, 0), point(100, 0)), 0);
    }

    #[test]
    fn test_reso_ignored_on_zero_geometry() {
        let mut config = TouchConfig::default();
        config.screen_x_max = 0;
        config.flags = config.flags.with_reso_x(true).with_reso_y(true);
        let scale = DistanceScale::new(&config);
        assert_eq!(scale.distance(point(0, 0), point(3, 4)), 25);
    }
}
