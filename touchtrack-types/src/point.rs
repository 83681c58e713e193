//! Packed point words.
//!
//! A [`Point`] is the per-slot state the engine keeps in its history windows.
//! The all-zero word means "slot empty".
use bitfield_struct::bitfield;

/// Raw y bit marking a touch inside the virtual key area
pub const RAW_KEY_FLAG: u32 = 0x1000;
/// Raw y bit marking a point that may continue a track but never open one
pub const RAW_TRACK_ONLY_FLAG: u32 = 0x4000;

const NO_DATA_BITS: u32 = 0x0fff_0fff;

/// Tracked point, packed LSB first into one 32-bit word
#[bitfield(u32, order = Lsb, defmt = cfg(feature = "defmt"))]
#[derive(Eq, PartialEq)]
pub struct Point {
    #[bits(12)]
    pub y: u16,
    /// Touch inside the virtual key area
    #[bits(1)]
    pub key: bool,
    /// Synthesized by prediction, not observed this frame
    #[bits(1)]
    pub fill: bool,
    /// Track-only marker from the controller
    #[bits(1)]
    pub able: bool,
    /// Produced by linear or quadratic extrapolation
    #[bits(1)]
    pub predict: bool,
    #[bits(16)]
    pub x: u16,
}

/// Coarse view of a point used for distance computation only.
///
/// `y` carries 13 bits: the coordinate plus the key flag, so key touches and
/// canvas touches are always far apart.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DistancePoint {
    pub x: i32,
    pub y: i32,
}

impl Point {
    /// Empty slot
    pub const EMPTY: Self = Self::new();
    /// "No data" marker written by prediction for slots without history.
    ///
    /// Distinct from a real `(0, 0)` coordinate.
    pub const NO_DATA: Self = Self::from_bits(NO_DATA_BITS);

    /// Build a point from the raw coordinates reported by the controller.
    ///
    /// Raw `x` is limited to 12 bits unless `extended` is set, raw `y` to 12
    /// bits. The key and track-only markers are taken from the raw y bits.
    pub const fn from_raw(x: u32, y: u32, extended: bool) -> Self {
        let x_mask = if extended { 0xffff } else { 0x0fff };
        Self::new()
            .with_x((x & x_mask) as u16)
            .with_y((y & 0x0fff) as u16)
            .with_key(y & RAW_KEY_FLAG != 0)
            .with_able(y & RAW_TRACK_ONLY_FLAG != 0)
    }

    pub const fn is_empty(&self) -> bool {
        self.into_bits() == 0
    }

    pub const fn is_no_data(&self) -> bool {
        self.into_bits() == NO_DATA_BITS
    }

    /// Point holding real (observed or predicted) coordinates
    pub const fn is_present(&self) -> bool {
        !self.is_empty() && !self.is_no_data()
    }

    pub const fn distance_view(&self) -> DistancePoint {
        let bits = self.into_bits();
        DistancePoint {
            x: (bits >> 16) as i32,
            y: (bits & 0x1fff) as i32,
        }
    }

    /// Same point with both coordinates replaced
    pub const fn with_coords(self, x: u16, y: u16) -> Self {
        self.with_x(x).with_y(y)
    }
}
