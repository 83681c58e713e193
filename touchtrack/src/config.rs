//! Configuration table of the tracking engine.
//!
//! The transport hands the engine a flat table of [`CONFIG_LEN`] 32-bit words.
//! [`TouchConfig::from_words`] decodes it into named fields following the
//! positions in [`layout`]; [`TouchConfig::to_words`] is the inverse and is what
//! hosts use to build tables.
//!
//! Decoding never fails. Zero geometry is accepted here and rejected per frame
//! by the tracker, which then reports no touches.

use heapless::Vec;
use serde::{Deserialize, Serialize};
use touchtrack_types::flags::PolicyFlags;

/// Number of words in a configuration table
pub const CONFIG_LEN: usize = 0x1c9;
/// Number of stretch table breakpoints
pub const STRETCH_STEPS: usize = 8;
/// Number of virtual key zones
pub const KEY_ZONES: usize = 8;
/// Number of filter coefficient rows
pub const FILTER_ROWS: usize = 4;
/// Number of taps per filter row and window
pub const FILTER_TAPS: usize = 8;
/// Sub-cell resolution of one sensor line
pub const CELL_SIZE: usize = 64;

/// Word positions inside the configuration table
pub mod layout {
    pub const ID_FIRST_COE: usize = 0x00;
    pub const ID_SPEED_COE: usize = 0x01;
    pub const ID_STATIC_COE: usize = 0x02;
    pub const POINT_NUM_MAX: usize = 0x03;
    pub const DRV_NUM: usize = 0x04;
    pub const SEN_NUM: usize = 0x05;
    pub const DRV_NUM_NOKEY: usize = 0x06;
    pub const SEN_NUM_NOKEY: usize = 0x07;
    pub const SCREEN_X_MAX: usize = 0x08;
    pub const SCREEN_Y_MAX: usize = 0x09;
    pub const FLAGS: usize = 0x0a;
    pub const REPORT_DELAY: usize = 0x0b;
    pub const REPORT_AHEAD: usize = 0x0c;
    pub const REPORT_DELETE: usize = 0x0d;
    pub const FILTER_ABLE: usize = 0x0e;
    pub const STRETCH_MULT: usize = 0x0f;
    /// scale x, offset x, scale y, offset y
    pub const MATCH: usize = 0x10;
    /// ignore x low/high, ignore y low/high
    pub const IGNORE: usize = 0x14;
    /// left, right, top, bottom
    pub const EDGE_CUT: usize = 0x18;
    pub const KEY_MAP_ABLE: usize = 0x1c;
    pub const CELL_CORRECT_ABLE: usize = 0x1d;
    /// 8 pairs of (distance, coefficient)
    pub const STRETCH: usize = 0x20;
    /// 8 zones of (x range, y range, target)
    pub const KEY_RANGE: usize = 0x30;
    /// 4 rows of (2 stretch words, 2 report words)
    pub const FILTER_COE: usize = 0x48;
    pub const CELL_CORRECT_X: usize = 0x80;
    pub const CELL_CORRECT_Y: usize = 0xc0;
}

/// Errors of persisting a configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// The output buffer is too small or the value can't be encoded
    Serialize,
    /// The input bytes are not a valid configuration
    Deserialize,
}

/// Affine calibration of one raw axis: `((v - offset) * scale + 2048) / 4096`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Calibration {
    pub scale: i32,
    pub offset: i32,
}

impl Default for Calibration {
    fn default() -> Self {
        Self { scale: 4096, offset: 0 }
    }
}

/// Margins cut from each screen edge, in screen pixels
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EdgeCut {
    pub left: u32,
    pub right: u32,
    pub top: u32,
    pub bottom: u32,
}

/// One breakpoint of the stretch table.
///
/// `coe` is the share of the movement applied at `distance`, 128 = 100%.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StretchStep {
    pub distance: u32,
    pub coe: u32,
}

/// Rectangular virtual key zone, bounds inclusive
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeyZone {
    pub x_min: u16,
    pub x_max: u16,
    pub y_min: u16,
    pub y_max: u16,
    /// Coordinate reported for any touch inside the zone
    pub target_x: u16,
    pub target_y: u16,
}

impl KeyZone {
    pub fn is_unused(&self) -> bool {
        *self == Self::default()
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        (self.x_min as i32..=self.x_max as i32).contains(&x) && (self.y_min as i32..=self.y_max as i32).contains(&y)
    }
}

/// Signed 8-bit taps of the coordinate filter
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FilterCoefficients {
    /// Taps over the stretch window, index 0 = current frame
    pub ps: [[i8; FILTER_TAPS]; FILTER_ROWS],
    /// Taps over the report window, index 0 = previous frame
    pub pr: [[i8; FILTER_TAPS]; FILTER_ROWS],
}

/// Decoded configuration table
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TouchConfig {
    /// Speed class assumed for slots without a usable motion estimate
    pub id_first_coe: u32,
    /// Squared-distance allowance per speed class
    pub id_speed_coe: u32,
    /// Squared-distance allowance for a static point
    pub id_static_coe: u32,
    /// Finger count above which the over-report mask applies
    pub point_num_max: u32,
    pub drv_num: u32,
    pub sen_num: u32,
    /// Driving lines of the touch area, raw x spans `drv_num_nokey * 64`
    pub drv_num_nokey: u32,
    /// Sensing lines of the touch area, raw y spans `sen_num_nokey * 64`
    pub sen_num_nokey: u32,
    pub screen_x_max: u32,
    pub screen_y_max: u32,
    pub flags: PolicyFlags,
    /// Frames a new point is held back, 3 bits per finger-count bucket
    pub report_delay: u32,
    /// Report lag in frames, 3 bits per finger-count bucket
    pub report_ahead: u32,
    /// Frames a lifted point stays reported, 3 bits per finger-count bucket
    pub report_delete: u32,
    /// Filter divisor, 0 and 1 disable the filter
    pub filter_able: u32,
    /// Widening of the stretch table per extra finger, 128 = 100%
    pub stretch_mult: u32,
    pub match_x: Calibration,
    pub match_y: Calibration,
    pub ignore_x: [i32; 2],
    pub ignore_y: [i32; 2],
    pub edge_cut: EdgeCut,
    /// Reject key touches outside every key zone
    pub key_map_able: bool,
    pub stretch: [StretchStep; STRETCH_STEPS],
    pub key_zones: [KeyZone; KEY_ZONES],
    pub filter: FilterCoefficients,
    /// Apply the sub-cell linearity correction tables
    pub cell_correct_able: bool,
    pub cell_correct_x: Vec<u8, CELL_SIZE>,
    pub cell_correct_y: Vec<u8, CELL_SIZE>,
}

impl Default for TouchConfig {
    fn default() -> Self {
        Self {
            id_first_coe: 8,
            id_speed_coe: 128 * 128,
            id_static_coe: 64 * 64,
            point_num_max: 10,
            drv_num: 16 + 8,
            sen_num: 12 + 8,
            drv_num_nokey: 16,
            sen_num_nokey: 12,
            screen_x_max: 800,
            screen_y_max: 480,
            flags: PolicyFlags::new(),
            report_delay: 0,
            report_ahead: 0x924_9249,
            report_delete: 0,
            filter_able: 0,
            stretch_mult: 0,
            match_x: Calibration::default(),
            match_y: Calibration::default(),
            ignore_x: [0; 2],
            ignore_y: [0; 2],
            edge_cut: EdgeCut::default(),
            key_map_able: false,
            stretch: [StretchStep::default(); STRETCH_STEPS],
            key_zones: [KeyZone::default(); KEY_ZONES],
            filter: FilterCoefficients::default(),
            cell_correct_able: false,
            cell_correct_x: identity_cell_table(),
            cell_correct_y: identity_cell_table(),
        }
    }
}

fn identity_cell_table() -> Vec<u8, CELL_SIZE> {
    (0..CELL_SIZE as u8).collect()
}

/// Sign-extend a 16-bit two's complement value stored in a 32-bit word
pub(crate) const fn sign_extend16(word: u32) -> i32 {
    if word & 0x8000 != 0 {
        (word | 0xffff_0000) as i32
    } else {
        word as i32
    }
}

const fn range_word(low: u16, high: u16) -> u32 {
    ((low as u32) << 16) | high as u32
}

const fn split_word(word: u32) -> (u16, u16) {
    ((word >> 16) as u16, word as u16)
}

fn unpack_taps(words: [u32; 2]) -> [i8; FILTER_TAPS] {
    let mut taps = [0; FILTER_TAPS];
    for (k, tap) in taps.iter_mut().enumerate() {
        *tap = (words[k / 4] >> (8 * (k % 4))) as u8 as i8;
    }
    taps
}

fn pack_taps(taps: &[i8; FILTER_TAPS]) -> [u32; 2] {
    let mut words = [0; 2];
    for (k, tap) in taps.iter().enumerate() {
        words[k / 4] |= (*tap as u8 as u32) << (8 * (k % 4));
    }
    words
}

impl TouchConfig {
    /// Decode a configuration table. Missing words read as zero.
    pub fn from_words(words: &[u32]) -> Self {
        use layout::*;

        let w = |i: usize| words.get(i).copied().unwrap_or(0);

        let mut stretch = [StretchStep::default(); STRETCH_STEPS];
        for (k, step) in stretch.iter_mut().enumerate() {
            step.distance = w(STRETCH + 2 * k);
            step.coe = w(STRETCH + 2 * k + 1);
        }

        let mut key_zones = [KeyZone::default(); KEY_ZONES];
        for (k, zone) in key_zones.iter_mut().enumerate() {
            let base = KEY_RANGE + 3 * k;
            (zone.x_min, zone.x_max) = split_word(w(base));
            (zone.y_min, zone.y_max) = split_word(w(base + 1));
            (zone.target_y, zone.target_x) = split_word(w(base + 2));
        }

        let mut filter = FilterCoefficients::default();
        for row in 0..FILTER_ROWS {
            let base = FILTER_COE + 4 * row;
            filter.ps[row] = unpack_taps([w(base), w(base + 1)]);
            filter.pr[row] = unpack_taps([w(base + 2), w(base + 3)]);
        }

        let cell_table = |base: usize| -> Vec<u8, CELL_SIZE> { (0..CELL_SIZE).map(|k| (w(base + k) & 0x3f) as u8).collect() };

        Self {
            id_first_coe: w(ID_FIRST_COE),
            id_speed_coe: w(ID_SPEED_COE),
            id_static_coe: w(ID_STATIC_COE),
            point_num_max: w(POINT_NUM_MAX),
            drv_num: w(DRV_NUM),
            sen_num: w(SEN_NUM),
            drv_num_nokey: w(DRV_NUM_NOKEY),
            sen_num_nokey: w(SEN_NUM_NOKEY),
            screen_x_max: w(SCREEN_X_MAX),
            screen_y_max: w(SCREEN_Y_MAX),
            flags: PolicyFlags::from_bits(w(FLAGS)),
            report_delay: w(REPORT_DELAY),
            report_ahead: w(REPORT_AHEAD),
            report_delete: w(REPORT_DELETE),
            filter_able: w(FILTER_ABLE),
            stretch_mult: w(STRETCH_MULT),
            match_x: Calibration {
                scale: sign_extend16(w(MATCH)),
                offset: sign_extend16(w(MATCH + 1)),
            },
            match_y: Calibration {
                scale: sign_extend16(w(MATCH + 2)),
                offset: sign_extend16(w(MATCH + 3)),
            },
            ignore_x: [w(IGNORE) as i32, w(IGNORE + 1) as i32],
            ignore_y: [w(IGNORE + 2) as i32, w(IGNORE + 3) as i32],
            edge_cut: EdgeCut {
                left: w(EDGE_CUT),
                right: w(EDGE_CUT + 1),
                top: w(EDGE_CUT + 2),
                bottom: w(EDGE_CUT + 3),
            },
            key_map_able: w(KEY_MAP_ABLE) & 0x1 != 0,
            stretch,
            key_zones,
            filter,
            cell_correct_able: w(CELL_CORRECT_ABLE) != 0,
            cell_correct_x: cell_table(CELL_CORRECT_X),
            cell_correct_y: cell_table(CELL_CORRECT_Y),
        }
    }

    /// Encode into a configuration table
    pub fn to_words(&self) -> [u32; CONFIG_LEN] {
        use layout::*;

        let mut words = [0u32; CONFIG_LEN];
        words[ID_FIRST_COE] = self.id_first_coe;
        words[ID_SPEED_COE] = self.id_speed_coe;
        words[ID_STATIC_COE] = self.id_static_coe;
        words[POINT_NUM_MAX] = self.point_num_max;
        words[DRV_NUM] = self.drv_num;
        words[SEN_NUM] = self.sen_num;
        words[DRV_NUM_NOKEY] = self.drv_num_nokey;
        words[SEN_NUM_NOKEY] = self.sen_num_nokey;
        words[SCREEN_X_MAX] = self.screen_x_max;
        words[SCREEN_Y_MAX] = self.screen_y_max;
        words[FLAGS] = self.flags.into_bits();
        words[REPORT_DELAY] = self.report_delay;
        words[REPORT_AHEAD] = self.report_ahead;
        words[REPORT_DELETE] = self.report_delete;
        words[FILTER_ABLE] = self.filter_able;
        words[STRETCH_MULT] = self.stretch_mult;
        words[MATCH] = self.match_x.scale as u32 & 0xffff;
        words[MATCH + 1] = self.match_x.offset as u32 & 0xffff;
        words[MATCH + 2] = self.match_y.scale as u32 & 0xffff;
        words[MATCH + 3] = self.match_y.offset as u32 & 0xffff;
        words[IGNORE] = self.ignore_x[0] as u32;
        words[IGNORE + 1] = self.ignore_x[1] as u32;
        words[IGNORE + 2] = self.ignore_y[0] as u32;
        words[IGNORE + 3] = self.ignore_y[1] as u32;
        words[EDGE_CUT] = self.edge_cut.left;
        words[EDGE_CUT + 1] = self.edge_cut.right;
        words[EDGE_CUT + 2] = self.edge_cut.top;
        words[EDGE_CUT + 3] = self.edge_cut.bottom;
        words[KEY_MAP_ABLE] = self.key_map_able as u32;
        words[CELL_CORRECT_ABLE] = self.cell_correct_able as u32;

        for (k, step) in self.stretch.iter().enumerate() {
            words[STRETCH + 2 * k] = step.distance;
            words[STRETCH + 2 * k + 1] = step.coe;
        }
        for (k, zone) in self.key_zones.iter().enumerate() {
            let base = KEY_RANGE + 3 * k;
            words[base] = range_word(zone.x_min, zone.x_max);
            words[base + 1] = range_word(zone.y_min, zone.y_max);
            words[base + 2] = range_word(zone.target_y, zone.target_x);
        }
        for row in 0..FILTER_ROWS {
            let base = FILTER_COE + 4 * row;
            let [ps0, ps1] = pack_taps(&self.filter.ps[row]);
            let [pr0, pr1] = pack_taps(&self.filter.pr[row]);
            words[base] = ps0;
            words[base + 1] = ps1;
            words[base + 2] = pr0;
            words[base + 3] = pr1;
        }
        for (k, v) in self.cell_correct_x.iter().enumerate() {
            words[CELL_CORRECT_X + k] = *v as u32;
        }
        for (k, v) in self.cell_correct_y.iter().enumerate() {
            words[CELL_CORRECT_Y + k] = *v as u32;
        }
        words
    }

    /// Geometry usable for mapping: every line count and screen size non-zero
    pub fn is_valid(&self) -> bool {
        self.drv_num != 0
            && self.sen_num != 0
            && self.drv_num_nokey != 0
            && self.sen_num_nokey != 0
            && self.screen_x_max != 0
            && self.screen_y_max != 0
    }

    /// Raw x span of the touch area, saturated at `i32::MAX`
    pub fn x_span(&self) -> i32 {
        line_span(self.drv_num_nokey)
    }

    /// Raw y span of the touch area, saturated at `i32::MAX`
    pub fn y_span(&self) -> i32 {
        line_span(self.sen_num_nokey)
    }

    /// Serialize with postcard into `buf`, returning the used part
    pub fn to_postcard<'a>(&self, buf: &'a mut [u8]) -> Result<&'a mut [u8], ConfigError> {
        postcard::to_slice(self, buf).map_err(|_| ConfigError::Serialize)
    }

    pub fn from_postcard(bytes: &[u8]) -> Result<Self, ConfigError> {
        postcard::from_bytes(bytes).map_err(|_| ConfigError::Deserialize)
    }
}

fn line_span(lines: u32) -> i32 {
    i32::try_from(lines).unwrap_or(i32::MAX).saturating_mul(CELL_SIZE as i32)
}

impl From<&[u32]> for TouchConfig {
    fn from(words: &[u32]) -> Self {
        Self::from_words(words)
    }
}

impl<const N: usize> From<&[u32; N]> for TouchConfig {
    fn from(words: &[u32; N]) -> Self {
        Self::from_words(words)
    }
}
