//! Policy flags of the configuration table.
use bitfield_struct::bitfield;
use serde::{Deserialize, Serialize};

/// Reporting and geometry policy, one word of the configuration table
#[bitfield(u32, order = Lsb, defmt = cfg(feature = "defmt"))]
#[derive(Eq, PartialEq, Serialize, Deserialize)]
pub struct PolicyFlags {
    /// Report nothing when more points are tracked than the configured maximum
    #[bits(1)]
    pub over_report_mask: bool,
    #[bits(1)]
    pub flip_x: bool,
    #[bits(1)]
    pub flip_y: bool,
    /// Exchange x and y after every other mapping step
    #[bits(1)]
    pub swap_xy: bool,
    /// Rescale the x axis of distances by the screen and sensor aspect ratios
    #[bits(1)]
    pub reso_x: bool,
    /// Rescale the y axis of distances by the screen and sensor aspect ratios
    #[bits(1)]
    pub reso_y: bool,
    /// Report points inside the ignore zones anyway
    #[bits(1)]
    pub ignore_bypass: bool,
    #[bits(25)]
    _reserved: u32,
}
