//! Frames exchanged with the transport and with the input sink.
use bitfield_struct::bitfield;
use heapless::Vec;
use postcard::experimental::max_size::MaxSize;
use serde::{Deserialize, Serialize};

use crate::POINT_MAX;

/// Control bits carried in the high bits of a raw frame's finger count.
///
/// Only the low byte is the actual finger count.
#[bitfield(u32, order = Lsb, defmt = cfg(feature = "defmt"))]
#[derive(Eq, PartialEq)]
pub struct FrameControl {
    #[bits(8)]
    pub finger_num: u8,
    /// Clear the tracking state and report an empty frame
    #[bits(1)]
    pub reset: bool,
    /// Clear the tracking state, then process the frame
    #[bits(1)]
    pub mask: bool,
    /// Track a single point only
    #[bits(1)]
    pub only: bool,
    #[bits(2)]
    _reserved0: u8,
    /// Disable extrapolation for this frame
    #[bits(1)]
    pub interpolation: bool,
    /// Raw x carries 16 bits instead of 12
    #[bits(1)]
    pub ex: bool,
    #[bits(17)]
    _reserved1: u32,
}

impl FrameControl {
    pub const RESET: u32 = 0x100;
    pub const MASK: u32 = 0x200;
    pub const ONLY: u32 = 0x400;
    pub const INTERPOLATION: u32 = 0x2000;
    pub const EX: u32 = 0x4000;

    /// Finger count clamped to [`POINT_MAX`]
    pub fn point_num(&self) -> usize {
        (self.finger_num() as usize).min(POINT_MAX)
    }
}

/// One batch of raw samples as delivered by the controller transport
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, MaxSize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RawFrame {
    /// Finger count in the low byte, [`FrameControl`] bits above
    pub finger_num: u32,
    pub x: [u32; POINT_MAX],
    pub y: [u32; POINT_MAX],
    /// Controller-assigned ids, advisory only
    pub id: [u32; POINT_MAX],
}

impl RawFrame {
    pub const fn new() -> Self {
        Self {
            finger_num: 0,
            x: [0; POINT_MAX],
            y: [0; POINT_MAX],
            id: [0; POINT_MAX],
        }
    }

    /// Build a frame from `(x, y)` samples; samples beyond [`POINT_MAX`] are dropped
    pub fn from_points(points: &[(u32, u32)]) -> Self {
        let mut frame = Self::new();
        for &(x, y) in points {
            frame.push(x, y);
        }
        frame
    }

    /// Append a sample, keeping the control bits. Returns false when full.
    pub fn push(&mut self, x: u32, y: u32) -> bool {
        let n = (self.finger_num & 0xff) as usize;
        if n >= POINT_MAX {
            return false;
        }
        self.x[n] = x;
        self.y[n] = y;
        self.id[n] = n as u32 + 1;
        self.finger_num = (self.finger_num & !0xff) | (n as u32 + 1);
        true
    }

    /// Same frame with extra control bits set
    pub fn with_control(mut self, bits: u32) -> Self {
        self.finger_num |= bits & !0xff;
        self
    }

    pub fn control(&self) -> FrameControl {
        FrameControl::from_bits(self.finger_num)
    }
}

/// A tracked touch point ready for the input sink
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, MaxSize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TouchPoint {
    /// Tracked identity, slot index + 1
    pub id: u8,
    pub x: u16,
    pub y: u16,
}

/// Final per-frame output of the engine, same shape as [`RawFrame`]
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, MaxSize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TouchFrame {
    pub finger_num: u32,
    pub x: [u32; POINT_MAX],
    pub y: [u32; POINT_MAX],
    /// Tracked ids, 0 is never used
    pub id: [u32; POINT_MAX],
}

impl TouchFrame {
    pub const fn empty() -> Self {
        Self {
            finger_num: 0,
            x: [0; POINT_MAX],
            y: [0; POINT_MAX],
            id: [0; POINT_MAX],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.finger_num == 0
    }

    /// Append a point. Returns false when full.
    pub fn push(&mut self, point: TouchPoint) -> bool {
        let n = self.finger_num as usize;
        if n >= POINT_MAX {
            return false;
        }
        self.x[n] = point.x as u32;
        self.y[n] = point.y as u32;
        self.id[n] = point.id as u32;
        self.finger_num += 1;
        true
    }

    pub fn points(&self) -> Vec<TouchPoint, POINT_MAX> {
        let n = (self.finger_num as usize).min(POINT_MAX);
        (0..n)
            .map(|i| TouchPoint {
                id: self.id[i] as u8,
                x: self.x[i] as u16,
                y: self.y[i] as u16,
            })
            .collect()
    }

    /// Point with the given tracked id, if reported this frame
    pub fn find(&self, id: u8) -> Option<TouchPoint> {
        self.points().into_iter().find(|p| p.id == id)
    }
}
