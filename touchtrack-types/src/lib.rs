//! # touchtrack types
//!
//! This crate provides the fundamental type definitions shared by the touch
//! tracking engine and the code around it.
//!
//! ## Modules
//!
//! - [`point`] - Packed per-slot point words and their distance view
//! - [`frame`] - Raw input frames, tracked output frames and the control bits
//!   carried in the finger count
//! - [`flags`] - Policy flags of the configuration table
//!
//! ## Integration
//!
//! - **touchtrack**: the engine consumes [`frame::RawFrame`] and produces
//!   [`frame::TouchFrame`], keeping per-slot history as [`point::Point`] words
//! - transports and input sinks only need this crate to exchange frames

#![no_std]

pub mod flags;
pub mod frame;
pub mod point;

/// Maximum number of simultaneous touch points
pub const POINT_MAX: usize = 10;
