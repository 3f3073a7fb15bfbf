//! Guest-visible CPU state and reference semantics for a 32-bit PowerPC
//! (Gekko-class) core.
//!
//! This crate is the ground truth the translation crate is measured against:
//! [`state::CpuState`] holds the architectural register file (with the
//! condition register kept in its 64-bit internal encoding), [`softfloat`]
//! implements the bit-exact single/double conversions the FPU register file
//! is built on, and [`interp`] executes one decoded instruction at a time.
//! The interpreter doubles as the fallback target for instructions the
//! translator does not cover.

pub mod interp;
pub mod softfloat;
pub mod state;

pub use state::CpuState;
