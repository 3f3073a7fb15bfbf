//! Translation core for 32-bit PowerPC guest code.
//!
//! [`translate`] turns a straight-line block of guest instructions into a
//! program for an ARM-flavored abstract host machine. The translator keeps
//! guest registers in host registers across the block, folds immediates at
//! compile time, tracks the guest carry bit symbolically, and keeps
//! single-precision values in single form between operations. Anything it
//! does not handle natively is routed through the interpreter, one
//! instruction at a time, with all deferred state flushed first.
//!
//! The output is symbolic ([`emit::HostOp`]); [`exec`] executes it directly
//! and doubles as the specification a machine-code encoder would implement.

use bitflags::bitflags;
use thiserror::Error;

pub mod block;
pub mod emit;
pub mod exec;
pub mod fprcache;
pub mod regcache;
mod translate;

pub use translate::translate;

/// Longest block the translator accepts, in guest instructions.
pub const MAX_BLOCK_LEN: usize = 1024;

bitflags! {
    /// Instruction classes forced onto the interpreter fallback.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct JitDisable: u32 {
        const INTEGER = 1 << 0;
        const FLOAT = 1 << 1;
        const PAIRED = 1 << 2;
    }
}

/// Translation-time configuration.
#[derive(Clone, Copy, Debug, Default)]
pub struct JitOptions {
    pub disable: JitDisable,
    /// Whether the host floating-point unit handles denormal singles like
    /// the guest. When false the translator guards every native
    /// single-to-double conversion whose input it cannot prove safe.
    pub host_denormals_native: bool,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TranslateError {
    #[error("cannot translate an empty block")]
    EmptyBlock,
    #[error("block of {0} instructions exceeds the limit of {MAX_BLOCK_LEN}")]
    BlockTooLarge(usize),
}

/// A translated block: host ops plus resolved branch targets.
#[derive(Debug, PartialEq, Eq)]
pub struct Program {
    pub ops: Vec<emit::HostOp>,
    /// Branch targets; `labels[Label.0]` is an index into `ops`.
    pub labels: Vec<usize>,
}
