//! Shared leaf types for the PowerPC translation crates: guest register
//! indices, host register handles, operand widths and host condition codes.
//!
//! Guest indices are plain newtypes over the 5-bit (or 3-bit, for CR fields)
//! architectural numbers; constructors assert the range so a bad decode is
//! caught at the boundary rather than deep inside a register cache.

/// Guest general-purpose register index (r0..r31).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Gpr(u8);

impl Gpr {
    pub const COUNT: usize = 32;

    #[must_use]
    pub fn new(index: u8) -> Self {
        assert!(index < 32, "GPR index out of range: {index}");
        Self(index)
    }

    #[must_use]
    pub fn index(self) -> usize {
        usize::from(self.0)
    }

    pub fn all() -> impl Iterator<Item = Self> {
        (0..32).map(Self)
    }
}

/// Guest floating-point register index (f0..f31). Each guest FPR is a
/// paired-single: two 64-bit lanes holding double-precision values.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Fpr(u8);

impl Fpr {
    pub const COUNT: usize = 32;

    #[must_use]
    pub fn new(index: u8) -> Self {
        assert!(index < 32, "FPR index out of range: {index}");
        Self(index)
    }

    #[must_use]
    pub fn index(self) -> usize {
        usize::from(self.0)
    }

    pub fn all() -> impl Iterator<Item = Self> {
        (0..32).map(Self)
    }
}

/// Condition-register field index (cr0..cr7).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CrField(u8);

impl CrField {
    pub const COUNT: usize = 8;

    #[must_use]
    pub fn new(index: u8) -> Self {
        assert!(index < 8, "CR field index out of range: {index}");
        Self(index)
    }

    #[must_use]
    pub fn index(self) -> usize {
        usize::from(self.0)
    }
}

/// Handle for a host general-purpose register. The translation core never
/// commits to a concrete host encoding; these are indices into the reference
/// executor's register file and, eventually, an encoder's allocation table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct HostReg(pub u8);

impl HostReg {
    #[must_use]
    pub fn index(self) -> usize {
        usize::from(self.0)
    }
}

/// Handle for a host vector/floating-point register (two 64-bit lanes).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct HostFpReg(pub u8);

impl HostFpReg {
    #[must_use]
    pub fn index(self) -> usize {
        usize::from(self.0)
    }
}

/// Operand width for host integer operations.
///
/// Guest GPRs are 32-bit, but several translation patterns deliberately work
/// in 64 bits (wide shifts, condition-register values, signed/unsigned
/// difference comparisons), so every ALU host op carries its width.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Width {
    W32,
    W64,
}

/// Host condition codes, tested against the NZCV flags the flag-setting host
/// ops produce. Semantics match the usual four-flag encoding:
/// carry-set doubles as unsigned-higher-or-same.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cond {
    /// Z set.
    Eq,
    /// Z clear.
    Ne,
    /// C set (unsigned >=).
    Cs,
    /// C clear (unsigned <).
    Cc,
    /// N set.
    Mi,
    /// N clear.
    Pl,
    /// V set.
    Vs,
    /// V clear.
    Vc,
    /// C set and Z clear (unsigned >).
    Hi,
    /// C clear or Z set (unsigned <=).
    Ls,
    /// N == V (signed >=).
    Ge,
    /// N != V (signed <).
    Lt,
    /// Z clear and N == V (signed >).
    Gt,
    /// Z set or N != V (signed <=).
    Le,
}

impl Cond {
    /// The condition that holds exactly when `self` does not.
    #[must_use]
    pub fn invert(self) -> Self {
        match self {
            Cond::Eq => Cond::Ne,
            Cond::Ne => Cond::Eq,
            Cond::Cs => Cond::Cc,
            Cond::Cc => Cond::Cs,
            Cond::Mi => Cond::Pl,
            Cond::Pl => Cond::Mi,
            Cond::Vs => Cond::Vc,
            Cond::Vc => Cond::Vs,
            Cond::Hi => Cond::Ls,
            Cond::Ls => Cond::Hi,
            Cond::Ge => Cond::Lt,
            Cond::Lt => Cond::Ge,
            Cond::Gt => Cond::Le,
            Cond::Le => Cond::Gt,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cond_invert_is_involutive() {
        let all = [
            Cond::Eq,
            Cond::Ne,
            Cond::Cs,
            Cond::Cc,
            Cond::Mi,
            Cond::Pl,
            Cond::Vs,
            Cond::Vc,
            Cond::Hi,
            Cond::Ls,
            Cond::Ge,
            Cond::Lt,
            Cond::Gt,
            Cond::Le,
        ];
        for c in all {
            assert_eq!(c.invert().invert(), c);
        }
    }

    #[test]
    #[should_panic(expected = "GPR index out of range")]
    fn gpr_index_checked() {
        let _ = Gpr::new(32);
    }
}
