// Copyright lowRISC contributors.
// Licensed under the Apache License, Version 2.0, see LICENSE for details.
// SPDX-License-Identifier: Apache-2.0

//! PMC scratch-register access.
//!
//! The warmboot selector communicates with the boot ROM through a handful of
//! registers in the power-management controller: a legacy scratch register
//! and the secure scratch/lock pair. This module names those registers and
//! abstracts the MMIO behind a capability trait, so the selector's register
//! side effects can be observed in tests instead of hitting physical memory.
//!
//! Mapping each [`Register`] to its MMIO offset is the platform
//! implementation's concern.
//!
//! [`Register`]: enum.Register.html

use static_assertions::assert_obj_safe;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The bit in [`Register::SecDisable3`] that write-locks the warmboot
/// secure scratch register for the rest of the boot session.
///
/// [`Register::SecDisable3`]: enum.Register.html
pub const SEC_DISABLE3_WB_LOCK: u32 = 1 << 16;

/// A PMC register used by the warmboot selector.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Register {
    /// Legacy scratch register holding the warmboot firmware base address
    /// for pre-4.0 firmware.
    Scratch1,

    /// Secure scratch register holding the warmboot physical-address id.
    SecureScratch32,

    /// Disable register whose bit 16 write-locks `SecureScratch32`.
    SecDisable3,
}

/// Provides access to the PMC register block.
///
/// Reads and writes are memory-mapped side effects with no failure mode; a
/// PMC that does not respond means the chip is already off the rails.
pub trait Pmc {
    /// Reads `reg`.
    fn read(&self, reg: Register) -> u32;

    /// Writes `value` to `reg`.
    fn write(&mut self, reg: Register, value: u32);
}
assert_obj_safe!(Pmc);

impl<P: Pmc + ?Sized> Pmc for &mut P {
    #[inline]
    fn read(&self, reg: Register) -> u32 {
        P::read(self, reg)
    }

    #[inline]
    fn write(&mut self, reg: Register, value: u32) {
        P::write(self, reg, value)
    }
}

#[cfg(test)]
pub(crate) mod fake {
    use std::collections::HashMap;

    use super::Register;

    /// A fake `Pmc` that records every write in order.
    #[derive(Default)]
    pub struct Pmc {
        regs: HashMap<Register, u32>,
        pub writes: Vec<(Register, u32)>,
    }

    impl Pmc {
        pub fn new() -> Self {
            Default::default()
        }

        /// Seeds `reg` with `value` without recording a write.
        pub fn seed(&mut self, reg: Register, value: u32) {
            self.regs.insert(reg, value);
        }

        /// Returns the last value written to `reg`, if any write happened.
        pub fn written(&self, reg: Register) -> Option<u32> {
            self.writes
                .iter()
                .rev()
                .find(|(r, _)| *r == reg)
                .map(|&(_, v)| v)
        }
    }

    impl super::Pmc for Pmc {
        fn read(&self, reg: Register) -> u32 {
            self.regs.get(&reg).copied().unwrap_or(0)
        }

        fn write(&mut self, reg: Register, value: u32) {
            self.regs.insert(reg, value);
            self.writes.push((reg, value));
        }
    }
}
