// Copyright lowRISC contributors.
// Licensed under the Apache License, Version 2.0, see LICENSE for details.
// SPDX-License-Identifier: Apache-2.0

//! Fuse-array access.
//!
//! Anti-downgrade state is recorded by burning one-way hardware fuses; the
//! warmboot selector reads the ODM reserved bank that holds them and counts
//! the burnt bits. Fuses only ever accumulate, so the count is monotonically
//! non-decreasing over the device's lifetime.

use static_assertions::assert_obj_safe;

/// The ODM reserved fuse bank holding the anti-downgrade fuses.
pub const ODM_ANTI_DOWNGRADE: u32 = 7;

/// A [`Fuses`] error.
///
/// Unlike storage failures, a fuse-read failure is fatal to the warmboot
/// stage: configuring the physical-address id from an unknown fuse count
/// would lock a wrong value into the secure scratch register.
///
/// [`Fuses`]: trait.Fuses.html
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// Indicates that the fuse array could not be read.
    Unavailable,
}

/// Provides read access to the fuse array.
pub trait Fuses {
    /// Reads the raw bits of ODM reserved fuse bank `bank`.
    fn read_odm(&self, bank: u32) -> Result<u32, Error>;
}
assert_obj_safe!(Fuses);

impl<F: Fuses + ?Sized> Fuses for &F {
    #[inline]
    fn read_odm(&self, bank: u32) -> Result<u32, Error> {
        F::read_odm(self, bank)
    }
}

/// Counts the burnt fuses in a raw fuse bank value.
#[inline]
pub fn count_burnt(bits: u32) -> u32 {
    bits.count_ones()
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_burnt_is_a_popcount() {
        assert_eq!(count_burnt(0), 0);
        assert_eq!(count_burnt(0b1011), 3);
        assert_eq!(count_burnt(u32::MAX), 32);
    }
}
