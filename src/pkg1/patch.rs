// Copyright lowRISC contributors.
// Licensed under the Apache License, Version 2.0, see LICENSE for details.
// SPDX-License-Identifier: Apache-2.0

//! Binary patch sets for decrypted payloads.
//!
//! Each known firmware build up to 6.2.0 ships with a pair of patch sets:
//! one defeating the secure monitor's package2 signature/hash checks, one
//! defeating the warmboot firmware's fuse and segment-id checks. A patch is
//! a plain (offset, word) override applied to the decrypted image before it
//! is treated as executable.
//!
//! The patched words are AArch64 instructions for the secure monitor and
//! AArch32 instructions for the warmboot firmware; the tiny encoders below
//! keep the tables readable.

use byteorder::ByteOrder;
use byteorder::LittleEndian;

use crate::pkg1::Error;

/// Load address of the 1.0.0 secure monitor, relocated from its original
/// 0x40014020 so a patched relocator can run from there.
pub const SM_100_ADR: u32 = 0x4002_B020;

/// An AArch64 `NOP`.
pub const fn nop() -> u32 {
    0xD503_201F
}

/// An AArch32 `NOP`.
pub const fn nop_arm7() -> u32 {
    0xE320_F000
}

/// The 4K-page base of `addr`.
pub const fn page_off(addr: u32) -> u32 {
    addr & 0xFFFF_F000
}

/// An AArch64 `ADRP xN, offset` with the given destination register.
pub const fn adrp(reg: u32, offset: u32) -> u32 {
    0x9000_0000
        | (((offset >> 12) & 0x3) << 29)
        | (((offset >> 12) & 0x1F_FFFC) << 3)
        | (reg & 0x1F)
}

/// A single word override within a decrypted image.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Patch {
    /// Byte offset of the word to replace.
    pub offset: usize,
    /// Replacement value, stored little-endian.
    pub value: u32,
}

/// An ordered sequence of [`Patch`]es.
///
/// Offsets within a set are disjoint, so application order does not affect
/// the result; the whole set must be applied before the image runs.
///
/// [`Patch`]: struct.Patch.html
#[derive(Copy, Clone, Debug)]
pub struct PatchSet(pub &'static [Patch]);

impl PatchSet {
    /// Applies every patch in this set to `image`.
    pub fn apply(&self, image: &mut [u8]) -> Result<(), Error> {
        for patch in self.0 {
            let end =
                patch.offset.checked_add(4).ok_or(Error::OutOfRange)?;
            let word = image
                .get_mut(patch.offset..end)
                .ok_or(Error::OutOfRange)?;
            LittleEndian::write_u32(word, patch.value);
        }
        Ok(())
    }
}

/// Secure monitor patches for 1.0.0.
pub static SECMON_1: PatchSet = PatchSet(&[
    // Patch the relocator to be able to run from SM_100_ADR.
    Patch {
        offset: 0x1E0,
        value: adrp(0, 0x7C01_3000 - page_off(SM_100_ADR)),
    },
    // Patch package2 signature/hash checks.
    Patch { offset: 0x9F0 + 0xADC, value: nop() },
]);

/// Secure monitor patches for 2.0.0 - 2.3.0.
pub static SECMON_2: PatchSet =
    PatchSet(&[Patch { offset: 0xAC8 + 0xAAC, value: nop() }]);

/// Secure monitor patches for 3.0.0 - 3.0.2.
pub static SECMON_3: PatchSet =
    PatchSet(&[Patch { offset: 0xAC8 + 0xA30, value: nop() }]);

/// Secure monitor patches for 4.0.0 - 4.1.0.
pub static SECMON_4: PatchSet =
    PatchSet(&[Patch { offset: 0x2300 + 0x5EFC, value: nop() }]);

/// Secure monitor patches for 5.0.0 - 5.1.0.
pub static SECMON_5: PatchSet =
    PatchSet(&[Patch { offset: 0xDA8 + 0xC9C, value: nop() }]);

/// Secure monitor patches for 6.0.0 - 6.1.0.
pub static SECMON_6: PatchSet =
    PatchSet(&[Patch { offset: 0xDC8 + 0xE90, value: nop() }]);

/// Secure monitor patches for 6.2.0.
pub static SECMON_620: PatchSet =
    PatchSet(&[Patch { offset: 0xDC8 + 0xC74, value: nop() }]);

/// Warmboot patches for 1.0.0.
pub static WARMBOOT_1: PatchSet = PatchSet(&[
    // Fuse check.
    Patch { offset: 0x4DC, value: nop_arm7() },
]);

/// Warmboot patches for 2.0.0 - 2.3.0.
pub static WARMBOOT_2: PatchSet =
    PatchSet(&[Patch { offset: 0x4DC, value: nop_arm7() }]);

/// Warmboot patches for 3.0.0 - 3.0.2.
pub static WARMBOOT_3: PatchSet = PatchSet(&[
    // Fuse check.
    Patch { offset: 0x4DC, value: nop_arm7() },
    // Segment id check.
    Patch { offset: 0x4F0, value: nop_arm7() },
]);

/// Warmboot patches for 4.0.0 and up.
pub static WARMBOOT_4: PatchSet = PatchSet(&[
    // Fuse check.
    Patch { offset: 0x544, value: nop_arm7() },
    // Segment id check.
    Patch { offset: 0x558, value: nop_arm7() },
]);

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn encodings() {
        assert_eq!(nop(), 0xD503_201F);
        assert_eq!(nop_arm7(), 0xE320_F000);
        assert_eq!(page_off(SM_100_ADR), 0x4002_B000);

        // The 1.0.0 relocator fix-up, checked against a hand encoding.
        assert_eq!(adrp(0, 0x7C01_3000 - 0x4002_B000), 0x901D_FF40);
    }

    #[test]
    fn apply_writes_each_word() {
        static SET: PatchSet = PatchSet(&[
            Patch { offset: 0, value: 0x1122_3344 },
            Patch { offset: 6, value: 0xAABB_CCDD },
        ]);

        let mut image = [0xFF; 10];
        SET.apply(&mut image).unwrap();
        assert_eq!(
            image,
            [0x44, 0x33, 0x22, 0x11, 0xFF, 0xFF, 0xDD, 0xCC, 0xBB, 0xAA]
        );
    }

    #[test]
    fn apply_rejects_out_of_bounds() {
        static LAST_WORD: PatchSet =
            PatchSet(&[Patch { offset: 6, value: 0 }]);
        static PAST_END: PatchSet =
            PatchSet(&[Patch { offset: 7, value: 0 }]);

        let mut image = [0; 10];
        assert_eq!(LAST_WORD.apply(&mut image), Ok(()));
        assert_eq!(PAST_END.apply(&mut image), Err(Error::OutOfRange));
    }
}
