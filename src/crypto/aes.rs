// Copyright lowRISC contributors.
// Licensed under the Apache License, Version 2.0, see LICENSE for details.
// SPDX-License-Identifier: Apache-2.0

//! AES security-engine contract.
//!
//! The package1 boot path performs exactly two kinds of decryption: AES-CTR
//! with an explicit counter value, and AES-CBC with the engine's current IV
//! state. Both operate in place on a key slot that an earlier boot stage
//! already loaded; this crate never sees the key itself.

use static_assertions::assert_obj_safe;

/// The AES block length, in bytes.
pub const BLOCK_LEN: usize = 16;

/// The key slot holding the package1 key.
pub const PK11_KEY: KeySlot = KeySlot(11);

/// The key slot holding the BEK, used for revision-B01 chips.
pub const BEK: KeySlot = KeySlot(13);

/// An [`Engine`] error.
///
/// [`Engine`]: trait.Engine.html
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// Indicates that the requested key slot does not exist or holds no key.
    BadSlot,

    /// Indicates that a block-mode operation was given a buffer whose length
    /// is not a multiple of [`BLOCK_LEN`].
    ///
    /// [`BLOCK_LEN`]: constant.BLOCK_LEN.html
    NotBlockAligned,

    /// Indicates that an unspecified error occurred.
    Unspecified,
}

/// An index into the security engine's key-slot array.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct KeySlot(pub u32);

/// A security engine primed with the boot-time key slots.
///
/// All operations decrypt in place. Implementations are expected to block
/// until the operation completes; there is no asynchronous contract during
/// early boot.
pub trait Engine {
    /// Decrypts `buf` in place using AES-CTR with the key in `slot` and the
    /// given initial counter value.
    fn decrypt_ctr(
        &mut self,
        slot: KeySlot,
        iv: &[u8; BLOCK_LEN],
        buf: &mut [u8],
    ) -> Result<(), Error>;

    /// Decrypts `buf` in place using AES-CBC with the key in `slot` and the
    /// slot's current IV state.
    ///
    /// `buf` must be a whole number of blocks.
    fn decrypt_cbc(&mut self, slot: KeySlot, buf: &mut [u8])
        -> Result<(), Error>;

    /// Clears `slot`'s IV state to all zeroes.
    fn clear_iv(&mut self, slot: KeySlot) -> Result<(), Error>;
}
assert_obj_safe!(Engine);

impl<E: Engine + ?Sized> Engine for &mut E {
    #[inline]
    fn decrypt_ctr(
        &mut self,
        slot: KeySlot,
        iv: &[u8; BLOCK_LEN],
        buf: &mut [u8],
    ) -> Result<(), Error> {
        E::decrypt_ctr(self, slot, iv, buf)
    }

    #[inline]
    fn decrypt_cbc(
        &mut self,
        slot: KeySlot,
        buf: &mut [u8],
    ) -> Result<(), Error> {
        E::decrypt_cbc(self, slot, buf)
    }

    #[inline]
    fn clear_iv(&mut self, slot: KeySlot) -> Result<(), Error> {
        E::clear_iv(self, slot)
    }
}
