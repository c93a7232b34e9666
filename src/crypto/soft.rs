// Copyright lowRISC contributors.
// Licensed under the Apache License, Version 2.0, see LICENSE for details.
// SPDX-License-Identifier: Apache-2.0

//! Software security-engine model, backed by the RustCrypto crates.
//!
//! This module provides an implementation of [`aes::Engine`] with sixteen
//! loadable software key slots. It exists so that the decrypt path can be
//! exercised end-to-end in tests and host tooling; it takes no care to be
//! side-channel-free and must not stand in for a real security engine.
//!
//! [`aes::Engine`]: ../aes/trait.Engine.html

use aes::Aes128;
use cipher::block_padding::NoPadding;
use cipher::BlockDecryptMut;
use cipher::BlockEncryptMut;
use cipher::KeyIvInit;
use cipher::StreamCipher;

use crate::crypto::aes::Engine;
use crate::crypto::aes::Error;
use crate::crypto::aes::KeySlot;
use crate::crypto::aes::BLOCK_LEN;

type Ctr = ctr::Ctr128BE<Aes128>;
type CbcDec = cbc::Decryptor<Aes128>;
type CbcEnc = cbc::Encryptor<Aes128>;

const SLOT_COUNT: usize = 16;

/// A software [`Engine`] with sixteen AES-128 key slots.
///
/// Slots start out holding the all-zeroes key and IV, matching a security
/// engine that was never keyed; load keys with [`set_key()`].
///
/// [`Engine`]: ../aes/trait.Engine.html
/// [`set_key()`]: struct.SoftEngine.html#method.set_key
#[derive(Clone)]
pub struct SoftEngine {
    keys: [[u8; BLOCK_LEN]; SLOT_COUNT],
    ivs: [[u8; BLOCK_LEN]; SLOT_COUNT],
}

impl SoftEngine {
    /// Creates a new `SoftEngine` with all slots zeroed.
    pub fn new() -> Self {
        Self {
            keys: [[0; BLOCK_LEN]; SLOT_COUNT],
            ivs: [[0; BLOCK_LEN]; SLOT_COUNT],
        }
    }

    /// Loads `key` into `slot`.
    pub fn set_key(
        &mut self,
        slot: KeySlot,
        key: [u8; BLOCK_LEN],
    ) -> Result<(), Error> {
        self.keys[Self::index(slot)?] = key;
        Ok(())
    }

    /// Encrypts `buf` in place using AES-CBC with the key in `slot` and the
    /// slot's current IV state.
    ///
    /// The engine contract is decrypt-only; this inverse operation is
    /// provided for building encrypted fixtures.
    pub fn encrypt_cbc(
        &mut self,
        slot: KeySlot,
        buf: &mut [u8],
    ) -> Result<(), Error> {
        let idx = Self::index(slot)?;
        let len = buf.len();
        if len % BLOCK_LEN != 0 {
            return Err(Error::NotBlockAligned);
        }
        let enc =
            CbcEnc::new(&self.keys[idx].into(), &self.ivs[idx].into());
        enc.encrypt_padded_mut::<NoPadding>(buf, len)
            .map_err(|_| Error::NotBlockAligned)?;
        Ok(())
    }

    fn index(slot: KeySlot) -> Result<usize, Error> {
        let idx = slot.0 as usize;
        if idx >= SLOT_COUNT {
            return Err(Error::BadSlot);
        }
        Ok(idx)
    }
}

impl Default for SoftEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine for SoftEngine {
    fn decrypt_ctr(
        &mut self,
        slot: KeySlot,
        iv: &[u8; BLOCK_LEN],
        buf: &mut [u8],
    ) -> Result<(), Error> {
        let idx = Self::index(slot)?;
        let mut ctr = Ctr::new(&self.keys[idx].into(), iv.into());
        ctr.apply_keystream(buf);
        Ok(())
    }

    fn decrypt_cbc(
        &mut self,
        slot: KeySlot,
        buf: &mut [u8],
    ) -> Result<(), Error> {
        let idx = Self::index(slot)?;
        if buf.len() % BLOCK_LEN != 0 {
            return Err(Error::NotBlockAligned);
        }
        let dec =
            CbcDec::new(&self.keys[idx].into(), &self.ivs[idx].into());
        dec.decrypt_padded_mut::<NoPadding>(buf)
            .map_err(|_| Error::NotBlockAligned)?;
        Ok(())
    }

    fn clear_iv(&mut self, slot: KeySlot) -> Result<(), Error> {
        self.ivs[Self::index(slot)?] = [0; BLOCK_LEN];
        Ok(())
    }
}
