// Copyright lowRISC contributors.
// Licensed under the Apache License, Version 2.0, see LICENSE for details.
// SPDX-License-Identifier: Apache-2.0

//! The PK11 sub-container: decryption and section unpacking.
//!
//! See the `cinder::pkg1` documentation for the wire format.

use core::mem;

use byteorder::ByteOrder;
use byteorder::LittleEndian;
use zerocopy::byteorder::U32;
use zerocopy::AsBytes;
use zerocopy::FromBytes;
use zerocopy::LayoutVerified;
use zerocopy::Unaligned;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::crypto::aes;
use crate::crypto::aes::Engine;
use crate::hardware::Chip;
use crate::pkg1::catalog::kb;
use crate::pkg1::catalog::Entry;
use crate::pkg1::Error;

type Le32 = U32<LittleEndian>;

/// The magic value of a correctly decrypted sub-container: `"PK11"`.
pub const PK11_MAGIC: u32 = 0x3131_4B50;

/// Length of the OEM bootloader header that precedes everything on
/// B01-revision chips.
const OEM_HEADER_LEN: usize = 0x170;

/// Offset of the total-image-size field within the OEM header.
const OEM_SIZE_OFF: usize = 0x154;

/// Offset of the encrypted body within the sub-container; the preceding
/// bytes hold the size field and the CTR counter.
const BODY_OFF: usize = 0x20;

/// Offset of the CTR counter within the sub-container.
const CTR_OFF: usize = 0x10;

/// The build id whose sub-container uses the unique 1.0 section ordering.
const BUILD_100: &str = "20161121183008";

/// The sub-container header's raw bits.
///
/// Only the three size fields are trusted; the offset fields are ignored
/// and sections are summed sequentially from the end of the header.
#[derive(Copy, Clone, Debug, AsBytes, FromBytes, Unaligned)]
#[repr(C)]
pub struct Pk11Header {
    /// Must decrypt to [`PK11_MAGIC`].
    ///
    /// [`PK11_MAGIC`]: constant.PK11_MAGIC.html
    pub magic: Le32,
    /// Warmboot section size.
    pub wb_size: Le32,
    /// Untrusted warmboot section offset.
    pub wb_off: Le32,
    /// Loader section size.
    pub ldr_size: Le32,
    /// Untrusted loader section offset.
    pub ldr_off: Le32,
    /// Secure monitor section size.
    pub sm_size: Le32,
    /// Untrusted secure monitor section offset.
    pub sm_off: Le32,
}

/// One of the three payload sections of a sub-container.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SectionKind {
    /// The resume firmware.
    Warmboot,
    /// The next-stage bootloader.
    Loader,
    /// The secure monitor.
    Monitor,
}

/// The physical order of the three sections within a sub-container.
///
/// Always a permutation of the three kinds; which permutation applies is a
/// property of the firmware generation:
///
/// ```text
/// 1.0:          { sm, ldr, wb }
/// 2.0 - 3.0.2:  { wb, ldr, sm }
/// 4.0+:         { ldr, sm, wb }
/// ```
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SectionMap(pub [SectionKind; 3]);

/// The 1.0 section ordering.
pub const MAP_100: SectionMap = SectionMap([
    SectionKind::Monitor,
    SectionKind::Loader,
    SectionKind::Warmboot,
]);

/// The 2.x/3.x section ordering.
pub const MAP_2XX: SectionMap = SectionMap([
    SectionKind::Warmboot,
    SectionKind::Loader,
    SectionKind::Monitor,
]);

/// The 4.0+ section ordering.
pub const MAP_4XX: SectionMap = SectionMap([
    SectionKind::Loader,
    SectionKind::Monitor,
    SectionKind::Warmboot,
]);

impl SectionMap {
    /// Returns the ordering used by `entry`'s sub-container.
    pub fn for_entry(entry: &Entry) -> Self {
        if entry.kb == kb::KB_100_200 && entry.id == BUILD_100 {
            MAP_100
        } else if entry.kb <= kb::KB_301 {
            MAP_2XX
        } else {
            MAP_4XX
        }
    }
}

/// Destination buffers for [`Pk11::unpack()`].
///
/// Any destination may be absent, meaning "skip that section"; skipped
/// sections still advance the copy cursor.
///
/// [`Pk11::unpack()`]: struct.Pk11.html#method.unpack
#[derive(Default)]
pub struct Destinations<'d> {
    /// Destination for the warmboot section.
    pub warmboot: Option<&'d mut [u8]>,
    /// Destination for the loader section.
    pub loader: Option<&'d mut [u8]>,
    /// Destination for the secure monitor section.
    pub monitor: Option<&'d mut [u8]>,
}

impl<'d> Destinations<'d> {
    fn slot(&mut self, kind: SectionKind) -> Option<&mut &'d mut [u8]> {
        match kind {
            SectionKind::Warmboot => self.warmboot.as_mut(),
            SectionKind::Loader => self.loader.as_mut(),
            SectionKind::Monitor => self.monitor.as_mut(),
        }
    }
}

/// The result of unpacking a sub-container.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Unpacked {
    /// The section ordering that was used, for diagnostics.
    pub map: SectionMap,
    /// The length of the warmboot section.
    pub warmboot_len: usize,
}

/// A decrypted, validated PK11 sub-container.
///
/// A value of this type is a witness that the magic matched and that the
/// declared section sizes fit within the decrypted region; it is not
/// possible to obtain one otherwise.
#[derive(Copy, Clone)]
pub struct Pk11<'a> {
    header: &'a Pk11Header,
    payload: &'a [u8],
}

impl<'a> Pk11<'a> {
    /// Parses a decrypted sub-container out of `bytes`.
    ///
    /// Checks the magic value first (a mismatch is the symptom of a failed
    /// decryption) and then that the three section sizes fit within the
    /// region.
    pub fn parse(bytes: &'a [u8]) -> Result<Self, Error> {
        let (lv, payload) =
            LayoutVerified::<_, Pk11Header>::new_unaligned_from_prefix(bytes)
                .ok_or(Error::OutOfRange)?;
        let header = lv.into_ref();

        let magic = header.magic.get();
        if magic != PK11_MAGIC {
            error!("pk11 magic mismatch: found {:#010x}", magic);
            return Err(Error::BadMagic(magic));
        }

        let pk11 = Self { header, payload };
        let declared = pk11.sections_len()?;
        if declared > payload.len() {
            return Err(Error::SectionOverflow {
                declared,
                available: payload.len(),
            });
        }
        Ok(pk11)
    }

    /// Returns the sub-container's header.
    pub fn header(&self) -> &'a Pk11Header {
        self.header
    }

    /// Returns the size of the given section.
    pub fn section_len(&self, kind: SectionKind) -> usize {
        let len = match kind {
            SectionKind::Warmboot => self.header.wb_size,
            SectionKind::Loader => self.header.ldr_size,
            SectionKind::Monitor => self.header.sm_size,
        };
        len.get() as usize
    }

    /// Returns the total bytes the three sections occupy.
    fn sections_len(&self) -> Result<usize, Error> {
        let mut total = 0usize;
        for kind in
            [SectionKind::Warmboot, SectionKind::Loader, SectionKind::Monitor]
        {
            total = total
                .checked_add(self.section_len(kind))
                .ok_or(Error::OutOfRange)?;
        }
        Ok(total)
    }

    /// Copies the payload sections out to `dst`.
    ///
    /// Sections are stored back to back in generation-dependent order; the
    /// copy cursor advances over every section whether or not a destination
    /// was supplied for it. Returns the ordering used and the warmboot
    /// section's size.
    pub fn unpack(
        &self,
        entry: &Entry,
        mut dst: Destinations,
    ) -> Result<Unpacked, Error> {
        let map = SectionMap::for_entry(entry);

        let mut cursor = 0;
        for &kind in &map.0 {
            let len = self.section_len(kind);
            let src = self
                .payload
                .get(cursor..cursor + len)
                .ok_or(Error::OutOfRange)?;
            if let Some(out) = dst.slot(kind) {
                out.get_mut(..len)
                    .ok_or(Error::OutOfRange)?
                    .copy_from_slice(src);
            }
            cursor += len;
        }

        Ok(Unpacked {
            map,
            warmboot_len: self.section_len(SectionKind::Warmboot),
        })
    }
}

/// Decrypts the sub-container embedded in `pkg1` in place, returning a
/// validated view of it.
///
/// The decryption mode is a property of the chip family: the original
/// family uses AES-CTR with the counter stored alongside the sub-container,
/// the B01 revision uses AES-CBC with the BEK and a zeroed IV, behind an
/// additional OEM header.
///
/// On failure the blob may be partially decrypted; the caller must not use
/// its contents.
pub fn decrypt<'a>(
    se: &mut impl Engine,
    entry: &Entry,
    chip: Chip,
    pkg1: &'a mut [u8],
) -> Result<Pk11<'a>, Error> {
    match chip {
        Chip::T210 => {
            let off = entry.pkg11_off;
            let size = read_le_u32(pkg1, off)? as usize;

            let mut iv = [0; aes::BLOCK_LEN];
            let ctr_at =
                off.checked_add(CTR_OFF).ok_or(Error::OutOfRange)?;
            iv.copy_from_slice(
                pkg1.get(ctr_at..ctr_at + aes::BLOCK_LEN)
                    .ok_or(Error::OutOfRange)?,
            );

            let start =
                off.checked_add(BODY_OFF).ok_or(Error::OutOfRange)?;
            let end = start.checked_add(size).ok_or(Error::OutOfRange)?;
            let body =
                pkg1.get_mut(start..end).ok_or(Error::OutOfRange)?;
            se.decrypt_ctr(aes::PK11_KEY, &iv, body)?;

            Pk11::parse(&pkg1[start..end])
        }
        Chip::T210B01 => {
            // The OEM header's size field covers the whole inner image,
            // header excluded.
            let size = read_le_u32(pkg1, OEM_SIZE_OFF)? as usize;
            if size < BODY_OFF {
                return Err(Error::OutOfRange);
            }

            se.clear_iv(aes::BEK)?;
            let start = OEM_HEADER_LEN + BODY_OFF;
            let end = OEM_HEADER_LEN
                .checked_add(size)
                .ok_or(Error::OutOfRange)?;
            let body =
                pkg1.get_mut(start..end).ok_or(Error::OutOfRange)?;
            se.decrypt_cbc(aes::BEK, body)?;

            let pk11_at = start
                .checked_add(entry.pkg11_off)
                .ok_or(Error::OutOfRange)?;
            Pk11::parse(pkg1.get(pk11_at..end).ok_or(Error::OutOfRange)?)
        }
    }
}

fn read_le_u32(bytes: &[u8], at: usize) -> Result<u32, Error> {
    let end = at.checked_add(mem::size_of::<u32>())
        .ok_or(Error::OutOfRange)?;
    Ok(LittleEndian::read_u32(
        bytes.get(at..end).ok_or(Error::OutOfRange)?,
    ))
}
