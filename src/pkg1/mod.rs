// Copyright lowRISC contributors.
// Licensed under the Apache License, Version 2.0, see LICENSE for details.
// SPDX-License-Identifier: Apache-2.0

//! Package1 identification, decryption, and unpacking.
//!
//! Package1 is the first-stage boot firmware container. Its outermost bytes
//! are revision-specific, but every known build embeds a 14-digit build
//! timestamp that this crate matches against a catalog of known layouts.
//!
//! # Wire Format
//!
//! On media, a package1 blob looks as follows, expressed as a pseudo-Rust
//! struct. Integers are little-endian.
//! ```ignore
//! struct Package1 {
//!     _: [u8; 0x10],
//!     build_date: [u8; 14], // "YYYYMMDDhhmmss"; first 8 bytes are the
//!     ...                   // catalog match key.
//!
//!     // At a catalog-provided offset, the encrypted "PK11" sub-container:
//!     pk11_size: u32,
//!     _: [u8; 0xc],
//!     ctr: [u8; 0x10],      // AES-CTR counter for the original chip family.
//!     body: [u8; self.pk11_size], // Encrypted; starts with Pk11Header.
//! }
//!
//! struct Pk11Header {
//!     magic: u32,           // "PK11".
//!     wb_size: u32,
//!     wb_off: u32,          // Offsets are never trusted; sections are
//!     ldr_size: u32,        // summed sequentially instead.
//!     ldr_off: u32,
//!     sm_size: u32,
//!     sm_off: u32,
//! }
//! ```
//! On B01-revision chips the whole structure above sits behind a 0x170-byte
//! OEM bootloader header, and `body` is AES-CBC-encrypted with the BEK
//! instead.
//!
//! The order of the three payload sections after the header depends on the
//! firmware generation; see [`SectionMap`].
//!
//! [`SectionMap`]: container/struct.SectionMap.html

use crate::crypto::aes;

pub mod catalog;
pub mod container;
pub mod patch;

pub use catalog::Catalog;
pub use catalog::Entry;
pub use catalog::Identity;
pub use container::decrypt;
pub use container::Destinations;
pub use container::Pk11;
pub use container::SectionKind;
pub use container::SectionMap;
pub use container::Unpacked;

/// An error returned by a package1 operation.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// Indicates that a value or region was out of its expected range, such
    /// as a blob too short for the layout the catalog promised.
    OutOfRange,

    /// Indicates that the decrypted sub-container's magic did not match.
    ///
    /// Contains the bad value found. This is the normal symptom of a wrong
    /// key or a wrong chip-family guess; retrying with the same key cannot
    /// succeed.
    BadMagic(u32),

    /// Indicates that the three section sizes overrun the decrypted region.
    SectionOverflow {
        /// Total bytes the header claims the sections occupy.
        declared: usize,
        /// Bytes actually available past the header.
        available: usize,
    },

    /// Indicates that the security engine failed.
    Crypto(aes::Error),
}

impl From<aes::Error> for Error {
    fn from(e: aes::Error) -> Self {
        Self::Crypto(e)
    }
}
