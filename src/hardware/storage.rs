// Copyright lowRISC contributors.
// Licensed under the Apache License, Version 2.0, see LICENSE for details.
// SPDX-License-Identifier: Apache-2.0

//! Persistent-store access.
//!
//! The warmboot selector caches resume-firmware images on persistent media,
//! one entry per fuse count. This module abstracts that media as a flat
//! namespace of named entries plus one level of directories, which is all
//! the boot path needs.
//!
//! Callers in this crate treat every storage failure as "entry absent" or
//! "save skipped". A missing cache entry is recoverable (at worst the
//! platform fails to resume from sleep), so storage errors never propagate
//! out of the warmboot stage.

use static_assertions::assert_obj_safe;

/// A [`Store`] error.
///
/// [`Store`]: trait.Store.html
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// Indicates that the named entry does not exist.
    NotFound,

    /// Indicates that an entry's contents do not fit the caller's buffer.
    TooBig,

    /// Indicates that an unspecified media error occurred.
    Unspecified,
}

/// Provides access to a flat persistent store.
pub trait Store {
    /// Returns whether an entry named `path` exists.
    fn exists(&mut self, path: &str) -> bool;

    /// Reads the entry named `path` into `out`, returning its length.
    fn read(&mut self, path: &str, out: &mut [u8]) -> Result<usize, Error>;

    /// Creates the entry named `path` with the given contents, replacing any
    /// existing entry.
    fn write(&mut self, path: &str, data: &[u8]) -> Result<(), Error>;

    /// Creates the directory named `path`; succeeds if it already exists.
    fn make_dir(&mut self, path: &str) -> Result<(), Error>;
}
assert_obj_safe!(Store);

impl<S: Store + ?Sized> Store for &mut S {
    #[inline]
    fn exists(&mut self, path: &str) -> bool {
        S::exists(self, path)
    }

    #[inline]
    fn read(&mut self, path: &str, out: &mut [u8]) -> Result<usize, Error> {
        S::read(self, path, out)
    }

    #[inline]
    fn write(&mut self, path: &str, data: &[u8]) -> Result<(), Error> {
        S::write(self, path, data)
    }

    #[inline]
    fn make_dir(&mut self, path: &str) -> Result<(), Error> {
        S::make_dir(self, path)
    }
}
