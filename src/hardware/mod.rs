// Copyright lowRISC contributors.
// Licensed under the Apache License, Version 2.0, see LICENSE for details.
// SPDX-License-Identifier: Apache-2.0

//! Pluggable hardware capabilities.
//!
//! This module provides traits for the hardware the package1 boot path
//! touches: the PMC scratch-register block, the fuse array, and the
//! persistent store used for the warmboot cache. Integrations implement
//! these on the real hardware; tests substitute recording fakes.
//!
//! Everything here is owned-for-the-duration state. The boot path is a
//! single logical thread of execution, and a host embedding this crate must
//! hand each capability to exactly one [`warmboot::Selector`] at a time.
//!
//! [`warmboot::Selector`]: ../warmboot/struct.Selector.html

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub mod fuse;
pub mod pmc;
pub mod storage;

/// A chip family within the SoC line.
///
/// The two families use different package1 outer layouts and different
/// decryption modes, and only the later one has fuse-dependent warmboot
/// firmware.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Chip {
    /// The original chip revision ("Erista").
    T210,

    /// The B01 revision ("Mariko").
    T210B01,
}
