// Copyright lowRISC contributors.
// Licensed under the Apache License, Version 2.0, see LICENSE for details.
// SPDX-License-Identifier: Apache-2.0

//! Pluggable cryptography traits.
//!
//! Decrypting package1 requires the SoC's security engine, whose key slots
//! were loaded by an earlier boot stage. This module abstracts the engine
//! behind an object-safe trait so that the boot logic never touches key
//! material directly.
//!
//! Integrations on real hardware implement [`aes::Engine`] on top of their
//! security-engine driver. A software model backed by the RustCrypto crates
//! is provided under the [`soft` module], controlled by the `soft-crypto`
//! feature flag; it is intended for tests and host-side tooling.
//!
//! [`aes::Engine`]: aes/trait.Engine.html
//! [`soft` module]: soft/index.html

pub mod aes;

#[cfg(feature = "soft-crypto")]
pub mod soft;
