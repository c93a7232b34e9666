// Copyright lowRISC contributors.
// Licensed under the Apache License, Version 2.0, see LICENSE for details.
// SPDX-License-Identifier: Apache-2.0

//! `cinder` identifies, decrypts, and unpacks "package1", the vendor-signed
//! first-stage boot firmware of the Tegra X1 SoC family, and selects the
//! warmboot (resume) firmware that matches the hardware fuse state.
//!
//! The crate is a library of the boot-critical logic only. Everything with a
//! hardware or platform dependency is expressed as a capability trait that
//! the integrator implements:
//!
//! - the security engine that performs AES decryption ([`crypto::aes`]),
//! - the PMC scratch-register block ([`hardware::pmc`]),
//! - the fuse array ([`hardware::fuse`]),
//! - the persistent store backing the warmboot cache ([`hardware::storage`]).
//!
//! The flow mirrors the boot sequence: [`pkg1::Catalog::identify`] matches a
//! raw package1 blob against the known-build catalog, [`pkg1::decrypt`]
//! produces a validated [`pkg1::Pk11`] sub-container, [`pkg1::Pk11::unpack`]
//! copies out the secure-monitor, loader, and warmboot payloads, and
//! [`warmboot::Selector::configure`] picks the warmboot image for the burnt
//! fuse count and performs the required PMC writes.
//!
//! Nothing here derives or validates key material; key slots are assumed to
//! be loaded before this stage runs.
//!
//! [`crypto::aes`]: crypto/aes/index.html
//! [`hardware::pmc`]: hardware/pmc/index.html
//! [`hardware::fuse`]: hardware/fuse/index.html
//! [`hardware::storage`]: hardware/storage/index.html
//! [`pkg1::Catalog::identify`]: pkg1/catalog/struct.Catalog.html
//! [`pkg1::decrypt`]: pkg1/container/fn.decrypt.html
//! [`pkg1::Pk11`]: pkg1/container/struct.Pk11.html
//! [`pkg1::Pk11::unpack`]: pkg1/container/struct.Pk11.html
//! [`warmboot::Selector::configure`]: warmboot/struct.Selector.html

#![cfg_attr(not(test), no_std)]
#![deny(missing_docs)]
#![deny(unsafe_code)]

#[macro_use]
mod debug;

pub mod crypto;
pub mod hardware;
pub mod pkg1;
pub mod warmboot;
