// Copyright lowRISC contributors.
// Licensed under the Apache License, Version 2.0, see LICENSE for details.
// SPDX-License-Identifier: Apache-2.0

//! Warmboot firmware selection and PMC configuration.
//!
//! The resume firmware a chip will accept on wake is tied to its
//! anti-downgrade fuse count. On the original chip family the firmware is
//! patchable and the only configuration needed is a handful of scratch
//! register writes. On the B01 revision the firmware is signed: the burnt
//! fuse count must match the count the firmware was built for, so this
//! module keeps a cache of firmware images on storage, one per fuse count,
//! and falls back to it whenever the resident image no longer matches the
//! hardware.

use core::fmt::Write as _;

use arrayvec::ArrayString;

use crate::hardware::fuse;
use crate::hardware::fuse::Fuses;
use crate::hardware::pmc;
use crate::hardware::pmc::Pmc;
use crate::hardware::storage::Store;
use crate::hardware::Chip;
use crate::pkg1::catalog::kb;
use crate::pkg1::catalog::Entry;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Storage directory holding the cached B01 warmboot images.
pub const CACHE_DIR: &str = "warmboot_mariko";

/// The highest fuse count any cached image can be built for.
pub const MAX_FUSES: u32 = kb::KB_MAX + 3;

/// How the resume firmware was chosen.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Selection {
    /// The resident image was kept.
    Current,
    /// A cached image built for `fuses` burnt fuses was adopted.
    Cached {
        /// The fuse count the adopted image matches.
        fuses: u32,
    },
    /// The resident image does not match the hardware and no usable cached
    /// image was found; resume from sleep will fail until one is provided.
    NoMatch,
}

/// An error returned by [`Selector::configure()`].
///
/// [`Selector::configure()`]: struct.Selector.html#method.configure
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// The fuse array could not be read.
    Fuse(fuse::Error),
}

impl From<fuse::Error> for Error {
    fn from(e: fuse::Error) -> Self {
        Self::Fuse(e)
    }
}

/// The resident warmboot image, as unpacked from the boot firmware or
/// provided by the caller.
pub struct Image<'a> {
    /// The image bytes; only the first `len` are meaningful. Must be large
    /// enough for any image the cache may hold.
    pub data: &'a mut [u8],
    /// The image's length.
    pub len: usize,
    /// Whether the image was provided from storage rather than unpacked
    /// from the boot firmware. A provided image is used as-is and the cache
    /// is neither updated nor searched.
    pub loaded: bool,
}

/// The warmboot selector.
///
/// Owns the capabilities the selection needs: the PMC register file, the
/// fuse array, and the storage backing the image cache.
pub struct Selector<P, F, S> {
    /// The PMC register file.
    pub pmc: P,
    /// The fuse array.
    pub fuses: F,
    /// The storage device holding the image cache.
    pub store: S,
}

impl<P: Pmc, F: Fuses, S: Store> Selector<P, F, S> {
    /// Creates a new `Selector` from its capabilities.
    pub fn new(pmc: P, fuses: F, store: S) -> Self {
        Self { pmc, fuses, store }
    }

    /// Selects the resume firmware for `entry` and programs the PMC
    /// accordingly.
    ///
    /// `image` holds the resident warmboot firmware; on the B01 revision it
    /// may be overwritten with a cached image that matches the hardware's
    /// fuse count, in which case `image.loaded` is set and the returned
    /// [`Selection::Cached`] names the count.
    ///
    /// [`Selection::Cached`]: enum.Selection.html#variant.Cached
    pub fn configure(
        &mut self,
        entry: &Entry,
        chip: Chip,
        image: &mut Image,
    ) -> Result<Selection, Error> {
        // Early firmware reads the resume entry point out of SCRATCH1.
        if entry.kb <= kb::KB_301 {
            self.pmc.write(pmc::Register::Scratch1, entry.warmboot_base);
        }

        match chip {
            Chip::T210 => Ok(self.configure_t210(entry)),
            Chip::T210B01 => self.configure_t210b01(entry, image),
        }
    }

    fn configure_t210(&mut self, entry: &Entry) -> Selection {
        // 3.0.x firmware additionally checks a physical-address id.
        if entry.kb == kb::KB_300 {
            self.pmc.write(pmc::Register::SecureScratch32, 0xE3);
        } else if entry.kb == kb::KB_301 {
            self.pmc.write(pmc::Register::SecureScratch32, 0x104);
        }
        Selection::Current
    }

    fn configure_t210b01(
        &mut self,
        entry: &Entry,
        image: &mut Image,
    ) -> Result<Selection, Error> {
        let expected = entry.expected_warmboot_fuses();
        let burnt =
            fuse::count_burnt(self.fuses.read_odm(fuse::ODM_ANTI_DOWNGRADE)?);

        let mut selection = Selection::Current;
        let mut effective = burnt;
        if !image.loaded {
            self.save_to_cache(expected, image);

            if burnt > expected {
                selection = self.search_cache(burnt, image);
                if let Selection::Cached { fuses } = selection {
                    effective = fuses;
                }
            }
        }

        // Program the physical-address id and lock its scratch register.
        self.pmc
            .write(pmc::Register::SecureScratch32, pa_id(effective));
        let disable = self.pmc.read(pmc::Register::SecDisable3);
        self.pmc.write(
            pmc::Register::SecDisable3,
            disable | pmc::SEC_DISABLE3_WB_LOCK,
        );

        Ok(selection)
    }

    /// Stores the resident image under the fuse count it was built for,
    /// unless the cache already has one. Cache failures are not fatal; the
    /// resident image is still usable for this boot.
    fn save_to_cache(&mut self, expected: u32, image: &Image) {
        if let Err(e) = self.store.make_dir(CACHE_DIR) {
            warn!("could not create {}: {:?}", CACHE_DIR, e);
        }

        let path = cache_path(expected);
        if !self.store.exists(&path) {
            if let Err(e) = self.store.write(&path, &image.data[..image.len])
            {
                warn!("could not cache warmboot image at {}: {:?}", &*path, e);
            }
        }
    }

    /// Scans the cache for an image built for `burnt` fuses or more,
    /// adopting the first readable one.
    fn search_cache(&mut self, burnt: u32, image: &mut Image) -> Selection {
        for fuses in burnt..=MAX_FUSES {
            let path = cache_path(fuses);
            if !self.store.exists(&path) {
                trace!("no cached warmboot image at {}", &*path);
                continue;
            }
            match self.store.read(&path, image.data) {
                Ok(len) => {
                    info!("adopted cached warmboot image {}", &*path);
                    image.len = len;
                    image.loaded = true;
                    return Selection::Cached { fuses };
                }
                Err(e) => {
                    warn!("could not read {}: {:?}", &*path, e);
                }
            }
        }

        warn!("no warmboot image matches {} burnt fuses", burnt);
        Selection::NoMatch
    }
}

/// Computes the physical-address id the B01 boot ROM expects for a given
/// burnt fuse count.
fn pa_id(burnt: u32) -> u32 {
    // The id was ad hoc for the first two signed generations and raises by
    // a fixed step from a fixed base after that.
    const FUSES_600: u32 = kb::KB_600 + 2;
    const FUSES_620: u32 = kb::KB_620 + 2;
    const FUSES_700: u32 = kb::KB_700 + 2;
    const PA_ID_BASE: u32 = 0x129;
    const PA_ID_STEP: u32 = 0x21;

    match burnt {
        FUSES_600 => 0x87,
        FUSES_620 => 0xA8,
        _ => PA_ID_BASE
            .wrapping_add(PA_ID_STEP.wrapping_mul(burnt.wrapping_sub(FUSES_700))),
    }
}

/// Builds the cache path for an image built for `fuses` burnt fuses.
///
/// Counts below 16 get a leading zero, so `wb_07.bin` but `wb_16.bin`.
fn cache_path(fuses: u32) -> ArrayString<36> {
    let mut path = ArrayString::new();
    // 19 bytes of prefix, at most 10 digits, 4 bytes of suffix.
    let _ = if fuses < 16 {
        write!(path, "{}/wb_0{}.bin", CACHE_DIR, fuses)
    } else {
        write!(path, "{}/wb_{}.bin", CACHE_DIR, fuses)
    };
    path
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    use crate::hardware::fuse::fake;
    use crate::hardware::pmc::fake::Pmc as FakePmc;
    use crate::hardware::pmc::Register;
    use crate::hardware::storage::fake::Store as FakeStore;

    fn entry(
        id: &'static str,
        kb: u32,
        warmboot_base: u32,
        extra_warmboot_fuse: bool,
    ) -> Entry {
        Entry {
            id,
            kb,
            pkg11_off: 0,
            kip1_off: 0,
            secmon_base: 0,
            warmboot_base,
            secmon_patches: None,
            warmboot_patches: None,
            extra_warmboot_fuse,
        }
    }

    fn selector(
        burnt: u32,
    ) -> Selector<FakePmc, fake::Fuses, FakeStore> {
        Selector::new(
            FakePmc::new(),
            fake::Fuses::with_burnt(burnt),
            FakeStore::new(),
        )
    }

    fn image<'a>(data: &'a mut [u8], len: usize) -> Image<'a> {
        Image { data, len, loaded: false }
    }

    #[test]
    fn cache_path_formatting() {
        assert_eq!(&*cache_path(7), "warmboot_mariko/wb_07.bin");
        assert_eq!(&*cache_path(13), "warmboot_mariko/wb_013.bin");
        assert_eq!(&*cache_path(16), "warmboot_mariko/wb_16.bin");
    }

    #[test]
    fn pa_id_per_fuse_count() {
        assert_eq!(pa_id(7), 0x87);
        assert_eq!(pa_id(8), 0xA8);
        assert_eq!(pa_id(9), 0x129);
        assert_eq!(pa_id(10), 0x14A);
        assert_eq!(pa_id(13), 0x1AD);
    }

    #[test]
    fn t210_legacy_scratch_writes() {
        for (kb_val, scratch1, pa) in [
            (kb::KB_100_200, Some(0x8000_D000), None),
            (kb::KB_300, Some(0x8000_D000), Some(0xE3)),
            (kb::KB_301, Some(0x8000_D000), Some(0x104)),
            (kb::KB_400, None, None),
        ] {
            let e = entry("20170519101410", kb_val, 0x8000_D000, false);
            let mut sel = selector(0);
            let mut data = [0; 4];
            let mut img = image(&mut data, 4);

            let got = sel.configure(&e, Chip::T210, &mut img).unwrap();
            assert_eq!(got, Selection::Current);
            assert_eq!(sel.pmc.written(Register::Scratch1), scratch1);
            assert_eq!(sel.pmc.written(Register::SecureScratch32), pa);
            assert_eq!(sel.pmc.written(Register::SecDisable3), None);
        }
    }

    #[test]
    fn t210b01_saves_resident_image_once() {
        let e = entry("20181218175730", kb::KB_700, 0x4003_E000, false);
        let mut sel = selector(9);

        let mut data = *b"warmboot!";
        let mut img = image(&mut data, 9);
        let got = sel.configure(&e, Chip::T210B01, &mut img).unwrap();
        assert_eq!(got, Selection::Current);
        assert!(sel.store.dirs.contains(CACHE_DIR));
        assert_eq!(
            sel.store.entries["warmboot_mariko/wb_09.bin"],
            b"warmboot!"
        );

        // An already cached image is never overwritten.
        let mut other = *b"differs!!";
        let mut img = image(&mut other, 9);
        sel.configure(&e, Chip::T210B01, &mut img).unwrap();
        assert_eq!(
            sel.store.entries["warmboot_mariko/wb_09.bin"],
            b"warmboot!"
        );
    }

    #[test]
    fn t210b01_programs_pa_id_and_locks_scratch() {
        for (burnt, pa) in [(7, 0x87), (8, 0xA8), (9, 0x129)] {
            let e = entry("20181218175730", kb::KB_700, 0x4003_E000, false);
            let mut sel = selector(burnt);
            sel.pmc.seed(Register::SecDisable3, 0x5);

            let mut data = [0; 4];
            let mut img = image(&mut data, 4);
            sel.configure(&e, Chip::T210B01, &mut img).unwrap();

            assert_eq!(sel.pmc.written(Register::SecureScratch32), Some(pa));
            assert_eq!(
                sel.pmc.written(Register::SecDisable3),
                Some(0x5 | pmc::SEC_DISABLE3_WB_LOCK)
            );
            // kb 7 firmware does not use SCRATCH1.
            assert_eq!(sel.pmc.written(Register::Scratch1), None);
        }
    }

    #[test]
    fn t210b01_adopts_cached_image_on_fuse_mismatch() {
        // The resident image expects 7 fuses but 9 are burnt; the cache
        // holds images for 9 and 10 and the lower one must win.
        let e = entry("20180802162753", kb::KB_500, 0x4003_D800, false);
        let mut sel = selector(9);
        sel.store.insert("warmboot_mariko/wb_09.bin", b"nine fuses");
        sel.store.insert("warmboot_mariko/wb_010.bin", b"ten fuses");

        let mut data = [0; 16];
        let mut img = image(&mut data, 4);
        let got = sel.configure(&e, Chip::T210B01, &mut img).unwrap();

        assert_eq!(got, Selection::Cached { fuses: 9 });
        assert!(img.loaded);
        assert_eq!(&img.data[..img.len], b"nine fuses");
        // The adopted count drives the PA id.
        assert_eq!(
            sel.pmc.written(Register::SecureScratch32),
            Some(0x129)
        );
    }

    #[test]
    fn t210b01_reports_exhausted_cache() {
        // Only an image for fewer fuses than are burnt is cached; the
        // search never looks downward.
        let e = entry("20180802162753", kb::KB_500, 0x4003_D800, false);
        let mut sel = selector(9);
        sel.store.insert("warmboot_mariko/wb_08.bin", b"eight fuses");

        let mut data = [0; 16];
        let mut img = image(&mut data, 4);
        let got = sel.configure(&e, Chip::T210B01, &mut img).unwrap();

        assert_eq!(got, Selection::NoMatch);
        assert!(!img.loaded);
        // The hardware count still programs the PA id.
        assert_eq!(
            sel.pmc.written(Register::SecureScratch32),
            Some(0x129)
        );
    }

    #[test]
    fn t210b01_provided_image_skips_the_cache() {
        let e = entry("20181218175730", kb::KB_700, 0x4003_E000, false);
        let mut sel = selector(12);
        sel.store.insert("warmboot_mariko/wb_012.bin", b"twelve");

        let mut data = *b"provided";
        let mut img = Image { data: &mut data, len: 8, loaded: true };
        let got = sel.configure(&e, Chip::T210B01, &mut img).unwrap();

        assert_eq!(got, Selection::Current);
        assert_eq!(&img.data[..], b"provided");
        assert!(sel.store.dirs.is_empty());
        assert_eq!(sel.pmc.written(Register::SecureScratch32), Some(0x18C));
    }

    #[test]
    fn t210b01_extra_fuse_entries_expect_one_more() {
        let e = entry("20200303104606", kb::KB_910, 0x4003_E000, true);
        let mut sel = selector(13);

        let mut data = *b"warmboot!";
        let mut img = image(&mut data, 9);
        let got = sel.configure(&e, Chip::T210B01, &mut img).unwrap();

        // 13 burnt fuses match the expected 13, so no search happens.
        assert_eq!(got, Selection::Current);
        assert!(sel.store.entries.contains_key("warmboot_mariko/wb_013.bin"));
        assert_eq!(sel.pmc.written(Register::SecureScratch32), Some(0x1AD));
    }

    #[test]
    fn t210b01_tolerates_storage_failures() {
        let e = entry("20181218175730", kb::KB_700, 0x4003_E000, false);
        let mut sel = selector(9);
        sel.store.fail_writes = true;

        let mut data = *b"warmboot!";
        let mut img = image(&mut data, 9);
        let got = sel.configure(&e, Chip::T210B01, &mut img).unwrap();

        // A dead cache still leaves the resident image bootable.
        assert_eq!(got, Selection::Current);
        assert_eq!(sel.pmc.written(Register::SecureScratch32), Some(0x129));
    }

    #[test]
    fn fuse_read_failure_is_fatal() {
        let e = entry("20181218175730", kb::KB_700, 0x4003_E000, false);
        let mut sel = selector(9);
        sel.fuses.odm7 = Err(fuse::Error::Unavailable);

        let mut data = [0; 4];
        let mut img = image(&mut data, 4);
        assert_eq!(
            sel.configure(&e, Chip::T210B01, &mut img),
            Err(Error::Fuse(fuse::Error::Unavailable))
        );
    }
}
