// Copyright lowRISC contributors.
// Licensed under the Apache License, Version 2.0, see LICENSE for details.
// SPDX-License-Identifier: Apache-2.0

//! The catalog of known package1 builds.
//!
//! Every supported firmware build is described by a static [`Entry`] mapping
//! its build timestamp to layout offsets, load addresses, and optional patch
//! sets. The [`Catalog`] is an injectable view over a table of entries, so
//! tests can run against synthetic tables; production code uses [`CATALOG`].
//!
//! [`Entry`]: struct.Entry.html
//! [`Catalog`]: struct.Catalog.html
//! [`CATALOG`]: static.CATALOG.html

use arrayvec::ArrayString;

use crate::pkg1::patch;
use crate::pkg1::patch::PatchSet;
use crate::pkg1::Error;

/// Master-key generation ordinals ("kb"), one per key-rotating firmware
/// release.
pub mod kb {
    #![allow(missing_docs)]

    pub const KB_100_200: u32 = 0;
    pub const KB_300: u32 = 1;
    pub const KB_301: u32 = 2;
    pub const KB_400: u32 = 3;
    pub const KB_500: u32 = 4;
    pub const KB_600: u32 = 5;
    pub const KB_620: u32 = 6;
    pub const KB_700: u32 = 7;
    pub const KB_810: u32 = 8;
    pub const KB_900: u32 = 9;
    pub const KB_910: u32 = 10;

    /// The newest generation with a known key.
    pub const KB_MAX: u32 = KB_910;
}

/// Offset of the build timestamp within a package1 blob.
const BUILD_DATE_OFF: usize = 0x10;

/// Length of the build timestamp: `YYYYMMDDhhmmss`.
const BUILD_DATE_LEN: usize = 14;

/// Length of the timestamp prefix used as the catalog match key.
const MATCH_KEY_LEN: usize = 8;

/// A known package1 build.
///
/// Entries are static data, loaded once and shared read-only.
#[derive(Copy, Clone, Debug)]
pub struct Entry {
    /// The 14-digit build timestamp; its first 8 bytes are the match key.
    pub id: &'static str,

    /// Master-key generation this build ships with.
    pub kb: u32,

    /// Offset of the encrypted PK11 sub-container within the blob.
    pub pkg11_off: usize,

    /// Offset of the embedded initial processes, used by later boot stages.
    pub kip1_off: u32,

    /// Load address of the secure monitor payload.
    pub secmon_base: u32,

    /// Load address of the warmboot payload.
    pub warmboot_base: u32,

    /// Patches defeating the secure monitor's package2 signature checks.
    pub secmon_patches: Option<&'static PatchSet>,

    /// Patches defeating the warmboot firmware's fuse and segment checks.
    pub warmboot_patches: Option<&'static PatchSet>,

    /// Whether this build's warmboot firmware expects one fuse beyond the
    /// usual `kb + 2`. Vendor quirk; preserved per entry rather than
    /// special-casing identifiers in control flow.
    pub extra_warmboot_fuse: bool,
}

impl Entry {
    /// Returns the 8-byte match key for this entry.
    pub fn match_key(&self) -> &[u8] {
        &self.id.as_bytes()[..MATCH_KEY_LEN]
    }

    /// Returns the number of burnt fuses this build's warmboot firmware
    /// expects on a B01-revision chip.
    pub fn expected_warmboot_fuses(&self) -> u32 {
        let mut fuses = self.kb + 2;
        // One more fuse for high versions.
        if self.kb > kb::KB_910 || self.extra_warmboot_fuse {
            fuses += 1;
        }
        fuses
    }
}

/// The result of identifying a raw package1 blob.
///
/// The decoded build date is exposed for diagnostics even when the blob is
/// not recognized, so callers can report what they found.
#[derive(Clone, Debug)]
pub struct Identity<'e> {
    /// The build timestamp decoded at the identification offset.
    pub build_date: ArrayString<BUILD_DATE_LEN>,

    /// The matching catalog entry, or `None` for unrecognized firmware.
    pub entry: Option<&'e Entry>,
}

/// An immutable view over a table of known builds.
///
/// Unlike the usual convention of deducing "latest" from table position,
/// the latest stable build is an explicit index, validated on construction.
#[derive(Copy, Clone, Debug)]
pub struct Catalog<'e> {
    entries: &'e [Entry],
    latest: usize,
}

impl<'e> Catalog<'e> {
    /// Creates a new `Catalog`, or `None` if `latest` is out of range.
    pub fn new(entries: &'e [Entry], latest: usize) -> Option<Self> {
        if latest >= entries.len() {
            return None;
        }
        Some(Self { entries, latest })
    }

    /// Returns the entries in this catalog, in priority order.
    pub fn entries(&self) -> &'e [Entry] {
        self.entries
    }

    /// Returns the latest stable build.
    pub fn latest(&self) -> &'e Entry {
        &self.entries[self.latest]
    }

    /// Returns the first entry whose match key equals the first 8 bytes of
    /// `key`, if any.
    ///
    /// Table order is the priority order: the first match wins.
    pub fn find(&self, key: &[u8]) -> Option<&'e Entry> {
        let key = key.get(..MATCH_KEY_LEN)?;
        self.entries.iter().find(|e| e.match_key() == key)
    }

    /// Identifies a raw package1 blob.
    ///
    /// Requires the blob to reach past the identification region; an
    /// unrecognized build is a normal outcome, not an error.
    pub fn identify(&self, pkg1: &[u8]) -> Result<Identity<'e>, Error> {
        let raw = pkg1
            .get(BUILD_DATE_OFF..BUILD_DATE_OFF + BUILD_DATE_LEN)
            .ok_or(Error::OutOfRange)?;

        let mut build_date = ArrayString::new();
        for &b in raw {
            // Known builds use ASCII digits; anything else is replaced so
            // the date is always printable.
            build_date.push(if b.is_ascii_graphic() { b as char } else { '?' });
        }
        info!("found pkg1 ('{}')", build_date);

        Ok(Identity {
            build_date,
            entry: self.find(raw),
        })
    }
}

const ENTRY_COUNT: usize = 15;

/// The known-build table.
///
/// Each row matches one production firmware generation; table order is the
/// match priority.
pub static ENTRIES: [Entry; ENTRY_COUNT] = [
    // 1.0.0 (patched relocator).
    Entry {
        id: "20161121183008",
        kb: kb::KB_100_200,
        pkg11_off: 0x1900,
        kip1_off: 0x3FE0,
        secmon_base: patch::SM_100_ADR,
        warmboot_base: 0x8000_D000,
        secmon_patches: Some(&patch::SECMON_1),
        warmboot_patches: Some(&patch::WARMBOOT_1),
        extra_warmboot_fuse: false,
    },
    // 2.0.0 - 2.3.0.
    Entry {
        id: "20170210155124",
        kb: kb::KB_100_200,
        pkg11_off: 0x1900,
        kip1_off: 0x3FE0,
        secmon_base: 0x4002_D000,
        warmboot_base: 0x8000_D000,
        secmon_patches: Some(&patch::SECMON_2),
        warmboot_patches: Some(&patch::WARMBOOT_2),
        extra_warmboot_fuse: false,
    },
    // 3.0.0.
    Entry {
        id: "20170519101410",
        kb: kb::KB_300,
        pkg11_off: 0x1A00,
        kip1_off: 0x3FE0,
        secmon_base: 0x4002_D000,
        warmboot_base: 0x8000_D000,
        secmon_patches: Some(&patch::SECMON_3),
        warmboot_patches: Some(&patch::WARMBOOT_3),
        extra_warmboot_fuse: false,
    },
    // 3.0.1 - 3.0.2.
    Entry {
        id: "20170710161758",
        kb: kb::KB_301,
        pkg11_off: 0x1A00,
        kip1_off: 0x3FE0,
        secmon_base: 0x4002_D000,
        warmboot_base: 0x8000_D000,
        secmon_patches: Some(&patch::SECMON_3),
        warmboot_patches: Some(&patch::WARMBOOT_3),
        extra_warmboot_fuse: false,
    },
    // 4.0.0 - 4.1.0.
    Entry {
        id: "20170921172629",
        kb: kb::KB_400,
        pkg11_off: 0x1800,
        kip1_off: 0x3FE0,
        secmon_base: 0x4002_B000,
        warmboot_base: 0x4003_B000,
        secmon_patches: Some(&patch::SECMON_4),
        warmboot_patches: Some(&patch::WARMBOOT_4),
        extra_warmboot_fuse: false,
    },
    // 5.0.0 - 5.1.0.
    Entry {
        id: "20180220163747",
        kb: kb::KB_500,
        pkg11_off: 0x1900,
        kip1_off: 0x3FE0,
        secmon_base: 0x4002_B000,
        warmboot_base: 0x4003_B000,
        secmon_patches: Some(&patch::SECMON_5),
        warmboot_patches: Some(&patch::WARMBOOT_4),
        extra_warmboot_fuse: false,
    },
    // 6.0.0 - 6.1.0.
    Entry {
        id: "20180802162753",
        kb: kb::KB_600,
        pkg11_off: 0x1900,
        kip1_off: 0x3FE0,
        secmon_base: 0x4002_B000,
        warmboot_base: 0x4003_D800,
        secmon_patches: Some(&patch::SECMON_6),
        warmboot_patches: Some(&patch::WARMBOOT_4),
        extra_warmboot_fuse: false,
    },
    // 6.2.0.
    Entry {
        id: "20181107105733",
        kb: kb::KB_620,
        pkg11_off: 0x0E00,
        kip1_off: 0x6FE0,
        secmon_base: 0x4002_B000,
        warmboot_base: 0x4003_D800,
        secmon_patches: Some(&patch::SECMON_620),
        warmboot_patches: Some(&patch::WARMBOOT_4),
        extra_warmboot_fuse: false,
    },
    // 7.0.0.
    Entry {
        id: "20181218175730",
        kb: kb::KB_700,
        pkg11_off: 0x0F00,
        kip1_off: 0x6FE0,
        secmon_base: 0x4003_0000,
        warmboot_base: 0x4003_E000,
        secmon_patches: None,
        warmboot_patches: None,
        extra_warmboot_fuse: false,
    },
    // 7.0.1.
    Entry {
        id: "20190208150037",
        kb: kb::KB_700,
        pkg11_off: 0x0F00,
        kip1_off: 0x6FE0,
        secmon_base: 0x4003_0000,
        warmboot_base: 0x4003_E000,
        secmon_patches: None,
        warmboot_patches: None,
        extra_warmboot_fuse: false,
    },
    // 8.0.0 - 8.0.1.
    Entry {
        id: "20190314172056",
        kb: kb::KB_700,
        pkg11_off: 0x0E00,
        kip1_off: 0x6FE0,
        secmon_base: 0x4003_0000,
        warmboot_base: 0x4003_E000,
        secmon_patches: None,
        warmboot_patches: None,
        extra_warmboot_fuse: false,
    },
    // 8.1.0.
    Entry {
        id: "20190531152432",
        kb: kb::KB_810,
        pkg11_off: 0x0E00,
        kip1_off: 0x6FE0,
        secmon_base: 0x4003_0000,
        warmboot_base: 0x4003_E000,
        secmon_patches: None,
        warmboot_patches: None,
        extra_warmboot_fuse: false,
    },
    // 9.0.0 - 9.0.1.
    Entry {
        id: "20190809135709",
        kb: kb::KB_900,
        pkg11_off: 0x0E00,
        kip1_off: 0x6FE0,
        secmon_base: 0x4003_0000,
        warmboot_base: 0x4003_E000,
        secmon_patches: None,
        warmboot_patches: None,
        extra_warmboot_fuse: false,
    },
    // 9.1.0.
    Entry {
        id: "20191021113848",
        kb: kb::KB_910,
        pkg11_off: 0x0E00,
        kip1_off: 0x6FE0,
        secmon_base: 0x4003_0000,
        warmboot_base: 0x4003_E000,
        secmon_patches: None,
        warmboot_patches: None,
        extra_warmboot_fuse: false,
    },
    // 10.0.0.
    Entry {
        id: "20200303104606",
        kb: kb::KB_910,
        pkg11_off: 0x0E00,
        kip1_off: 0x6FE0,
        secmon_base: 0x4003_0000,
        warmboot_base: 0x4003_E000,
        secmon_patches: None,
        warmboot_patches: None,
        extra_warmboot_fuse: true,
    },
];

/// The production catalog.
pub static CATALOG: Catalog<'static> = Catalog {
    entries: &ENTRIES,
    latest: ENTRY_COUNT - 1,
};

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn blob_with_date(date: &str) -> Vec<u8> {
        let mut blob = vec![0u8; 0x40];
        blob[BUILD_DATE_OFF..BUILD_DATE_OFF + BUILD_DATE_LEN]
            .copy_from_slice(date.as_bytes());
        blob
    }

    #[test]
    fn identify_known_build() {
        let blob = blob_with_date("20180802162753");
        let identity = CATALOG.identify(&blob).unwrap();
        assert_eq!(identity.build_date.as_str(), "20180802162753");
        assert_eq!(identity.entry.unwrap().kb, kb::KB_600);
    }

    #[test]
    fn identify_matches_on_prefix_only() {
        // Only the first 8 bytes participate in matching.
        let blob = blob_with_date("20180802999999");
        let identity = CATALOG.identify(&blob).unwrap();
        assert_eq!(identity.entry.unwrap().id, "20180802162753");
    }

    #[test]
    fn identify_unknown_build() {
        let blob = blob_with_date("20991231235959");
        let identity = CATALOG.identify(&blob).unwrap();
        assert!(identity.entry.is_none());
        assert_eq!(identity.build_date.as_str(), "20991231235959");
    }

    #[test]
    fn identify_rejects_short_blobs() {
        assert!(matches!(
            CATALOG.identify(&[0; 16]),
            Err(Error::OutOfRange)
        ));
    }

    #[test]
    fn find_every_known_build() {
        for entry in CATALOG.entries() {
            let found = CATALOG.find(entry.id.as_bytes()).unwrap();
            assert_eq!(found.id, entry.id);
        }
    }

    #[test]
    fn latest_is_the_final_table_entry() {
        // Guards the historical convention that the newest supported build
        // sits at the end of the table.
        assert_eq!(CATALOG.latest().id, ENTRIES[ENTRIES.len() - 1].id);
        assert_eq!(CATALOG.latest().id, "20200303104606");
    }

    #[test]
    fn synthetic_catalogs() {
        let catalog = Catalog::new(&ENTRIES[..3], 1).unwrap();
        assert_eq!(catalog.latest().id, ENTRIES[1].id);
        assert!(Catalog::new(&ENTRIES[..3], 3).is_none());
        assert!(Catalog::new(&[], 0).is_none());
    }

    #[test]
    fn table_is_well_formed() {
        let mut last_kb = 0;
        for entry in &ENTRIES {
            assert_eq!(entry.id.len(), BUILD_DATE_LEN);
            assert!(entry.id.bytes().all(|b| b.is_ascii_digit()));
            assert!(entry.kb >= last_kb, "kb order broken at {}", entry.id);
            last_kb = entry.kb;
        }
    }

    #[test]
    fn expected_warmboot_fuses() {
        // kb + 2 as a rule...
        let v700 = CATALOG.find(b"20181218").unwrap();
        assert_eq!(v700.expected_warmboot_fuses(), 9);
        let v910 = CATALOG.find(b"20191021").unwrap();
        assert_eq!(v910.expected_warmboot_fuses(), 12);
        // ...except 10.0.0, which burns one more.
        let v1000 = CATALOG.find(b"20200303").unwrap();
        assert_eq!(v1000.expected_warmboot_fuses(), 13);
    }
}
