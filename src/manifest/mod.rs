//! Builds the in-memory manifest of generated tarballs from a directory
//! scan. The directory IS the store of truth: records are rebuilt on every
//! request and never persisted.

use std::fs;
use std::ops::Range;
use std::path::Path;

use serde::Serialize;

use crate::error::{Result, ShelfError};

/// Snapshot timestamp embedded in a generated tarball's version string,
/// twelve digits laid out as `YYYYMMDDHHMM`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Snapshot {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
}

impl Snapshot {
    /// Read the snapshot fields positionally from a version string. Segments
    /// that are missing or not numeric come back as 0; the caller decides
    /// whether the result is worth displaying.
    pub fn from_version(version: &str) -> Self {
        fn digits(s: &str, range: Range<usize>) -> u16 {
            s.get(range).and_then(|seg| seg.parse().ok()).unwrap_or(0)
        }
        Self {
            year: digits(version, 0..4),
            month: digits(version, 4..6) as u8,
            day: digits(version, 6..8) as u8,
            hour: digits(version, 8..10) as u8,
            minute: digits(version, 10..12) as u8,
        }
    }

    /// `DD-Mon-YYYY`, or empty when the fields do not form a calendar date.
    pub fn date_label(&self) -> String {
        chrono::NaiveDate::from_ymd_opt(self.year as i32, self.month as u32, self.day as u32)
            .map(|d| d.format("%d-%b-%Y").to_string())
            .unwrap_or_default()
    }

    /// `HH:MM`, zero-padded.
    pub fn time_label(&self) -> String {
        format!("{:02}:{:02}", self.hour, self.minute)
    }
}

/// One generated tarball, derived entirely from its directory entry.
///
/// Field declaration order is the composite sort order: product, then
/// version, then snapshot, then filename. The manifest is sorted descending
/// on exactly this comparison, so newest snapshots come first as long as the
/// naming convention holds.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct TarballRecord {
    pub product: String,
    pub version: String,
    pub snapshot: Snapshot,
    pub filename: String,
    pub size_kb: u64,
}

/// Split a directory entry name into product, version, and snapshot fields.
///
/// The convention is `PRODUCT-VERSION.ext` where VERSION starts with a
/// `YYYYMMDDHHMM` digit run. Parsing is purely positional string splitting:
/// a name without a `-` keeps the whole name as product with an empty
/// version, and garbage digits parse to zero fields. Nothing here fails.
pub fn parse_filename(name: &str) -> TarballRecord {
    let mut parts = name.split('-');
    let product = parts.next().unwrap_or(name).to_string();
    let version = parts
        .next()
        .and_then(|seg| seg.split('.').next())
        .unwrap_or("")
        .to_string();
    let snapshot = Snapshot::from_version(&version);
    TarballRecord {
        product,
        version,
        snapshot,
        filename: name.to_string(),
        size_kb: 0,
    }
}

/// File size in KiB, rounded half away from zero.
pub fn kib_rounded(bytes: u64) -> u64 {
    (bytes as f64 / 1024.0).round() as u64
}

/// Scan the generated directory into an ordered manifest, newest first.
///
/// Per-entry problems (unparseable name, failed stat) are logged and kept as
/// best-effort rows; only an unreadable directory is an error, and callers
/// degrade that to an empty listing.
pub fn build_manifest(dir: &Path) -> Result<Vec<TarballRecord>> {
    let entries = fs::read_dir(dir).map_err(|source| ShelfError::DirectoryAccess {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut records = Vec::new();
    for entry in entries.flatten() {
        let name = entry.file_name().to_string_lossy().into_owned();
        let mut record = parse_filename(&name);
        if record.version.is_empty() {
            tracing::warn!("tarball name {name:?} does not match PRODUCT-VERSION.ext");
        }
        match entry.metadata() {
            Ok(meta) => record.size_kb = kib_rounded(meta.len()),
            Err(e) => tracing::warn!("cannot stat {name:?}: {e}"),
        }
        records.push(record);
    }

    records.sort_by(|a, b| b.cmp(a));
    Ok(records)
}
