//! Partition discovery.
//!
//! At open the table directory is scanned twice: a zero pass renames legacy
//! `<prefix>.XXXXXX` files into the modern timestamped shape, then the
//! discovery pass collects every well-formed partition file together with its
//! creation time and predicted index footprint. Files whose timestamp does
//! not parse are logged and skipped; they never abort an open.

use std::fs;
use std::path::Path;

use rand::Rng;

use crate::filename;
use crate::row::RowDef;
use crate::store::RowTable;
use crate::Result;

/// A partition file found on disk, not yet opened.
#[derive(Debug, Clone)]
pub struct DiscoveredPartition {
    pub name: String,
    /// Creation time recovered from the filename, epoch milliseconds.
    pub created_ms: u64,
    /// Predicted in-memory index footprint, from file size alone.
    pub ram_need: u64,
}

/// Rename legacy `<prefix>.XXXXXX` files to the modern shape.
///
/// The six legacy characters become the head of the timestamp field, padded
/// with `0100000` and four random digits. Renames are best-effort: a failure
/// is logged and the file is left for the next open to retry. Returns the
/// number of files migrated.
pub fn migrate_legacy(dir: &Path, prefix: &str) -> Result<usize> {
    let mut migrated = 0;
    let mut rng = rand::thread_rng();

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = match entry.file_name().into_string() {
            Ok(name) => name,
            Err(_) => continue,
        };
        if !filename::is_legacy_name(prefix, &name) {
            continue;
        }

        let newname = format!(
            "{name}0100000{:04}{}",
            rng.gen_range(0..10_000u32),
            filename::SUFFIX
        );
        match fs::rename(entry.path(), dir.join(&newname)) {
            Ok(()) => {
                log::info!("migrated legacy partition {name} -> {newname}");
                migrated += 1;
            }
            Err(err) => {
                log::warn!("failed to migrate legacy partition {name}: {err}");
            }
        }
    }

    Ok(migrated)
}

/// Collect all well-formed partition files under `dir` for `prefix`.
///
/// The predicted RAM need is computed from file metadata only; no partition
/// file is opened here.
pub fn discover(dir: &Path, prefix: &str, rowdef: &RowDef) -> Result<Vec<DiscoveredPartition>> {
    let mut found = Vec::new();

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = match entry.file_name().into_string() {
            Ok(name) => name,
            Err(_) => continue,
        };
        if name.len() != prefix.len() + filename::NAME_OVERHEAD || !name.starts_with(prefix) {
            continue;
        }

        let created_ms = match filename::parse_created_ms(prefix, &name) {
            Ok(ms) => ms,
            Err(err) => {
                log::warn!("skipping partition file: {err}");
                continue;
            }
        };

        let ram_need = RowTable::static_ram_need(&entry.path(), rowdef)?;
        found.push(DiscoveredPartition {
            name,
            created_ms,
            ram_need,
        });
    }

    Ok(found)
}
