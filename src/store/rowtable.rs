//! On-disk partition store.
//!
//! A `RowTable` is a single file of fixed-length rows behind a 32-byte
//! header, with an in-memory ordered index from key to row slot. Appends are
//! staged in a bounded write buffer; deletes fill the hole with the last row
//! and shrink the file, so the file stays dense. An optional tail cache keeps
//! the non-key remainder of every row in memory so lookups can skip the disk
//! after warm-up.
//!
//! Capacity is signalled, not guessed: opening fails with `CapacityExceeded`
//! when the requested tail cache would not fit its budget or the file exceeds
//! the large-table limit, both computed from file size and schema alone so
//! callers can fall back deterministically.

use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File};
use std::io::{BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::merge::Cursor;
use crate::row::{OrderedKey, Row, RowDef};
use crate::store::PartitionStore;
use crate::{Error, Result};

/// File magic ('STB1').
pub const FILE_MAGIC: u32 = 0x53544231;

/// File format version.
pub const FILE_VERSION: u32 = 1;

/// Header length: magic, version, row length, key length, reserved, CRC-32.
pub const FILE_HEADER_LEN: usize = 32;

/// Largest file an unflagged store accepts (128 MiB - 1).
pub const LARGE_TABLE_LIMIT: u64 = 134_217_727;

/// Budget for the in-memory tail cache.
pub const TAIL_CACHE_BUDGET: u64 = 64 * 1024 * 1024;

/// Estimated per-entry bookkeeping of the key index.
const INDEX_ENTRY_OVERHEAD: u64 = 56;

/// Open-time parameters of a [`RowTable`].
#[derive(Debug, Clone, Copy)]
pub struct StoreOptions {
    /// Rows staged in memory before the next append flush. Zero writes
    /// through.
    pub buffer_rows: usize,
    /// Expected row count, used to pre-size caches.
    pub initial_capacity: usize,
    /// Keep row tails in memory once warmed up.
    pub use_tail_cache: bool,
    /// Accept files past [`LARGE_TABLE_LIMIT`].
    pub exceed_large_limit: bool,
    /// Create the file; fails if it already exists.
    pub create_new: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    File(u64),
    Buffer(usize),
}

struct TableState {
    file: File,
    file_rows: u64,
    index: BTreeMap<OrderedKey, Slot>,
    buffer: Vec<Row>,
    tail_cache: Option<HashMap<Box<[u8]>, Box<[u8]>>>,
    warmed: bool,
    /// File slots holding rows whose key is shadowed by a live row.
    stale: Vec<u64>,
    closed: bool,
}

pub struct RowTable {
    path: PathBuf,
    rowdef: RowDef,
    buffer_rows: usize,
    state: Mutex<TableState>,
    remove_on_drop: AtomicBool,
}

impl std::fmt::Debug for RowTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RowTable")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl RowTable {
    /// Open or create a partition file.
    pub fn open(path: &Path, rowdef: &RowDef, options: StoreOptions) -> Result<Self> {
        let mut file = if options.create_new {
            fs::OpenOptions::new()
                .read(true)
                .write(true)
                .create_new(true)
                .open(path)?
        } else {
            fs::OpenOptions::new().read(true).write(true).open(path)?
        };

        let len = file.metadata()?.len();
        if !options.exceed_large_limit && len > LARGE_TABLE_LIMIT {
            return Err(Error::CapacityExceeded);
        }
        if options.use_tail_cache && tail_cache_need(len, rowdef) > TAIL_CACHE_BUDGET {
            return Err(Error::CapacityExceeded);
        }

        let file_rows = if len == 0 {
            write_header(&mut file, rowdef)?;
            0
        } else {
            read_header(&mut file, rowdef)?;
            let body = len - FILE_HEADER_LEN as u64;
            let rows = body / rowdef.row_len() as u64;
            if body % rowdef.row_len() as u64 != 0 {
                log::warn!(
                    "{}: dropping {} trailing bytes of a partial row",
                    path.display(),
                    body % rowdef.row_len() as u64
                );
                file.set_len(row_offset(rowdef, rows))?;
            }
            rows
        };

        let mut index = BTreeMap::new();
        let mut stale = Vec::new();
        if file_rows > 0 {
            file.seek(SeekFrom::Start(FILE_HEADER_LEN as u64))?;
            let mut reader = BufReader::new(&mut file);
            let mut row = vec![0u8; rowdef.row_len()];
            for slot in 0..file_rows {
                reader.read_exact(&mut row)?;
                let key = rowdef.ordered_key(rowdef.key_of(&row));
                // Later occurrences win; shadowed slots are kept for
                // remove_doubles.
                if let Some(previous) = index.insert(key, Slot::File(slot)) {
                    if let Slot::File(previous_slot) = previous {
                        stale.push(previous_slot);
                    }
                }
            }
        }

        let tail_cache = options
            .use_tail_cache
            .then(|| HashMap::with_capacity(options.initial_capacity));

        Ok(Self {
            path: path.to_path_buf(),
            rowdef: *rowdef,
            buffer_rows: options.buffer_rows,
            state: Mutex::new(TableState {
                file,
                file_rows,
                index,
                buffer: Vec::with_capacity(options.buffer_rows),
                tail_cache,
                warmed: false,
                stale,
                closed: false,
            }),
            remove_on_drop: AtomicBool::new(false),
        })
    }

    /// Predicted in-memory index footprint for a partition file, computed
    /// from file metadata without opening it.
    pub fn static_ram_need(path: &Path, rowdef: &RowDef) -> Result<u64> {
        let len = fs::metadata(path)?.len();
        let rows = len.saturating_sub(FILE_HEADER_LEN as u64) / rowdef.row_len() as u64;
        Ok(rows * (rowdef.key_len() as u64 + INDEX_ENTRY_OVERHEAD))
    }

    fn lock(&self) -> MutexGuard<'_, TableState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Shared insert/update path of `put` and `replace`.
    fn upsert(&self, row: Row, want_previous: bool) -> Result<(bool, Option<Row>)> {
        assert_eq!(
            row.len(),
            self.rowdef.row_len(),
            "row length does not match schema"
        );
        let rowdef = self.rowdef;
        let mut guard = self.lock();
        let state = &mut *guard;
        if state.closed {
            return Err(Error::Closed);
        }

        let okey = rowdef.ordered_key(row.key(&rowdef));
        let existing = state
            .index
            .get_key_value(&okey)
            .map(|(key, slot)| (key.clone(), *slot));

        if let Some((stored, slot)) = existing {
            let previous = match slot {
                Slot::Buffer(i) => {
                    let previous = want_previous.then(|| state.buffer[i].clone());
                    state.buffer[i] = row.clone();
                    previous
                }
                Slot::File(n) => {
                    let previous = if want_previous {
                        Some(read_row_at(&mut state.file, &rowdef, n)?)
                    } else {
                        None
                    };
                    write_row_at(&mut state.file, &rowdef, n, row.as_bytes())?;
                    previous
                }
            };
            // Under a custom key order, equal keys may differ in bytes; keep
            // the index and cache keyed by the bytes actually on disk.
            if stored.as_bytes() != row.key(&rowdef) {
                state.index.remove(&stored);
                state.index.insert(okey, slot);
            }
            if state.warmed {
                if let Some(cache) = state.tail_cache.as_mut() {
                    cache.remove(stored.as_bytes());
                    cache.insert(
                        row.key(&rowdef).into(),
                        row.as_bytes()[rowdef.key_len()..].into(),
                    );
                }
            }
            return Ok((false, previous));
        }

        self.append_new(state, okey, row)?;
        Ok((true, None))
    }

    /// Append a row whose key is known to be absent from the index.
    fn append_new(&self, state: &mut TableState, okey: OrderedKey, row: Row) -> Result<()> {
        if state.warmed {
            if let Some(cache) = state.tail_cache.as_mut() {
                cache.insert(
                    row.key(&self.rowdef).into(),
                    row.as_bytes()[self.rowdef.key_len()..].into(),
                );
            }
        }
        if self.buffer_rows == 0 {
            let slot = state.file_rows;
            write_row_at(&mut state.file, &self.rowdef, slot, row.as_bytes())?;
            state.file_rows += 1;
            state.index.insert(okey, Slot::File(slot));
        } else {
            state.buffer.push(row);
            state.index.insert(okey, Slot::Buffer(state.buffer.len() - 1));
            if state.buffer.len() >= self.buffer_rows {
                flush_buffer(&self.rowdef, state)?;
            }
        }
        Ok(())
    }
}

/// Flush staged appends to the end of the file and re-point their index
/// slots.
fn flush_buffer(rowdef: &RowDef, state: &mut TableState) -> Result<()> {
    if state.buffer.is_empty() {
        return Ok(());
    }
    let base = state.file_rows;
    state.file.seek(SeekFrom::Start(row_offset(rowdef, base)))?;
    for row in &state.buffer {
        state.file.write_all(row.as_bytes())?;
    }
    state.file_rows += state.buffer.len() as u64;

    let rows = std::mem::take(&mut state.buffer);
    for (i, row) in rows.iter().enumerate() {
        let okey = rowdef.ordered_key(row.key(rowdef));
        if let Some(slot) = state.index.get_mut(&okey) {
            if *slot == Slot::Buffer(i) {
                *slot = Slot::File(base + i as u64);
            }
        }
    }
    Ok(())
}

/// Remove one file slot by moving the last row into the hole and shrinking
/// the file. Fixes up the index entry and stale references of the moved row.
fn remove_file_slot(rowdef: &RowDef, state: &mut TableState, slot: u64) -> Result<()> {
    let last = state.file_rows - 1;
    if slot != last {
        let moved = read_row_at(&mut state.file, rowdef, last)?;
        write_row_at(&mut state.file, rowdef, slot, moved.as_bytes())?;
        let okey = rowdef.ordered_key(moved.key(rowdef));
        if let Some(entry) = state.index.get_mut(&okey) {
            if *entry == Slot::File(last) {
                *entry = Slot::File(slot);
            }
        }
        for stale in state.stale.iter_mut() {
            if *stale == last {
                *stale = slot;
            }
        }
    }
    state.file_rows = last;
    state.file.set_len(row_offset(rowdef, last))?;
    Ok(())
}

fn row_offset(rowdef: &RowDef, slot: u64) -> u64 {
    FILE_HEADER_LEN as u64 + slot * rowdef.row_len() as u64
}

fn read_row_at(file: &mut File, rowdef: &RowDef, slot: u64) -> Result<Row> {
    let mut buf = vec![0u8; rowdef.row_len()];
    file.seek(SeekFrom::Start(row_offset(rowdef, slot)))?;
    file.read_exact(&mut buf)?;
    Ok(Row::from_bytes(buf))
}

fn write_row_at(file: &mut File, rowdef: &RowDef, slot: u64, row: &[u8]) -> Result<()> {
    file.seek(SeekFrom::Start(row_offset(rowdef, slot)))?;
    file.write_all(row)?;
    Ok(())
}

/// Bytes the tail cache would need for a file of `len` bytes.
fn tail_cache_need(len: u64, rowdef: &RowDef) -> u64 {
    let rows = len.saturating_sub(FILE_HEADER_LEN as u64) / rowdef.row_len() as u64;
    rows * (rowdef.row_len() - rowdef.key_len()) as u64
}

fn write_header(file: &mut File, rowdef: &RowDef) -> Result<()> {
    let mut buf = [0u8; FILE_HEADER_LEN];
    buf[0..4].copy_from_slice(&FILE_MAGIC.to_le_bytes());
    buf[4..8].copy_from_slice(&FILE_VERSION.to_le_bytes());
    buf[8..12].copy_from_slice(&(rowdef.row_len() as u32).to_le_bytes());
    buf[12..16].copy_from_slice(&(rowdef.key_len() as u32).to_le_bytes());
    let crc = crc32fast::hash(&buf[0..28]);
    buf[28..32].copy_from_slice(&crc.to_le_bytes());

    file.seek(SeekFrom::Start(0))?;
    file.write_all(&buf)?;
    Ok(())
}

fn read_header(file: &mut File, rowdef: &RowDef) -> Result<()> {
    let mut buf = [0u8; FILE_HEADER_LEN];
    file.seek(SeekFrom::Start(0))?;
    file.read_exact(&mut buf)
        .map_err(|_| Error::Corrupt("partition file too small for header"))?;

    let field = |from: usize| u32::from_le_bytes(buf[from..from + 4].try_into().expect("slice"));
    if field(0) != FILE_MAGIC {
        return Err(Error::Corrupt("partition file magic mismatch"));
    }
    if field(4) != FILE_VERSION {
        return Err(Error::Corrupt("unsupported partition file version"));
    }
    if field(28) != crc32fast::hash(&buf[0..28]) {
        return Err(Error::Corrupt("partition header checksum mismatch"));
    }
    if field(8) as usize != rowdef.row_len() || field(12) as usize != rowdef.key_len() {
        return Err(Error::Corrupt("partition file schema mismatch"));
    }
    Ok(())
}

/// Cursor over a snapshot of the table's keys taken at construction.
#[derive(Clone)]
struct SnapshotCursor<T: Clone> {
    items: std::sync::Arc<Vec<T>>,
    pos: usize,
}

impl<T: Clone + Send + Sync + 'static> Cursor for SnapshotCursor<T> {
    type Item = T;

    fn next(&mut self) -> Result<Option<T>> {
        let item = self.items.get(self.pos).cloned();
        if item.is_some() {
            self.pos += 1;
        }
        Ok(item)
    }

    fn clone_boxed(&self) -> Box<dyn Cursor<Item = T>> {
        Box::new(self.clone())
    }
}

impl RowTable {
    /// Keys in index order for the requested direction, starting at `start`
    /// (inclusive).
    fn collect_keys(
        state: &TableState,
        rowdef: &RowDef,
        ascending: bool,
        start: Option<&[u8]>,
    ) -> Vec<OrderedKey> {
        match (ascending, start) {
            (true, None) => state.index.keys().cloned().collect(),
            (true, Some(start)) => {
                let from = rowdef.ordered_key(start);
                state.index.range(from..).map(|(k, _)| k.clone()).collect()
            }
            (false, None) => state.index.keys().rev().cloned().collect(),
            (false, Some(start)) => {
                let to = rowdef.ordered_key(start);
                state
                    .index
                    .range(..=to)
                    .rev()
                    .map(|(k, _)| k.clone())
                    .collect()
            }
        }
    }
}

impl PartitionStore for RowTable {
    fn has(&self, key: &[u8]) -> bool {
        let state = self.lock();
        !state.closed && state.index.contains_key(&self.rowdef.ordered_key(key))
    }

    fn get(&self, key: &[u8], _force_copy: bool) -> Result<Option<Row>> {
        let rowdef = self.rowdef;
        let mut guard = self.lock();
        let state = &mut *guard;
        if state.closed {
            return Err(Error::Closed);
        }

        let okey = rowdef.ordered_key(key);
        let TableState {
            file,
            index,
            buffer,
            tail_cache,
            warmed,
            ..
        } = state;
        let Some((stored, slot)) = index.get_key_value(&okey) else {
            return Ok(None);
        };
        match *slot {
            Slot::Buffer(i) => Ok(Some(buffer[i].clone())),
            Slot::File(n) => {
                if *warmed {
                    if let Some(tail) = tail_cache.as_ref().and_then(|c| c.get(stored.as_bytes()))
                    {
                        let mut bytes = Vec::with_capacity(rowdef.row_len());
                        bytes.extend_from_slice(stored.as_bytes());
                        bytes.extend_from_slice(tail);
                        return Ok(Some(Row::from_bytes(bytes)));
                    }
                }
                Ok(Some(read_row_at(file, &rowdef, n)?))
            }
        }
    }

    fn put(&self, row: Row) -> Result<bool> {
        let (inserted, _) = self.upsert(row, false)?;
        Ok(inserted)
    }

    fn replace(&self, row: Row) -> Result<Option<Row>> {
        let (_, previous) = self.upsert(row, true)?;
        Ok(previous)
    }

    fn add_unique(&self, row: Row) -> Result<()> {
        assert_eq!(
            row.len(),
            self.rowdef.row_len(),
            "row length does not match schema"
        );
        let rowdef = self.rowdef;
        let mut guard = self.lock();
        if guard.closed {
            return Err(Error::Closed);
        }
        let okey = rowdef.ordered_key(row.key(&rowdef));
        debug_assert!(
            !guard.index.contains_key(&okey),
            "add_unique called with a present key"
        );
        self.append_new(&mut guard, okey, row)
    }

    fn delete(&self, key: &[u8]) -> Result<bool> {
        Ok(self.remove(key)?.is_some())
    }

    fn remove(&self, key: &[u8]) -> Result<Option<Row>> {
        let rowdef = self.rowdef;
        let mut guard = self.lock();
        let state = &mut *guard;
        if state.closed {
            return Err(Error::Closed);
        }
        flush_buffer(&rowdef, state)?;

        let Some((stored, slot)) = state.index.remove_entry(&rowdef.ordered_key(key)) else {
            return Ok(None);
        };
        let Slot::File(n) = slot else {
            unreachable!("buffer slots are flushed before removal");
        };
        let row = read_row_at(&mut state.file, &rowdef, n)?;
        remove_file_slot(&rowdef, state, n)?;
        if let Some(cache) = state.tail_cache.as_mut() {
            cache.remove(stored.as_bytes());
        }
        Ok(Some(row))
    }

    fn remove_one(&self) -> Result<Option<Row>> {
        let rowdef = self.rowdef;
        let mut guard = self.lock();
        let state = &mut *guard;
        if state.closed {
            return Err(Error::Closed);
        }
        flush_buffer(&rowdef, state)?;
        if state.file_rows == 0 {
            return Ok(None);
        }

        let last = state.file_rows - 1;
        let row = read_row_at(&mut state.file, &rowdef, last)?;
        let okey = rowdef.ordered_key(row.key(&rowdef));
        if state.index.get(&okey) == Some(&Slot::File(last)) {
            state.index.remove(&okey);
            if let Some(cache) = state.tail_cache.as_mut() {
                cache.remove(row.key(&rowdef));
            }
        }
        state.stale.retain(|slot| *slot != last);
        state.file_rows = last;
        state.file.set_len(row_offset(&rowdef, last))?;
        Ok(Some(row))
    }

    fn top(&self, count: usize) -> Result<Vec<Row>> {
        let rowdef = self.rowdef;
        let mut guard = self.lock();
        let state = &mut *guard;
        if state.closed {
            return Ok(Vec::new());
        }
        flush_buffer(&rowdef, state)?;

        let take = (count as u64).min(state.file_rows);
        let mut rows = Vec::with_capacity(take as usize);
        for slot in (state.file_rows - take..state.file_rows).rev() {
            rows.push(read_row_at(&mut state.file, &rowdef, slot)?);
        }
        Ok(rows)
    }

    fn remove_doubles(&self) -> Result<Vec<Vec<Row>>> {
        let rowdef = self.rowdef;
        let mut guard = self.lock();
        let state = &mut *guard;
        if state.closed {
            return Err(Error::Closed);
        }
        flush_buffer(&rowdef, state)?;

        // Highest slot first: every remaining stale slot is below the one
        // being removed, so the row moved down from the tail is never itself
        // pending.
        let mut pending = std::mem::take(&mut state.stale);
        pending.sort_unstable();
        let mut groups: BTreeMap<OrderedKey, Vec<Row>> = BTreeMap::new();
        while let Some(slot) = pending.pop() {
            let row = read_row_at(&mut state.file, &rowdef, slot)?;
            remove_file_slot(&rowdef, state, slot)?;
            groups
                .entry(rowdef.ordered_key(row.key(&rowdef)))
                .or_default()
                .push(row);
        }
        Ok(groups.into_values().collect())
    }

    fn size(&self) -> usize {
        self.lock().index.len()
    }

    fn mem(&self) -> u64 {
        let state = self.lock();
        let index = state.index.len() as u64
            * (self.rowdef.key_len() as u64 + INDEX_ENTRY_OVERHEAD);
        let cache = state
            .tail_cache
            .as_ref()
            .map(|c| c.len() as u64 * self.rowdef.row_len() as u64)
            .unwrap_or(0);
        index + cache
    }

    fn write_buffer_size(&self) -> u64 {
        self.lock().buffer.len() as u64 * self.rowdef.row_len() as u64
    }

    fn file_size(&self) -> u64 {
        let state = self.lock();
        row_offset(
            &self.rowdef,
            state.file_rows + state.buffer.len() as u64,
        )
    }

    fn smallest_key(&self) -> Result<Option<Box<[u8]>>> {
        Ok(self
            .lock()
            .index
            .first_key_value()
            .map(|(key, _)| Box::from(key.as_bytes())))
    }

    fn largest_key(&self) -> Result<Option<Box<[u8]>>> {
        Ok(self
            .lock()
            .index
            .last_key_value()
            .map(|(key, _)| Box::from(key.as_bytes())))
    }

    fn keys(
        &self,
        ascending: bool,
        start: Option<&[u8]>,
    ) -> Result<Box<dyn Cursor<Item = Box<[u8]>>>> {
        let state = self.lock();
        if state.closed {
            return Err(Error::Closed);
        }
        let keys: Vec<Box<[u8]>> = Self::collect_keys(&state, &self.rowdef, ascending, start)
            .into_iter()
            .map(OrderedKey::into_bytes)
            .collect();
        Ok(Box::new(SnapshotCursor {
            items: std::sync::Arc::new(keys),
            pos: 0,
        }))
    }

    fn rows(&self, ascending: bool, start: Option<&[u8]>) -> Result<Box<dyn Cursor<Item = Row>>> {
        let rowdef = self.rowdef;
        let mut guard = self.lock();
        let state = &mut *guard;
        if state.closed {
            return Err(Error::Closed);
        }
        flush_buffer(&rowdef, state)?;

        let keys = Self::collect_keys(state, &rowdef, ascending, start);
        let mut rows = Vec::with_capacity(keys.len());
        for key in keys {
            let Some(&Slot::File(n)) = state.index.get(&key) else {
                continue;
            };
            rows.push(read_row_at(&mut state.file, &rowdef, n)?);
        }
        Ok(Box::new(SnapshotCursor {
            items: std::sync::Arc::new(rows),
            pos: 0,
        }))
    }

    fn warm_up(&self) {
        let rowdef = self.rowdef;
        let mut guard = self.lock();
        let state = &mut *guard;
        if state.closed || state.warmed || state.tail_cache.is_none() {
            return;
        }

        let TableState {
            file,
            index,
            buffer,
            tail_cache,
            ..
        } = state;
        let cache = tail_cache.as_mut().expect("tail cache enabled");
        cache.clear();
        let mut buf = vec![0u8; rowdef.row_len()];
        for (key, slot) in index.iter() {
            let tail: Box<[u8]> = match *slot {
                Slot::Buffer(i) => buffer[i].as_bytes()[rowdef.key_len()..].into(),
                Slot::File(n) => {
                    let read = file
                        .seek(SeekFrom::Start(row_offset(&rowdef, n)))
                        .and_then(|_| file.read_exact(&mut buf));
                    if let Err(err) = read {
                        log::warn!("{}: warm-up aborted: {err}", self.path.display());
                        return;
                    }
                    buf[rowdef.key_len()..].into()
                }
            };
            cache.insert(key.as_bytes().into(), tail);
        }
        state.warmed = true;
    }

    fn close(&self) -> Result<()> {
        let rowdef = self.rowdef;
        let mut guard = self.lock();
        let state = &mut *guard;
        if state.closed {
            return Ok(());
        }
        flush_buffer(&rowdef, state)?;
        state.file.sync_all()?;
        state.closed = true;
        Ok(())
    }

    fn delete_on_exit(&self) {
        self.remove_on_drop.store(true, AtomicOrdering::Relaxed);
    }

    fn filename(&self) -> String {
        self.path.display().to_string()
    }
}

impl Drop for RowTable {
    fn drop(&mut self) {
        let state = self
            .state
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        if !state.closed {
            if let Err(err) = flush_buffer(&self.rowdef, state) {
                log::warn!("{}: flush on drop failed: {err}", self.path.display());
            }
            let _ = state.file.sync_all();
        }
        if self.remove_on_drop.load(AtomicOrdering::Relaxed) {
            if let Err(err) = fs::remove_file(&self.path) {
                log::warn!("{}: delete on exit failed: {err}", self.path.display());
            }
        }
    }
}
