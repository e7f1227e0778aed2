//! Partition stores.
//!
//! A partition store is one ordered, primary-key-indexed on-disk table. The
//! split table dispatches every operation through the [`PartitionStore`]
//! trait and never relies on anything beyond it; [`RowTable`] is the on-disk
//! implementation shipped with this crate.

mod rowtable;

pub use rowtable::{RowTable, StoreOptions, FILE_HEADER_LEN, LARGE_TABLE_LIMIT, TAIL_CACHE_BUDGET};

use crate::merge::Cursor;
use crate::row::Row;
use crate::Result;

/// Contract between the split table and one partition.
///
/// Implementations are internally thread-safe: every method takes `&self`
/// and concurrent calls on one store are the store's business. Methods that
/// touch the disk may block arbitrarily.
pub trait PartitionStore: Send + Sync {
    /// Whether the store holds a row with this key.
    fn has(&self, key: &[u8]) -> bool;

    /// Fetch a row by key. `force_copy` requests a copy independent of any
    /// internal cache; implementations returning owned rows may ignore it.
    fn get(&self, key: &[u8], force_copy: bool) -> Result<Option<Row>>;

    /// Insert or update. Returns true if the key was newly inserted.
    fn put(&self, row: Row) -> Result<bool>;

    /// Insert or update, returning the previous row if one existed.
    fn replace(&self, row: Row) -> Result<Option<Row>>;

    /// Append a row whose key the caller guarantees is absent.
    fn add_unique(&self, row: Row) -> Result<()>;

    /// Delete by key. Returns true if a row was removed.
    fn delete(&self, key: &[u8]) -> Result<bool>;

    /// Delete by key, returning the removed row.
    fn remove(&self, key: &[u8]) -> Result<Option<Row>>;

    /// Remove and return the most recently appended row.
    fn remove_one(&self) -> Result<Option<Row>>;

    /// Up to `count` of the most recently appended rows, newest first.
    fn top(&self, count: usize) -> Result<Vec<Row>>;

    /// Evict stale rows sharing a key with a live row, grouped by key.
    fn remove_doubles(&self) -> Result<Vec<Vec<Row>>>;

    /// Number of live rows.
    fn size(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Estimated in-memory footprint in bytes.
    fn mem(&self) -> u64;

    /// Bytes currently staged in the write buffer.
    fn write_buffer_size(&self) -> u64;

    /// Logical file size in bytes, counting buffered appends.
    fn file_size(&self) -> u64;

    fn smallest_key(&self) -> Result<Option<Box<[u8]>>>;

    fn largest_key(&self) -> Result<Option<Box<[u8]>>>;

    /// Clonable ordered key stream, starting at `start` (inclusive) when
    /// given.
    fn keys(&self, ascending: bool, start: Option<&[u8]>)
        -> Result<Box<dyn Cursor<Item = Box<[u8]>>>>;

    /// Clonable ordered row stream, starting at `start` (inclusive) when
    /// given.
    fn rows(&self, ascending: bool, start: Option<&[u8]>) -> Result<Box<dyn Cursor<Item = Row>>>;

    /// Pre-populate internal caches. Idempotent; safe to run concurrently
    /// with other operations.
    fn warm_up(&self);

    /// Flush and close. Idempotent.
    fn close(&self) -> Result<()>;

    /// Mark the backing file for deletion when the store is dropped.
    fn delete_on_exit(&self);

    /// Path of the backing file.
    fn filename(&self) -> String;
}
