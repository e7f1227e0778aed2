//! The split table.
//!
//! A split table presents one logical, ordered, primary-key-indexed table
//! whose rows live in many partition files, each covering a bounded creation
//! window or size. New keys go to the active partition, rolling over to a
//! fresh one under age or size pressure; updates and deletes follow the key
//! to whichever partition already holds it. A key lives in at most one
//! partition — writes enforce that by probing before they route — so lookups
//! stop at the first hit and ordered iteration is a plain k-way merge.
//!
//! Locking is two-level: a table-wide read-write lock makes `close` and
//! `clear` exclusive against everything else, and a registry monitor
//! serialises partition creation, the active-partition handoff and the
//! double-checked probe in `put`/`replace`. Reads share the table lock and
//! probe a snapshot of the partition set; partitions created concurrently
//! cannot hold the probed key, so a miss under the snapshot stays correct.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::{mpsc, Arc, Mutex, PoisonError, RwLock};
use std::thread;
use std::time::Duration;

use crate::clock::{Clock, SystemClock};
use crate::config::SplitTableConfig;
use crate::filename;
use crate::merge::{MergeCursor, StackedCursor};
use crate::pool::WorkerPool;
use crate::row::{OrderedKey, Row, RowDef};
use crate::scan;
use crate::store::{PartitionStore, RowTable, StoreOptions};
use crate::{Error, Result};

/// Grace period granted to in-flight lookup jobs at close.
const CLOSE_GRACE: Duration = Duration::from_secs(3);

type Store = Arc<dyn PartitionStore>;

struct Registry {
    /// Open partitions by filename. Iteration order is unspecified.
    partitions: HashMap<String, Store>,
    /// Partition accepting new keys; the newest by creation time.
    active: Option<String>,
}

struct Inner {
    registry: Mutex<Registry>,
    pool: WorkerPool,
}

pub struct SplitTable {
    dir: PathBuf,
    prefix: String,
    rowdef: RowDef,
    config: SplitTableConfig,
    /// Cleared for the table's lifetime when re-init after `clear` runs out
    /// of capacity.
    use_tail_cache: AtomicBool,
    clock: Arc<dyn Clock>,
    inner: RwLock<Option<Inner>>,
}

impl std::fmt::Debug for SplitTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SplitTable")
            .field("dir", &self.dir)
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

impl SplitTable {
    /// Open the split table under `dir` with the given filename prefix,
    /// discovering and warming all existing partitions before returning.
    pub fn open(
        dir: &Path,
        prefix: &str,
        rowdef: RowDef,
        config: SplitTableConfig,
    ) -> Result<Self> {
        Self::open_with_clock(dir, prefix, rowdef, config, Arc::new(SystemClock))
    }

    /// Like [`SplitTable::open`] with an explicit time source for rollover
    /// age checks and partition naming.
    pub fn open_with_clock(
        dir: &Path,
        prefix: &str,
        rowdef: RowDef,
        config: SplitTableConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let table = Self {
            dir: dir.to_path_buf(),
            prefix: prefix.to_string(),
            rowdef,
            use_tail_cache: AtomicBool::new(config.use_tail_cache),
            config,
            clock,
            inner: RwLock::new(None),
        };
        let inner = table.init()?;
        *table.write_lock() = Some(inner);
        Ok(table)
    }

    /// Discover, open and warm every partition, then size the lookup pool.
    fn init(&self) -> Result<Inner> {
        fs::create_dir_all(&self.dir)?;
        scan::migrate_legacy(&self.dir, &self.prefix)?;
        let mut found = scan::discover(&self.dir, &self.prefix, &self.rowdef)?;

        let active = found
            .iter()
            .max_by_key(|partition| partition.created_ms)
            .map(|partition| partition.name.clone());

        // Largest predicted footprint first: the biggest partition is the
        // most likely lookup target while the rest are still warming.
        found.sort_by(|a, b| b.ram_need.cmp(&a.ram_need));

        let mut partitions: HashMap<String, Store> = HashMap::with_capacity(found.len());
        let mut warmups = Vec::with_capacity(found.len());
        for partition in found {
            log::info!("opening partition {}", partition.name);
            let store = Arc::new(self.open_store(&self.dir.join(&partition.name), false)?);
            let warming = Arc::clone(&store);
            let handle = thread::Builder::new()
                .name(format!("{}-warmup", self.prefix))
                .spawn(move || warming.warm_up())?;
            warmups.push(handle);
            partitions.insert(partition.name, store);
        }
        // Barrier: the table is not open until every partition is warm.
        for handle in warmups {
            if handle.join().is_err() {
                log::warn!("partition warm-up thread failed");
            }
        }

        debug_assert!(
            active.as_ref().map_or(true, |name| partitions.contains_key(name)),
            "active partition must be registered"
        );

        let parallelism = thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        let pool = WorkerPool::new(partitions.len().max(parallelism) + 1, &self.prefix)?;

        Ok(Inner {
            registry: Mutex::new(Registry { partitions, active }),
            pool,
        })
    }

    /// Open one partition store, falling back to low-memory settings when the
    /// first attempt reports `CapacityExceeded`. The fallback is part of the
    /// store contract; a single attempt would refuse tables that can still be
    /// served without their tail cache.
    fn open_store(&self, path: &Path, create_new: bool) -> Result<RowTable> {
        let options = StoreOptions {
            buffer_rows: self.config.buffer_rows,
            initial_capacity: 0,
            use_tail_cache: self.use_tail_cache.load(AtomicOrdering::Relaxed),
            exceed_large_limit: self.config.exceed_large_limit,
            create_new,
        };
        match RowTable::open(path, &self.rowdef, options) {
            Err(Error::CapacityExceeded) => {
                log::error!(
                    "{}: capacity exceeded, reopening without tail cache",
                    path.display()
                );
                RowTable::open(
                    path,
                    &self.rowdef,
                    StoreOptions {
                        buffer_rows: 0,
                        use_tail_cache: false,
                        ..options
                    },
                )
            }
            other => other,
        }
    }

    fn read_lock(&self) -> std::sync::RwLockReadGuard<'_, Option<Inner>> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_lock(&self) -> std::sync::RwLockWriteGuard<'_, Option<Inner>> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of the current partition set, in unspecified order.
    fn snapshot(inner: &Inner) -> Vec<Store> {
        inner
            .registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .partitions
            .values()
            .cloned()
            .collect()
    }

    /// The partition store that should receive a new key: the active
    /// partition, rolled over first when it is too old or too large.
    /// Creates the first partition when none exists. Callers hold the
    /// registry monitor.
    fn write_target(&self, registry: &mut Registry) -> Result<Store> {
        let Some(name) = registry.active.clone() else {
            return self.roll_new(registry);
        };
        let store = registry
            .partitions
            .get(&name)
            .expect("active partition is registered")
            .clone();

        let created_ms = match filename::parse_created_ms(&self.prefix, &name) {
            Ok(ms) => ms,
            Err(err) => {
                log::error!("active partition has an unparsable name: {err}");
                0
            }
        };
        let now = self.clock.now_millis();
        let age = Duration::from_millis(now.saturating_sub(created_ms));
        if age >= self.config.age_limit || store.file_size() >= self.config.size_limit {
            return self.roll_new(registry);
        }
        Ok(store)
    }

    /// Create a fresh partition and promote it to active.
    fn roll_new(&self, registry: &mut Registry) -> Result<Store> {
        // Names carry millisecond precision; if the clock has not ticked
        // since the last rollover, wait out the millisecond instead of
        // reusing a name.
        let mut name = filename::partition_filename(&self.prefix, self.clock.now_millis());
        while registry.partitions.contains_key(&name) {
            thread::sleep(Duration::from_millis(1));
            name = filename::partition_filename(&self.prefix, self.clock.now_millis());
        }

        log::info!("creating partition {name}");
        let store: Store = Arc::new(self.open_store(&self.dir.join(&name), true)?);
        registry.partitions.insert(name.clone(), Arc::clone(&store));
        registry.active = Some(name);
        Ok(store)
    }

    /// The unique partition holding `key`, if any.
    fn keeper_of<'a>(stores: &'a [Store], key: &[u8]) -> Option<&'a Store> {
        stores.iter().find(|store| store.has(key))
    }

    /// The row schema shared by every partition.
    pub fn rowdef(&self) -> &RowDef {
        &self.rowdef
    }

    /// Logical filename of the table: directory joined with the prefix.
    pub fn filename(&self) -> String {
        self.dir.join(&self.prefix).display().to_string()
    }

    /// Number of open partitions.
    pub fn partition_count(&self) -> usize {
        let guard = self.read_lock();
        match guard.as_ref() {
            Some(inner) => Self::snapshot(inner).len(),
            None => 0,
        }
    }

    /// Whether any partition holds `key`.
    pub fn has(&self, key: &[u8]) -> bool {
        let guard = self.read_lock();
        let Some(inner) = guard.as_ref() else {
            return false;
        };
        let stores = Self::snapshot(inner);
        Self::keeper_of(&stores, key).is_some()
    }

    /// Fetch a row by key from whichever partition holds it.
    pub fn get(&self, key: &[u8], force_copy: bool) -> Result<Option<Row>> {
        let guard = self.read_lock();
        let Some(inner) = guard.as_ref() else {
            return Ok(None);
        };
        let stores = Self::snapshot(inner);
        match Self::keeper_of(&stores, key) {
            Some(keeper) => keeper.get(key, force_copy),
            None => Ok(None),
        }
    }

    /// Batch lookup, fanned out across the lookup pool. The result maps each
    /// present key to its row, ordered by the schema's key order; missing
    /// keys are omitted. Fails with `Interrupted` when a worker goes away
    /// before delivering.
    pub fn get_all<I>(&self, keys: I, force_copy: bool) -> Result<BTreeMap<OrderedKey, Row>>
    where
        I: IntoIterator,
        I::Item: AsRef<[u8]>,
    {
        let guard = self.read_lock();
        let Some(inner) = guard.as_ref() else {
            return Ok(BTreeMap::new());
        };
        let stores = Self::snapshot(inner);

        let (sender, receiver) = mpsc::channel();
        let mut submitted = 0usize;
        for key in keys {
            let key: Box<[u8]> = key.as_ref().into();
            let stores = stores.clone();
            let sender = sender.clone();
            inner.pool.execute(move || {
                let found = match Self::keeper_of(&stores, &key) {
                    Some(keeper) => keeper.get(&key, force_copy),
                    None => Ok(None),
                };
                sender.send((key, found)).ok();
            })?;
            submitted += 1;
        }
        drop(sender);

        let mut rows = BTreeMap::new();
        for _ in 0..submitted {
            let (key, found) = receiver.recv().map_err(|_| Error::Interrupted)?;
            if let Some(row) = found? {
                rows.insert(self.rowdef.ordered_key(&key), row);
            }
        }
        Ok(rows)
    }

    /// Insert or update a row. Returns true if the key was newly inserted.
    ///
    /// An existing copy is updated in place wherever it lives; only genuinely
    /// new keys are routed to the (rollover-checked) active partition.
    pub fn put(&self, row: Row) -> Result<bool> {
        let guard = self.read_lock();
        let Some(inner) = guard.as_ref() else {
            return Err(Error::Closed);
        };
        let key = row.key(&self.rowdef).to_vec();

        // Optimisation only; the probe under the monitor below is the one
        // that counts.
        let stores = Self::snapshot(inner);
        if let Some(keeper) = Self::keeper_of(&stores, &key) {
            return keeper.put(row);
        }

        let mut registry = inner
            .registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        for store in registry.partitions.values() {
            if store.has(&key) {
                return store.put(row);
            }
        }
        let target = self.write_target(&mut registry)?;
        let inserted = target.put(row)?;
        debug_assert!(inserted, "negative probe under the monitor, put must insert");
        Ok(inserted)
    }

    /// Insert or update a row, returning the previous copy if one existed.
    pub fn replace(&self, row: Row) -> Result<Option<Row>> {
        let guard = self.read_lock();
        let Some(inner) = guard.as_ref() else {
            return Err(Error::Closed);
        };
        let key = row.key(&self.rowdef).to_vec();

        let stores = Self::snapshot(inner);
        if let Some(keeper) = Self::keeper_of(&stores, &key) {
            return keeper.replace(row);
        }

        let mut registry = inner
            .registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        for store in registry.partitions.values() {
            if store.has(&key) {
                return store.replace(row);
            }
        }
        let target = self.write_target(&mut registry)?;
        target.put(row)?;
        Ok(None)
    }

    /// Append a row whose key the caller guarantees is absent from every
    /// partition. Skips the cross-partition probe.
    pub fn add_unique(&self, row: Row) -> Result<()> {
        let guard = self.read_lock();
        let Some(inner) = guard.as_ref() else {
            return Err(Error::Closed);
        };
        let target = {
            let mut registry = inner
                .registry
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            self.write_target(&mut registry)?
        };
        target.add_unique(row)
    }

    /// Delete a row by key. Returns true if a partition held it.
    pub fn delete(&self, key: &[u8]) -> Result<bool> {
        let guard = self.read_lock();
        let Some(inner) = guard.as_ref() else {
            return Ok(false);
        };
        let stores = Self::snapshot(inner);
        match Self::keeper_of(&stores, key) {
            Some(keeper) => keeper.delete(key),
            None => Ok(false),
        }
    }

    /// Delete a row by key, returning it.
    pub fn remove(&self, key: &[u8]) -> Result<Option<Row>> {
        let guard = self.read_lock();
        let Some(inner) = guard.as_ref() else {
            return Ok(None);
        };
        let stores = Self::snapshot(inner);
        match Self::keeper_of(&stores, key) {
            Some(keeper) => keeper.remove(key),
            None => Ok(None),
        }
    }

    /// Remove and return one row from the largest partition, or `None` when
    /// the table is empty.
    pub fn remove_one(&self) -> Result<Option<Row>> {
        let guard = self.read_lock();
        let Some(inner) = guard.as_ref() else {
            return Ok(None);
        };
        match Self::largest_partition(&Self::snapshot(inner)) {
            Some(store) => store.remove_one(),
            None => Ok(None),
        }
    }

    /// Up to `count` recently written rows. Consults only the largest
    /// partition: callers want an approximate recently-used sample, not a
    /// global statistic.
    pub fn top(&self, count: usize) -> Result<Vec<Row>> {
        let guard = self.read_lock();
        let Some(inner) = guard.as_ref() else {
            return Ok(Vec::new());
        };
        match Self::largest_partition(&Self::snapshot(inner)) {
            Some(store) => store.top(count),
            None => Ok(Vec::new()),
        }
    }

    fn largest_partition(stores: &[Store]) -> Option<&Store> {
        stores.iter().max_by_key(|store| store.size())
    }

    /// Evict stale duplicate rows partition by partition, concatenating the
    /// reports. Cross-partition duplicates cannot exist.
    pub fn remove_doubles(&self) -> Result<Vec<Vec<Row>>> {
        let guard = self.read_lock();
        let Some(inner) = guard.as_ref() else {
            return Ok(Vec::new());
        };
        let mut report = Vec::new();
        for store in Self::snapshot(inner) {
            report.extend(store.remove_doubles()?);
        }
        Ok(report)
    }

    /// Total number of rows across all partitions.
    pub fn size(&self) -> usize {
        let guard = self.read_lock();
        match guard.as_ref() {
            Some(inner) => Self::snapshot(inner).iter().map(|s| s.size()).sum(),
            None => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        let guard = self.read_lock();
        match guard.as_ref() {
            Some(inner) => Self::snapshot(inner).iter().all(|s| s.is_empty()),
            None => true,
        }
    }

    /// Estimated in-memory footprint across all partitions.
    pub fn mem(&self) -> u64 {
        let guard = self.read_lock();
        match guard.as_ref() {
            Some(inner) => Self::snapshot(inner).iter().map(|s| s.mem()).sum(),
            None => 0,
        }
    }

    /// Bytes staged in partition write buffers.
    pub fn write_buffer_size(&self) -> u64 {
        let guard = self.read_lock();
        match guard.as_ref() {
            Some(inner) => Self::snapshot(inner)
                .iter()
                .map(|s| s.write_buffer_size())
                .sum(),
            None => 0,
        }
    }

    /// The least key across all partitions under the key order. Partitions
    /// failing to report are logged and skipped.
    pub fn smallest_key(&self) -> Option<Box<[u8]>> {
        let candidates = self.extremum_candidates(|store| store.smallest_key());
        candidates.first().cloned().map(OrderedKey::into_bytes)
    }

    /// The greatest key across all partitions under the key order.
    pub fn largest_key(&self) -> Option<Box<[u8]>> {
        let candidates = self.extremum_candidates(|store| store.largest_key());
        candidates.last().cloned().map(OrderedKey::into_bytes)
    }

    /// One candidate key per partition; the set stays as small as the
    /// partition count.
    fn extremum_candidates(
        &self,
        ask: impl Fn(&Store) -> Result<Option<Box<[u8]>>>,
    ) -> BTreeSet<OrderedKey> {
        let mut candidates = BTreeSet::new();
        let guard = self.read_lock();
        let Some(inner) = guard.as_ref() else {
            return candidates;
        };
        for store in Self::snapshot(inner) {
            match ask(&store) {
                Ok(Some(key)) => {
                    candidates.insert(self.rowdef.ordered_key(&key));
                }
                Ok(None) => {}
                Err(err) => {
                    log::warn!("{}: extremum key unavailable: {err}", store.filename());
                }
            }
        }
        candidates
    }

    /// Ordered merged key stream across all partitions.
    pub fn keys(&self, ascending: bool, start: Option<&[u8]>) -> Result<MergeCursor<Box<[u8]>>> {
        let guard = self.read_lock();
        let Some(inner) = guard.as_ref() else {
            return Err(Error::Closed);
        };
        let mut cursors = Vec::new();
        for store in Self::snapshot(inner) {
            cursors.push(store.keys(ascending, start)?);
        }
        Ok(MergeCursor::new(cursors, self.rowdef, merge_keys, ascending))
    }

    /// Ordered merged row stream across all partitions.
    pub fn rows(&self, ascending: bool, start: Option<&[u8]>) -> Result<MergeCursor<Row>> {
        let guard = self.read_lock();
        let Some(inner) = guard.as_ref() else {
            return Err(Error::Closed);
        };
        let mut cursors = Vec::new();
        for store in Self::snapshot(inner) {
            cursors.push(store.rows(ascending, start)?);
        }
        Ok(MergeCursor::new(cursors, self.rowdef, merge_rows, ascending))
    }

    /// Unordered row stream: per-partition cursors concatenated in registry
    /// order. Cheaper than the merge when the caller accepts any order.
    pub fn rows_unordered(&self) -> Result<StackedCursor<Row>> {
        let guard = self.read_lock();
        let Some(inner) = guard.as_ref() else {
            return Err(Error::Closed);
        };
        let mut cursors = Vec::new();
        for store in Self::snapshot(inner) {
            cursors.push(store.rows(true, None)?);
        }
        Ok(StackedCursor::new(cursors))
    }

    /// Close the table, wipe every `prefix`-named entry under the directory
    /// and re-initialise empty. A first re-init failing with
    /// `CapacityExceeded` disables the tail cache for the table's lifetime
    /// and retries once; a second failure surfaces as an I/O error.
    pub fn clear(&self) -> Result<()> {
        let mut guard = self.write_lock();
        Self::shutdown_inner(guard.take());

        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if !name.starts_with(&self.prefix) {
                continue;
            }
            if entry.file_type()?.is_dir() {
                fs::remove_dir_all(entry.path())?;
            } else {
                fs::remove_file(entry.path())?;
            }
        }

        match self.init() {
            Ok(inner) => {
                *guard = Some(inner);
                Ok(())
            }
            Err(Error::CapacityExceeded) => {
                self.use_tail_cache.store(false, AtomicOrdering::Relaxed);
                match self.init() {
                    Ok(inner) => {
                        *guard = Some(inner);
                        Ok(())
                    }
                    Err(Error::CapacityExceeded) => Err(Error::Io(io::Error::new(
                        io::ErrorKind::OutOfMemory,
                        "split table re-init exceeded capacity twice",
                    ))),
                    Err(err) => Err(err),
                }
            }
            Err(err) => Err(err),
        }
    }

    /// Close every partition and release the lookup pool. Idempotent;
    /// exclusive against all other operations. After close, only reopening
    /// the table is defined.
    pub fn close(&self) {
        let mut guard = self.write_lock();
        Self::shutdown_inner(guard.take());
    }

    fn shutdown_inner(inner: Option<Inner>) {
        let Some(mut inner) = inner else {
            return;
        };
        inner.pool.shutdown(CLOSE_GRACE);
        let registry = inner
            .registry
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        for (name, store) in registry.partitions {
            if let Err(err) = store.close() {
                log::warn!("{name}: close failed: {err}");
            }
        }
    }

    /// Mark every partition file for deletion when its store is dropped.
    pub fn delete_on_exit(&self) {
        let guard = self.read_lock();
        if let Some(inner) = guard.as_ref() {
            for store in Self::snapshot(inner) {
                store.delete_on_exit();
            }
        }
    }
}

fn merge_keys(rowdef: &RowDef, a: &Box<[u8]>, b: &Box<[u8]>) -> Ordering {
    rowdef.compare_keys(a, b)
}

fn merge_rows(rowdef: &RowDef, a: &Row, b: &Row) -> Ordering {
    rowdef.compare_rows(a, b)
}
