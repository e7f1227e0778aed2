use std::fs;
use std::io::Write;

use strata::store::{PartitionStore, RowTable, StoreOptions, FILE_HEADER_LEN};
use strata::{Error, Row, RowDef, SplitTable, SplitTableConfig};
use tempfile::tempdir;

fn rowdef() -> RowDef {
    RowDef::new(8, 4)
}

fn row(key: &[u8; 4], val: &[u8; 4]) -> Row {
    let mut bytes = Vec::with_capacity(8);
    bytes.extend_from_slice(key);
    bytes.extend_from_slice(val);
    Row::from_bytes(bytes)
}

#[test]
fn close_is_idempotent() {
    let dir = tempdir().expect("tempdir");
    let table = SplitTable::open(dir.path(), "t", rowdef(), SplitTableConfig::default())
        .expect("open table");
    table.put(row(b"0001", b"AAAA")).expect("put");

    table.close();
    table.close();
}

#[test]
fn closed_table_returns_defaults_for_reads_and_errors_for_writes() {
    let dir = tempdir().expect("tempdir");
    let table = SplitTable::open(dir.path(), "t", rowdef(), SplitTableConfig::default())
        .expect("open table");
    table.put(row(b"0001", b"AAAA")).expect("put");
    table.close();

    assert!(!table.has(b"0001"));
    assert_eq!(table.get(b"0001", false).expect("get"), None);
    assert_eq!(table.size(), 0);
    assert!(table.is_empty());
    assert_eq!(table.smallest_key(), None);
    assert_eq!(table.remove(b"0001").expect("remove"), None);
    assert!(!table.delete(b"0001").expect("delete"));
    assert!(table.get_all([b"0001"], false).expect("batch").is_empty());
    assert!(matches!(table.put(row(b"0002", b"BBBB")), Err(Error::Closed)));
    assert!(matches!(table.keys(true, None), Err(Error::Closed)));
}

#[test]
fn clear_on_an_empty_directory_leaves_an_openable_table() {
    let dir = tempdir().expect("tempdir");
    let table = SplitTable::open(dir.path(), "t", rowdef(), SplitTableConfig::default())
        .expect("open table");

    table.clear().expect("clear");
    assert!(table.is_empty());
    assert_eq!(table.partition_count(), 0);

    table.put(row(b"0001", b"AAAA")).expect("put after clear");
    assert_eq!(table.size(), 1);
}

#[test]
fn clear_wipes_partitions_and_reinitialises() {
    let dir = tempdir().expect("tempdir");
    let config = SplitTableConfig {
        size_limit: 40,
        buffer_rows: 0,
        ..Default::default()
    };
    let table = SplitTable::open(dir.path(), "t", rowdef(), config).expect("open table");
    table.put(row(b"0001", b"AAAA")).expect("put");
    table.put(row(b"0002", b"BBBB")).expect("put");
    assert_eq!(table.partition_count(), 2);

    // An unrelated file in the same directory survives the wipe.
    fs::write(dir.path().join("unrelated.txt"), b"keep me").expect("write");

    table.clear().expect("clear");
    assert_eq!(table.partition_count(), 0);
    assert!(table.is_empty());
    assert!(!table.has(b"0001"));

    let leftovers: Vec<String> = fs::read_dir(dir.path())
        .expect("read dir")
        .map(|e| e.expect("entry").file_name().into_string().expect("name"))
        .filter(|n| n.starts_with("t"))
        .collect();
    assert!(leftovers.is_empty(), "partitions remain: {leftovers:?}");
    assert!(dir.path().join("unrelated.txt").exists());

    table.put(row(b"0003", b"CCCC")).expect("put after clear");
    assert_eq!(table.size(), 1);
}

#[test]
fn delete_on_exit_removes_partition_files_at_close() {
    let dir = tempdir().expect("tempdir");
    let table = SplitTable::open(dir.path(), "t", rowdef(), SplitTableConfig::default())
        .expect("open table");
    table.put(row(b"0001", b"AAAA")).expect("put");

    table.delete_on_exit();
    table.close();

    let partitions: Vec<String> = fs::read_dir(dir.path())
        .expect("read dir")
        .map(|e| e.expect("entry").file_name().into_string().expect("name"))
        .filter(|n| n.ends_with(".table"))
        .collect();
    assert!(partitions.is_empty(), "partitions remain: {partitions:?}");
}

#[test]
fn capacity_fallback_reopens_an_oversized_tail_cache_partition() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let rowdef = RowDef::new(1024, 16);
    let name = "t.20240129153045123.table";
    let path = dir.path().join(name);

    // One real row, then sparse-grow the file so the predicted tail cache
    // footprint exceeds its budget while staying under the large-table
    // limit. The first open attempt must fail with CapacityExceeded and the
    // fallback (tail cache off) must serve the table.
    {
        let store = RowTable::open(
            &path,
            &rowdef,
            StoreOptions {
                buffer_rows: 0,
                initial_capacity: 0,
                use_tail_cache: false,
                exceed_large_limit: false,
                create_new: true,
            },
        )?;
        let mut bytes = vec![0u8; 1024];
        bytes[..16].copy_from_slice(b"0000000000000001");
        bytes[16..20].copy_from_slice(b"DATA");
        store.put(Row::from_bytes(bytes))?;
        store.close()?;
    }
    let rows = 70_000u64;
    let file = fs::OpenOptions::new().write(true).open(&path)?;
    file.set_len(FILE_HEADER_LEN as u64 + rows * 1024)?;
    drop(file);

    let config = SplitTableConfig {
        use_tail_cache: true,
        buffer_rows: 0,
        ..Default::default()
    };
    let table = SplitTable::open(dir.path(), "t", rowdef, config)?;
    assert_eq!(table.partition_count(), 1);

    let mut probe = vec![0u8; 16];
    probe.copy_from_slice(b"0000000000000001");
    let found = table.get(&probe, false)?.expect("row present");
    assert_eq!(&found.as_bytes()[16..20], b"DATA");
    Ok(())
}

#[test]
fn corrupt_partition_content_surfaces_at_open() {
    let dir = tempdir().expect("tempdir");
    let name = "t.20240129153045123.table";
    let mut file = fs::File::create(dir.path().join(name)).expect("create");
    file.write_all(&[0xFFu8; 64]).expect("write garbage");
    drop(file);

    let err = SplitTable::open(dir.path(), "t", rowdef(), SplitTableConfig::default())
        .expect_err("open must fail");
    assert!(matches!(err, Error::Corrupt(_)));
}
