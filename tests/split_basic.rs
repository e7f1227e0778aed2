use strata::{Row, RowDef, SplitTable, SplitTableConfig};
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
fn first_put_creates_one_partition() {
    let dir = tempdir().expect("tempdir");
    let table = SplitTable::open(dir.path(), "t", rowdef(), SplitTableConfig::default())
        .expect("open table");

    assert!(table.is_empty());
    assert_eq!(table.partition_count(), 0);

    assert!(table.put(row(b"0001", b"AAAA")).expect("put"));
    assert_eq!(table.get(b"0001", false).expect("get"), Some(row(b"0001", b"AAAA")));
    assert_eq!(table.partition_count(), 1);
    assert_eq!(table.size(), 1);
}

#[test]
fn second_put_updates_in_place() {
    let dir = tempdir().expect("tempdir");
    let table = SplitTable::open(dir.path(), "t", rowdef(), SplitTableConfig::default())
        .expect("open table");

    assert!(table.put(row(b"0001", b"AAAA")).expect("put a"));
    assert!(!table.put(row(b"0001", b"BBBB")).expect("put b"));
    assert_eq!(table.get(b"0001", false).expect("get"), Some(row(b"0001", b"BBBB")));
    assert_eq!(table.partition_count(), 1);
    assert_eq!(table.size(), 1);
}

#[test]
fn replace_is_idempotent_and_reports_previous() {
    let dir = tempdir().expect("tempdir");
    let table = SplitTable::open(dir.path(), "t", rowdef(), SplitTableConfig::default())
        .expect("open table");

    assert_eq!(table.replace(row(b"0001", b"AAAA")).expect("first"), None);
    assert_eq!(
        table.replace(row(b"0001", b"BBBB")).expect("second"),
        Some(row(b"0001", b"AAAA"))
    );
    // Replacing with the same row again returns that row and changes nothing.
    assert_eq!(
        table.replace(row(b"0001", b"BBBB")).expect("third"),
        Some(row(b"0001", b"BBBB"))
    );
    assert_eq!(table.size(), 1);
    assert_eq!(table.get(b"0001", false).expect("get"), Some(row(b"0001", b"BBBB")));
}

#[test]
fn delete_and_remove() {
    let dir = tempdir().expect("tempdir");
    let table = SplitTable::open(dir.path(), "t", rowdef(), SplitTableConfig::default())
        .expect("open table");

    table.put(row(b"0001", b"AAAA")).expect("put");
    table.put(row(b"0002", b"BBBB")).expect("put");

    assert!(table.delete(b"0001").expect("delete"));
    assert!(!table.delete(b"0001").expect("delete again"));
    assert!(!table.has(b"0001"));

    assert_eq!(table.remove(b"0002").expect("remove"), Some(row(b"0002", b"BBBB")));
    assert_eq!(table.remove(b"0002").expect("remove again"), None);
    assert!(table.is_empty());
}

#[test]
fn add_unique_skips_the_probe_but_lands_in_the_active_partition() {
    let dir = tempdir().expect("tempdir");
    let table = SplitTable::open(dir.path(), "t", rowdef(), SplitTableConfig::default())
        .expect("open table");

    table.add_unique(row(b"0001", b"AAAA")).expect("add");
    table.add_unique(row(b"0002", b"BBBB")).expect("add");
    assert_eq!(table.size(), 2);
    assert_eq!(table.get(b"0002", false).expect("get"), Some(row(b"0002", b"BBBB")));
}

#[test]
fn extremum_keys_span_partitions() {
    let dir = tempdir().expect("tempdir");
    let config = SplitTableConfig {
        size_limit: 48, // header + two rows
        buffer_rows: 0,
        ..Default::default()
    };
    let table = SplitTable::open(dir.path(), "t", rowdef(), config).expect("open table");

    for k in [b"0005", b"0001", b"0009", b"0003"] {
        table.put(row(k, b"VVVV")).expect("put");
    }
    assert!(table.partition_count() >= 2);
    assert_eq!(table.smallest_key().as_deref(), Some(b"0001".as_slice()));
    assert_eq!(table.largest_key().as_deref(), Some(b"0009".as_slice()));
}

#[test]
fn batch_get_returns_present_keys_in_key_order() {
    let dir = tempdir().expect("tempdir");
    let config = SplitTableConfig {
        size_limit: 48,
        buffer_rows: 0,
        ..Default::default()
    };
    let table = SplitTable::open(dir.path(), "t", rowdef(), config).expect("open table");

    for k in [b"0004", b"0001", b"0003"] {
        table.put(row(k, b"VVVV")).expect("put");
    }

    let found = table
        .get_all([b"0003", b"0009", b"0001"], false)
        .expect("batch get");
    let keys: Vec<&[u8]> = found.keys().map(|k| k.as_bytes()).collect();
    assert_eq!(keys, vec![b"0001".as_slice(), b"0003"]);
    assert_eq!(found.values().next(), Some(&row(b"0001", b"VVVV")));
}

#[test]
fn remove_one_and_top_use_the_largest_partition() {
    let dir = tempdir().expect("tempdir");
    let table = SplitTable::open(dir.path(), "t", rowdef(), SplitTableConfig::default())
        .expect("open table");

    assert_eq!(table.remove_one().expect("empty"), None);
    assert!(table.top(3).expect("empty").is_empty());

    for k in [b"0001", b"0002", b"0003"] {
        table.put(row(k, b"VVVV")).expect("put");
    }
    let top = table.top(2).expect("top");
    assert_eq!(top, vec![row(b"0003", b"VVVV"), row(b"0002", b"VVVV")]);

    assert_eq!(table.remove_one().expect("remove one"), Some(row(b"0003", b"VVVV")));
    assert_eq!(table.size(), 2);
}

#[test]
fn rows_survive_reopen() {
    let dir = tempdir().expect("tempdir");
    {
        let table = SplitTable::open(dir.path(), "t", rowdef(), SplitTableConfig::default())
            .expect("open table");
        table.put(row(b"0001", b"AAAA")).expect("put");
        table.put(row(b"0002", b"BBBB")).expect("put");
        table.close();
    }

    let table = SplitTable::open(dir.path(), "t", rowdef(), SplitTableConfig::default())
        .expect("reopen table");
    assert_eq!(table.size(), 2);
    assert_eq!(table.get(b"0001", false).expect("get"), Some(row(b"0001", b"AAAA")));
    assert_eq!(table.get(b"0002", true).expect("get"), Some(row(b"0002", b"BBBB")));
}

#[test]
fn remove_doubles_is_empty_on_a_healthy_table() {
    let dir = tempdir().expect("tempdir");
    let table = SplitTable::open(dir.path(), "t", rowdef(), SplitTableConfig::default())
        .expect("open table");
    table.put(row(b"0001", b"AAAA")).expect("put");
    assert!(table.remove_doubles().expect("doubles").is_empty());
}

#[test]
fn write_buffer_is_reported_until_flush() {
    let dir = tempdir().expect("tempdir");
    let config = SplitTableConfig {
        buffer_rows: 8,
        ..Default::default()
    };
    let table = SplitTable::open(dir.path(), "t", rowdef(), config).expect("open table");

    table.put(row(b"0001", b"AAAA")).expect("put");
    table.put(row(b"0002", b"BBBB")).expect("put");
    assert_eq!(table.write_buffer_size(), 16);
    assert!(table.mem() > 0);
}
