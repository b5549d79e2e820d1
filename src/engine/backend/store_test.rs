use tempfile::tempdir;

use crate::engine::backend::BackendStore;
use crate::engine::codec::{composite, row};
use crate::engine::errors::BackendError;
use crate::engine::types::ScalarValue;

fn int_row(v: i64) -> Vec<ScalarValue> {
    vec![ScalarValue::Int64(v)]
}

fn keyed(ref_bytes: &[u8], sort: &[u8], chunk: u32, idx: u32, v: i64) -> (Vec<u8>, Vec<u8>) {
    (
        composite::encode_key(ref_bytes, sort, chunk, idx),
        row::encode_row(&int_row(v)).unwrap(),
    )
}

#[test]
fn open_refuses_an_existing_store() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("store.redb");

    let first = BackendStore::open(&path, 1 << 20).expect("fresh open");
    drop(first);

    match BackendStore::open(&path, 1 << 20) {
        Err(BackendError::AlreadyExists(p)) => assert_eq!(p, path),
        other => panic!("expected AlreadyExists, got {other:?}"),
    }
}

#[test]
fn scan_returns_rows_in_key_order_with_offset_and_limit() {
    let dir = tempdir().unwrap();
    let store = BackendStore::open(&dir.path().join("store.redb"), 1 << 20).unwrap();

    // Insert out of key order; the store scans in key order.
    store
        .put(&[
            keyed(b"q1", b"\x01c", 0, 2, 30),
            keyed(b"q1", b"\x01a", 0, 0, 10),
            keyed(b"q1", b"\x01b", 0, 1, 20),
        ])
        .unwrap();

    let all = store.scan(b"q1", 0, None).unwrap();
    assert_eq!(all, vec![int_row(10), int_row(20), int_row(30)]);

    let paged = store.scan(b"q1", 1, Some(1)).unwrap();
    assert_eq!(paged, vec![int_row(20)]);

    assert!(store.scan(b"q1", 3, Some(10)).unwrap().is_empty());
    assert!(store.scan(b"q1", 0, Some(0)).unwrap().is_empty());
}

#[test]
fn buckets_do_not_leak_into_each_other() {
    let dir = tempdir().unwrap();
    let store = BackendStore::open(&dir.path().join("store.redb"), 1 << 20).unwrap();

    store.put(&[keyed(b"qa", b"\x01x", 0, 0, 1)]).unwrap();
    store.put(&[keyed(b"qaa", b"\x01x", 0, 0, 2)]).unwrap();

    assert_eq!(store.scan(b"qa", 0, None).unwrap(), vec![int_row(1)]);
    assert_eq!(store.scan(b"qaa", 0, None).unwrap(), vec![int_row(2)]);
}

#[test]
fn delete_bucket_removes_only_that_bucket() {
    let dir = tempdir().unwrap();
    let store = BackendStore::open(&dir.path().join("store.redb"), 1 << 20).unwrap();

    store
        .put(&[keyed(b"gone", b"\x01a", 0, 0, 1), keyed(b"gone", b"\x01b", 0, 1, 2)])
        .unwrap();
    store.put(&[keyed(b"kept", b"\x01a", 0, 0, 3)]).unwrap();

    assert_eq!(store.delete_bucket(b"gone").unwrap(), 2);
    assert!(store.scan(b"gone", 0, None).unwrap().is_empty());
    assert_eq!(store.scan(b"kept", 0, None).unwrap(), vec![int_row(3)]);
}

#[test]
fn duplicate_put_overwrites_in_place() {
    let dir = tempdir().unwrap();
    let store = BackendStore::open(&dir.path().join("store.redb"), 1 << 20).unwrap();

    // Same composite key twice, as happens when a failed chunk is
    // retried under the same chunk id.
    store.put(&[keyed(b"q", b"\x01a", 0, 0, 7)]).unwrap();
    store.put(&[keyed(b"q", b"\x01a", 0, 0, 7)]).unwrap();

    assert_eq!(store.scan(b"q", 0, None).unwrap(), vec![int_row(7)]);
}

#[test]
fn destroy_wipes_the_store_files() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("store.redb");

    let store = BackendStore::open(&path, 1 << 20).unwrap();
    drop(store);

    BackendStore::destroy(&path).unwrap();
    assert!(!path.exists());
    // A fresh open succeeds again afterwards.
    BackendStore::open(&path, 1 << 20).unwrap();
}
