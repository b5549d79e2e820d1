use std::sync::Arc;
use std::time::Duration;

use tempfile::tempdir;

use crate::engine::backend::BackendStore;
use crate::engine::qbuf::buffer::{QBuf, QBufData, QBufStatus};
use crate::engine::qbuf::types::QBufRef;
use crate::engine::schema::{OrderByColumn, QuerySchema};
use crate::engine::types::ScalarValue;
use crate::test_helpers::factories::{QuerySpecFactory, RowFactory};

fn int_qbuf(chunks_need: u32) -> QBuf {
    let spec = QuerySpecFactory::new("t")
        .with_columns(&[("x", "Integer")])
        .with_order_by(vec![OrderByColumn::asc("x")])
        .with_chunks(chunks_need)
        .create();
    let schema = QuerySchema::resolve(&spec).unwrap();
    QBuf::new(QBufRef::generate(), spec, schema, Duration::from_secs(60))
}

fn staged_ints(qbuf: &QBuf) -> Vec<i64> {
    match &qbuf.data {
        QBufData::Staging(staged) => staged
            .iter()
            .map(|(_, row)| match row[0] {
                ScalarValue::Int64(v) => v,
                _ => panic!("expected ints"),
            })
            .collect(),
        other => panic!("expected staging data, got {other:?}"),
    }
}

#[test]
fn staging_keeps_global_key_order_across_chunks() {
    let mut qbuf = int_qbuf(2);

    let keyed = qbuf.build_keyed(0, RowFactory::ints(&[3, 1, 4]));
    qbuf.stage_chunk(keyed);
    let keyed = qbuf.build_keyed(1, RowFactory::ints(&[1, 5, 9]));
    qbuf.stage_chunk(keyed);

    assert_eq!(staged_ints(&qbuf), vec![1, 1, 3, 4, 5, 9]);
}

#[test]
fn finish_collecting_strips_keys_and_preserves_order() {
    let mut qbuf = int_qbuf(1);
    let keyed = qbuf.build_keyed(0, RowFactory::ints(&[2, 0, 1]));
    qbuf.stage_chunk(keyed);

    qbuf.finish_collecting();

    assert_eq!(qbuf.status, QBufStatus::ServingFetches);
    match &qbuf.data {
        QBufData::Resident(rows) => {
            assert_eq!(
                rows,
                &vec![
                    vec![ScalarValue::Int64(0)],
                    vec![ScalarValue::Int64(1)],
                    vec![ScalarValue::Int64(2)],
                ]
            );
        }
        other => panic!("expected resident rows, got {other:?}"),
    }
}

#[test]
fn zero_chunk_buffer_is_born_serving() {
    let qbuf = int_qbuf(0);
    assert_eq!(qbuf.status, QBufStatus::ServingFetches);
    assert!(qbuf.page(0, None).unwrap().is_empty());
}

#[test]
fn resident_paging_clamps_offset_and_limit() {
    let mut qbuf = int_qbuf(1);
    let keyed = qbuf.build_keyed(0, RowFactory::ints(&[0, 1, 2, 3, 4]));
    qbuf.stage_chunk(keyed);
    qbuf.finish_collecting();

    assert_eq!(qbuf.page(0, None).unwrap().len(), 5);
    assert_eq!(qbuf.page(3, Some(10)).unwrap(), RowFactory::ints(&[3, 4]));
    assert!(qbuf.page(5, Some(1)).unwrap().is_empty());
    assert!(qbuf.page(99, None).unwrap().is_empty());
}

#[test]
fn spill_flushes_staged_rows_with_the_new_chunk() {
    let dir = tempdir().unwrap();
    let backend =
        Arc::new(BackendStore::open(&dir.path().join("store.redb"), 1 << 20).unwrap());

    let mut qbuf = int_qbuf(2);
    let keyed = qbuf.build_keyed(0, RowFactory::ints(&[7, 3]));
    qbuf.stage_chunk(keyed);

    let keyed = qbuf.build_keyed(1, RowFactory::ints(&[5, 1]));
    qbuf.spill_chunk(&backend, &keyed).unwrap();

    assert!(qbuf.is_spilled());
    // Both the staged chunk and the spilling chunk are on disk, merged.
    assert_eq!(
        qbuf.page(0, None).unwrap(),
        RowFactory::ints(&[1, 3, 5, 7])
    );
}

#[test]
fn build_keyed_breaks_ties_by_chunk_then_row_index() {
    let qbuf = int_qbuf(2);

    let chunk0 = qbuf.build_keyed(0, RowFactory::ints(&[5, 5]));
    let chunk1 = qbuf.build_keyed(1, RowFactory::ints(&[5]));

    assert!(chunk0[0].0 < chunk0[1].0, "row index orders within a chunk");
    assert!(chunk0[1].0 < chunk1[0].0, "chunk id orders across chunks");
}

#[test]
fn ready_notifier_fires_once_on_completion() {
    let mut qbuf = int_qbuf(1);
    let (tx, mut rx) = tokio::sync::oneshot::channel();
    qbuf.ready_notifier = Some(tx);

    let keyed = qbuf.build_keyed(0, RowFactory::ints(&[1]));
    qbuf.stage_chunk(keyed);
    qbuf.finish_collecting();

    assert_eq!(rx.try_recv().unwrap(), qbuf.qref);
    assert!(qbuf.ready_notifier.is_none());
}
