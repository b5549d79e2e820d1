/// Bucket-type literal of the query buffer subsystem. Part of the
/// on-disk key envelope; the backend expiry handshake identifies qbuf
/// buckets by this tag.
pub const BUCKET_TAG: &str = "$abuf";

/// Every key of a bucket starts with `"$abuf" 0x00 ref 0x00`. The 0x00
/// separators sort below any ref byte, so buckets never interleave.
pub fn bucket_prefix(ref_bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(BUCKET_TAG.len() + ref_bytes.len() + 2);
    out.extend_from_slice(BUCKET_TAG.as_bytes());
    out.push(0x00);
    out.extend_from_slice(ref_bytes);
    out.push(0x00);
    out
}

/// Full composite storage key: bucket envelope, then the sort key, then
/// `(chunk_id, row_idx)` as deterministic tie-breakers.
pub fn encode_key(ref_bytes: &[u8], sort_key: &[u8], chunk_id: u32, row_idx: u32) -> Vec<u8> {
    let mut key = bucket_prefix(ref_bytes);
    key.reserve(sort_key.len() + 8);
    key.extend_from_slice(sort_key);
    key.extend_from_slice(&chunk_id.to_be_bytes());
    key.extend_from_slice(&row_idx.to_be_bytes());
    key
}

/// Half-open scan bounds covering exactly one bucket. The upper bound
/// bumps the trailing separator to 0x01, which sorts strictly after
/// every key carrying the bucket prefix.
pub fn bucket_range(ref_bytes: &[u8]) -> (Vec<u8>, Vec<u8>) {
    let lower = bucket_prefix(ref_bytes);
    let mut upper = lower.clone();
    if let Some(last) = upper.last_mut() {
        *last = 0x01;
    }
    (lower, upper)
}
