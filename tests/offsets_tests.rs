//! Tests for the offset table
//!
//! These tests verify:
//! - Prefix sum over ascending bucket counts, including gaps
//! - Range and sequencing violations
//! - Persistence: big-endian i32 layout, length inference, validation
//! - Reading counting-pass output in partition order

use std::fs;
use std::path::PathBuf;

use denseid::offsets::{build_offsets, read_bucket_counts, BucketCount};
use denseid::record::RecordWriter;
use denseid::{NumberError, OffsetTable};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn counts(pairs: &[(u32, u64)]) -> Vec<BucketCount> {
    pairs.iter().map(|&(b, c)| BucketCount::new(b, c)).collect()
}

fn setup_temp_dir() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().to_path_buf();
    (temp_dir, path)
}

// =============================================================================
// Builder Tests
// =============================================================================

#[test]
fn test_reference_scenario() {
    // Buckets [0,0,1,3,3,3] with B = 4
    let table = build_offsets(4, counts(&[(0, 2), (1, 1), (3, 3)])).unwrap();

    assert_eq!(table.as_slice(), &[0, 2, 3, 3, 6]);
    assert_eq!(table.bucket_count(), 4);
    assert_eq!(table.total(), 6);
    assert_eq!(table.range(0), Some((0, 2)));
    assert_eq!(table.range(1), Some((2, 3)));
    assert_eq!(table.range(2), Some((3, 3)));
    assert_eq!(table.range(3), Some((3, 6)));
    assert_eq!(table.range(4), None);
    assert_eq!(table.nonempty_buckets(), 3);
}

#[test]
fn test_no_counts_all_zero() {
    let table = build_offsets(8, Vec::new()).unwrap();

    assert_eq!(table.as_slice(), &[0; 9]);
    assert_eq!(table.total(), 0);
    assert_eq!(table.nonempty_buckets(), 0);
}

#[test]
fn test_leading_and_trailing_gaps() {
    let table = build_offsets(6, counts(&[(2, 5), (3, 1)])).unwrap();

    assert_eq!(table.as_slice(), &[0, 0, 0, 5, 6, 6, 6]);
}

#[test]
fn test_single_bucket() {
    let table = build_offsets(1, counts(&[(0, 42)])).unwrap();

    assert_eq!(table.as_slice(), &[0, 42]);
}

#[test]
fn test_monotone_and_dense() {
    let input: Vec<(u32, u64)> = (0..1024u32)
        .filter(|b| b % 3 != 0)
        .map(|b| (b, (b as u64 * 7) % 13 + 1))
        .collect();
    let table = build_offsets(1024, counts(&input)).unwrap();

    let offsets = table.as_slice();
    assert_eq!(offsets.len(), 1025);
    assert_eq!(offsets[0], 0);
    assert!(offsets.windows(2).all(|w| w[0] <= w[1]));

    for &(b, c) in &input {
        assert_eq!(table.count(b), c);
    }
    assert_eq!(table.count(0), 0);
    assert_eq!(table.total(), input.iter().map(|&(_, c)| c).sum::<u64>());
}

#[test]
fn test_out_of_range_bucket() {
    let result = build_offsets(4, counts(&[(0, 1), (4, 1)]));

    assert!(matches!(
        result,
        Err(NumberError::Range {
            bucket: 4,
            bucket_count: 4
        })
    ));
}

#[test]
fn test_repeated_bucket() {
    let result = build_offsets(4, counts(&[(1, 1), (1, 1)]));

    assert!(matches!(
        result,
        Err(NumberError::Sequencing {
            previous: 1,
            bucket: 1
        })
    ));
}

#[test]
fn test_descending_bucket() {
    let result = build_offsets(4, counts(&[(0, 1), (3, 1), (2, 1)]));

    assert!(matches!(
        result,
        Err(NumberError::Sequencing {
            previous: 3,
            bucket: 2
        })
    ));
}

#[test]
fn test_deterministic() {
    let input = counts(&[(0, 3), (5, 9), (6, 1)]);

    let a = build_offsets(16, input.clone()).unwrap();
    let b = build_offsets(16, input).unwrap();
    assert_eq!(a, b);
}

// =============================================================================
// Encoding Tests
// =============================================================================

#[test]
fn test_encode_big_endian() {
    let table = build_offsets(2, counts(&[(0, 1), (1, 258)])).unwrap();

    assert_eq!(
        table.encode().unwrap(),
        vec![0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 1, 3]
    );
}

#[test]
fn test_decode_infers_bucket_count() {
    let bytes: Vec<u8> = [0i32, 2, 3, 3, 6]
        .iter()
        .flat_map(|v| v.to_be_bytes())
        .collect();

    let table = OffsetTable::decode(&bytes).unwrap();
    assert_eq!(table.bucket_count(), 4);
    assert_eq!(table.as_slice(), &[0, 2, 3, 3, 6]);
}

#[test]
fn test_decode_rejects_bad_length() {
    assert!(matches!(
        OffsetTable::decode(&[0, 0, 0, 0, 0]),
        Err(NumberError::Corruption(_))
    ));
    // A single entry describes zero buckets
    assert!(matches!(
        OffsetTable::decode(&[0, 0, 0, 0]),
        Err(NumberError::Corruption(_))
    ));
}

#[test]
fn test_decode_rejects_invalid_tables() {
    let encode = |values: &[i32]| -> Vec<u8> {
        values.iter().flat_map(|v| v.to_be_bytes()).collect()
    };

    // Nonzero start
    assert!(OffsetTable::decode(&encode(&[1, 2])).is_err());
    // Decreasing
    assert!(OffsetTable::decode(&encode(&[0, 5, 4])).is_err());
    // Negative
    assert!(OffsetTable::decode(&encode(&[0, -1])).is_err());
}

#[test]
fn test_encode_rejects_overflow() {
    let table = build_offsets(2, counts(&[(0, i32::MAX as u64), (1, 1)])).unwrap();

    assert!(matches!(table.encode(), Err(NumberError::Overflow(_))));
}

// =============================================================================
// File Tests
// =============================================================================

#[test]
fn test_write_and_read_file() {
    let (_temp, dir) = setup_temp_dir();
    let path = dir.join("number.stage2");

    let table = build_offsets(4, counts(&[(0, 2), (1, 1), (3, 3)])).unwrap();
    table.write_to(&path).unwrap();

    assert_eq!(fs::metadata(&path).unwrap().len(), 5 * 4);
    assert_eq!(OffsetTable::read_from(&path).unwrap(), table);

    // No temporary sibling left behind
    let leftovers: Vec<_> = fs::read_dir(&dir).unwrap().collect();
    assert_eq!(leftovers.len(), 1);
}

#[test]
fn test_write_replaces_existing() {
    let (_temp, dir) = setup_temp_dir();
    let path = dir.join("table");

    build_offsets(2, counts(&[(0, 9)])).unwrap().write_to(&path).unwrap();
    let table = build_offsets(4, counts(&[(3, 1)])).unwrap();
    table.write_to(&path).unwrap();

    assert_eq!(OffsetTable::read_from(&path).unwrap(), table);
}

#[test]
fn test_read_missing_file() {
    let (_temp, dir) = setup_temp_dir();

    assert!(matches!(
        OffsetTable::read_from(&dir.join("missing")),
        Err(NumberError::Io(_))
    ));
}

// =============================================================================
// Counting Output Tests
// =============================================================================

fn write_count_part(dir: &std::path::Path, index: usize, pairs: &[(u32, u64)]) {
    let mut writer = RecordWriter::create(&dir.join(format!("part-{:05}", index))).unwrap();
    for &(b, c) in pairs {
        writer
            .append(&BucketCount::encode_key(b), &BucketCount::encode_value(c))
            .unwrap();
    }
    writer.finish().unwrap();
}

#[test]
fn test_read_bucket_counts_partition_order() {
    let (_temp, dir) = setup_temp_dir();

    write_count_part(&dir, 10, &[(900, 4)]);
    write_count_part(&dir, 2, &[(200, 1), (201, 2)]);
    write_count_part(&dir, 0, &[]);
    fs::write(dir.join("_SUCCESS"), b"").unwrap();

    let read = read_bucket_counts(&dir).unwrap();
    assert_eq!(read, counts(&[(200, 1), (201, 2), (900, 4)]));

    let table = build_offsets(1024, read).unwrap();
    assert_eq!(table.total(), 7);
    assert_eq!(table.range(900), Some((3, 7)));
}

#[test]
fn test_read_bucket_counts_bad_width() {
    let (_temp, dir) = setup_temp_dir();

    let mut writer = RecordWriter::create(&dir.join("part-00000")).unwrap();
    writer.append(&[0, 1], &[0; 8]).unwrap();
    writer.finish().unwrap();

    assert!(matches!(
        read_bucket_counts(&dir),
        Err(NumberError::Corruption(_))
    ));
}
