#![allow(missing_docs)]

use std::fs;
use std::io::Cursor;

use proptest::prelude::*;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tempfile::TempDir;
use wikiroute::cli::import_export::{run_import, ImportConfig};
use wikiroute::primitives::io::{MemorySource, WindowSource};
use wikiroute::storage::ser::{self, ReadOptions, FILE_HEADER_LEN, MAGIC_VERSION};
use wikiroute::storage::{PageRecord, PageStore, ViewSorts, RECORD_HEADER_SIZE};
use wikiroute::{PageId, WikiError};

fn random_pages(seed: u64, count: u32) -> Vec<PageRecord> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..count)
        .map(|id| {
            let mut links: Vec<PageId> = (0..rng.gen_range(0..12))
                .map(|_| PageId(rng.gen_range(0..count * 2)))
                .collect();
            links.sort_unstable();
            links.dedup();
            let title = format!("Page {id:05} {}", "x".repeat(rng.gen_range(0..40)));
            let redirect = links.len() == 1 && rng.gen_bool(0.3);
            PageRecord::encode(PageId(id), &links, &title, redirect).unwrap()
        })
        .collect()
}

fn serialized(pages: &[PageRecord]) -> Vec<u8> {
    let mut out = Vec::new();
    ser::write_pages(&mut out, pages).unwrap();
    out
}

#[test]
fn header_is_little_endian_magic_and_count() {
    let pages = random_pages(1, 3);
    let bytes = serialized(&pages);
    assert_eq!(&bytes[..4], &MAGIC_VERSION.to_le_bytes());
    assert_eq!(&bytes[4..FILE_HEADER_LEN], &3i64.to_le_bytes());
    let body: usize = pages.iter().map(PageRecord::byte_length).sum();
    assert_eq!(bytes.len(), FILE_HEADER_LEN + body);
}

#[test]
fn imported_graphs_reload_without_sorting() {
    let dir = TempDir::new().unwrap();
    // Rows out of title order; ids follow title order.
    let input = dir.path().join("pages.csv");
    fs::write(
        &input,
        "id,title,redirect,links\n3,Turku,false,1\n1,Aalto,false,2|3\n2,Espoo,false,\n",
    )
    .unwrap();
    let output = dir.path().join("pages.wikiroute");
    run_import(&ImportConfig::new(&input, &output)).unwrap();
    for read in [ReadOptions::default(), ReadOptions::default().window_bytes(24)] {
        let store = PageStore::new(ser::open(&output, &read).unwrap()).unwrap();
        assert_eq!(store.sorts_on_load().count(), 0);
    }
    let streamed = PageStore::new(ser::load(fs::File::open(&output).unwrap()).unwrap()).unwrap();
    assert_eq!(streamed.sorts_on_load().count(), 0);

    // Ids unrelated to titles: only the id permutation, which is never stored, needs a sort.
    let input = dir.path().join("shuffled.csv");
    fs::write(
        &input,
        "id,title,redirect,links\n1,Turku,false,\n2,Aalto,false,\n3,Espoo,false,\n",
    )
    .unwrap();
    let output = dir.path().join("shuffled.wikiroute");
    run_import(&ImportConfig::new(&input, &output)).unwrap();
    let store = PageStore::new(ser::open(&output, &ReadOptions::default()).unwrap()).unwrap();
    assert_eq!(store.sorts_on_load(), ViewSorts { title: false, id: true });
}

#[test]
fn negative_link_ids_fail_at_their_record() {
    let pages = vec![
        PageRecord::encode(PageId(1), &[PageId(2)], "First", false).unwrap(),
        PageRecord::encode(PageId(2), &[PageId(1), PageId(3)], "Second", false).unwrap(),
    ];
    let mut bytes = serialized(&pages);
    let start = FILE_HEADER_LEN + pages[0].byte_length();
    let link = start + RECORD_HEADER_SIZE;
    bytes[link..link + 4].copy_from_slice(&(-7i32).to_le_bytes());
    for result in [
        ser::read_from_bytes(bytes.clone()),
        ser::load(Cursor::new(bytes.clone())),
    ] {
        match result {
            Err(WikiError::CorruptRecord { offset, reason }) => {
                assert_eq!(offset, start as u64);
                assert_eq!(reason, "negative link id");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
}

#[test]
fn all_three_readers_agree() {
    let pages = random_pages(7, 500);
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("graph.wikiroute");
    let written = ser::save(&path, &pages).unwrap();
    assert_eq!(written, fs::metadata(&path).unwrap().len());

    let from_memory = ser::read_from_bytes(fs::read(&path).unwrap()).unwrap();
    let from_mmap = ser::open(&path, &ReadOptions::default()).unwrap();
    let from_small_windows = ser::open(&path, &ReadOptions::default().window_bytes(100)).unwrap();
    let from_stream = ser::load(fs::File::open(&path).unwrap()).unwrap();

    assert_eq!(from_memory, pages);
    assert_eq!(from_mmap, pages);
    assert_eq!(from_small_windows, pages);
    assert_eq!(from_stream, pages);
}

#[test]
fn windows_smaller_than_a_record_are_widened() {
    let long = "W".repeat(4_000);
    let pages = vec![
        PageRecord::encode(PageId(1), &[PageId(2)], "short", false).unwrap(),
        PageRecord::encode(PageId(2), &[PageId(1); 1], &long, true).unwrap(),
        PageRecord::encode(PageId(3), &[], "tail", false).unwrap(),
    ];
    let source = MemorySource::new(serialized(&pages));
    for window in [1, RECORD_HEADER_SIZE, 17, 64, 4_000] {
        let decoded =
            ser::read_windowed(&source, &ReadOptions::default().window_bytes(window)).unwrap();
        assert_eq!(decoded, pages, "window {window}");
    }
    assert!(source.len().unwrap() > 4_000);
}

#[test]
fn wrong_magic_fails_before_records() {
    let mut bytes = serialized(&random_pages(2, 4));
    bytes[..4].copy_from_slice(&0x0BAD_F00Di32.to_le_bytes());
    let err = ser::read_from_bytes(bytes.clone()).unwrap_err();
    assert!(matches!(
        err,
        WikiError::InvalidVersion {
            expected: MAGIC_VERSION,
            found: 0x0BAD_F00D
        }
    ));
    let err = ser::load(Cursor::new(bytes)).unwrap_err();
    assert!(matches!(err, WikiError::InvalidVersion { .. }));
}

#[test]
fn truncated_files_fail_closed() {
    let pages = random_pages(3, 20);
    let bytes = serialized(&pages);
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cut.wikiroute");
    fs::write(&path, &bytes[..bytes.len() - 3]).unwrap();

    let err = ser::open(&path, &ReadOptions::default().window_bytes(64)).unwrap_err();
    assert!(matches!(err, WikiError::TruncatedStream { expected: 20, .. }));
    let err = ser::load(fs::File::open(&path).unwrap()).unwrap_err();
    assert!(matches!(err, WikiError::TruncatedStream { expected: 20, found: 19 }));
}

#[test]
fn corrupt_offsets_are_reported_at_their_file_position() {
    let pages = random_pages(4, 3);
    let mut bytes = serialized(&pages);
    let second = FILE_HEADER_LEN + pages[0].byte_length();
    // links_offset of the second record.
    bytes[second + 6..second + 10].copy_from_slice(&99i32.to_le_bytes());
    let err = ser::read_from_bytes(bytes).unwrap_err();
    match err {
        WikiError::CorruptRecord { offset, .. } => assert_eq!(offset, second as u64),
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn empty_file_header_is_rejected() {
    assert!(matches!(
        ser::read_from_bytes(Vec::new()),
        Err(WikiError::CorruptRecord { offset: 0, .. })
    ));
    assert!(ser::read_from_bytes(serialized(&[])).unwrap().is_empty());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn window_size_never_changes_the_result(seed in any::<u64>(), window in 1usize..512) {
        let pages = random_pages(seed, 40);
        let source = MemorySource::new(serialized(&pages));
        let decoded = ser::read_windowed(&source, &ReadOptions::default().window_bytes(window)).unwrap();
        prop_assert_eq!(decoded, pages);
    }
}
