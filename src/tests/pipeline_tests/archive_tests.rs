use std::fs;

use crate::archive::CardArchiver;
use crate::cancel::CancelToken;
use crate::errors::PipelineError;
use crate::tests::utils::{card_markup, temp_store, APARTMENT_JSON_LD};

fn file_names(dir: &std::path::Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn every_card_gets_an_indexed_markup_file() {
    let (_dir, store) = temp_store();
    let cards = vec![
        card_markup("First", None),
        card_markup("Second", Some(APARTMENT_JSON_LD)),
        card_markup("Third", None),
    ];

    let report = CardArchiver::new(store.clone())
        .archive(&cards, &CancelToken::new())
        .unwrap();

    assert_eq!(report.snapshots, 3);
    assert_eq!(report.structured_blocks, 1);
    assert_eq!(report.malformed_blocks, 0);

    let indices: Vec<usize> = store.markup_files().unwrap().into_iter().map(|(i, _)| i).collect();
    assert_eq!(indices, vec![0, 1, 2]);
    for (index, markup) in cards.iter().enumerate() {
        assert_eq!(&fs::read_to_string(store.markup_path(index)).unwrap(), markup);
    }

    let structured: Vec<usize> = store
        .structured_files()
        .unwrap()
        .into_iter()
        .map(|(i, _)| i)
        .collect();
    assert_eq!(structured, vec![1]);
}

#[test]
fn malformed_block_costs_only_the_structured_file() {
    let (_dir, store) = temp_store();
    let cards = vec![
        card_markup("Good", Some(APARTMENT_JSON_LD)),
        card_markup("Broken", Some(r#"{"name": "oops","#)),
        card_markup("Also good", Some(r#"{"@type": "House", "name": "Villa"}"#)),
    ];

    let report = CardArchiver::new(store.clone())
        .archive(&cards, &CancelToken::new())
        .unwrap();

    assert_eq!(report.snapshots, 3);
    assert_eq!(report.structured_blocks, 2);
    assert_eq!(report.malformed_blocks, 1);
    assert!(store.markup_path(1).exists());
    assert!(!store.structured_path(1).exists());

    let saved: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(store.structured_path(2)).unwrap()).unwrap();
    assert_eq!(saved["name"], "Villa");
}

#[test]
fn rerun_replaces_previous_snapshots() {
    let (_dir, store) = temp_store();
    let archiver = CardArchiver::new(store.clone());
    let first: Vec<String> = (0..5)
        .map(|i| card_markup(&format!("Card {i}"), Some(APARTMENT_JSON_LD)))
        .collect();
    archiver.archive(&first, &CancelToken::new()).unwrap();

    let second = vec![card_markup("Only", None), card_markup("Two", None)];
    archiver.archive(&second, &CancelToken::new()).unwrap();

    assert_eq!(store.markup_files().unwrap().len(), 2);
    assert!(store.structured_files().unwrap().is_empty());
}

#[test]
fn no_temp_files_survive_archiving() {
    let (dir, store) = temp_store();
    let cards: Vec<String> = (0..20)
        .map(|i| card_markup(&format!("Card {i}"), Some(APARTMENT_JSON_LD)))
        .collect();

    CardArchiver::new(store)
        .archive(&cards, &CancelToken::new())
        .unwrap();

    let raw = dir.path().join("data").join("raw");
    for sub in ["extracted_html", "extracted_json"] {
        let names = file_names(&raw.join(sub));
        assert_eq!(names.len(), 20);
        assert!(names.iter().all(|n| n.starts_with("card_") && !n.ends_with(".tmp")));
    }
}

#[test]
fn cancelled_archive_keeps_the_previous_snapshots() {
    let (dir, store) = temp_store();
    let archiver = CardArchiver::new(store.clone());
    let first: Vec<String> = (0..5)
        .map(|i| card_markup(&format!("Card {i}"), Some(APARTMENT_JSON_LD)))
        .collect();
    archiver.archive(&first, &CancelToken::new()).unwrap();

    let cancel = CancelToken::new();
    cancel.cancel();
    let second: Vec<String> = (0..3).map(|i| card_markup(&format!("New {i}"), None)).collect();
    let result = archiver.archive(&second, &cancel);

    assert!(matches!(result, Err(PipelineError::Cancelled)));
    assert_eq!(store.markup_files().unwrap().len(), 5);
    assert_eq!(store.structured_files().unwrap().len(), 5);
    assert_eq!(&fs::read_to_string(store.markup_path(4)).unwrap(), &first[4]);

    let raw = file_names(&dir.path().join("data").join("raw"));
    assert_eq!(raw, vec!["extracted_html", "extracted_json"]);
    let names = file_names(&dir.path().join("data").join("raw").join("extracted_html"));
    assert!(names.iter().all(|n| !n.ends_with(".tmp")));
}

#[test]
fn successful_archive_leaves_no_staging_dirs() {
    let (dir, store) = temp_store();
    let archiver = CardArchiver::new(store);
    archiver.archive(&[card_markup("A", None)], &CancelToken::new()).unwrap();
    archiver.archive(&[card_markup("B", None)], &CancelToken::new()).unwrap();

    let raw = file_names(&dir.path().join("data").join("raw"));
    assert_eq!(raw, vec!["extracted_html", "extracted_json"]);
}
