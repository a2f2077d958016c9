use std::io::Write;

use accatalog::{Catalog, CatalogError};

fn write_manifest(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_manifest_from_disk() {
    let file = write_manifest(
        r#"[
            {
                "title": "The Adventures of Sherlock Holmes",
                "author": "Arthur Conan Doyle",
                "cover_image_ref": "covers/holmes.png",
                "audio_ref": "audio/holmes_01.mp3",
                "summary": "Twelve short stories.",
                "duration_hint_ms": 600000
            },
            {
                "title": "Dracula",
                "author": "Bram Stoker",
                "cover_image_ref": "covers/dracula.png",
                "audio_ref": "audio/dracula_01.mp3",
                "summary": "An epistolary novel."
            }
        ]"#,
    );

    let catalog = Catalog::from_path(file.path()).unwrap();
    assert_eq!(catalog.len(), 2);

    let holmes = catalog.get(0).unwrap();
    assert_eq!(holmes.audio_ref, "audio/holmes_01.mp3");
    assert_eq!(holmes.duration_hint_ms, Some(600000));

    let dracula = catalog.get(1).unwrap();
    assert_eq!(dracula.cover_image_ref, "covers/dracula.png");
    assert_eq!(dracula.duration_hint_ms, None);
}

#[test]
fn test_load_falls_back_to_embedded() {
    let catalog = Catalog::load(None).unwrap();
    assert_eq!(catalog, Catalog::embedded().unwrap());
}

#[test]
fn test_missing_manifest_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.json");

    match Catalog::from_path(&missing) {
        Err(CatalogError::Io { path, .. }) => assert_eq!(path, missing),
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn test_malformed_manifest_is_parse_error() {
    let file = write_manifest(r#"[{ "title": "Dracula" }]"#);
    assert!(matches!(
        Catalog::from_path(file.path()),
        Err(CatalogError::Parse(_))
    ));
}

#[test]
fn test_manifest_order_is_preserved() {
    let file = write_manifest(
        r#"[
            {"title": "C", "author": "", "cover_image_ref": "", "audio_ref": "c", "summary": ""},
            {"title": "A", "author": "", "cover_image_ref": "", "audio_ref": "a", "summary": ""},
            {"title": "B", "author": "", "cover_image_ref": "", "audio_ref": "b", "summary": ""}
        ]"#,
    );

    let catalog = Catalog::from_path(file.path()).unwrap();
    let titles: Vec<&str> = catalog.iter().map(|item| item.title.as_str()).collect();
    assert_eq!(titles, vec!["C", "A", "B"]);
}
