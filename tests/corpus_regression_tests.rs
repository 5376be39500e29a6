//! End-to-end scenarios over realistic PO corpora: import into a store,
//! export back out, and recovery on malformed input.

use std::io::Write;

use indoc::indoc;
use pocodec::{
    Count, ExportOptions, ImportOptions, MemoryPluralFormsCache, MemoryStringStore,
    OverwriteOptions, PluralFormsCache, PoFileReader, PoFileWriter, PoRead, PoStoreReader,
    PoStoreWriter, PoStream, PoWrite, Translation,
};
use tempfile::NamedTempFile;

const DUTCH_PO: &str = indoc! {r#"
    msgid ""
    msgstr ""
    "Project-Id-Version: Example project (1.0)\n"
    "PO-Revision-Date: 2012-02-17 11:24+0100\n"
    "Language-Team: Dutch\n"
    "MIME-Version: 1.0\n"
    "Content-Type: text/plain; charset=utf-8\n"
    "Content-Transfer-Encoding: 8bit\n"
    "Plural-Forms: nplurals=2; plural=(n > 1);\n"

    msgid "home"
    msgstr "thuis"

    msgid "1 day"
    msgid_plural "@count days"
    msgstr[0] "1 dag"
    msgstr[1] "@count dagen"
"#};

fn po_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp file");
    file.write_all(content.as_bytes()).expect("write corpus");
    file
}

#[test]
fn test_basic_catalog_parses_two_entries() {
    let file = po_file(DUTCH_PO);
    let mut reader = PoFileReader::open_path(file.path()).expect("open");

    let first = reader.read_item().expect("read").expect("item");
    assert_eq!(
        first.translation,
        Translation::Singular {
            source: "home".to_string(),
            target: "thuis".to_string(),
        }
    );
    assert!(!first.is_plural());

    let second = reader.read_item().expect("read").expect("item");
    match &second.translation {
        Translation::Plural { sources, targets } => {
            assert_eq!(sources, &["1 day".to_string(), "@count days".to_string()]);
            assert_eq!(targets[&0], "1 dag");
            assert_eq!(targets[&1], "@count dagen");
        }
        other => panic!("expected plural, got {:?}", other),
    }
    assert!(second.is_plural());

    assert!(reader.read_item().expect("read").is_none());
}

#[test]
fn test_file_to_store_to_file_migration() {
    let file = po_file(DUTCH_PO);
    let mut store = MemoryStringStore::new();
    let mut cache = MemoryPluralFormsCache::new();

    // Import the file into the store.
    let mut reader = PoFileReader::open_path(file.path())
        .expect("open")
        .with_langcode("nl");
    {
        let mut writer = PoStoreWriter::new(&mut store).with_langcode("nl");
        let header = reader.header().expect("header").clone();
        writer.set_header(header, &mut cache);
        let moved = writer
            .write_items(&mut reader, Count::Unlimited)
            .expect("import");
        assert_eq!(moved, 2);
        assert_eq!(writer.report().additions, 2);
    }
    assert_eq!(cache.get("nl").expect("cached plural forms").nplurals, 2);

    // Export the store back to a new PO file.
    let out_dir = tempfile::TempDir::new().expect("temp dir");
    let out = out_dir.path().join("export.po");
    let mut store_reader = PoStoreReader::new(&store, "nl").with_options(ExportOptions {
        not_customized: true,
        ..ExportOptions::default()
    });
    let mut file_writer = PoFileWriter::new().with_langcode("nl");
    file_writer.set_uri(out.clone());
    file_writer.set_header(store_reader.header().expect("header").clone());
    file_writer.open().expect("open sink");
    file_writer
        .write_items(&mut store_reader, Count::Unlimited)
        .expect("export");
    file_writer.close().expect("close");

    // The exported file carries the same content.
    let mut check = PoFileReader::open_path(&out).expect("reopen");
    let first = check.read_item().expect("read").expect("item");
    assert_eq!(first.source_text(), "home");
    assert_eq!(first.target_text(), "thuis");
    let second = check.read_item().expect("read").expect("item");
    assert!(second.is_plural());
    match &second.translation {
        Translation::Plural { targets, .. } => {
            assert_eq!(targets[&0], "1 dag");
            assert_eq!(targets[&1], "@count dagen");
        }
        other => panic!("expected plural, got {:?}", other),
    }
    assert!(check.read_item().expect("read").is_none());
    assert!(check.error_log().is_empty());
}

#[test]
fn test_reimport_with_overwrite_updates_everything() {
    let file = po_file(DUTCH_PO);
    let mut store = MemoryStringStore::new();

    for _ in 0..2 {
        let mut reader = PoFileReader::open_path(file.path()).expect("open");
        let mut writer = PoStoreWriter::new(&mut store).with_langcode("nl");
        writer
            .write_items(&mut reader, Count::Unlimited)
            .expect("import");
    }

    let mut reader = PoFileReader::open_path(file.path()).expect("open");
    let mut writer = PoStoreWriter::new(&mut store)
        .with_langcode("nl")
        .with_options(ImportOptions {
            overwrite: OverwriteOptions {
                not_customized: true,
                customized: false,
            },
            ..ImportOptions::default()
        });
    writer
        .write_items(&mut reader, Count::Unlimited)
        .expect("import");
    assert_eq!(writer.report().updates, 2);
    assert_eq!(writer.report().additions, 0);
}

#[test]
fn test_malformed_corpus_recovers_and_reports() {
    let content = indoc! {r#"
        msgid ""
        msgstr ""
        "Plural-Forms: nplurals=2; plural=(n > 1);\n"

        msgid "broken"
        msgstr[bad

        msgid "good"
        msgstr "goed"
    "#};
    let file = po_file(content);
    let mut reader = PoFileReader::open_path(file.path()).expect("open");

    let mut items = Vec::new();
    while let Some(item) = reader.read_item().expect("read") {
        items.push(item);
    }
    // The broken entry is dropped, the well-formed one survives.
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].source_text(), "good");
    assert!(!reader.error_log().is_empty());
    assert!(reader.error_log().iter().all(|e| e.line > 0));
}

#[test]
fn test_crlf_corpus_parses() {
    let content = DUTCH_PO.replace('\n', "\r\n");
    let file = po_file(&content);
    let mut reader = PoFileReader::open_path(file.path()).expect("open");
    assert_eq!(reader.header().expect("header").nplurals(), Some(2));
    let first = reader.read_item().expect("read").expect("item");
    assert_eq!(first.target_text(), "thuis");
}

#[test]
fn test_header_survives_file_roundtrip() {
    let file = po_file(DUTCH_PO);
    let reader = PoFileReader::open_path(file.path()).expect("open");
    let header = reader.header().expect("header");
    assert_eq!(
        header.metadata_value("Project-Id-Version"),
        Some("Example project (1.0)")
    );

    let out_dir = tempfile::TempDir::new().expect("temp dir");
    let out = out_dir.path().join("copy.po");
    let mut writer = PoFileWriter::new();
    writer.set_uri(out.clone());
    writer.set_header(header.clone());
    writer.open().expect("open");
    writer.close().expect("close");

    let copied = PoFileReader::open_path(&out).expect("reopen");
    let copied_header = copied.header().expect("header");
    assert_eq!(
        copied_header.metadata_value("Project-Id-Version"),
        Some("Example project (1.0)")
    );
    assert_eq!(copied_header.nplurals(), Some(2));
}
