//! Resumability: a cursor captured after k entries, restored into a fresh
//! reader, must yield exactly the entries an uninterrupted read would have
//! yielded.

use std::io::Write;

use indoc::indoc;
use pocodec::{BatchState, Count, PoFileReader, PoFileWriter, PoItem, PoRead, PoStream, PoWrite};
use tempfile::NamedTempFile;

const CORPUS: &str = indoc! {r#"
    msgid ""
    msgstr ""
    "Project-Id-Version: resume corpus\n"
    "Content-Type: text/plain; charset=utf-8\n"
    "Plural-Forms: nplurals=2; plural=(n > 1);\n"

    # First entry.
    msgid "home"
    msgstr "thuis"

    msgctxt "Month name"
    msgid "May"
    msgstr "mei"

    msgid "1 day"
    msgid_plural "@count days"
    msgstr[0] "1 dag"
    msgstr[1] "@count dagen"

    msgid ""
    "Hello "
    "world"
    msgstr ""
    "Hallo "
    "wereld"

    msgid "bye"
    msgstr "doei"
"#};

/// Same corpus without blank separator lines: entries are closed out by the
/// next token instead, which forces the parser to hold lookahead.
const DENSE_CORPUS: &str = indoc! {r#"
    msgid ""
    msgstr ""
    "Plural-Forms: nplurals=2; plural=(n > 1);\n"
    msgid "one"
    msgstr "1"
    msgid "two"
    msgstr "2"
    msgid "three"
    msgstr "3"
    msgid "four"
    msgstr "4"
"#};

fn corpus_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp file");
    file.write_all(content.as_bytes()).expect("write corpus");
    file
}

fn read_all(reader: &mut PoFileReader) -> Vec<PoItem> {
    let mut items = Vec::new();
    while let Some(item) = reader.read_item().expect("read item") {
        items.push(item);
    }
    items
}

fn assert_split_resumes(content: &str) {
    let file = corpus_file(content);
    let mut reader = PoFileReader::open_path(file.path()).expect("open");
    let expected = read_all(&mut reader);
    assert!(!expected.is_empty());

    for split_at in 0..=expected.len() {
        let mut reader = PoFileReader::open_path(file.path()).expect("open");
        for i in 0..split_at {
            let item = reader.read_item().expect("read").expect("item");
            assert_eq!(item, expected[i], "prefix diverged at {i}");
        }
        let blob = reader.save_state_blob().expect("save state");

        let mut resumed = PoFileReader::new();
        resumed.restore_state_blob(&blob).expect("restore state");
        let rest = read_all(&mut resumed);
        assert_eq!(
            rest,
            expected[split_at..],
            "resume after {split_at} items diverged"
        );
    }
}

#[test]
fn test_resume_at_every_entry_boundary() {
    assert_split_resumes(CORPUS);
}

#[test]
fn test_resume_at_every_entry_boundary_without_blank_lines() {
    assert_split_resumes(DENSE_CORPUS);
}

#[test]
fn test_restored_reader_rederives_header() {
    let file = corpus_file(CORPUS);
    let mut reader = PoFileReader::open_path(file.path()).expect("open");
    reader.read_item().expect("read").expect("item");
    let blob = reader.save_state_blob().expect("save state");

    let mut resumed = PoFileReader::new();
    resumed.restore_state_blob(&blob).expect("restore state");
    // The header comes from re-parsing the resource, not from the blob.
    assert_eq!(resumed.header().expect("header").nplurals(), Some(2));
}

#[test]
fn test_state_blob_is_versioned_json() {
    let file = corpus_file(CORPUS);
    let mut reader = PoFileReader::open_path(file.path()).expect("open");
    let blob = reader.save_state_blob().expect("save state");
    let value: serde_json::Value = serde_json::from_str(&blob).expect("valid JSON");
    assert_eq!(value["version"], 1);
    assert!(value["uri"].is_string());
}

#[test]
fn test_garbage_blob_is_resumption_error() {
    let mut reader = PoFileReader::new();
    let result = reader.restore_state_blob("{\"what\": \"ever\"}");
    assert!(matches!(result, Err(pocodec::Error::Resumption(_))));
}

#[test]
fn test_interrupted_pump_resumes_both_ends() {
    let source = corpus_file(CORPUS);
    let sink_dir = tempfile::TempDir::new().expect("temp dir");
    let sink = sink_dir.path().join("sink.po");

    // First invocation: move two entries, externalize both cursors.
    let (reader_blob, writer_blob) = {
        let mut reader = PoFileReader::open_path(source.path()).expect("open reader");
        let mut writer = PoFileWriter::open_path(&sink).expect("open writer");
        let moved = writer
            .write_items(&mut reader, Count::Limit(2))
            .expect("pump");
        assert_eq!(moved, 2);
        (
            reader.save_state_blob().expect("reader state"),
            writer.save_state_blob().expect("writer state"),
        )
    };

    // Second invocation: fresh components, restored cursors, finish up.
    let mut reader = PoFileReader::new();
    reader.restore_state_blob(&reader_blob).expect("restore reader");
    let mut writer = PoFileWriter::new();
    writer.restore_state_blob(&writer_blob).expect("restore writer");
    writer
        .write_items(&mut reader, Count::Unlimited)
        .expect("pump rest");
    writer.close().expect("close");

    // The sink now holds every entry exactly once.
    let mut original = PoFileReader::open_path(source.path()).expect("reopen source");
    let expected = read_all(&mut original);
    let mut copied = PoFileReader::open_path(&sink).expect("open sink");
    let actual = read_all(&mut copied);
    assert_eq!(actual.len(), expected.len());
    for (expected, actual) in expected.iter().zip(actual.iter()) {
        assert_eq!(expected.context, actual.context);
        assert_eq!(expected.translation, actual.translation);
    }
}
