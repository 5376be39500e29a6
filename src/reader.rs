//! Streaming PO file reader.
//!
//! A line-oriented state machine tokenizing a PO byte stream into
//! [`PoItem`]s, one [`PoFileReader::read_item`] call at a time. Syntax
//! problems are logged with their line number and parsing continues on the
//! next line; only resource-level failures abort a read.
//!
//! The reader carries a resumable cursor: [`BatchState::save_state`]
//! captures the byte offset of the next unread entry straight from the live
//! stream, and a fresh reader restored from that state yields exactly the
//! items an uninterrupted read would have yielded.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, SyntaxError};
use crate::header::{InvalidPluralForms, PoHeader};
use crate::quote::parse_quoted;
use crate::traits::{BatchState, PoRead, PoStream};
use crate::types::{PoItem, Translation};

const STATE_VERSION: u32 = 1;

/// Resumable cursor of a [`PoFileReader`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileReaderState {
    pub version: u32,
    pub uri: PathBuf,
    pub seek_pos: u64,
    pub line_no: u64,
    pub langcode: Option<String>,
}

/// Parser context: which token the state machine is currently inside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseContext {
    Comment,
    Msgctxt,
    Msgid,
    MsgidPlural,
    Msgstr,
    MsgstrArr,
}

/// Fields collected for the entry being parsed.
#[derive(Debug, Default)]
struct Pending {
    comments: Vec<String>,
    msgctxt: Option<String>,
    msgid: Vec<String>,
    msgstr: Option<String>,
    msgstr_arr: BTreeMap<usize, String>,
}

impl Pending {
    fn is_empty(&self) -> bool {
        self.comments.is_empty()
            && self.msgctxt.is_none()
            && self.msgid.is_empty()
            && self.msgstr.is_none()
            && self.msgstr_arr.is_empty()
    }
}

pub struct PoFileReader {
    uri: Option<PathBuf>,
    langcode: Option<String>,
    on_invalid_plural_forms: InvalidPluralForms,

    file: Option<BufReader<File>>,
    line_no: u64,
    context: ParseContext,
    current: Pending,
    plural_index: usize,
    finished: bool,

    item: Option<PoItem>,
    pending_item: Option<PoItem>,
    header: Option<PoHeader>,
    errors: Vec<SyntaxError>,

    // Start of the first entry not yet returned, derived from live stream
    // positions. save_state falls back to this when the parser is holding
    // lookahead for the next entry.
    entry_start_pos: u64,
    entry_start_line: u64,
    // Start of the logical line currently being processed.
    line_start_pos: u64,
    line_start_line: u64,
}

impl PoFileReader {
    pub fn new() -> Self {
        PoFileReader {
            uri: None,
            langcode: None,
            on_invalid_plural_forms: InvalidPluralForms::default(),
            file: None,
            line_no: 0,
            context: ParseContext::Comment,
            current: Pending::default(),
            plural_index: 0,
            finished: false,
            item: None,
            pending_item: None,
            header: None,
            errors: Vec::new(),
            entry_start_pos: 0,
            entry_start_line: 0,
            line_start_pos: 0,
            line_start_line: 0,
        }
    }

    /// Convenience constructor: sets the URI and opens the stream, which
    /// also consumes the header entry.
    pub fn open_path(path: impl Into<PathBuf>) -> Result<Self, Error> {
        let mut reader = PoFileReader::new();
        reader.set_uri(path.into());
        reader.open()?;
        Ok(reader)
    }

    pub fn with_langcode(mut self, langcode: impl Into<String>) -> Self {
        self.langcode = Some(langcode.into());
        self
    }

    pub fn with_invalid_plural_forms(mut self, policy: InvalidPluralForms) -> Self {
        self.on_invalid_plural_forms = policy;
        self
    }

    /// Recovered syntax problems, keyed by line number.
    pub fn error_log(&self) -> &[SyntaxError] {
        &self.errors
    }

    fn log(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(line = self.line_no, %message, "recovered PO syntax error");
        self.errors.push(SyntaxError::new(self.line_no, message));
    }

    /// Reads one logical line: physical lines ending in a backslash are
    /// joined with their successor before any token parsing. Returns
    /// `Ok(None)` at end of stream.
    fn read_logical_line(&mut self) -> Result<Option<String>, Error> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| Error::DataMismatch("stream is not open".to_string()))?;

        self.line_start_pos = file.stream_position()?;
        self.line_start_line = self.line_no;
        if self.current.is_empty() && self.context == ParseContext::Comment {
            self.entry_start_pos = self.line_start_pos;
            self.entry_start_line = self.line_start_line;
        }

        let mut logical = String::new();
        loop {
            let mut raw = String::new();
            if file.read_line(&mut raw)? == 0 {
                if logical.is_empty() {
                    return Ok(None);
                }
                break;
            }
            if self.line_no == 0 {
                // The first line may carry a UTF-8 byte-order mark.
                if let Some(stripped) = raw.strip_prefix('\u{FEFF}') {
                    raw = stripped.to_string();
                }
                self.plural_index = 0;
            }
            self.line_no += 1;
            while raw.ends_with('\n') || raw.ends_with('\r') {
                raw.pop();
            }
            match raw.strip_suffix('\\') {
                Some(stripped) => logical.push_str(stripped),
                None => {
                    logical.push_str(&raw);
                    break;
                }
            }
        }
        Ok(Some(logical))
    }

    /// Applies one logical line to the state machine.
    fn process_line(&mut self, raw: &str) {
        use ParseContext::*;

        let line = raw.trim();

        if let Some(comment) = line.strip_prefix('#') {
            match self.context {
                Comment => self.current.comments.push(comment.to_string()),
                Msgstr | MsgstrArr => {
                    self.flush_for_lookahead();
                    self.current.comments.push(comment.to_string());
                }
                _ => self.log("\"msgstr\" was expected but not found"),
            }
            return;
        }

        if let Some(rest) = line.strip_prefix("msgid_plural") {
            // A plural form attaches to the id directly.
            if self.context != Msgid {
                self.log("\"msgid_plural\" was expected but not found");
                return;
            }
            let Some(quoted) = parse_quoted(rest.trim()) else {
                self.log("the \"msgid_plural\" string must be quoted");
                return;
            };
            self.current.msgid.push(quoted);
            self.context = MsgidPlural;
            return;
        }

        if let Some(rest) = line.strip_prefix("msgid") {
            match self.context {
                Msgstr | MsgstrArr => self.flush_for_lookahead(),
                Msgid => {
                    // An id with no data followed by another id.
                    self.log("\"msgid\" is unexpected");
                    return;
                }
                _ => {}
            }
            let Some(quoted) = parse_quoted(rest.trim()) else {
                self.log("the \"msgid\" string must be quoted");
                return;
            };
            self.current.msgid.push(quoted);
            self.context = Msgid;
            return;
        }

        if let Some(rest) = line.strip_prefix("msgctxt") {
            match self.context {
                Msgstr | MsgstrArr => self.flush_for_lookahead(),
                _ if self.current.msgctxt.is_some() => {
                    // A context cannot apply to another context.
                    self.log("\"msgctxt\" is unexpected");
                    return;
                }
                _ => {}
            }
            let Some(quoted) = parse_quoted(rest.trim()) else {
                self.log("the \"msgctxt\" string must be quoted");
                return;
            };
            self.current.msgctxt = Some(quoted);
            self.context = Msgctxt;
            return;
        }

        if let Some(rest) = line.strip_prefix("msgstr[") {
            if !matches!(self.context, Msgid | Msgctxt | MsgidPlural | MsgstrArr) {
                self.log("\"msgstr[]\" is unexpected");
                return;
            }
            let Some(end) = rest.find(']') else {
                self.log("the plurality of \"msgstr[]\" is not terminated");
                return;
            };
            let Ok(index) = rest[..end].trim().parse::<usize>() else {
                self.log("the plurality of \"msgstr[]\" is not a number");
                return;
            };
            let Some(quoted) = parse_quoted(rest[end + 1..].trim()) else {
                self.log("the \"msgstr[]\" string must be quoted");
                return;
            };
            self.plural_index = index;
            self.current.msgstr_arr.insert(index, quoted);
            self.context = MsgstrArr;
            return;
        }

        if let Some(rest) = line.strip_prefix("msgstr") {
            if !matches!(self.context, Msgid | Msgctxt) {
                self.log("\"msgstr\" is unexpected");
                return;
            }
            let Some(quoted) = parse_quoted(rest.trim()) else {
                self.log("the \"msgstr\" string must be quoted");
                return;
            };
            self.current.msgstr = Some(quoted);
            self.context = Msgstr;
            return;
        }

        if !line.is_empty() {
            // Anything that is not a token is a continuation of the
            // previous token.
            let Some(quoted) = parse_quoted(line) else {
                self.log("the continuation string must be quoted");
                return;
            };
            match self.context {
                Msgid | MsgidPlural => match self.current.msgid.last_mut() {
                    Some(last) => last.push_str(&quoted),
                    None => self.log("there is an unexpected string"),
                },
                Msgctxt => match self.current.msgctxt.as_mut() {
                    Some(context) => context.push_str(&quoted),
                    None => self.log("there is an unexpected string"),
                },
                Msgstr => match self.current.msgstr.as_mut() {
                    Some(msgstr) => msgstr.push_str(&quoted),
                    None => self.log("there is an unexpected string"),
                },
                MsgstrArr => {
                    self.current
                        .msgstr_arr
                        .entry(self.plural_index)
                        .or_default()
                        .push_str(&quoted);
                }
                Comment => self.log("there is an unexpected string"),
            }
            return;
        }

        self.end_of_entry();
    }

    /// Blank line or end of stream: close out the entry in progress.
    ///
    /// An entry cut off before its translation is dropped; its fields do
    /// not leak into the next record.
    fn end_of_entry(&mut self) {
        match self.context {
            ParseContext::Msgstr | ParseContext::MsgstrArr => self.flush(),
            ParseContext::Comment => {}
            _ => {
                self.log("the stream ended unexpectedly");
                self.current = Pending::default();
                self.context = ParseContext::Comment;
            }
        }
    }

    /// Turns the collected fields into a [`PoItem`].
    ///
    /// The entry is plural whenever the translations arrived in the
    /// `msgstr[n]` array form, regardless of any declared plural count; the
    /// map keeps the forms sorted by index.
    fn flush(&mut self) {
        let current = std::mem::take(&mut self.current);

        let comment = shorten_comments(&current.comments);
        let translation = if !current.msgstr_arr.is_empty() {
            let mut sources = current.msgid.into_iter();
            let singular = sources.next().unwrap_or_default();
            let plural = sources.next().unwrap_or_default();
            Translation::Plural {
                sources: [singular, plural],
                targets: current.msgstr_arr,
            }
        } else {
            Translation::Singular {
                source: current.msgid.into_iter().next().unwrap_or_default(),
                target: current.msgstr.unwrap_or_default(),
            }
        };

        self.item = Some(PoItem {
            context: current.msgctxt,
            translation,
            comment,
        });
        self.context = ParseContext::Comment;
    }

    /// Flush triggered by the first line of the *next* entry: that line is
    /// where a resumed read has to start.
    fn flush_for_lookahead(&mut self) {
        self.flush();
        self.entry_start_pos = self.line_start_pos;
        self.entry_start_line = self.line_start_line;
    }

    /// Drives the state machine until one item is produced or the stream is
    /// exhausted.
    fn read_translation(&mut self) -> Result<Option<PoItem>, Error> {
        self.item = None;
        while !self.finished && self.item.is_none() {
            match self.read_logical_line()? {
                Some(line) => self.process_line(&line),
                None => {
                    self.finished = true;
                    self.end_of_entry();
                }
            }
        }
        Ok(self.item.take())
    }

    /// Consumes the conventional first entry (empty msgid) as the header.
    ///
    /// A stream that does not start with a header entry gets a default
    /// header and the entry is buffered for the next [`PoRead::read_item`].
    fn read_header(&mut self) -> Result<(), Error> {
        match self.read_translation()? {
            Some(item) => {
                let header_blob = match &item.translation {
                    Translation::Singular { source, target } if source.is_empty() => {
                        Some(target.clone())
                    }
                    _ => None,
                };
                match header_blob {
                    Some(blob) => {
                        let mut header =
                            PoHeader::from_string(blob.trim(), self.on_invalid_plural_forms)?;
                        header.langcode = self.langcode.clone();
                        self.header = Some(header);
                        // Cursors never point back into the header block.
                        if self.current.is_empty() && self.context == ParseContext::Comment {
                            if let Some(file) = self.file.as_mut() {
                                self.entry_start_pos = file.stream_position()?;
                                self.entry_start_line = self.line_no;
                            }
                        }
                    }
                    None => {
                        tracing::warn!("PO stream does not start with a header entry");
                        let mut header = PoHeader::default();
                        header.langcode = self.langcode.clone();
                        self.header = Some(header);
                        self.pending_item = Some(item);
                    }
                }
            }
            None => {
                let mut header = PoHeader::default();
                header.langcode = self.langcode.clone();
                self.header = Some(header);
            }
        }
        Ok(())
    }
}

impl Default for PoFileReader {
    fn default() -> Self {
        PoFileReader::new()
    }
}

impl PoStream for PoFileReader {
    /// Opens the stream and immediately consumes the header entry.
    fn open(&mut self) -> Result<(), Error> {
        let uri = self
            .uri
            .clone()
            .ok_or_else(|| Error::DataMismatch("cannot open a stream without a URI".to_string()))?;
        self.file = Some(BufReader::new(File::open(uri)?));
        self.line_no = 0;
        self.context = ParseContext::Comment;
        self.current = Pending::default();
        self.plural_index = 0;
        self.finished = false;
        self.item = None;
        self.pending_item = None;
        self.header = None;
        self.errors.clear();
        self.entry_start_pos = 0;
        self.entry_start_line = 0;
        self.read_header()
    }

    fn close(&mut self) -> Result<(), Error> {
        self.file = None;
        Ok(())
    }

    fn uri(&self) -> Option<&Path> {
        self.uri.as_deref()
    }

    fn set_uri(&mut self, uri: PathBuf) {
        self.uri = Some(uri);
    }
}

impl PoRead for PoFileReader {
    fn read_item(&mut self) -> Result<Option<PoItem>, Error> {
        if let Some(item) = self.pending_item.take() {
            return Ok(Some(item));
        }
        if self.file.is_none() {
            return Err(Error::DataMismatch("stream is not open".to_string()));
        }
        self.read_translation()
    }

    fn header(&self) -> Option<&PoHeader> {
        self.header.as_ref()
    }

    fn langcode(&self) -> Option<&str> {
        self.langcode.as_deref()
    }

    fn set_langcode(&mut self, langcode: &str) {
        self.langcode = Some(langcode.to_string());
        if let Some(header) = self.header.as_mut() {
            header.langcode = Some(langcode.to_string());
        }
    }
}

impl BatchState for PoFileReader {
    type State = FileReaderState;

    fn save_state(&mut self) -> Result<FileReaderState, Error> {
        let uri = self
            .uri
            .clone()
            .ok_or_else(|| Error::DataMismatch("cannot capture state without a URI".to_string()))?;
        let at_boundary = self.current.is_empty()
            && self.context == ParseContext::Comment
            && self.pending_item.is_none();
        let (seek_pos, line_no) = if at_boundary {
            match self.file.as_mut() {
                Some(file) => (file.stream_position()?, self.line_no),
                None => (0, 0),
            }
        } else {
            // The parser holds lookahead for the next entry; resume from
            // that entry's first line.
            (self.entry_start_pos, self.entry_start_line)
        };
        Ok(FileReaderState {
            version: STATE_VERSION,
            uri,
            seek_pos,
            line_no,
            langcode: self.langcode.clone(),
        })
    }

    fn restore_state(&mut self, state: FileReaderState) -> Result<(), Error> {
        if state.version != STATE_VERSION {
            return Err(Error::Resumption(format!(
                "unsupported reader state version {}",
                state.version
            )));
        }
        self.uri = Some(state.uri.clone());
        self.langcode = state.langcode.clone();
        // Re-open so the header is re-derived fresh from the resource.
        self.open().map_err(|error| {
            Error::Resumption(format!("cannot reopen {}: {error}", state.uri.display()))
        })?;

        if state.seek_pos > 0 {
            let file = self
                .file
                .as_mut()
                .ok_or_else(|| Error::Resumption("stream failed to reopen".to_string()))?;
            let len = file
                .get_ref()
                .metadata()
                .map_err(|error| Error::Resumption(error.to_string()))?
                .len();
            if state.seek_pos > len {
                return Err(Error::Resumption(format!(
                    "recorded offset {} is beyond the end of {}",
                    state.seek_pos,
                    state.uri.display()
                )));
            }
            file.seek(SeekFrom::Start(state.seek_pos))
                .map_err(|error| Error::Resumption(error.to_string()))?;
            self.pending_item = None;
            self.current = Pending::default();
            self.context = ParseContext::Comment;
            self.finished = false;
            self.line_no = state.line_no;
            self.entry_start_pos = state.seek_pos;
            self.entry_start_line = state.line_no;
        }
        Ok(())
    }
}

/// Collapses the comment lines of one entry into a short summary string.
fn shorten_comments(comments: &[String]) -> Option<String> {
    if comments.is_empty() {
        return None;
    }
    let mut out = String::new();
    for comment in comments {
        if out.len() >= 130 {
            break;
        }
        if !out.is_empty() {
            out.push_str(", ");
        }
        out.push_str(comment.trim_start());
    }
    Some(out)
}
