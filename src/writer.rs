//! Streaming PO file writer.
//!
//! Appends [`PoItem`]s to a PO resource. Opening a new (empty) resource
//! synthesizes and writes the header block first; opening a growing
//! resource re-derives the header by parsing what is already on disk, so a
//! succession of batch writers sharing one file stay consistent.

use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::header::PoHeader;
use crate::reader::PoFileReader;
use crate::traits::{BatchState, PoRead, PoStream, PoWrite};
use crate::types::PoItem;

const STATE_VERSION: u32 = 1;

/// Resumable cursor of a [`PoFileWriter`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileWriterState {
    pub version: u32,
    pub uri: PathBuf,
    pub seek_pos: u64,
    pub langcode: Option<String>,
}

/// What to do when a plural item must be serialized but the number of
/// plural forms for the target language is unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MissingNplurals {
    /// Emit exactly the forms present, in index order.
    #[default]
    WriteKnown,
    /// Refuse the write.
    Fail,
}

pub struct PoFileWriter {
    uri: Option<PathBuf>,
    langcode: Option<String>,
    file: Option<File>,
    header: Option<PoHeader>,
    missing_nplurals: MissingNplurals,
}

impl PoFileWriter {
    pub fn new() -> Self {
        PoFileWriter {
            uri: None,
            langcode: None,
            file: None,
            header: None,
            missing_nplurals: MissingNplurals::default(),
        }
    }

    /// Convenience constructor: sets the URI and opens the resource.
    pub fn open_path(path: impl Into<PathBuf>) -> Result<Self, Error> {
        let mut writer = PoFileWriter::new();
        writer.set_uri(path.into());
        writer.open()?;
        Ok(writer)
    }

    pub fn with_langcode(mut self, langcode: impl Into<String>) -> Self {
        self.langcode = Some(langcode.into());
        self
    }

    pub fn with_missing_nplurals(mut self, policy: MissingNplurals) -> Self {
        self.missing_nplurals = policy;
        self
    }

    pub fn header(&self) -> Option<&PoHeader> {
        self.header.as_ref()
    }

    /// Sets the header written when the target resource turns out to be
    /// empty. Ignored for a resource that already has a header on disk.
    pub fn set_header(&mut self, header: PoHeader) {
        self.header = Some(header);
    }

    pub fn langcode(&self) -> Option<&str> {
        self.langcode.as_deref()
    }

    pub fn set_langcode(&mut self, langcode: &str) {
        self.langcode = Some(langcode.to_string());
    }

    fn write(&mut self, data: &str) -> Result<(), Error> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| Error::DataMismatch("stream is not open".to_string()))?;
        file.write_all(data.as_bytes())
            .map_err(|_| Error::write_failed(data))
    }

    fn write_header(&mut self) -> Result<(), Error> {
        let header = self.header.get_or_insert_with(|| {
            let mut header = PoHeader::default();
            header.langcode = self.langcode.clone();
            header
        });
        let block = header.to_item().compile(None);
        self.write(&block)
    }
}

impl Default for PoFileWriter {
    fn default() -> Self {
        PoFileWriter::new()
    }
}

impl PoStream for PoFileWriter {
    /// Opens the resource in append mode.
    ///
    /// At byte offset 0 the header block is synthesized and written first.
    /// Otherwise the header is re-derived by independently parsing the
    /// existing resource, never trusted from cached state.
    fn open(&mut self) -> Result<(), Error> {
        let uri = self
            .uri
            .clone()
            .ok_or_else(|| Error::DataMismatch("cannot open a stream without a URI".to_string()))?;
        let mut file = OpenOptions::new().create(true).append(true).open(&uri)?;
        let seek_pos = file.seek(SeekFrom::End(0))?;
        self.file = Some(file);

        if seek_pos == 0 {
            self.write_header()?;
        } else {
            let mut reader = PoFileReader::new();
            if let Some(langcode) = &self.langcode {
                reader = reader.with_langcode(langcode.clone());
            }
            reader.set_uri(uri);
            reader.open()?;
            self.header = reader.header().cloned();
        }
        Ok(())
    }

    fn close(&mut self) -> Result<(), Error> {
        if let Some(mut file) = self.file.take() {
            file.flush()?;
        }
        Ok(())
    }

    fn uri(&self) -> Option<&Path> {
        self.uri.as_deref()
    }

    fn set_uri(&mut self, uri: PathBuf) {
        self.uri = Some(uri);
    }
}

impl PoWrite for PoFileWriter {
    fn write_item(&mut self, item: &PoItem) -> Result<(), Error> {
        let nplurals = self.header.as_ref().and_then(PoHeader::nplurals);
        if item.is_plural()
            && nplurals.is_none()
            && self.missing_nplurals == MissingNplurals::Fail
        {
            return Err(Error::DataMismatch(format!(
                "unknown number of plural forms for {:?}",
                item.source_text()
            )));
        }
        self.write(&item.compile(nplurals))
    }
}

impl BatchState for PoFileWriter {
    type State = FileWriterState;

    fn save_state(&mut self) -> Result<FileWriterState, Error> {
        let uri = self
            .uri
            .clone()
            .ok_or_else(|| Error::DataMismatch("cannot capture state without a URI".to_string()))?;
        let seek_pos = match self.file.as_mut() {
            Some(file) => file.stream_position()?,
            None => 0,
        };
        Ok(FileWriterState {
            version: STATE_VERSION,
            uri,
            seek_pos,
            langcode: self.langcode.clone(),
        })
    }

    fn restore_state(&mut self, state: FileWriterState) -> Result<(), Error> {
        if state.version != STATE_VERSION {
            return Err(Error::Resumption(format!(
                "unsupported writer state version {}",
                state.version
            )));
        }
        if state.seek_pos > 0 {
            let len = std::fs::metadata(&state.uri)
                .map_err(|error| {
                    Error::Resumption(format!(
                        "cannot reopen {}: {error}",
                        state.uri.display()
                    ))
                })?
                .len();
            if len < state.seek_pos {
                return Err(Error::Resumption(format!(
                    "{} shrank below the recorded offset {}",
                    state.uri.display(),
                    state.seek_pos
                )));
            }
        }
        self.uri = Some(state.uri.clone());
        self.langcode = state.langcode;
        self.open().map_err(|error| {
            Error::Resumption(format!("cannot reopen {}: {error}", state.uri.display()))
        })
    }
}
