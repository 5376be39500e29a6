#![forbid(unsafe_code)]
//! Streaming Gettext PO toolkit for Rust.
//!
//! Parses and serializes the GNU gettext PO translation format as a stream
//! of [`PoItem`]s, with a resumable cursor on every reader and writer so a
//! long transfer can pause and continue across separate invocations.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use pocodec::{Count, PoFileReader, PoFileWriter, PoWrite};
//!
//! // Copy a PO file entry by entry.
//! let mut reader = PoFileReader::open_path("nl.po")?;
//! let mut writer = PoFileWriter::open_path("copy.po")?;
//! writer.write_items(&mut reader, Count::Unlimited)?;
//! # Ok::<(), pocodec::Error>(())
//! ```
//!
//! # Resumable transfer
//!
//! ```rust,no_run
//! use pocodec::{BatchState, Count, PoFileReader, PoFileWriter, PoWrite};
//!
//! // First invocation: move a bounded slice, then externalize the cursor.
//! let mut reader = PoFileReader::open_path("nl.po")?;
//! let mut writer = PoFileWriter::open_path("out.po")?;
//! writer.write_items(&mut reader, Count::Limit(50))?;
//! let cursor = reader.save_state_blob()?;
//!
//! // Later invocation: a fresh reader continues exactly where it stopped.
//! let mut reader = PoFileReader::new();
//! reader.restore_state_blob(&cursor)?;
//! writer.write_items(&mut reader, Count::Unlimited)?;
//! # Ok::<(), pocodec::Error>(())
//! ```
//!
//! # Pieces
//!
//! - [`reader::PoFileReader`] — line-oriented state machine tokenizing a PO
//!   byte stream; recovers from syntax errors and logs them by line.
//! - [`writer::PoFileWriter`] — append-mode serializer with header
//!   synthesis and re-derivation.
//! - [`store`] — the storage-backend contract plus store-backed
//!   reader/writer with merge reporting.
//! - [`memory::PoMemoryWriter`] — in-memory sink for installer-style flows.
//! - [`traits`] — the seams everything plugs into, including
//!   [`traits::BatchState`] for cross-invocation resumption.

pub mod error;
pub mod header;
pub mod memory;
pub mod plural_forms;
pub mod quote;
pub mod reader;
pub mod store;
pub mod traits;
pub mod types;
pub mod writer;

// Re-export most used types for easy consumption
pub use crate::{
    error::{Error, SyntaxError},
    header::{InvalidPluralForms, PoHeader},
    memory::PoMemoryWriter,
    plural_forms::PluralForms,
    reader::PoFileReader,
    store::{
        Customized, ExportOptions, ImportOptions, MemoryPluralFormsCache, MemoryStringStore,
        MergeReport, OverwriteOptions, PoStoreReader, PoStoreWriter, StringStore,
    },
    traits::{BatchState, Count, PluralFormsCache, PoRead, PoStream, PoWrite, TranslationValidator},
    types::{PLURAL_DELIMITER, PoItem, Translation},
    writer::{MissingNplurals, PoFileWriter},
};
