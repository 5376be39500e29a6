//! Trait seams for the PO pipeline.
//!
//! Readers and writers come in several interchangeable shapes (file-backed,
//! store-backed, memory-backed); the pump in [`PoWrite::write_items`] and
//! the batch machinery depend only on these traits.

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::Error;
use crate::header::PoHeader;
use crate::plural_forms::PluralForms;
use crate::types::PoItem;

/// How many items a pump run may transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Count {
    /// Transfer until the reader is exhausted.
    Unlimited,
    /// Transfer at most this many items.
    Limit(u64),
}

impl Count {
    fn allows(&self, transferred: u64) -> bool {
        match self {
            Count::Unlimited => true,
            Count::Limit(limit) => transferred < *limit,
        }
    }
}

/// A source of PO items.
pub trait PoRead {
    /// Reads the next item, `Ok(None)` on exhaustion.
    fn read_item(&mut self) -> Result<Option<PoItem>, Error>;

    /// The header of the underlying resource, once known.
    fn header(&self) -> Option<&PoHeader>;

    fn langcode(&self) -> Option<&str>;

    fn set_langcode(&mut self, langcode: &str);
}

/// A sink for PO items.
pub trait PoWrite {
    fn write_item(&mut self, item: &PoItem) -> Result<(), Error>;

    /// Pumps items from `reader` into this writer, strictly alternating one
    /// blocking read with one blocking write, until the reader is exhausted
    /// or `count` is reached. Returns the number of items transferred.
    ///
    /// This is the canonical batch-transfer driver for every reader/writer
    /// pairing (file to file, file to store, store to file).
    fn write_items(&mut self, reader: &mut dyn PoRead, count: Count) -> Result<u64, Error> {
        let mut transferred = 0;
        while count.allows(transferred) {
            match reader.read_item()? {
                Some(item) => {
                    self.write_item(&item)?;
                    transferred += 1;
                }
                None => break,
            }
        }
        Ok(transferred)
    }
}

/// A reader/writer bound to a seekable resource identified by a URI.
pub trait PoStream {
    /// Opens the resource set via [`PoStream::set_uri`].
    fn open(&mut self) -> Result<(), Error>;

    fn close(&mut self) -> Result<(), Error>;

    fn uri(&self) -> Option<&Path>;

    fn set_uri(&mut self, uri: PathBuf);
}

/// Cursor externalization for cross-invocation resumption.
///
/// A component constructed fresh behaves as "start from the beginning";
/// [`BatchState::restore_state`] re-opens its resource and seeks to the
/// recorded position, after which reads/writes continue exactly where the
/// saved run stopped. Positions are queried from the live resource when the
/// state is captured, never from shadow counters.
pub trait BatchState {
    /// The typed, versioned cursor for this component.
    type State: Serialize + DeserializeOwned;

    fn save_state(&mut self) -> Result<Self::State, Error>;

    /// Restores a previously captured cursor. Fails with
    /// [`Error::Resumption`] when the resource is gone, cannot be seeked to
    /// the recorded offset, or the state version is incompatible.
    fn restore_state(&mut self, state: Self::State) -> Result<(), Error>;

    /// Serializes the cursor into an opaque blob for batch systems.
    fn save_state_blob(&mut self) -> Result<String, Error> {
        Ok(serde_json::to_string(&self.save_state()?)?)
    }

    /// Restores from an opaque blob produced by [`BatchState::save_state_blob`].
    fn restore_state_blob(&mut self, blob: &str) -> Result<(), Error> {
        let state = serde_json::from_str(blob)
            .map_err(|error| Error::Resumption(format!("incompatible state blob: {error}")))?;
        self.restore_state(state)
    }
}

/// External cache of plural declarations keyed by language code.
///
/// Consulted by plural-entry serialization and refreshed when a header
/// carrying a new declaration is written.
pub trait PluralFormsCache {
    fn get(&self, langcode: &str) -> Option<PluralForms>;

    fn set(&mut self, langcode: &str, forms: PluralForms);
}

/// Screens translation payloads before they are accepted into storage.
///
/// Unsafe content is counted as a skip in the merge report, never raised as
/// an error.
pub trait TranslationValidator {
    fn is_safe(&self, translation: &str) -> bool;
}
