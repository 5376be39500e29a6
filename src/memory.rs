//! In-memory PO writer.
//!
//! Collects items into a `context → source → translation` map, the shape
//! installer-style flows consume directly. Plural variants are joined with
//! [`crate::types::PLURAL_DELIMITER`] so every stored value is a scalar
//! string.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::header::PoHeader;
use crate::traits::{BatchState, PoWrite};
use crate::types::PoItem;

const STATE_VERSION: u32 = 1;

/// Cursor of a [`PoMemoryWriter`]. The collected items live only in this
/// process, so there is nothing to externalize beyond the version tag; a
/// restored memory writer starts out empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryWriterState {
    pub version: u32,
}

#[derive(Debug, Default)]
pub struct PoMemoryWriter {
    header: Option<PoHeader>,
    items: BTreeMap<String, BTreeMap<String, String>>,
}

impl PoMemoryWriter {
    pub fn new() -> Self {
        PoMemoryWriter::default()
    }

    pub fn header(&self) -> Option<&PoHeader> {
        self.header.as_ref()
    }

    pub fn set_header(&mut self, header: PoHeader) {
        self.header = Some(header);
    }

    /// The collected translations, keyed by context then source. Entries
    /// without a context live under the empty-string key.
    pub fn data(&self) -> &BTreeMap<String, BTreeMap<String, String>> {
        &self.items
    }

    pub fn into_data(self) -> BTreeMap<String, BTreeMap<String, String>> {
        self.items
    }
}

impl PoWrite for PoMemoryWriter {
    fn write_item(&mut self, item: &PoItem) -> Result<(), Error> {
        let context = item.context.clone().unwrap_or_default();
        self.items
            .entry(context)
            .or_default()
            .insert(item.source_text(), item.target_text());
        Ok(())
    }
}

impl BatchState for PoMemoryWriter {
    type State = MemoryWriterState;

    fn save_state(&mut self) -> Result<MemoryWriterState, Error> {
        Ok(MemoryWriterState {
            version: STATE_VERSION,
        })
    }

    fn restore_state(&mut self, state: MemoryWriterState) -> Result<(), Error> {
        if state.version != STATE_VERSION {
            return Err(Error::Resumption(format!(
                "unsupported memory writer state version {}",
                state.version
            )));
        }
        Ok(())
    }
}
