//! PO header block codec.
//!
//! The header travels as the first entry of a PO stream: an empty `msgid`
//! whose `msgstr` holds `Key: Value` metadata pairs, one per line. Among
//! them, `Plural-Forms` carries the plural declaration for the target
//! language.

use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};
use unic_langid::LanguageIdentifier;

use crate::error::Error;
use crate::plural_forms::PluralForms;
use crate::types::PoItem;

/// Default plural declaration used when a header never declared one.
pub const DEFAULT_PLURAL_FORMS: &str = "nplurals=2; plural=(n > 1);";

/// Canonical header keys in their conventional output order.
const CANONICAL_KEYS: [&str; 8] = [
    "Project-Id-Version",
    "POT-Creation-Date",
    "PO-Revision-Date",
    "Language-Team",
    "MIME-Version",
    "Content-Type",
    "Content-Transfer-Encoding",
    "Plural-Forms",
];

/// What to do when a header carries a `Plural-Forms` value that does not
/// parse. The original importer silently left the formula unset; `Fail`
/// turns the condition into a hard header error instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum InvalidPluralForms {
    #[default]
    Ignore,
    Fail,
}

/// Parsed PO header: language code, ordered metadata and the plural
/// declaration extracted from it.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PoHeader {
    pub langcode: Option<String>,

    /// `Key: Value` pairs in the order they appeared (or were set).
    pub metadata: Vec<(String, String)>,

    pub plural_forms: Option<PluralForms>,
}

impl PoHeader {
    pub fn new(langcode: impl Into<String>) -> Self {
        PoHeader {
            langcode: Some(langcode.into()),
            metadata: Vec::new(),
            plural_forms: None,
        }
    }

    /// Parses a header from the `msgstr` content of the header entry.
    ///
    /// Lines without a `:` separator are ignored; repeated keys overwrite
    /// their earlier value in place.
    pub fn from_string(blob: &str, on_invalid: InvalidPluralForms) -> Result<Self, Error> {
        let mut header = PoHeader::default();
        for line in blob.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            header.set_metadata(key.trim(), value.trim());
        }

        if let Some(value) = header.metadata_value("Plural-Forms") {
            match PluralForms::parse(value) {
                Ok(forms) => header.plural_forms = Some(forms),
                Err(error) => match on_invalid {
                    InvalidPluralForms::Ignore => {
                        tracing::warn!(%error, "ignoring unparseable Plural-Forms header");
                    }
                    InvalidPluralForms::Fail => return Err(error),
                },
            }
        }

        Ok(header)
    }

    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Sets a metadata value, updating an existing key in place.
    pub fn set_metadata(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.metadata.iter_mut().find(|(k, _)| *k == key) {
            Some(pair) => pair.1 = value,
            None => self.metadata.push((key, value)),
        }
    }

    /// Declared number of plural forms, when known.
    pub fn nplurals(&self) -> Option<usize> {
        self.plural_forms.as_ref().map(|forms| forms.nplurals)
    }

    /// The language code as a validated identifier, when it parses.
    pub fn language_identifier(&self) -> Option<LanguageIdentifier> {
        self.langcode.as_ref()?.parse().ok()
    }

    /// Wraps the rendered header as the conventional first PO entry.
    pub fn to_item(&self) -> PoItem {
        PoItem::singular("", self.to_string())
    }

    fn canonical_value(&self, key: &str) -> String {
        if key == "Plural-Forms" {
            return match &self.plural_forms {
                Some(forms) => forms.to_string(),
                None => self
                    .metadata_value(key)
                    .unwrap_or(DEFAULT_PLURAL_FORMS)
                    .to_string(),
            };
        }
        if let Some(value) = self.metadata_value(key) {
            return value.to_string();
        }
        match key {
            "Project-Id-Version" => "PROJECT VERSION".to_string(),
            "Language-Team" => self.langcode.clone().unwrap_or_default(),
            "MIME-Version" => "1.0".to_string(),
            "Content-Type" => "text/plain; charset=UTF-8".to_string(),
            "Content-Transfer-Encoding" => "8bit".to_string(),
            _ => String::new(),
        }
    }
}

impl Display for PoHeader {
    /// Renders the canonical ordered header block, followed by any extra
    /// metadata keys in their original order.
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for key in CANONICAL_KEYS {
            writeln!(f, "{}: {}", key, self.canonical_value(key))?;
        }
        for (key, value) in &self.metadata {
            if !CANONICAL_KEYS.contains(&key.as_str()) {
                writeln!(f, "{}: {}", key, value)?;
            }
        }
        Ok(())
    }
}
