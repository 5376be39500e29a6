//! Core types for pocodec: the PO translation item and its PO-text compiler.

use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::quote::format_string;

/// Joins plural variants into a single string for collaborators that only
/// handle scalar values (key-value stores, database columns).
pub const PLURAL_DELIMITER: char = '\u{0003}';

/// A translation payload: either one string or a set of plural forms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Translation {
    /// A single source string with a single translation.
    Singular { source: String, target: String },

    /// A plural message: the singular source plus its plural exemplar, and
    /// one target per plural-form index. The map keeps targets sorted by
    /// index regardless of the order they were supplied in.
    Plural {
        sources: [String; 2],
        targets: BTreeMap<usize, String>,
    },
}

/// One source/translation pair read from or written to a PO stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoItem {
    /// Optional `msgctxt` disambiguation context.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub context: Option<String>,

    pub translation: Translation,

    /// Translator comment collected from the `#` lines preceding the entry.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub comment: Option<String>,
}

impl PoItem {
    pub fn singular(source: impl Into<String>, target: impl Into<String>) -> Self {
        PoItem {
            context: None,
            translation: Translation::Singular {
                source: source.into(),
                target: target.into(),
            },
            comment: None,
        }
    }

    pub fn plural(
        singular: impl Into<String>,
        plural: impl Into<String>,
        targets: BTreeMap<usize, String>,
    ) -> Self {
        PoItem {
            context: None,
            translation: Translation::Plural {
                sources: [singular.into(), plural.into()],
                targets,
            },
            comment: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn is_plural(&self) -> bool {
        matches!(self.translation, Translation::Plural { .. })
    }

    /// The source text as a scalar: plural sources are joined with
    /// [`PLURAL_DELIMITER`].
    pub fn source_text(&self) -> String {
        match &self.translation {
            Translation::Singular { source, .. } => source.clone(),
            Translation::Plural { sources, .. } => {
                format!("{}{}{}", sources[0], PLURAL_DELIMITER, sources[1])
            }
        }
    }

    /// The translation text as a scalar: plural targets are joined with
    /// [`PLURAL_DELIMITER`] in index order.
    pub fn target_text(&self) -> String {
        match &self.translation {
            Translation::Singular { target, .. } => target.clone(),
            Translation::Plural { targets, .. } => targets
                .values()
                .cloned()
                .collect::<Vec<_>>()
                .join(&PLURAL_DELIMITER.to_string()),
        }
    }

    /// Rebuilds an item from scalar source/translation columns, splitting on
    /// [`PLURAL_DELIMITER`]. The inverse of [`PoItem::source_text`] /
    /// [`PoItem::target_text`].
    pub fn from_delimited(context: Option<String>, source: &str, translation: &str) -> Self {
        let translation = if source.contains(PLURAL_DELIMITER) {
            let mut sources = source.split(PLURAL_DELIMITER);
            let singular = sources.next().unwrap_or_default().to_string();
            let plural = sources.next().unwrap_or_default().to_string();
            let targets = translation
                .split(PLURAL_DELIMITER)
                .enumerate()
                .map(|(i, form)| (i, form.to_string()))
                .collect();
            Translation::Plural {
                sources: [singular, plural],
                targets,
            }
        } else {
            Translation::Singular {
                source: source.to_string(),
                target: translation.to_string(),
            }
        };
        PoItem {
            context,
            translation,
            comment: None,
        }
    }

    /// Compiles the item to PO text, terminated by the blank separator line.
    ///
    /// For plural items, `nplurals` (when known) bounds the emitted
    /// `msgstr[n]` lines and gaps are filled with empty strings; when
    /// unknown, exactly the forms present are emitted in index order.
    pub fn compile(&self, nplurals: Option<usize>) -> String {
        let mut output = String::new();

        if let Some(context) = &self.context {
            if !context.is_empty() {
                output.push_str("msgctxt ");
                output.push_str(&format_string(context));
            }
        }

        match &self.translation {
            Translation::Singular { source, target } => {
                output.push_str("msgid ");
                output.push_str(&format_string(source));
                output.push_str("msgstr ");
                output.push_str(&format_string(target));
            }
            Translation::Plural { sources, targets } => {
                output.push_str("msgid ");
                output.push_str(&format_string(&sources[0]));
                output.push_str("msgid_plural ");
                output.push_str(&format_string(&sources[1]));

                match nplurals {
                    Some(nplurals) => {
                        for i in 0..nplurals {
                            output.push_str(&format!("msgstr[{}] ", i));
                            match targets.get(&i) {
                                Some(target) => output.push_str(&format_string(target)),
                                None => output.push_str("\"\"\n"),
                            }
                        }
                    }
                    None => {
                        for (i, target) in targets {
                            output.push_str(&format!("msgstr[{}] ", i));
                            output.push_str(&format_string(target));
                        }
                    }
                }
            }
        }

        // Blank line separating entries.
        output.push('\n');
        output
    }
}

impl Display for PoItem {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.compile(None))
    }
}
