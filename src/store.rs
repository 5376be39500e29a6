//! Store-backed reader and writer.
//!
//! [`StringStore`] is the contract a translation storage backend must
//! satisfy: source strings matched by exact source + context, per-language
//! translations with a customization flag, records ordered by a stable
//! monotonically increasing id. [`MemoryStringStore`] is the in-memory
//! reference implementation; a relational backend slots in behind the same
//! trait.
//!
//! [`PoStoreWriter`] merges incoming items into a store honoring the
//! overwrite policy and the injected safety validator, producing a
//! [`MergeReport`]. [`PoStoreReader`] streams a store back out as PO items.

use std::collections::{BTreeMap, HashMap};

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use unic_langid::LanguageIdentifier;

use crate::error::Error;
use crate::header::PoHeader;
use crate::plural_forms::PluralForms;
use crate::traits::{BatchState, PluralFormsCache, PoRead, PoWrite, TranslationValidator};
use crate::types::PoItem;

const STATE_VERSION: u32 = 1;

/// Whether a stored translation was manually edited. Customized
/// translations are exempt from automatic overwrite unless explicitly
/// requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Customized {
    #[default]
    NotCustomized,
    Customized,
}

/// Which classes of existing translations an import may overwrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OverwriteOptions {
    pub not_customized: bool,
    pub customized: bool,
}

impl OverwriteOptions {
    fn allows(&self, customized: Customized) -> bool {
        match customized {
            Customized::NotCustomized => self.not_customized,
            Customized::Customized => self.customized,
        }
    }
}

/// Import behavior: overwrite policy plus the flag newly written
/// translations are stored with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ImportOptions {
    pub overwrite: OverwriteOptions,
    pub customized: Customized,
}

/// What a store export includes. With every flag off the export is a
/// translation template: all sources, no translations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExportOptions {
    pub customized: bool,
    pub not_customized: bool,
    pub not_translated: bool,
}

impl ExportOptions {
    fn is_template(&self) -> bool {
        !self.customized && !self.not_customized && !self.not_translated
    }
}

/// Aggregate change report of one import run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MergeReport {
    pub additions: u64,
    pub updates: u64,
    pub deletes: u64,
    pub skips: u64,
    pub ignored: u64,
}

/// One record streamed out of a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringRecord {
    pub id: u64,
    pub source: String,
    pub context: String,
    pub translation: Option<String>,
    pub customized: Option<Customized>,
}

/// Contract a translation storage backend satisfies.
pub trait StringStore {
    /// Looks up a source string by exact source + context. Returns the
    /// record id and, when a translation exists for `langcode`, its
    /// customization flag.
    fn find(&self, langcode: &str, source: &str, context: &str)
    -> Option<(u64, Option<Customized>)>;

    /// Registers a new source string and returns its id. Ids increase
    /// monotonically.
    fn insert_source(&mut self, source: &str, context: &str) -> u64;

    fn upsert_translation(
        &mut self,
        id: u64,
        langcode: &str,
        translation: &str,
        customized: Customized,
    );

    fn delete_translation(&mut self, id: u64, langcode: &str);

    /// The first record with an id greater than `after` that matches the
    /// export options, in id order.
    fn read_after(&self, langcode: &str, after: u64, options: &ExportOptions)
    -> Option<StringRecord>;
}

/// In-memory [`StringStore`] used by tests and installer-style flows.
#[derive(Debug, Default)]
pub struct MemoryStringStore {
    next_id: u64,
    sources: BTreeMap<u64, (String, String)>,
    targets: HashMap<(u64, String), (String, Customized)>,
}

impl MemoryStringStore {
    pub fn new() -> Self {
        MemoryStringStore::default()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn translation(&self, id: u64, langcode: &str) -> Option<&str> {
        self.targets
            .get(&(id, langcode.to_string()))
            .map(|(translation, _)| translation.as_str())
    }
}

impl StringStore for MemoryStringStore {
    fn find(
        &self,
        langcode: &str,
        source: &str,
        context: &str,
    ) -> Option<(u64, Option<Customized>)> {
        let (&id, _) = self
            .sources
            .iter()
            .find(|(_, (s, c))| s == source && c == context)?;
        let customized = self
            .targets
            .get(&(id, langcode.to_string()))
            .map(|(_, customized)| *customized);
        Some((id, customized))
    }

    fn insert_source(&mut self, source: &str, context: &str) -> u64 {
        self.next_id += 1;
        self.sources
            .insert(self.next_id, (source.to_string(), context.to_string()));
        self.next_id
    }

    fn upsert_translation(
        &mut self,
        id: u64,
        langcode: &str,
        translation: &str,
        customized: Customized,
    ) {
        self.targets.insert(
            (id, langcode.to_string()),
            (translation.to_string(), customized),
        );
    }

    fn delete_translation(&mut self, id: u64, langcode: &str) {
        self.targets.remove(&(id, langcode.to_string()));
    }

    fn read_after(
        &self,
        langcode: &str,
        after: u64,
        options: &ExportOptions,
    ) -> Option<StringRecord> {
        for (&id, (source, context)) in self.sources.range(after + 1..) {
            let target = self.targets.get(&(id, langcode.to_string()));
            let record = |translation: Option<&(String, Customized)>| StringRecord {
                id,
                source: source.clone(),
                context: context.clone(),
                translation: translation.map(|(t, _)| t.clone()),
                customized: translation.map(|(_, c)| *c),
            };
            if options.is_template() {
                return Some(record(None));
            }
            match target {
                Some((_, customized)) => {
                    let wanted = match customized {
                        Customized::Customized => options.customized,
                        Customized::NotCustomized => options.not_customized,
                    };
                    if wanted {
                        return Some(record(target));
                    }
                }
                None => {
                    if options.not_translated {
                        return Some(record(None));
                    }
                }
            }
        }
        None
    }
}

/// Accepts every translation payload.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl TranslationValidator for AllowAll {
    fn is_safe(&self, _translation: &str) -> bool {
        true
    }
}

lazy_static! {
    static ref UNSAFE_MARKUP_REGEX: Regex =
        Regex::new(r"(?i)<\s*(script|style|iframe|object|embed)\b|\bon\w+\s*=\s*[\x22']")
            .unwrap();
}

/// Screens translations for markup that must never reach storage.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkupScreen;

impl TranslationValidator for MarkupScreen {
    fn is_safe(&self, translation: &str) -> bool {
        !UNSAFE_MARKUP_REGEX.is_match(translation)
    }
}

/// In-memory [`PluralFormsCache`].
#[derive(Debug, Clone, Default)]
pub struct MemoryPluralFormsCache {
    forms: HashMap<String, PluralForms>,
}

impl MemoryPluralFormsCache {
    pub fn new() -> Self {
        MemoryPluralFormsCache::default()
    }
}

impl PluralFormsCache for MemoryPluralFormsCache {
    fn get(&self, langcode: &str) -> Option<PluralForms> {
        self.forms.get(langcode).cloned()
    }

    fn set(&mut self, langcode: &str, forms: PluralForms) {
        self.forms.insert(langcode.to_string(), forms);
    }
}

/// Resumable cursor of a [`PoStoreReader`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreReaderState {
    pub version: u32,
    pub last_id: u64,
    pub langcode: String,
    pub options: ExportOptions,
}

/// Streams the contents of a store as PO items, ordered by record id.
pub struct PoStoreReader<'a, S: StringStore> {
    store: &'a S,
    langcode: String,
    options: ExportOptions,
    last_id: u64,
    header: PoHeader,
}

impl<'a, S: StringStore> PoStoreReader<'a, S> {
    pub fn new(store: &'a S, langcode: impl Into<String>) -> Self {
        let langcode = langcode.into();
        let header = PoHeader::new(langcode.clone());
        PoStoreReader {
            store,
            langcode,
            options: ExportOptions::default(),
            last_id: 0,
            header,
        }
    }

    pub fn with_options(mut self, options: ExportOptions) -> Self {
        self.options = options;
        self
    }
}

impl<S: StringStore> PoRead for PoStoreReader<'_, S> {
    fn read_item(&mut self) -> Result<Option<PoItem>, Error> {
        let Some(record) = self
            .store
            .read_after(&self.langcode, self.last_id, &self.options)
        else {
            return Ok(None);
        };
        self.last_id = record.id;
        let context = (!record.context.is_empty()).then(|| record.context.clone());
        Ok(Some(PoItem::from_delimited(
            context,
            &record.source,
            record.translation.as_deref().unwrap_or_default(),
        )))
    }

    fn header(&self) -> Option<&PoHeader> {
        Some(&self.header)
    }

    fn langcode(&self) -> Option<&str> {
        Some(&self.langcode)
    }

    fn set_langcode(&mut self, langcode: &str) {
        self.langcode = langcode.to_string();
        self.header.langcode = Some(langcode.to_string());
    }
}

impl<S: StringStore> BatchState for PoStoreReader<'_, S> {
    type State = StoreReaderState;

    fn save_state(&mut self) -> Result<StoreReaderState, Error> {
        Ok(StoreReaderState {
            version: STATE_VERSION,
            last_id: self.last_id,
            langcode: self.langcode.clone(),
            options: self.options,
        })
    }

    fn restore_state(&mut self, state: StoreReaderState) -> Result<(), Error> {
        if state.version != STATE_VERSION {
            return Err(Error::Resumption(format!(
                "unsupported store reader state version {}",
                state.version
            )));
        }
        self.last_id = state.last_id;
        self.options = state.options;
        self.set_langcode(&state.langcode);
        Ok(())
    }
}

/// Resumable cursor of a [`PoStoreWriter`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreWriterState {
    pub version: u32,
    pub langcode: Option<String>,
    pub options: ImportOptions,
    pub report: MergeReport,
}

/// Merges PO items into a [`StringStore`].
pub struct PoStoreWriter<'a, S: StringStore> {
    store: &'a mut S,
    langcode: Option<String>,
    options: ImportOptions,
    report: MergeReport,
    header: Option<PoHeader>,
    validator: Box<dyn TranslationValidator>,
}

impl<'a, S: StringStore> PoStoreWriter<'a, S> {
    pub fn new(store: &'a mut S) -> Self {
        PoStoreWriter {
            store,
            langcode: None,
            options: ImportOptions::default(),
            report: MergeReport::default(),
            header: None,
            validator: Box::new(AllowAll),
        }
    }

    pub fn with_langcode(mut self, langcode: impl Into<String>) -> Self {
        self.set_langcode(&langcode.into());
        self
    }

    pub fn with_options(mut self, options: ImportOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_validator(mut self, validator: Box<dyn TranslationValidator>) -> Self {
        self.validator = validator;
        self
    }

    pub fn set_langcode(&mut self, langcode: &str) {
        if langcode.parse::<LanguageIdentifier>().is_err() {
            tracing::warn!(langcode, "language code is not a valid identifier");
        }
        self.langcode = Some(langcode.to_string());
    }

    pub fn report(&self) -> &MergeReport {
        &self.report
    }

    pub fn header(&self) -> Option<&PoHeader> {
        self.header.as_ref()
    }

    /// Accepts the header of the stream being imported and refreshes the
    /// plural-forms cache: the declaration is stored when the import may
    /// overwrite existing data or when nothing is cached for the language
    /// yet.
    pub fn set_header(&mut self, header: PoHeader, cache: &mut dyn PluralFormsCache) {
        let langcode = header.langcode.clone().or_else(|| self.langcode.clone());
        if let (Some(langcode), Some(forms)) = (langcode, header.plural_forms.clone()) {
            let force = self.options.overwrite.not_customized || self.options.overwrite.customized;
            if force || cache.get(&langcode).is_none() {
                cache.set(&langcode, forms);
            }
        }
        self.header = Some(header);
    }

    fn merge_one(
        &mut self,
        langcode: &str,
        context: &str,
        source: &str,
        translation: &str,
    ) -> Result<(), Error> {
        let existing = self.store.find(langcode, source, context);

        if translation.is_empty() {
            // An empty translation deletes an existing one, when the
            // overwrite policy allows it.
            if let Some((id, Some(customized))) = existing {
                if self.options.overwrite.allows(customized) {
                    self.store.delete_translation(id, langcode);
                    self.report.deletes += 1;
                }
            }
            return Ok(());
        }

        if !self.validator.is_safe(translation) {
            tracing::warn!(
                source,
                "import skipped because of disallowed or malformed markup"
            );
            self.report.skips += 1;
            return Ok(());
        }

        match existing {
            Some((id, None)) => {
                // Known source, no translation in this language yet.
                self.store
                    .upsert_translation(id, langcode, translation, self.options.customized);
                self.report.additions += 1;
            }
            Some((id, Some(customized))) => {
                if self.options.overwrite.allows(customized) {
                    self.store.upsert_translation(
                        id,
                        langcode,
                        translation,
                        self.options.customized,
                    );
                    self.report.updates += 1;
                } else {
                    self.report.ignored += 1;
                }
            }
            None => {
                let id = self.store.insert_source(source, context);
                self.store
                    .upsert_translation(id, langcode, translation, self.options.customized);
                self.report.additions += 1;
            }
        }
        Ok(())
    }
}

impl<S: StringStore> PoWrite for PoStoreWriter<'_, S> {
    fn write_item(&mut self, item: &PoItem) -> Result<(), Error> {
        let langcode = self
            .langcode
            .clone()
            .ok_or_else(|| Error::DataMismatch("no langcode set for store import".to_string()))?;
        let context = item.context.clone().unwrap_or_default();
        // Plural variants travel through the store as delimiter-joined
        // scalars.
        let source = item.source_text();
        let translation = item.target_text();
        self.merge_one(&langcode, &context, &source, &translation)
    }
}

impl<S: StringStore> BatchState for PoStoreWriter<'_, S> {
    type State = StoreWriterState;

    fn save_state(&mut self) -> Result<StoreWriterState, Error> {
        Ok(StoreWriterState {
            version: STATE_VERSION,
            langcode: self.langcode.clone(),
            options: self.options,
            report: self.report,
        })
    }

    fn restore_state(&mut self, state: StoreWriterState) -> Result<(), Error> {
        if state.version != STATE_VERSION {
            return Err(Error::Resumption(format!(
                "unsupported store writer state version {}",
                state.version
            )));
        }
        self.langcode = state.langcode;
        self.options = state.options;
        self.report = state.report;
        Ok(())
    }
}
