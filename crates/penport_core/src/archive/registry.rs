//! Explicit `(kind, version) -> importer` registry.
//!
//! # Invariants
//! - One importer per format tag.
//! - Resolution is exact: a document is only ever handed to the importer
//!   registered for its own tag, and only when that tag's kind is the kind
//!   the caller asked to import.

use crate::archive::bundle::ArchiveBundle;
use crate::archive::error::{ArchiveError, ArchiveResult};
use crate::archive::import::{
    ProjectImporterV1, ProjectTypeImporterV1, TemplateImporterV1, TemplateImporterV2,
};
use crate::config::ArchiveOptions;
use crate::model::format::{ArchiveKind, FormatTag};
use crate::model::project::ProjectId;
use crate::model::project_type::ProjectTypeId;
use crate::model::template::TemplateId;
use crate::repo::store::DestinationStore;
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

/// Everything an importer may touch while assembling one root.
pub struct ImportContext<'a, S: DestinationStore> {
    pub store: &'a S,
    pub bundle: &'a ArchiveBundle,
    pub options: &'a ArchiveOptions,
}

/// Destination identity assigned to an imported root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportedRoot {
    Template(TemplateId),
    ProjectType(ProjectTypeId),
    Project(ProjectId),
}

/// One importer implementation for one format tag.
pub trait DocumentImporter<S: DestinationStore> {
    fn format(&self) -> FormatTag;

    /// Assembles one root from `document` (read from archive entry `path`).
    fn import(
        &self,
        ctx: &ImportContext<'_, S>,
        path: &str,
        document: Value,
    ) -> ArchiveResult<ImportedRoot>;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("importer already registered for {0}")]
    DuplicateFormat(FormatTag),
}

pub struct ImporterRegistry<S: DestinationStore> {
    importers: BTreeMap<FormatTag, Box<dyn DocumentImporter<S>>>,
}

impl<S: DestinationStore> Default for ImporterRegistry<S> {
    fn default() -> Self {
        Self {
            importers: BTreeMap::new(),
        }
    }
}

impl<S: DestinationStore> ImporterRegistry<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in importer.
    pub fn with_defaults() -> Self {
        let mut importers: BTreeMap<FormatTag, Box<dyn DocumentImporter<S>>> = BTreeMap::new();
        let builtins: [Box<dyn DocumentImporter<S>>; 4] = [
            Box::new(TemplateImporterV1),
            Box::new(TemplateImporterV2),
            Box::new(ProjectTypeImporterV1),
            Box::new(ProjectImporterV1),
        ];
        for importer in builtins {
            importers.insert(importer.format(), importer);
        }
        Self { importers }
    }

    pub fn register(
        &mut self,
        importer: Box<dyn DocumentImporter<S>>,
    ) -> Result<(), RegistryError> {
        let format = importer.format();
        if self.importers.contains_key(&format) {
            return Err(RegistryError::DuplicateFormat(format));
        }
        self.importers.insert(format, importer);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.importers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.importers.is_empty()
    }

    /// Registered tags for `kind`, oldest version first.
    pub fn formats_for(&self, kind: ArchiveKind) -> Vec<FormatTag> {
        self.importers
            .keys()
            .filter(|tag| tag.kind() == kind.as_str())
            .cloned()
            .collect()
    }

    /// Selects the importer for a document of `kind` carrying tag `found`.
    pub fn resolve(
        &self,
        kind: ArchiveKind,
        found: Option<&str>,
    ) -> ArchiveResult<&dyn DocumentImporter<S>> {
        let importer = found
            .and_then(FormatTag::parse)
            .filter(|tag| tag.kind() == kind.as_str())
            .and_then(|tag| self.importers.get(&tag));
        match importer {
            Some(importer) => Ok(importer.as_ref()),
            None => Err(ArchiveError::FormatMismatch {
                expected: self.expected_label(kind),
                found: found.unwrap_or("").to_string(),
            }),
        }
    }

    fn expected_label(&self, kind: ArchiveKind) -> String {
        let formats = self.formats_for(kind);
        if formats.is_empty() {
            return format!("{kind}/v?");
        }
        formats
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" or ")
    }
}
