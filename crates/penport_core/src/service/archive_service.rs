//! Archive export/import use-case service.
//!
//! # Responsibility
//! - Provide the entry points callers use to export roots by id and to
//!   import a whole archive.
//! - Negotiate formats once per archive, then run every importer inside one
//!   store transaction.
//!
//! # Invariants
//! - An import either creates every root of the archive or nothing.
//! - A document whose format tag is not registered for the requested kind
//!   aborts the import before anything is written.

use crate::archive::bundle::ArchiveBundle;
use crate::archive::document::document_format;
use crate::archive::error::{ArchiveError, ArchiveResult};
use crate::archive::export::Exporter;
use crate::archive::registry::{ImportContext, ImportedRoot, ImporterRegistry};
use crate::config::ArchiveOptions;
use crate::model::format::ArchiveKind;
use crate::model::project::ProjectId;
use crate::model::project_type::ProjectTypeId;
use crate::model::template::TemplateId;
use crate::repo::store::{DestinationStore, SourceStore};
use log::{error, info};
use std::time::Instant;

/// Use-case facade over one store that is both export source and import
/// destination.
pub struct ArchiveService<S: DestinationStore + SourceStore> {
    store: S,
}

impl<S: DestinationStore + SourceStore> ArchiveService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn export_templates(
        &self,
        ids: &[TemplateId],
        options: ArchiveOptions,
    ) -> ArchiveResult<ArchiveBundle> {
        self.timed_export(ArchiveKind::Templates, ids.len(), || {
            Exporter::new(&self.store, options).export_templates(ids)
        })
    }

    pub fn export_project_types(
        &self,
        ids: &[ProjectTypeId],
        options: ArchiveOptions,
    ) -> ArchiveResult<ArchiveBundle> {
        self.timed_export(ArchiveKind::ProjectTypes, ids.len(), || {
            Exporter::new(&self.store, options).export_project_types(ids)
        })
    }

    pub fn export_projects(
        &self,
        ids: &[ProjectId],
        options: ArchiveOptions,
    ) -> ArchiveResult<ArchiveBundle> {
        self.timed_export(ArchiveKind::Projects, ids.len(), || {
            Exporter::new(&self.store, options).export_projects(ids)
        })
    }

    /// Imports every document of `bundle` as a root of `kind`.
    ///
    /// Returns the created roots in archive path order.
    pub fn import_archive(
        &self,
        kind: ArchiveKind,
        bundle: &ArchiveBundle,
        options: ArchiveOptions,
    ) -> ArchiveResult<Vec<ImportedRoot>> {
        let started_at = Instant::now();
        info!(
            "event=archive_import module=service status=start kind={kind} entries={}",
            bundle.len()
        );

        let result = self.import_documents(kind, bundle, &options);
        match &result {
            Ok(roots) => info!(
                "event=archive_import module=service status=ok kind={kind} roots={} export_all={} duration_ms={}",
                roots.len(),
                options.export_all,
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event=archive_import module=service status=error kind={kind} duration_ms={} error_code={} error={err}",
                started_at.elapsed().as_millis(),
                err.error_code()
            ),
        }
        result
    }

    pub fn import_templates(
        &self,
        bundle: &ArchiveBundle,
        options: ArchiveOptions,
    ) -> ArchiveResult<Vec<TemplateId>> {
        let roots = self.import_archive(ArchiveKind::Templates, bundle, options)?;
        Ok(roots
            .into_iter()
            .filter_map(|root| match root {
                ImportedRoot::Template(id) => Some(id),
                _ => None,
            })
            .collect())
    }

    pub fn import_project_types(
        &self,
        bundle: &ArchiveBundle,
        options: ArchiveOptions,
    ) -> ArchiveResult<Vec<ProjectTypeId>> {
        let roots = self.import_archive(ArchiveKind::ProjectTypes, bundle, options)?;
        Ok(roots
            .into_iter()
            .filter_map(|root| match root {
                ImportedRoot::ProjectType(id) => Some(id),
                _ => None,
            })
            .collect())
    }

    pub fn import_projects(
        &self,
        bundle: &ArchiveBundle,
        options: ArchiveOptions,
    ) -> ArchiveResult<Vec<ProjectId>> {
        let roots = self.import_archive(ArchiveKind::Projects, bundle, options)?;
        Ok(roots
            .into_iter()
            .filter_map(|root| match root {
                ImportedRoot::Project(id) => Some(id),
                _ => None,
            })
            .collect())
    }

    fn import_documents(
        &self,
        kind: ArchiveKind,
        bundle: &ArchiveBundle,
        options: &ArchiveOptions,
    ) -> ArchiveResult<Vec<ImportedRoot>> {
        let documents = bundle.documents()?;
        if documents.is_empty() {
            return Err(ArchiveError::validation(
                "archive",
                kind.as_str(),
                "archive contains no documents",
            ));
        }

        let registry = ImporterRegistry::<S>::with_defaults();
        let mut plan = Vec::with_capacity(documents.len());
        for (path, document) in documents {
            let importer = registry.resolve(kind, document_format(&document))?;
            plan.push((path, document, importer));
        }

        self.store.atomically(|store| -> ArchiveResult<Vec<ImportedRoot>> {
            let ctx = ImportContext {
                store,
                bundle,
                options,
            };
            let mut roots = Vec::with_capacity(plan.len());
            for (path, document, importer) in plan {
                roots.push(importer.import(&ctx, &path, document)?);
            }
            Ok(roots)
        })
    }

    fn timed_export(
        &self,
        kind: ArchiveKind,
        requested: usize,
        export: impl FnOnce() -> ArchiveResult<ArchiveBundle>,
    ) -> ArchiveResult<ArchiveBundle> {
        let started_at = Instant::now();
        info!("event=archive_export module=service status=start kind={kind} requested={requested}");

        let result = export();
        match &result {
            Ok(bundle) => info!(
                "event=archive_export module=service status=ok kind={kind} requested={requested} entries={} duration_ms={}",
                bundle.len(),
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event=archive_export module=service status=error kind={kind} duration_ms={} error_code={} error={err}",
                started_at.elapsed().as_millis(),
                err.error_code()
            ),
        }
        result
    }
}
