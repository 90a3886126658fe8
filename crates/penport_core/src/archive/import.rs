//! Importers: assemble one aggregate root from one archived document.
//!
//! # Responsibility
//! - Decode and validate a document against its importer's format.
//! - Prepare every draft (references resolved, field documents reconciled,
//!   notebook tree planned, attachment bytes located) before the first write.
//! - Create the aggregate in a fixed order: dependencies, root, flat owned
//!   collections, notebook tree, attachments last.
//!
//! # Invariants
//! - Importers never open their own transaction; the caller runs a whole
//!   archive inside `DestinationStore::atomically`.
//! - Source ids only link fragments and locate attachment bytes; every
//!   created row gets a fresh destination identity.

use crate::archive::bundle::FileBundler;
use crate::archive::document::{
    FileFragment, NotebookPageFragment, ProjectFragment, ProjectTypeFragment, SourceId,
    TemplateV1Fragment, TemplateV2Fragment,
};
use crate::archive::error::{ArchiveError, ArchiveResult};
use crate::archive::reconcile::{reconcile, UndefinedFieldPolicy};
use crate::archive::registry::{DocumentImporter, ImportContext, ImportedRoot};
use crate::archive::resolve::{ReferenceResolver, ResolvedMember};
use crate::archive::tree::{self, TreeNode};
use crate::model::common::SourceKind;
use crate::model::file::{AttachmentKind, AttachmentOwner};
use crate::model::format::{ArchiveKind, FormatTag};
use crate::model::project_type::ProjectTypeId;
use crate::repo::store::{
    DestinationStore, FileDraft, FindingDraft, NotebookPageDraft, ProjectDraft, ProjectTypeDraft,
    SectionDraft, TemplateDraft, TranslationDraft,
};
use chrono::Utc;
use log::info;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::{HashMap, HashSet};

/// Legacy single-language templates.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateImporterV1;

/// Multilingual templates with images.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateImporterV2;

/// Standalone project types.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProjectTypeImporterV1;

/// Projects with their nested project type.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProjectImporterV1;

impl TemplateImporterV1 {
    pub fn tag() -> FormatTag {
        FormatTag::new(ArchiveKind::Templates.as_str(), 1)
    }
}

impl TemplateImporterV2 {
    pub fn tag() -> FormatTag {
        FormatTag::new(ArchiveKind::Templates.as_str(), 2)
    }
}

impl ProjectTypeImporterV1 {
    pub fn tag() -> FormatTag {
        FormatTag::new(ArchiveKind::ProjectTypes.as_str(), 1)
    }
}

impl ProjectImporterV1 {
    pub fn tag() -> FormatTag {
        FormatTag::new(ArchiveKind::Projects.as_str(), 1)
    }
}

impl<S: DestinationStore> DocumentImporter<S> for TemplateImporterV1 {
    fn format(&self) -> FormatTag {
        Self::tag()
    }

    fn import(
        &self,
        ctx: &ImportContext<'_, S>,
        path: &str,
        document: Value,
    ) -> ArchiveResult<ImportedRoot> {
        let fragment: TemplateV1Fragment = decode(path, document)?;
        Self::tag().validate(&fragment.format)?;

        let created_at = fragment.created.unwrap_or_else(Utc::now);
        let draft = TemplateDraft {
            tags: fragment.tags,
            source: SourceKind::Imported,
            created_at,
            translations: vec![TranslationDraft {
                is_main: true,
                language: fragment.language,
                status: fragment.status,
                data: fragment.data,
                created_at,
            }],
        };
        let template_id = ctx.store.create_template(&draft)?;

        info!(
            "event=document_import module=archive status=ok format={} source_id={} translations=1 images=0",
            fragment.format, fragment.id
        );
        Ok(ImportedRoot::Template(template_id))
    }
}

impl<S: DestinationStore> DocumentImporter<S> for TemplateImporterV2 {
    fn format(&self) -> FormatTag {
        Self::tag()
    }

    fn import(
        &self,
        ctx: &ImportContext<'_, S>,
        path: &str,
        document: Value,
    ) -> ArchiveResult<ImportedRoot> {
        let fragment: TemplateV2Fragment = decode(path, document)?;
        Self::tag().validate(&fragment.format)?;
        validate_translations(&fragment)?;

        let bundler = FileBundler::new(ctx.bundle, ctx.options);
        let images = bundler.prepare(
            "template",
            &fragment.id,
            AttachmentKind::Images,
            &fragment.images,
        )?;

        let created_at = fragment.created.unwrap_or_else(Utc::now);
        let translations: Vec<TranslationDraft> = fragment
            .translations
            .iter()
            .map(|translation| TranslationDraft {
                is_main: translation.is_main,
                language: translation.language,
                status: translation.status,
                data: translation.data.clone(),
                created_at: translation.created.unwrap_or(created_at),
            })
            .collect();
        let draft = TemplateDraft {
            tags: fragment.tags.clone(),
            source: SourceKind::Imported,
            created_at,
            translations,
        };

        let template_id = ctx.store.create_template(&draft)?;
        let image_count = bundler.persist(
            ctx.store,
            AttachmentOwner::Template(template_id),
            AttachmentKind::Images,
            &images,
        )?;

        info!(
            "event=document_import module=archive status=ok format={} source_id={} translations={} images={image_count}",
            fragment.format,
            fragment.id,
            draft.translations.len()
        );
        Ok(ImportedRoot::Template(template_id))
    }
}

impl<S: DestinationStore> DocumentImporter<S> for ProjectTypeImporterV1 {
    fn format(&self) -> FormatTag {
        Self::tag()
    }

    fn import(
        &self,
        ctx: &ImportContext<'_, S>,
        path: &str,
        document: Value,
    ) -> ArchiveResult<ImportedRoot> {
        let fragment: ProjectTypeFragment = decode(path, document)?;
        let bundler = FileBundler::new(ctx.bundle, ctx.options);
        let prepared = prepare_project_type(&bundler, fragment, SourceKind::Imported)?;
        let project_type_id = create_project_type(ctx.store, &bundler, &prepared)?;

        info!(
            "event=document_import module=archive status=ok format={} source_id={} assets={}",
            Self::tag(),
            prepared.source_id,
            prepared.assets.len()
        );
        Ok(ImportedRoot::ProjectType(project_type_id))
    }
}

impl<S: DestinationStore> DocumentImporter<S> for ProjectImporterV1 {
    fn format(&self) -> FormatTag {
        Self::tag()
    }

    fn import(
        &self,
        ctx: &ImportContext<'_, S>,
        path: &str,
        document: Value,
    ) -> ArchiveResult<ImportedRoot> {
        let mut fragment: ProjectFragment = decode(path, document)?;
        Self::tag().validate(&fragment.format)?;

        let bundler = FileBundler::new(ctx.bundle, ctx.options);
        let resolver = ReferenceResolver::new(ctx.store);
        let export_all = ctx.options.export_all;

        let project_type = prepare_project_type(
            &bundler,
            fragment.project_type.clone(),
            SourceKind::ImportedDependency,
        )?;

        let images = bundler.prepare(
            "project",
            &fragment.id,
            AttachmentKind::Images,
            &fragment.images,
        )?;
        let files = if export_all {
            let fragments: &[FileFragment] = fragment.files.as_deref().unwrap_or_default();
            bundler.prepare("project", &fragment.id, AttachmentKind::Files, fragments)?
        } else {
            Vec::new()
        };

        let mut members = Vec::new();
        let mut imported_members = Vec::new();
        let mut member_ids = HashSet::new();
        for member in &fragment.members {
            match resolver.member(member)? {
                ResolvedMember::Existing(draft) => {
                    if member_ids.insert(draft.user_id) {
                        members.push(draft);
                    }
                }
                ResolvedMember::Snapshot(snapshot) => imported_members.push(snapshot),
            }
        }

        let report_data = reconcile(
            &fragment.report_data,
            &project_type.draft.report_fields,
            UndefinedFieldPolicy::FillNull,
            true,
        );

        let archived_sections: HashMap<&str, _> = fragment
            .sections
            .iter()
            .map(|section| (section.id.as_str(), section))
            .collect();
        let mut sections = Vec::with_capacity(project_type.draft.report_sections.len());
        for definition in &project_type.draft.report_sections {
            let archived = archived_sections.get(definition.id.as_str());
            sections.push(SectionDraft {
                section_id: definition.id.clone(),
                assignee: match archived {
                    Some(section) => resolver.user(section.assignee.as_ref(), "section.assignee")?,
                    None => None,
                },
                status: archived.map(|section| section.status).unwrap_or_default(),
                created_at: archived
                    .and_then(|section| section.created)
                    .unwrap_or_else(Utc::now),
            });
        }

        let mut finding_ids = HashSet::with_capacity(fragment.findings.len());
        let mut findings = Vec::with_capacity(fragment.findings.len());
        for finding in &fragment.findings {
            if !finding_ids.insert(finding.id.as_str()) {
                return Err(ArchiveError::validation(
                    "project",
                    fragment.id.as_str(),
                    format!("duplicate finding id `{}`", finding.id),
                ));
            }
            findings.push(FindingDraft {
                finding_id: finding.id.clone(),
                assignee: resolver.user(finding.assignee.as_ref(), "finding.assignee")?,
                template_id: resolver.template(finding.template.as_ref())?,
                status: finding.status,
                order: finding.order,
                data: reconcile(
                    &finding.data,
                    &project_type.draft.finding_fields,
                    UndefinedFieldPolicy::FillNull,
                    true,
                ),
                created_at: finding.created.unwrap_or_else(Utc::now),
            });
        }

        let notes = if export_all {
            plan_notebook(&resolver, fragment.notes.take().unwrap_or_default())?
        } else {
            Vec::new()
        };

        let project_type_id = create_project_type(ctx.store, &bundler, &project_type)?;
        let project_id = ctx.store.create_project(&ProjectDraft {
            name: fragment.name.clone(),
            language: fragment.language,
            tags: fragment.tags.clone(),
            project_type_id,
            override_finding_order: fragment.override_finding_order,
            report_data,
            imported_members,
            source: SourceKind::Imported,
            created_at: fragment.created.unwrap_or_else(Utc::now),
        })?;
        ctx.store.link_project_type(project_type_id, project_id)?;
        ctx.store.add_members(project_id, &members)?;
        ctx.store.create_sections(project_id, &sections)?;
        ctx.store.create_findings(project_id, &findings)?;
        ctx.store.create_notebook_pages(project_id, &notes)?;

        let owner = AttachmentOwner::Project(project_id);
        bundler.persist(ctx.store, owner, AttachmentKind::Images, &images)?;
        bundler.persist(ctx.store, owner, AttachmentKind::Files, &files)?;

        info!(
            "event=document_import module=archive status=ok format={} source_id={} members={} sections={} findings={} notes={} images={} files={}",
            fragment.format,
            fragment.id,
            members.len(),
            sections.len(),
            findings.len(),
            notes.len(),
            images.len(),
            files.len()
        );
        Ok(ImportedRoot::Project(project_id))
    }
}

/// Project type draft with its located asset bytes.
struct PreparedProjectType {
    source_id: SourceId,
    draft: ProjectTypeDraft,
    assets: Vec<FileDraft>,
}

fn prepare_project_type(
    bundler: &FileBundler<'_>,
    fragment: ProjectTypeFragment,
    source: SourceKind,
) -> ArchiveResult<PreparedProjectType> {
    ProjectTypeImporterV1::tag().validate(&fragment.format)?;
    let assets = bundler.prepare(
        "project type",
        &fragment.id,
        AttachmentKind::Assets,
        &fragment.assets,
    )?;

    Ok(PreparedProjectType {
        source_id: fragment.id,
        draft: ProjectTypeDraft {
            name: fragment.name,
            language: fragment.language,
            report_fields: fragment.report_fields,
            report_sections: fragment.report_sections,
            finding_fields: fragment.finding_fields,
            finding_field_order: fragment.finding_field_order,
            finding_ordering: fragment.finding_ordering,
            report_template: fragment.report_template,
            report_styles: fragment.report_styles,
            report_preview_data: fragment.report_preview_data,
            source,
            created_at: fragment.created.unwrap_or_else(Utc::now),
        },
        assets,
    })
}

fn create_project_type<S: DestinationStore>(
    store: &S,
    bundler: &FileBundler<'_>,
    prepared: &PreparedProjectType,
) -> ArchiveResult<ProjectTypeId> {
    let project_type_id = store.create_project_type(&prepared.draft)?;
    bundler.persist(
        store,
        AttachmentOwner::ProjectType(project_type_id),
        AttachmentKind::Assets,
        &prepared.assets,
    )?;
    Ok(project_type_id)
}

fn plan_notebook<S: DestinationStore>(
    resolver: &ReferenceResolver<'_, S>,
    pages: Vec<NotebookPageFragment>,
) -> ArchiveResult<Vec<NotebookPageDraft>> {
    let nodes = pages
        .into_iter()
        .map(|page| TreeNode {
            local_id: page.id.clone(),
            parent_local_id: page.parent.clone(),
            order: page.order,
            payload: page,
        })
        .collect();

    let plan = tree::build(nodes)?;
    let mut drafts = Vec::with_capacity(plan.len());
    for planned in plan {
        let page = planned.payload;
        drafts.push(NotebookPageDraft {
            note_id: planned.local_id,
            parent_index: planned.parent_index,
            assignee: resolver.user(page.assignee.as_ref(), "note.assignee")?,
            title: page.title,
            text: page.text,
            checked: page.checked,
            icon_emoji: page.icon_emoji,
            status_emoji: page.status_emoji,
            order: planned.order,
            created_at: page.created.unwrap_or_else(Utc::now),
        });
    }
    Ok(drafts)
}

fn validate_translations(fragment: &TemplateV2Fragment) -> ArchiveResult<()> {
    let invalid = |message: &str| ArchiveError::validation("template", fragment.id.as_str(), message);

    if fragment.translations.is_empty() {
        return Err(invalid("at least one translation is required"));
    }
    let main_count = fragment
        .translations
        .iter()
        .filter(|translation| translation.is_main)
        .count();
    if main_count != 1 {
        return Err(invalid(&format!(
            "exactly one main translation is required, found {main_count}"
        )));
    }
    let mut languages = HashSet::with_capacity(fragment.translations.len());
    for translation in &fragment.translations {
        if !languages.insert(translation.language) {
            return Err(invalid(&format!(
                "duplicate translation language `{}`",
                translation.language.as_str()
            )));
        }
    }
    Ok(())
}

fn decode<T: DeserializeOwned>(path: &str, document: Value) -> ArchiveResult<T> {
    serde_json::from_value(document).map_err(|source| ArchiveError::MalformedDocument {
        path: path.to_string(),
        source,
    })
}
