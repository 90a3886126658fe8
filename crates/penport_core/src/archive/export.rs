//! Exporters: write aggregates from a source store into an archive bundle.
//!
//! Every root becomes one `{id}.json` document tagged with its kind's
//! current format. Attachments are written under the owner's id, which is
//! the source id a later import will look them up by.

use crate::archive::bundle::{export_files, ArchiveBundle};
use crate::archive::document::{
    FindingFragment, MemberFragment, NotebookPageFragment, ProjectFragment, ProjectTypeFragment,
    RefId, SectionFragment, SourceId, TemplateV2Fragment, TranslationFragment, UserRef,
};
use crate::archive::error::{ArchiveError, ArchiveResult};
use crate::config::ArchiveOptions;
use crate::model::file::AttachmentKind;
use crate::model::format::ArchiveKind;
use crate::model::project::{NotebookPageId, Project, ProjectId, ProjectMember};
use crate::model::project_type::{ProjectType, ProjectTypeId};
use crate::model::template::{FindingTemplate, TemplateId};
use crate::model::user::UserId;
use crate::repo::store::{SourceStore, StoreError};
use serde_json::Value;
use std::collections::HashMap;

pub struct Exporter<'a, S: SourceStore> {
    store: &'a S,
    options: ArchiveOptions,
}

impl<'a, S: SourceStore> Exporter<'a, S> {
    pub fn new(store: &'a S, options: ArchiveOptions) -> Self {
        Self { store, options }
    }

    pub fn export_templates(&self, ids: &[TemplateId]) -> ArchiveResult<ArchiveBundle> {
        let mut bundle = ArchiveBundle::new();
        for &id in ids {
            let template = self
                .store
                .load_template(id)?
                .ok_or_else(|| unknown("template", id))?;
            let fragment = template_fragment(&mut bundle, &template)?;
            bundle.put_document(&fragment.id, &fragment)?;
        }
        Ok(bundle)
    }

    pub fn export_project_types(&self, ids: &[ProjectTypeId]) -> ArchiveResult<ArchiveBundle> {
        let mut bundle = ArchiveBundle::new();
        for &id in ids {
            let project_type = self
                .store
                .load_project_type(id)?
                .ok_or_else(|| unknown("project type", id))?;
            let fragment = project_type_fragment(&mut bundle, &project_type)?;
            bundle.put_document(&fragment.id, &fragment)?;
        }
        Ok(bundle)
    }

    /// Exports projects with their project types. Notebooks and project
    /// files are only included when `export_all` is set.
    pub fn export_projects(&self, ids: &[ProjectId]) -> ArchiveResult<ArchiveBundle> {
        let mut bundle = ArchiveBundle::new();
        for &id in ids {
            let project = self
                .store
                .load_project(id)?
                .ok_or_else(|| unknown("project", id))?;
            let fragment = self.project_fragment(&mut bundle, &project)?;
            bundle.put_document(&fragment.id, &fragment)?;
        }
        Ok(bundle)
    }

    fn project_fragment(
        &self,
        bundle: &mut ArchiveBundle,
        project: &Project,
    ) -> ArchiveResult<ProjectFragment> {
        let source_id = SourceId::from(project.id);

        let mut members: Vec<MemberFragment> =
            project.members.iter().map(member_fragment).collect();
        for snapshot in &project.imported_members {
            let member = serde_json::from_value(Value::Object(snapshot.clone())).map_err(|err| {
                StoreError::InvalidData(format!(
                    "project {} holds an unreadable member snapshot: {err}",
                    project.id
                ))
            })?;
            members.push(member);
        }

        let (notes, files) = if self.options.export_all {
            (
                Some(notebook_fragments(project)),
                Some(export_files(
                    bundle,
                    &source_id,
                    AttachmentKind::Files,
                    &project.files,
                )?),
            )
        } else {
            (None, None)
        };

        Ok(ProjectFragment {
            format: ArchiveKind::Projects.current_format().to_string(),
            images: export_files(bundle, &source_id, AttachmentKind::Images, &project.images)?,
            id: source_id,
            created: Some(project.created_at),
            name: project.name.clone(),
            language: project.language,
            tags: project.tags.clone(),
            members,
            project_type: project_type_fragment(bundle, &project.project_type)?,
            override_finding_order: project.override_finding_order,
            report_data: project.report_data.clone(),
            sections: project
                .sections
                .iter()
                .map(|section| SectionFragment {
                    id: section.section_id.clone(),
                    created: Some(section.created_at),
                    assignee: section.assignee.map(user_ref),
                    status: section.status,
                })
                .collect(),
            findings: project
                .findings
                .iter()
                .map(|finding| FindingFragment {
                    id: finding.finding_id.clone(),
                    created: Some(finding.created_at),
                    assignee: finding.assignee.map(user_ref),
                    status: finding.status,
                    template: finding.template_id.map(RefId::from),
                    order: finding.order,
                    data: finding.data.clone(),
                })
                .collect(),
            notes,
            files,
        })
    }
}

fn template_fragment(
    bundle: &mut ArchiveBundle,
    template: &FindingTemplate,
) -> ArchiveResult<TemplateV2Fragment> {
    let source_id = SourceId::from(template.id);
    Ok(TemplateV2Fragment {
        format: ArchiveKind::Templates.current_format().to_string(),
        images: export_files(bundle, &source_id, AttachmentKind::Images, &template.images)?,
        id: source_id,
        created: Some(template.created_at),
        tags: template.tags.clone(),
        translations: template
            .translations
            .iter()
            .map(|translation| TranslationFragment {
                id: Some(SourceId::from(translation.id)),
                created: Some(translation.created_at),
                is_main: translation.is_main,
                language: translation.language,
                status: translation.status,
                data: translation.data.clone(),
            })
            .collect(),
    })
}

fn project_type_fragment(
    bundle: &mut ArchiveBundle,
    project_type: &ProjectType,
) -> ArchiveResult<ProjectTypeFragment> {
    let source_id = SourceId::from(project_type.id);
    Ok(ProjectTypeFragment {
        format: ArchiveKind::ProjectTypes.current_format().to_string(),
        assets: export_files(bundle, &source_id, AttachmentKind::Assets, &project_type.assets)?,
        id: source_id,
        created: Some(project_type.created_at),
        name: project_type.name.clone(),
        language: project_type.language,
        report_fields: project_type.report_fields.clone(),
        report_sections: project_type.report_sections.clone(),
        finding_fields: project_type.finding_fields.clone(),
        finding_field_order: project_type.finding_field_order.clone(),
        finding_ordering: project_type.finding_ordering.clone(),
        report_template: project_type.report_template.clone(),
        report_styles: project_type.report_styles.clone(),
        report_preview_data: project_type.report_preview_data.clone(),
    })
}

fn member_fragment(member: &ProjectMember) -> MemberFragment {
    let user = &member.user;
    MemberFragment {
        id: Some(RefId::from(user.id)),
        username: Some(user.username.clone()),
        name: user.name.clone(),
        title_before: user.title_before.clone(),
        first_name: user.first_name.clone(),
        middle_name: user.middle_name.clone(),
        last_name: user.last_name.clone(),
        title_after: user.title_after.clone(),
        email: user.email.clone(),
        phone: user.phone.clone(),
        mobile: user.mobile.clone(),
        roles: member.roles.clone(),
        extra: Default::default(),
    }
}

fn notebook_fragments(project: &Project) -> Vec<NotebookPageFragment> {
    let note_ids: HashMap<NotebookPageId, &str> = project
        .notes
        .iter()
        .map(|page| (page.id, page.note_id.as_str()))
        .collect();
    project
        .notes
        .iter()
        .map(|page| NotebookPageFragment {
            id: page.note_id.clone(),
            created: Some(page.created_at),
            title: page.title.clone(),
            text: page.text.clone(),
            checked: page.checked,
            icon_emoji: page.icon_emoji.clone(),
            status_emoji: page.status_emoji.clone(),
            assignee: page.assignee.map(user_ref),
            order: page.order,
            parent: page
                .parent_id
                .and_then(|parent_id| note_ids.get(&parent_id))
                .map(|note_id| note_id.to_string()),
        })
        .collect()
}

fn user_ref(user_id: UserId) -> UserRef {
    UserRef::Object {
        id: RefId::from(user_id),
    }
}

fn unknown(kind: &'static str, id: uuid::Uuid) -> ArchiveError {
    ArchiveError::UnknownEntity {
        kind,
        id: id.to_string(),
    }
}
