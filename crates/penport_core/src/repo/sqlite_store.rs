//! SQLite implementation of the archive store contracts.
//!
//! # Responsibility
//! - Persist imported aggregates and load aggregates for export.
//! - Keep SQL details and column encodings inside the repository boundary.
//!
//! # Invariants
//! - JSON columns hold serde_json encodings of the model values.
//! - Timestamps are epoch milliseconds.
//! - Owned collections are read back in creation order, so notebook pages
//!   always list parents before children.

use crate::db::migrations::latest_version;
use crate::model::common::{from_epoch_ms, to_epoch_ms, Language, ReviewStatus, SourceKind};
use crate::model::file::{AttachmentKind, AttachmentOwner, FileId, UploadedFile};
use crate::model::project::{
    Finding, FindingRowId, NotebookPage, NotebookPageId, Project, ProjectId, ProjectMember,
    ReportSection,
};
use crate::model::project_type::{ProjectType, ProjectTypeId};
use crate::model::template::{FindingTemplate, TemplateId, TemplateTranslation};
use crate::model::user::{User, UserId};
use crate::repo::store::{
    DestinationStore, FileDraft, FindingDraft, MemberDraft, NotebookPageDraft, ProjectDraft,
    ProjectTypeDraft, SectionDraft, SourceStore, StoreError, StoreResult, TemplateDraft,
};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

const REQUIRED_TABLES: &[&str] = &[
    "users",
    "finding_templates",
    "finding_template_translations",
    "project_types",
    "projects",
    "project_members",
    "report_sections",
    "findings",
    "notebook_pages",
    "uploaded_files",
];

const PROJECT_TYPE_SELECT_SQL: &str = "SELECT
    id,
    name,
    language,
    report_fields,
    report_sections,
    finding_fields,
    finding_field_order,
    finding_ordering,
    report_template,
    report_styles,
    report_preview_data,
    source,
    linked_project_id,
    created_at,
    updated_at
FROM project_types";

/// SQLite-backed store over one migrated connection.
pub struct SqliteArchiveStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteArchiveStore<'conn> {
    /// Creates a store from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> StoreResult<Self> {
        ensure_store_connection_ready(conn)?;
        Ok(Self { conn })
    }

    /// Inserts a user account. Users are managed outside the archive engine;
    /// this exists for seeding destinations.
    pub fn create_user(&self, user: &User) -> StoreResult<UserId> {
        self.conn.execute(
            "INSERT INTO users (
                id,
                username,
                email,
                phone,
                mobile,
                name,
                title_before,
                first_name,
                middle_name,
                last_name,
                title_after
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11);",
            params![
                user.id.to_string(),
                user.username.as_str(),
                user.email.as_deref(),
                user.phone.as_deref(),
                user.mobile.as_deref(),
                user.name.as_deref(),
                user.title_before.as_deref(),
                user.first_name.as_deref(),
                user.middle_name.as_deref(),
                user.last_name.as_deref(),
                user.title_after.as_deref(),
            ],
        )?;
        Ok(user.id)
    }

    fn load_files(
        &self,
        owner: AttachmentOwner,
        kind: AttachmentKind,
    ) -> StoreResult<Vec<UploadedFile>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, name_hash, content, uploaded_by, created_at
             FROM uploaded_files
             WHERE owner_kind = ?1
               AND owner_id = ?2
               AND file_kind = ?3
             ORDER BY rowid ASC;",
        )?;
        let mut rows = stmt.query(params![
            owner.kind_name(),
            owner.id().to_string(),
            kind.as_str()
        ])?;

        let mut files = Vec::new();
        while let Some(row) = rows.next()? {
            files.push(UploadedFile {
                id: parse_uuid(&row.get::<_, String>("id")?, "uploaded_files.id")?,
                name: row.get("name")?,
                name_hash: row.get("name_hash")?,
                content: row.get("content")?,
                uploaded_by: parse_optional_uuid(row.get("uploaded_by")?, "uploaded_files.uploaded_by")?,
                created_at: parse_timestamp(row.get("created_at")?, "uploaded_files.created_at")?,
            });
        }
        Ok(files)
    }

    fn load_members(&self, project_id: ProjectId) -> StoreResult<Vec<ProjectMember>> {
        let mut stmt = self.conn.prepare(
            "SELECT
                u.id AS id,
                u.username AS username,
                u.email AS email,
                u.phone AS phone,
                u.mobile AS mobile,
                u.name AS name,
                u.title_before AS title_before,
                u.first_name AS first_name,
                u.middle_name AS middle_name,
                u.last_name AS last_name,
                u.title_after AS title_after,
                m.roles AS roles
             FROM project_members m
             INNER JOIN users u ON u.id = m.user_id
             WHERE m.project_id = ?1
             ORDER BY m.rowid ASC;",
        )?;
        let mut rows = stmt.query([project_id.to_string()])?;
        let mut members = Vec::new();
        while let Some(row) = rows.next()? {
            members.push(ProjectMember {
                user: parse_user_row(row)?,
                roles: parse_json(&row.get::<_, String>("roles")?, "project_members.roles")?,
            });
        }
        Ok(members)
    }

    fn load_sections(&self, project_id: ProjectId) -> StoreResult<Vec<ReportSection>> {
        let mut stmt = self.conn.prepare(
            "SELECT section_id, assignee_id, status, created_at
             FROM report_sections
             WHERE project_id = ?1
             ORDER BY rowid ASC;",
        )?;
        let mut rows = stmt.query([project_id.to_string()])?;
        let mut sections = Vec::new();
        while let Some(row) = rows.next()? {
            sections.push(ReportSection {
                section_id: row.get("section_id")?,
                assignee: parse_optional_uuid(row.get("assignee_id")?, "report_sections.assignee_id")?,
                status: parse_status(&row.get::<_, String>("status")?, "report_sections.status")?,
                created_at: parse_timestamp(row.get("created_at")?, "report_sections.created_at")?,
            });
        }
        Ok(sections)
    }

    fn load_findings(&self, project_id: ProjectId) -> StoreResult<Vec<Finding>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, finding_id, assignee_id, template_id, status, sort_order, data, created_at
             FROM findings
             WHERE project_id = ?1
             ORDER BY sort_order ASC, rowid ASC;",
        )?;
        let mut rows = stmt.query([project_id.to_string()])?;
        let mut findings = Vec::new();
        while let Some(row) = rows.next()? {
            findings.push(Finding {
                id: parse_uuid(&row.get::<_, String>("id")?, "findings.id")?,
                finding_id: row.get("finding_id")?,
                assignee: parse_optional_uuid(row.get("assignee_id")?, "findings.assignee_id")?,
                template_id: parse_optional_uuid(row.get("template_id")?, "findings.template_id")?,
                status: parse_status(&row.get::<_, String>("status")?, "findings.status")?,
                order: row.get("sort_order")?,
                data: parse_json(&row.get::<_, String>("data")?, "findings.data")?,
                created_at: parse_timestamp(row.get("created_at")?, "findings.created_at")?,
            });
        }
        Ok(findings)
    }

    fn load_notebook_pages(&self, project_id: ProjectId) -> StoreResult<Vec<NotebookPage>> {
        let mut stmt = self.conn.prepare(
            "SELECT
                id,
                note_id,
                parent_id,
                title,
                text,
                checked,
                icon_emoji,
                status_emoji,
                assignee_id,
                sort_order,
                created_at
             FROM notebook_pages
             WHERE project_id = ?1
             ORDER BY rowid ASC;",
        )?;
        let mut rows = stmt.query([project_id.to_string()])?;
        let mut pages = Vec::new();
        while let Some(row) = rows.next()? {
            let checked = row
                .get::<_, Option<i64>>("checked")?
                .map(|value| parse_bool(value, "notebook_pages.checked"))
                .transpose()?;
            pages.push(NotebookPage {
                id: parse_uuid(&row.get::<_, String>("id")?, "notebook_pages.id")?,
                note_id: row.get("note_id")?,
                parent_id: parse_optional_uuid(row.get("parent_id")?, "notebook_pages.parent_id")?,
                title: row.get("title")?,
                text: row.get("text")?,
                checked,
                icon_emoji: row.get("icon_emoji")?,
                status_emoji: row.get("status_emoji")?,
                assignee: parse_optional_uuid(row.get("assignee_id")?, "notebook_pages.assignee_id")?,
                order: row.get("sort_order")?,
                created_at: parse_timestamp(row.get("created_at")?, "notebook_pages.created_at")?,
            });
        }
        Ok(pages)
    }
}

impl DestinationStore for SqliteArchiveStore<'_> {
    fn atomically<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&Self) -> Result<T, E>,
        E: From<StoreError>,
    {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)
            .map_err(StoreError::from)?;
        // Dropping `tx` on the error path rolls the whole unit back.
        let value = work(self)?;
        tx.commit().map_err(StoreError::from)?;
        Ok(value)
    }

    fn find_user(&self, id: UserId) -> StoreResult<Option<User>> {
        let mut stmt = self.conn.prepare(
            "SELECT
                id,
                username,
                email,
                phone,
                mobile,
                name,
                title_before,
                first_name,
                middle_name,
                last_name,
                title_after
             FROM users
             WHERE id = ?1;",
        )?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_user_row(row)?));
        }
        Ok(None)
    }

    fn template_exists(&self, id: TemplateId) -> StoreResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM finding_templates WHERE id = ?1);",
            [id.to_string()],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn create_template(&self, draft: &TemplateDraft) -> StoreResult<TemplateId> {
        let template_id = Uuid::new_v4();
        self.conn.execute(
            "INSERT INTO finding_templates (id, tags, source, created_at)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                template_id.to_string(),
                to_json(&draft.tags)?,
                draft.source.as_str(),
                to_epoch_ms(draft.created_at),
            ],
        )?;

        for translation in &draft.translations {
            self.conn.execute(
                "INSERT INTO finding_template_translations (
                    id,
                    template_id,
                    is_main,
                    language,
                    status,
                    data,
                    created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
                params![
                    Uuid::new_v4().to_string(),
                    template_id.to_string(),
                    bool_to_int(translation.is_main),
                    translation.language.as_str(),
                    translation.status.as_str(),
                    to_json(&translation.data)?,
                    to_epoch_ms(translation.created_at),
                ],
            )?;
        }

        Ok(template_id)
    }

    fn create_project_type(&self, draft: &ProjectTypeDraft) -> StoreResult<ProjectTypeId> {
        let project_type_id = Uuid::new_v4();
        self.conn.execute(
            "INSERT INTO project_types (
                id,
                name,
                language,
                report_fields,
                report_sections,
                finding_fields,
                finding_field_order,
                finding_ordering,
                report_template,
                report_styles,
                report_preview_data,
                source,
                created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13);",
            params![
                project_type_id.to_string(),
                draft.name.as_str(),
                draft.language.as_str(),
                to_json(&draft.report_fields)?,
                to_json(&draft.report_sections)?,
                to_json(&draft.finding_fields)?,
                to_json(&draft.finding_field_order)?,
                to_json(&draft.finding_ordering)?,
                draft.report_template.as_str(),
                draft.report_styles.as_str(),
                to_json(&draft.report_preview_data)?,
                draft.source.as_str(),
                to_epoch_ms(draft.created_at),
            ],
        )?;
        Ok(project_type_id)
    }

    fn link_project_type(
        &self,
        project_type_id: ProjectTypeId,
        project_id: ProjectId,
    ) -> StoreResult<()> {
        let changed = self.conn.execute(
            "UPDATE project_types
             SET linked_project_id = ?2,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![project_type_id.to_string(), project_id.to_string()],
        )?;
        if changed == 0 {
            return Err(StoreError::InvalidData(format!(
                "project type not found: {project_type_id}"
            )));
        }
        Ok(())
    }

    fn create_project(&self, draft: &ProjectDraft) -> StoreResult<ProjectId> {
        let project_id = Uuid::new_v4();
        self.conn.execute(
            "INSERT INTO projects (
                id,
                name,
                language,
                tags,
                project_type_id,
                override_finding_order,
                report_data,
                imported_members,
                source,
                created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10);",
            params![
                project_id.to_string(),
                draft.name.as_str(),
                draft.language.as_str(),
                to_json(&draft.tags)?,
                draft.project_type_id.to_string(),
                bool_to_int(draft.override_finding_order),
                to_json(&draft.report_data)?,
                to_json(&draft.imported_members)?,
                draft.source.as_str(),
                to_epoch_ms(draft.created_at),
            ],
        )?;
        Ok(project_id)
    }

    fn add_members(&self, project_id: ProjectId, members: &[MemberDraft]) -> StoreResult<()> {
        for member in members {
            self.conn.execute(
                "INSERT INTO project_members (project_id, user_id, roles)
                 VALUES (?1, ?2, ?3);",
                params![
                    project_id.to_string(),
                    member.user_id.to_string(),
                    to_json(&member.roles)?,
                ],
            )?;
        }
        Ok(())
    }

    fn create_sections(
        &self,
        project_id: ProjectId,
        sections: &[SectionDraft],
    ) -> StoreResult<()> {
        for section in sections {
            self.conn.execute(
                "INSERT INTO report_sections (
                    project_id,
                    section_id,
                    assignee_id,
                    status,
                    created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5);",
                params![
                    project_id.to_string(),
                    section.section_id.as_str(),
                    section.assignee.map(|value| value.to_string()),
                    section.status.as_str(),
                    to_epoch_ms(section.created_at),
                ],
            )?;
        }
        Ok(())
    }

    fn create_findings(
        &self,
        project_id: ProjectId,
        findings: &[FindingDraft],
    ) -> StoreResult<Vec<FindingRowId>> {
        let mut ids = Vec::with_capacity(findings.len());
        for finding in findings {
            let id = Uuid::new_v4();
            self.conn.execute(
                "INSERT INTO findings (
                    id,
                    project_id,
                    finding_id,
                    assignee_id,
                    template_id,
                    status,
                    sort_order,
                    data,
                    created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
                params![
                    id.to_string(),
                    project_id.to_string(),
                    finding.finding_id.as_str(),
                    finding.assignee.map(|value| value.to_string()),
                    finding.template_id.map(|value| value.to_string()),
                    finding.status.as_str(),
                    finding.order,
                    to_json(&finding.data)?,
                    to_epoch_ms(finding.created_at),
                ],
            )?;
            ids.push(id);
        }
        Ok(ids)
    }

    fn create_notebook_pages(
        &self,
        project_id: ProjectId,
        pages: &[NotebookPageDraft],
    ) -> StoreResult<Vec<NotebookPageId>> {
        let mut ids: Vec<NotebookPageId> = Vec::with_capacity(pages.len());
        for (index, page) in pages.iter().enumerate() {
            let parent_id = match page.parent_index {
                Some(parent_index) if parent_index < index => Some(ids[parent_index]),
                Some(parent_index) => {
                    return Err(StoreError::InvalidData(format!(
                        "notebook page `{}` links to parent index {parent_index} that is not created before it",
                        page.note_id
                    )));
                }
                None => None,
            };

            let id = Uuid::new_v4();
            self.conn.execute(
                "INSERT INTO notebook_pages (
                    id,
                    project_id,
                    note_id,
                    parent_id,
                    title,
                    text,
                    checked,
                    icon_emoji,
                    status_emoji,
                    assignee_id,
                    sort_order,
                    created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12);",
                params![
                    id.to_string(),
                    project_id.to_string(),
                    page.note_id.as_str(),
                    parent_id.map(|value| value.to_string()),
                    page.title.as_str(),
                    page.text.as_str(),
                    page.checked.map(bool_to_int),
                    page.icon_emoji.as_deref(),
                    page.status_emoji.as_deref(),
                    page.assignee.map(|value| value.to_string()),
                    page.order,
                    to_epoch_ms(page.created_at),
                ],
            )?;
            ids.push(id);
        }
        Ok(ids)
    }

    fn create_files(
        &self,
        owner: AttachmentOwner,
        kind: AttachmentKind,
        files: &[FileDraft],
    ) -> StoreResult<Vec<FileId>> {
        let mut ids = Vec::with_capacity(files.len());
        for file in files {
            let id = Uuid::new_v4();
            self.conn.execute(
                "INSERT INTO uploaded_files (
                    id,
                    owner_kind,
                    owner_id,
                    file_kind,
                    name,
                    name_hash,
                    content,
                    uploaded_by,
                    created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
                params![
                    id.to_string(),
                    owner.kind_name(),
                    owner.id().to_string(),
                    kind.as_str(),
                    file.name.as_str(),
                    file.name_hash.as_str(),
                    file.content.as_slice(),
                    file.uploaded_by.map(|value| value.to_string()),
                    to_epoch_ms(file.created_at),
                ],
            )?;
            ids.push(id);
        }
        Ok(ids)
    }
}

impl SourceStore for SqliteArchiveStore<'_> {
    fn load_template(&self, id: TemplateId) -> StoreResult<Option<FindingTemplate>> {
        let header = self
            .conn
            .query_row(
                "SELECT tags, source, created_at, updated_at
                 FROM finding_templates
                 WHERE id = ?1;",
                [id.to_string()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, i64>(3)?,
                    ))
                },
            )
            .optional()?;
        let Some((tags, source, created_at, updated_at)) = header else {
            return Ok(None);
        };

        let mut stmt = self.conn.prepare(
            "SELECT id, is_main, language, status, data, created_at
             FROM finding_template_translations
             WHERE template_id = ?1
             ORDER BY is_main DESC, rowid ASC;",
        )?;
        let mut rows = stmt.query([id.to_string()])?;
        let mut translations = Vec::new();
        while let Some(row) = rows.next()? {
            translations.push(TemplateTranslation {
                id: parse_uuid(&row.get::<_, String>("id")?, "finding_template_translations.id")?,
                is_main: parse_bool(row.get("is_main")?, "finding_template_translations.is_main")?,
                language: parse_language(
                    &row.get::<_, String>("language")?,
                    "finding_template_translations.language",
                )?,
                status: parse_status(
                    &row.get::<_, String>("status")?,
                    "finding_template_translations.status",
                )?,
                data: parse_json(&row.get::<_, String>("data")?, "finding_template_translations.data")?,
                created_at: parse_timestamp(
                    row.get("created_at")?,
                    "finding_template_translations.created_at",
                )?,
            });
        }

        Ok(Some(FindingTemplate {
            id,
            tags: parse_json(&tags, "finding_templates.tags")?,
            source: parse_source(&source, "finding_templates.source")?,
            created_at: parse_timestamp(created_at, "finding_templates.created_at")?,
            updated_at: parse_timestamp(updated_at, "finding_templates.updated_at")?,
            translations,
            images: self.load_files(AttachmentOwner::Template(id), AttachmentKind::Images)?,
        }))
    }

    fn load_project_type(&self, id: ProjectTypeId) -> StoreResult<Option<ProjectType>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{PROJECT_TYPE_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        let Some(row) = rows.next()? else {
            return Ok(None);
        };

        Ok(Some(ProjectType {
            id,
            name: row.get("name")?,
            language: parse_language(&row.get::<_, String>("language")?, "project_types.language")?,
            report_fields: parse_json(
                &row.get::<_, String>("report_fields")?,
                "project_types.report_fields",
            )?,
            report_sections: parse_json(
                &row.get::<_, String>("report_sections")?,
                "project_types.report_sections",
            )?,
            finding_fields: parse_json(
                &row.get::<_, String>("finding_fields")?,
                "project_types.finding_fields",
            )?,
            finding_field_order: parse_json(
                &row.get::<_, String>("finding_field_order")?,
                "project_types.finding_field_order",
            )?,
            finding_ordering: parse_json(
                &row.get::<_, String>("finding_ordering")?,
                "project_types.finding_ordering",
            )?,
            report_template: row.get("report_template")?,
            report_styles: row.get("report_styles")?,
            report_preview_data: parse_json(
                &row.get::<_, String>("report_preview_data")?,
                "project_types.report_preview_data",
            )?,
            source: parse_source(&row.get::<_, String>("source")?, "project_types.source")?,
            linked_project: parse_optional_uuid(
                row.get("linked_project_id")?,
                "project_types.linked_project_id",
            )?,
            created_at: parse_timestamp(row.get("created_at")?, "project_types.created_at")?,
            updated_at: parse_timestamp(row.get("updated_at")?, "project_types.updated_at")?,
            assets: self.load_files(AttachmentOwner::ProjectType(id), AttachmentKind::Assets)?,
        }))
    }

    fn load_project(&self, id: ProjectId) -> StoreResult<Option<Project>> {
        let header = self
            .conn
            .query_row(
                "SELECT
                    name,
                    language,
                    tags,
                    project_type_id,
                    override_finding_order,
                    report_data,
                    imported_members,
                    source,
                    created_at,
                    updated_at
                 FROM projects
                 WHERE id = ?1;",
                [id.to_string()],
                |row| {
                    Ok(ProjectHeaderRow {
                        name: row.get(0)?,
                        language: row.get(1)?,
                        tags: row.get(2)?,
                        project_type_id: row.get(3)?,
                        override_finding_order: row.get(4)?,
                        report_data: row.get(5)?,
                        imported_members: row.get(6)?,
                        source: row.get(7)?,
                        created_at: row.get(8)?,
                        updated_at: row.get(9)?,
                    })
                },
            )
            .optional()?;
        let Some(header) = header else {
            return Ok(None);
        };

        let project_type_id = parse_uuid(&header.project_type_id, "projects.project_type_id")?;
        let project_type = self.load_project_type(project_type_id)?.ok_or_else(|| {
            StoreError::InvalidData(format!(
                "project {id} references missing project type {project_type_id}"
            ))
        })?;

        Ok(Some(Project {
            id,
            name: header.name,
            language: parse_language(&header.language, "projects.language")?,
            tags: parse_json(&header.tags, "projects.tags")?,
            project_type,
            override_finding_order: parse_bool(
                header.override_finding_order,
                "projects.override_finding_order",
            )?,
            report_data: parse_json(&header.report_data, "projects.report_data")?,
            members: self.load_members(id)?,
            imported_members: parse_json(&header.imported_members, "projects.imported_members")?,
            sections: self.load_sections(id)?,
            findings: self.load_findings(id)?,
            notes: self.load_notebook_pages(id)?,
            images: self.load_files(AttachmentOwner::Project(id), AttachmentKind::Images)?,
            files: self.load_files(AttachmentOwner::Project(id), AttachmentKind::Files)?,
            source: parse_source(&header.source, "projects.source")?,
            created_at: parse_timestamp(header.created_at, "projects.created_at")?,
            updated_at: parse_timestamp(header.updated_at, "projects.updated_at")?,
        }))
    }
}

struct ProjectHeaderRow {
    name: String,
    language: String,
    tags: String,
    project_type_id: String,
    override_finding_order: i64,
    report_data: String,
    imported_members: String,
    source: String,
    created_at: i64,
    updated_at: i64,
}

fn parse_user_row(row: &Row<'_>) -> StoreResult<User> {
    Ok(User {
        id: parse_uuid(&row.get::<_, String>("id")?, "users.id")?,
        username: row.get("username")?,
        email: row.get("email")?,
        phone: row.get("phone")?,
        mobile: row.get("mobile")?,
        name: row.get("name")?,
        title_before: row.get("title_before")?,
        first_name: row.get("first_name")?,
        middle_name: row.get("middle_name")?,
        last_name: row.get("last_name")?,
        title_after: row.get("title_after")?,
    })
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> StoreResult<String> {
    Ok(serde_json::to_string(value)?)
}

fn parse_json<T: DeserializeOwned>(value: &str, column: &'static str) -> StoreResult<T> {
    serde_json::from_str(value)
        .map_err(|err| StoreError::InvalidData(format!("invalid json in {column}: {err}")))
}

fn parse_uuid(value: &str, column: &'static str) -> StoreResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| StoreError::InvalidData(format!("invalid uuid `{value}` in {column}")))
}

fn parse_optional_uuid(value: Option<String>, column: &'static str) -> StoreResult<Option<Uuid>> {
    value.map(|value| parse_uuid(&value, column)).transpose()
}

fn parse_timestamp(value: i64, column: &'static str) -> StoreResult<DateTime<Utc>> {
    from_epoch_ms(value)
        .ok_or_else(|| StoreError::InvalidData(format!("invalid timestamp `{value}` in {column}")))
}

fn parse_language(value: &str, column: &'static str) -> StoreResult<Language> {
    Language::parse(value)
        .ok_or_else(|| StoreError::InvalidData(format!("invalid language `{value}` in {column}")))
}

fn parse_status(value: &str, column: &'static str) -> StoreResult<ReviewStatus> {
    ReviewStatus::parse(value)
        .ok_or_else(|| StoreError::InvalidData(format!("invalid status `{value}` in {column}")))
}

fn parse_source(value: &str, column: &'static str) -> StoreResult<SourceKind> {
    SourceKind::parse(value)
        .ok_or_else(|| StoreError::InvalidData(format!("invalid source `{value}` in {column}")))
}

fn parse_bool(value: i64, column: &'static str) -> StoreResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(StoreError::InvalidData(format!(
            "invalid boolean `{other}` in {column}"
        ))),
    }
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

fn ensure_store_connection_ready(conn: &Connection) -> StoreResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(StoreError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for table in REQUIRED_TABLES {
        let exists: i64 = conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table],
            |row| row.get(0),
        )?;
        if exists != 1 {
            return Err(StoreError::InvalidData(format!(
                "archive store requires table `{table}`"
            )));
        }
    }
    Ok(())
}
