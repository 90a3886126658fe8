//! Archive container and attachment packing.
//!
//! # Responsibility
//! - Hold document and attachment entries and encode them as a ZIP archive.
//! - Map attachments to `{source-id}-{kind}/{name}` paths on export and back
//!   to file drafts on import.
//!
//! # Invariants
//! - Attachment paths are keyed by the owner's source id, never by a
//!   destination id.
//! - Attachment names never contain `/`, `\` or NUL and are never `.`/`..`.
//! - `name_hash` is recomputed on import and never read from the archive.

use crate::archive::document::{FileFragment, SourceId};
use crate::archive::error::{ArchiveError, ArchiveResult};
use crate::config::ArchiveOptions;
use crate::model::file::{hash_name, AttachmentKind, AttachmentOwner, UploadedFile};
use crate::repo::store::{DestinationStore, FileDraft};
use chrono::Utc;
use log::info;
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::io::{Cursor, Read, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

const DOCUMENT_SUFFIX: &str = ".json";

/// Rejects attachment names that could escape their archive directory.
pub fn validate_filename(name: &str) -> ArchiveResult<()> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', '\0']);
    if invalid {
        return Err(ArchiveError::InvalidFilename {
            name: name.to_string(),
        });
    }
    Ok(())
}

/// Archive path of one attachment.
pub fn archive_path(owner_source_id: &SourceId, kind: AttachmentKind, name: &str) -> String {
    format!("{owner_source_id}-{kind}/{name}")
}

/// In-memory archive: top-level `*.json` documents plus attachment entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchiveBundle {
    entries: BTreeMap<String, Vec<u8>>,
}

impl ArchiveBundle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Stores `document` as `{root_id}.json`.
    pub fn put_document<T: Serialize>(
        &mut self,
        root_id: &SourceId,
        document: &T,
    ) -> ArchiveResult<()> {
        let path = format!("{root_id}{DOCUMENT_SUFFIX}");
        let bytes = serde_json::to_vec_pretty(document).map_err(|source| {
            ArchiveError::MalformedDocument {
                path: path.clone(),
                source,
            }
        })?;
        self.entries.insert(path, bytes);
        Ok(())
    }

    /// Decodes every top-level document, in path order.
    pub fn documents(&self) -> ArchiveResult<Vec<(String, Value)>> {
        self.entries
            .iter()
            .filter(|(path, _)| path.ends_with(DOCUMENT_SUFFIX) && !path.contains('/'))
            .map(|(path, bytes)| {
                serde_json::from_slice(bytes)
                    .map(|document| (path.clone(), document))
                    .map_err(|source| ArchiveError::MalformedDocument {
                        path: path.clone(),
                        source,
                    })
            })
            .collect()
    }

    pub fn put_file(&mut self, path: impl Into<String>, content: Vec<u8>) {
        self.entries.insert(path.into(), content);
    }

    pub fn file(&self, path: &str) -> Option<&[u8]> {
        self.entries.get(path).map(Vec::as_slice)
    }

    /// Encodes the bundle as a deflate-compressed ZIP archive.
    pub fn to_zip_bytes(&self) -> ArchiveResult<Vec<u8>> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        for (path, bytes) in &self.entries {
            writer.start_file(path.as_str(), options)?;
            writer.write_all(bytes)?;
        }
        Ok(writer.finish()?.into_inner())
    }

    /// Decodes a ZIP archive. Directory entries are skipped.
    pub fn from_zip_bytes(bytes: &[u8]) -> ArchiveResult<Self> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))?;
        let mut entries = BTreeMap::new();
        for index in 0..archive.len() {
            let mut entry = archive.by_index(index)?;
            if entry.is_dir() {
                continue;
            }
            let mut content = Vec::new();
            entry.read_to_end(&mut content)?;
            entries.insert(entry.name().to_string(), content);
        }
        Ok(Self { entries })
    }
}

/// Writes attachments into `bundle` and returns their fragments.
pub fn export_files(
    bundle: &mut ArchiveBundle,
    owner_source_id: &SourceId,
    kind: AttachmentKind,
    files: &[UploadedFile],
) -> ArchiveResult<Vec<FileFragment>> {
    let mut fragments = Vec::with_capacity(files.len());
    for file in files {
        validate_filename(&file.name)?;
        bundle.put_file(
            archive_path(owner_source_id, kind, &file.name),
            file.content.clone(),
        );
        fragments.push(FileFragment {
            id: Some(SourceId::from(file.id)),
            created: Some(file.created_at),
            name: file.name.clone(),
        });
    }
    Ok(fragments)
}

/// Turns archived attachment fragments into drafts for a new owner.
pub struct FileBundler<'a> {
    bundle: &'a ArchiveBundle,
    options: &'a ArchiveOptions,
}

impl<'a> FileBundler<'a> {
    pub fn new(bundle: &'a ArchiveBundle, options: &'a ArchiveOptions) -> Self {
        Self { bundle, options }
    }

    /// Validates names and locates bytes without writing anything.
    ///
    /// `entity` and `owner_source_id` name the owner in errors; bytes are
    /// looked up under `owner_source_id` as recorded in the archive.
    pub fn prepare(
        &self,
        entity: &'static str,
        owner_source_id: &SourceId,
        kind: AttachmentKind,
        fragments: &[FileFragment],
    ) -> ArchiveResult<Vec<FileDraft>> {
        let mut seen = HashSet::with_capacity(fragments.len());
        let mut drafts = Vec::with_capacity(fragments.len());
        for fragment in fragments {
            validate_filename(&fragment.name)?;
            if !seen.insert(fragment.name.as_str()) {
                return Err(ArchiveError::validation(
                    entity,
                    owner_source_id.as_str(),
                    format!("duplicate {kind} name `{}`", fragment.name),
                ));
            }

            let path = archive_path(owner_source_id, kind, &fragment.name);
            let Some(content) = self.bundle.file(&path) else {
                return Err(ArchiveError::MissingAttachment {
                    kind: entity,
                    id: owner_source_id.to_string(),
                    path,
                });
            };

            drafts.push(FileDraft {
                name: fragment.name.clone(),
                name_hash: hash_name(&fragment.name),
                content: content.to_vec(),
                uploaded_by: self.options.uploaded_by,
                created_at: fragment.created.unwrap_or_else(Utc::now),
            });
        }
        Ok(drafts)
    }

    /// Persists prepared drafts for their new owner.
    pub fn persist<S: DestinationStore>(
        &self,
        store: &S,
        owner: AttachmentOwner,
        kind: AttachmentKind,
        drafts: &[FileDraft],
    ) -> ArchiveResult<usize> {
        if drafts.is_empty() {
            return Ok(0);
        }
        let created = store.create_files(owner, kind, drafts)?;
        info!(
            "event=attachment_import module=archive status=ok owner_kind={} owner_id={} kind={kind} count={}",
            owner.kind_name(),
            owner.id(),
            created.len()
        );
        Ok(created.len())
    }
}

#[cfg(test)]
mod tests {
    use super::{archive_path, validate_filename, ArchiveBundle, FileBundler};
    use crate::archive::document::{FileFragment, SourceId};
    use crate::archive::error::ArchiveError;
    use crate::config::ArchiveOptions;
    use crate::model::file::{hash_name, AttachmentKind};
    use serde_json::json;
    use uuid::Uuid;

    fn fragment(name: &str) -> FileFragment {
        FileFragment {
            id: None,
            created: None,
            name: name.to_string(),
        }
    }

    #[test]
    fn rejects_path_escaping_names() {
        for name in ["../x", "a/b", "a\\b", "a\0b", "", "..", "."] {
            let err = validate_filename(name).expect_err("name should be rejected");
            assert!(matches!(err, ArchiveError::InvalidFilename { .. }));
        }
        validate_filename("pic.png").expect("plain name should pass");
        validate_filename("..pic").expect("leading dots without separator should pass");
    }

    #[test]
    fn path_is_keyed_by_source_id() {
        let source_id = SourceId::new("7").expect("id");
        assert_eq!(
            archive_path(&source_id, AttachmentKind::Images, "pic.png"),
            "7-images/pic.png"
        );
    }

    #[test]
    fn zip_encoding_keeps_entries() {
        let mut bundle = ArchiveBundle::new();
        let root = SourceId::new("7").expect("id");
        bundle
            .put_document(&root, &json!({"format": "templates/v2", "id": "7"}))
            .expect("document");
        bundle.put_file("7-images/pic.png", vec![1, 2, 3]);

        let bytes = bundle.to_zip_bytes().expect("encode");
        let decoded = ArchiveBundle::from_zip_bytes(&bytes).expect("decode");
        assert_eq!(decoded, bundle);

        let documents = decoded.documents().expect("documents");
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].0, "7.json");
    }

    #[test]
    fn garbage_is_not_a_zip_archive() {
        let err = ArchiveBundle::from_zip_bytes(b"not a zip").expect_err("decode should fail");
        assert_eq!(err.error_code(), "ARCHIVE_CONTAINER_ERROR");
    }

    #[test]
    fn declared_entry_size_is_not_trusted() {
        let mut bundle = ArchiveBundle::new();
        bundle.put_file("7-images/pic.png", vec![7; 64]);
        let mut bytes = bundle.to_zip_bytes().expect("encode");

        // Central directory record: uncompressed size lives at offset 24.
        let header = bytes
            .windows(4)
            .position(|window| window == [0x50, 0x4b, 0x01, 0x02])
            .expect("central directory record");
        bytes[header + 24..header + 28].copy_from_slice(&0xFFFF_FFFEu32.to_le_bytes());

        match ArchiveBundle::from_zip_bytes(&bytes) {
            Ok(decoded) => assert_eq!(decoded.file("7-images/pic.png"), Some([7; 64].as_slice())),
            Err(err) => assert!(matches!(
                err,
                ArchiveError::Archive(_) | ArchiveError::Io(_)
            )),
        }
    }

    #[test]
    fn prepare_recomputes_hash_and_records_uploader() {
        let mut bundle = ArchiveBundle::new();
        bundle.put_file("7-images/pic.png", vec![9]);
        let uploader = Uuid::new_v4();
        let options = ArchiveOptions::default().with_uploaded_by(uploader);
        let bundler = FileBundler::new(&bundle, &options);

        let drafts = bundler
            .prepare(
                "template",
                &SourceId::new("7").expect("id"),
                AttachmentKind::Images,
                &[fragment("pic.png")],
            )
            .expect("prepare");
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].name_hash, hash_name("pic.png"));
        assert_eq!(drafts[0].content, vec![9]);
        assert_eq!(drafts[0].uploaded_by, Some(uploader));
    }

    #[test]
    fn prepare_reports_missing_and_duplicate_entries() {
        let mut bundle = ArchiveBundle::new();
        bundle.put_file("7-files/a.txt", vec![1]);
        let options = ArchiveOptions::default();
        let bundler = FileBundler::new(&bundle, &options);
        let owner = SourceId::new("7").expect("id");

        let missing = bundler
            .prepare("project", &owner, AttachmentKind::Files, &[fragment("b.txt")])
            .expect_err("missing entry should fail");
        match missing {
            ArchiveError::MissingAttachment { kind, id, path } => {
                assert_eq!(kind, "project");
                assert_eq!(id, "7");
                assert_eq!(path, "7-files/b.txt");
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let duplicate = bundler
            .prepare(
                "project",
                &owner,
                AttachmentKind::Files,
                &[fragment("a.txt"), fragment("a.txt")],
            )
            .expect_err("duplicate names should fail");
        assert_eq!(duplicate.error_code(), "VALIDATION_FAILED");
    }
}
