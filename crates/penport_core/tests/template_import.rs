use penport_core::model::common::{Language, ReviewStatus, SourceKind};
use penport_core::repo::store::SourceStore;
use penport_core::{
    open_db_in_memory, ArchiveBundle, ArchiveError, ArchiveOptions, ArchiveService,
    SqliteArchiveStore,
};
use rusqlite::Connection;
use serde_json::{json, Value};

fn put_json(bundle: &mut ArchiveBundle, path: &str, document: Value) {
    bundle.put_file(path, serde_json::to_vec(&document).unwrap());
}

fn count_rows(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table};"), [], |row| row.get(0))
        .unwrap()
}

fn multilingual_template(id: Value, images: Value) -> Value {
    json!({
        "format": "templates/v2",
        "id": id,
        "created": "2024-03-01T10:00:00Z",
        "tags": ["web", "xss"],
        "translations": [
            {
                "is_main": true,
                "language": "en-US",
                "status": "finished",
                "data": {"title": "Cross-Site Scripting", "cvss": "CVSS:3.1/AV:N"}
            },
            {
                "is_main": false,
                "language": "de-DE",
                "status": "in-progress",
                "data": {"title": "Cross-Site-Scripting"}
            }
        ],
        "images": images
    })
}

#[test]
fn legacy_template_imports_with_single_main_translation() {
    let conn = open_db_in_memory().unwrap();
    let service = ArchiveService::new(SqliteArchiveStore::try_new(&conn).unwrap());

    let mut bundle = ArchiveBundle::new();
    put_json(
        &mut bundle,
        "3.json",
        json!({
            "format": "templates/v1",
            "id": 3,
            "tags": ["legacy"],
            "language": "de-DE",
            "status": "ready-for-review",
            "data": {"title": "Veraltete Software"}
        }),
    );

    let ids = service
        .import_templates(&bundle, ArchiveOptions::default())
        .unwrap();
    assert_eq!(ids.len(), 1);

    let template = service.store().load_template(ids[0]).unwrap().unwrap();
    assert_eq!(template.tags, vec!["legacy".to_string()]);
    assert_eq!(template.source, SourceKind::Imported);
    assert_eq!(template.translations.len(), 1);

    let main = template.main_translation().unwrap();
    assert_eq!(main.language, Language::GermanDe);
    assert_eq!(main.status, ReviewStatus::ReadyForReview);
    assert_eq!(main.data.get("title"), Some(&json!("Veraltete Software")));
}

#[test]
fn template_images_are_read_from_source_id_directory() {
    let conn = open_db_in_memory().unwrap();
    let service = ArchiveService::new(SqliteArchiveStore::try_new(&conn).unwrap());

    let mut bundle = ArchiveBundle::new();
    put_json(
        &mut bundle,
        "7.json",
        multilingual_template(json!(7), json!([{"name": "pic.png"}])),
    );
    bundle.put_file("7-images/pic.png", b"png-bytes".to_vec());

    let ids = service
        .import_templates(&bundle, ArchiveOptions::default())
        .unwrap();
    let template = service.store().load_template(ids[0]).unwrap().unwrap();

    assert_ne!(template.id.to_string(), "7");
    assert_eq!(template.translations.len(), 2);
    assert_eq!(template.images.len(), 1);
    assert_eq!(template.images[0].name, "pic.png");
    assert_eq!(template.images[0].content, b"png-bytes".to_vec());
}

#[test]
fn exported_template_reimports_under_fresh_identity() {
    let conn = open_db_in_memory().unwrap();
    let service = ArchiveService::new(SqliteArchiveStore::try_new(&conn).unwrap());

    let mut source = ArchiveBundle::new();
    put_json(
        &mut source,
        "7.json",
        multilingual_template(json!("7"), json!([{"name": "pic.png"}])),
    );
    source.put_file("7-images/pic.png", b"png-bytes".to_vec());
    let original_id = service
        .import_templates(&source, ArchiveOptions::default())
        .unwrap()[0];

    let exported = service
        .export_templates(&[original_id], ArchiveOptions::default())
        .unwrap();
    let documents = exported.documents().unwrap();
    assert_eq!(documents.len(), 1);
    assert_eq!(documents[0].0, format!("{original_id}.json"));
    assert_eq!(documents[0].1["format"], json!("templates/v2"));
    assert_eq!(
        exported.file(&format!("{original_id}-images/pic.png")),
        Some(b"png-bytes".as_slice())
    );

    let zipped = exported.to_zip_bytes().unwrap();
    let reopened = ArchiveBundle::from_zip_bytes(&zipped).unwrap();
    let reimported_id = service
        .import_templates(&reopened, ArchiveOptions::default())
        .unwrap()[0];
    assert_ne!(reimported_id, original_id);

    let original = service.store().load_template(original_id).unwrap().unwrap();
    let reimported = service.store().load_template(reimported_id).unwrap().unwrap();
    assert_eq!(reimported.tags, original.tags);
    assert_eq!(reimported.created_at, original.created_at);
    assert_eq!(reimported.images.len(), 1);
    assert_eq!(reimported.images[0].content, original.images[0].content);

    let languages = |translations: &[penport_core::model::template::TemplateTranslation]| {
        let mut pairs: Vec<_> = translations
            .iter()
            .map(|t| (t.language.as_str(), t.is_main, t.status, t.data.clone()))
            .collect();
        pairs.sort_by(|a, b| a.0.cmp(b.0));
        pairs
    };
    assert_eq!(
        languages(&reimported.translations),
        languages(&original.translations)
    );
}

#[test]
fn template_with_two_main_translations_is_rejected_without_rows() {
    let conn = open_db_in_memory().unwrap();
    let service = ArchiveService::new(SqliteArchiveStore::try_new(&conn).unwrap());

    let mut document = multilingual_template(json!("1"), json!([]));
    document["translations"][1]["is_main"] = json!(true);
    let mut bundle = ArchiveBundle::new();
    put_json(&mut bundle, "1.json", document);

    let err = service
        .import_templates(&bundle, ArchiveOptions::default())
        .unwrap_err();
    assert!(matches!(err, ArchiveError::Validation { kind: "template", .. }));
    assert!(err.is_client_error());
    assert_eq!(count_rows(&conn, "finding_templates"), 0);
    assert_eq!(count_rows(&conn, "finding_template_translations"), 0);
}

#[test]
fn template_with_duplicate_language_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let service = ArchiveService::new(SqliteArchiveStore::try_new(&conn).unwrap());

    let mut document = multilingual_template(json!("1"), json!([]));
    document["translations"][1]["language"] = json!("en-US");
    let mut bundle = ArchiveBundle::new();
    put_json(&mut bundle, "1.json", document);

    let err = service
        .import_templates(&bundle, ArchiveOptions::default())
        .unwrap_err();
    assert_eq!(err.error_code(), "VALIDATION_FAILED");
    assert!(err.to_string().contains("duplicate translation language"));
    assert_eq!(count_rows(&conn, "finding_templates"), 0);
}

#[test]
fn template_archive_with_foreign_format_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let service = ArchiveService::new(SqliteArchiveStore::try_new(&conn).unwrap());

    let mut bundle = ArchiveBundle::new();
    put_json(
        &mut bundle,
        "1.json",
        json!({"format": "projects/v1", "id": "1", "name": "p", "language": "en-US"}),
    );

    let err = service
        .import_templates(&bundle, ArchiveOptions::default())
        .unwrap_err();
    match err {
        ArchiveError::FormatMismatch { expected, found } => {
            assert_eq!(expected, "templates/v1 or templates/v2");
            assert_eq!(found, "projects/v1");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn missing_template_image_rolls_back_whole_template() {
    let conn = open_db_in_memory().unwrap();
    let service = ArchiveService::new(SqliteArchiveStore::try_new(&conn).unwrap());

    let mut bundle = ArchiveBundle::new();
    put_json(
        &mut bundle,
        "7.json",
        multilingual_template(json!("7"), json!([{"name": "pic.png"}])),
    );

    let err = service
        .import_templates(&bundle, ArchiveOptions::default())
        .unwrap_err();
    match err {
        ArchiveError::MissingAttachment { path, .. } => assert_eq!(path, "7-images/pic.png"),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(count_rows(&conn, "finding_templates"), 0);
    assert_eq!(count_rows(&conn, "uploaded_files"), 0);
}

#[test]
fn one_invalid_document_rolls_back_every_root_of_the_archive() {
    let conn = open_db_in_memory().unwrap();
    let service = ArchiveService::new(SqliteArchiveStore::try_new(&conn).unwrap());

    let mut bundle = ArchiveBundle::new();
    put_json(
        &mut bundle,
        "1.json",
        multilingual_template(json!("1"), json!([])),
    );
    let mut broken = multilingual_template(json!("2"), json!([]));
    broken["translations"] = json!([]);
    put_json(&mut bundle, "2.json", broken);

    let err = service
        .import_templates(&bundle, ArchiveOptions::default())
        .unwrap_err();
    assert!(matches!(err, ArchiveError::Validation { .. }));
    assert_eq!(count_rows(&conn, "finding_templates"), 0);
    assert_eq!(count_rows(&conn, "finding_template_translations"), 0);

    put_json(
        &mut bundle,
        "2.json",
        multilingual_template(json!("2"), json!([])),
    );
    let ids = service
        .import_templates(&bundle, ArchiveOptions::default())
        .unwrap();
    assert_eq!(ids.len(), 2);
    assert_eq!(count_rows(&conn, "finding_templates"), 2);
}

#[test]
fn archive_without_documents_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let service = ArchiveService::new(SqliteArchiveStore::try_new(&conn).unwrap());

    let mut bundle = ArchiveBundle::new();
    bundle.put_file("7-images/pic.png", b"orphan".to_vec());

    let err = service
        .import_templates(&bundle, ArchiveOptions::default())
        .unwrap_err();
    assert!(matches!(err, ArchiveError::Validation { kind: "archive", .. }));
}

#[test]
fn unparsable_document_reports_its_path() {
    let conn = open_db_in_memory().unwrap();
    let service = ArchiveService::new(SqliteArchiveStore::try_new(&conn).unwrap());

    let mut bundle = ArchiveBundle::new();
    put_json(
        &mut bundle,
        "9.json",
        json!({"format": "templates/v2", "id": "9", "translations": "nope"}),
    );

    let err = service
        .import_templates(&bundle, ArchiveOptions::default())
        .unwrap_err();
    match err {
        ArchiveError::MalformedDocument { path, .. } => assert_eq!(path, "9.json"),
        other => panic!("unexpected error: {other}"),
    }
}
