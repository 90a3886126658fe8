use penport_core::model::common::{Language, SourceKind};
use penport_core::model::fields::FieldShape;
use penport_core::{
    open_db_in_memory, ArchiveBundle, ArchiveError, ArchiveKind, ArchiveOptions, ArchiveService,
    ImportedRoot, SourceStore, SqliteArchiveStore,
};
use serde_json::{json, Value};

fn project_type_document() -> Value {
    json!({
        "format": "projecttypes/v1",
        "id": 42,
        "created": "2023-11-20T12:00:00Z",
        "name": "Internal Assessment",
        "language": "de-DE",
        "report_fields": {
            "customer": {"type": "string", "label": "Customer", "default": "ACME"},
            "hosts": {"type": "list", "items": {"type": "string"}}
        },
        "report_sections": [{"id": "customer", "label": "Customer", "fields": ["customer"]}],
        "finding_fields": {"title": {"type": "string"}},
        "finding_field_order": ["title"],
        "finding_ordering": [{"field": "cvss", "order": "desc"}],
        "report_template": "<section>{{ report.customer }}</section>",
        "report_styles": "h1 { color: red; }",
        "report_preview_data": {"report": {"customer": "Preview"}},
        "assets": [{"name": "font.woff2"}, {"name": "logo.svg"}]
    })
}

fn project_type_bundle() -> ArchiveBundle {
    let mut bundle = ArchiveBundle::new();
    bundle.put_file(
        "42.json",
        serde_json::to_vec(&project_type_document()).unwrap(),
    );
    bundle.put_file("42-assets/font.woff2", b"font".to_vec());
    bundle.put_file("42-assets/logo.svg", b"<svg/>".to_vec());
    bundle
}

#[test]
fn project_type_import_keeps_design_and_assets() {
    let conn = open_db_in_memory().unwrap();
    let service = ArchiveService::new(SqliteArchiveStore::try_new(&conn).unwrap());

    let roots = service
        .import_archive(
            ArchiveKind::ProjectTypes,
            &project_type_bundle(),
            ArchiveOptions::default(),
        )
        .unwrap();
    let project_type_id = match roots.as_slice() {
        [ImportedRoot::ProjectType(id)] => *id,
        _ => panic!("expected exactly one project type root"),
    };

    let project_type = service
        .store()
        .load_project_type(project_type_id)
        .unwrap()
        .unwrap();
    assert_eq!(project_type.name, "Internal Assessment");
    assert_eq!(project_type.language, Language::GermanDe);
    assert_eq!(project_type.source, SourceKind::Imported);
    assert_eq!(project_type.linked_project, None);
    assert_eq!(
        project_type.report_fields.get("hosts").unwrap().shape(),
        FieldShape::List
    );
    assert_eq!(project_type.report_sections[0].id, "customer");
    assert_eq!(
        project_type.finding_ordering,
        json!([{"field": "cvss", "order": "desc"}])
    );
    assert_eq!(project_type.report_styles, "h1 { color: red; }");
    assert_eq!(project_type.assets.len(), 2);
}

#[test]
fn exported_project_type_matches_reimport() {
    let conn = open_db_in_memory().unwrap();
    let service = ArchiveService::new(SqliteArchiveStore::try_new(&conn).unwrap());
    let original_id = service
        .import_project_types(&project_type_bundle(), ArchiveOptions::default())
        .unwrap()[0];

    let exported = service
        .export_project_types(&[original_id], ArchiveOptions::default())
        .unwrap();
    let documents = exported.documents().unwrap();
    let document = &documents[0].1;
    assert_eq!(document["format"], json!("projecttypes/v1"));
    assert_eq!(document["id"], json!(original_id.to_string()));
    assert_eq!(
        document["report_fields"]["customer"]["label"],
        json!("Customer")
    );
    assert_eq!(
        exported.file(&format!("{original_id}-assets/logo.svg")),
        Some(b"<svg/>".as_slice())
    );

    let reimported_id = service
        .import_project_types(&exported, ArchiveOptions::default())
        .unwrap()[0];
    assert_ne!(reimported_id, original_id);

    let original = service
        .store()
        .load_project_type(original_id)
        .unwrap()
        .unwrap();
    let reimported = service
        .store()
        .load_project_type(reimported_id)
        .unwrap()
        .unwrap();
    assert_eq!(reimported.report_fields, original.report_fields);
    assert_eq!(reimported.report_sections, original.report_sections);
    assert_eq!(reimported.finding_fields, original.finding_fields);
    assert_eq!(reimported.finding_field_order, original.finding_field_order);
    assert_eq!(reimported.report_template, original.report_template);
    assert_eq!(reimported.report_preview_data, original.report_preview_data);
    assert_eq!(reimported.created_at, original.created_at);

    let mut original_assets: Vec<_> = original
        .assets
        .iter()
        .map(|file| (file.name.clone(), file.content.clone()))
        .collect();
    let mut reimported_assets: Vec<_> = reimported
        .assets
        .iter()
        .map(|file| (file.name.clone(), file.content.clone()))
        .collect();
    original_assets.sort();
    reimported_assets.sort();
    assert_eq!(reimported_assets, original_assets);
}

#[test]
fn duplicate_asset_names_are_rejected() {
    let conn = open_db_in_memory().unwrap();
    let service = ArchiveService::new(SqliteArchiveStore::try_new(&conn).unwrap());

    let mut document = project_type_document();
    document["assets"] = json!([{"name": "logo.svg"}, {"name": "logo.svg"}]);
    let mut bundle = project_type_bundle();
    bundle.put_file("42.json", serde_json::to_vec(&document).unwrap());

    let err = service
        .import_project_types(&bundle, ArchiveOptions::default())
        .unwrap_err();
    assert!(matches!(err, ArchiveError::Validation { .. }));
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM project_types;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 0);
}

#[test]
fn project_archive_is_not_accepted_as_project_types() {
    let conn = open_db_in_memory().unwrap();
    let service = ArchiveService::new(SqliteArchiveStore::try_new(&conn).unwrap());

    let mut bundle = ArchiveBundle::new();
    bundle.put_file(
        "1.json",
        serde_json::to_vec(&json!({"format": "projects/v1", "id": "1"})).unwrap(),
    );

    let err = service
        .import_project_types(&bundle, ArchiveOptions::default())
        .unwrap_err();
    assert_eq!(err.error_code(), "FORMAT_MISMATCH");
}
