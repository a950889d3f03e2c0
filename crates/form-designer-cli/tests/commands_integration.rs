//! Integration tests for the management commands against an on-disk
//! `SQLite` database.

use form_designer_cli::command::CommandRegistry;
use form_designer_cli::commands::dumpdata::dump_definitions;
use form_designer_cli::commands::exportlogs::export_logs;
use form_designer_cli::commands::loaddata::{load_definitions, LoadSummary};
use form_designer_cli::commands::register_builtin_commands;
use form_designer_core::settings::DatabaseSettings;
use form_designer_core::{FormDesignerSettings, QueryDict};
use form_designer_models::{build_form, delivery};
use form_designer_views::FormServices;

// ============================================================================
// Shared helpers
// ============================================================================

const FIXTURE: &str = r#"[
  {
    "name": "newsletter",
    "title": "Newsletter",
    "fields": [
      {"name": "email", "label": "E-Mail", "field_class": "forms.EmailField"}
    ]
  },
  {
    "name": "contact",
    "fields": [
      {"name": "name", "label": "Name", "field_class": "forms.CharField", "position": 1},
      {"name": "message", "label": "Message", "field_class": "forms.CharField",
       "widget": "widgets.Textarea", "position": 2}
    ]
  }
]"#;

fn services(dir: &tempfile::TempDir) -> FormServices {
    let settings = FormDesignerSettings {
        database: DatabaseSettings {
            path: dir.path().join("forms.sqlite3"),
        },
        email: form_designer_core::settings::EmailSettings {
            backend: "memory".into(),
            ..Default::default()
        },
        ..FormDesignerSettings::default()
    };
    FormServices::from_settings(settings).unwrap()
}

async fn run(services: &FormServices, args: &[&str]) -> Result<(), form_designer_core::FormDesignerError> {
    let mut registry = CommandRegistry::new();
    register_builtin_commands(&mut registry);
    let argv = std::iter::once("form-designer").chain(args.iter().copied());
    let matches = registry.build_cli().try_get_matches_from(argv).unwrap();
    registry.execute(&matches, services).await
}

// ============================================================================
// loaddata / dumpdata
// ============================================================================

#[tokio::test]
async fn test_loaddata_then_dumpdata() {
    let dir = tempfile::tempdir().unwrap();
    let services = services(&dir);
    let fixture = dir.path().join("forms.json");
    std::fs::write(&fixture, FIXTURE).unwrap();

    run(&services, &["loaddata", fixture.to_str().unwrap()])
        .await
        .unwrap();
    let names: Vec<_> = services
        .store
        .list_definitions()
        .await
        .unwrap()
        .into_iter()
        .map(|d| d.name)
        .collect();
    assert_eq!(names, ["contact", "newsletter"]);

    let out = dir.path().join("dump.json");
    run(&services, &["dumpdata", "contact", "-o", out.to_str().unwrap()])
        .await
        .unwrap();
    let dumped: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(dumped.as_array().unwrap().len(), 1);
    assert_eq!(dumped[0]["fields"][1]["widget"], "widgets.Textarea");
}

#[tokio::test]
async fn test_loaddata_replaces_by_name() {
    let dir = tempfile::tempdir().unwrap();
    let services = services(&dir);
    services.store.migrate().await.unwrap();

    let first = load_definitions(&services, FIXTURE).await.unwrap();
    assert_eq!(first, LoadSummary { created: 2, updated: 0 });
    let id = services
        .store
        .get_definition_by_name("contact")
        .await
        .unwrap()
        .id;

    let dump = dump_definitions(services.store.as_ref(), None).await.unwrap();
    let again = load_definitions(&services, &dump).await.unwrap();
    assert_eq!(again, LoadSummary { created: 0, updated: 2 });
    let contact = services.store.get_definition_by_name("contact").await.unwrap();
    assert_eq!(contact.id, id);
    assert_eq!(contact.fields.len(), 2);
}

#[tokio::test]
async fn test_loaddata_rejects_invalid_fixture() {
    let dir = tempfile::tempdir().unwrap();
    let services = services(&dir);
    services.store.migrate().await.unwrap();

    let broken = r#"{"name": "x", "fields": [{"name": "c", "field_class": "forms.RegexField"}]}"#;
    assert!(load_definitions(&services, broken).await.is_err());
    assert!(services.store.list_definitions().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_loaddata_rejects_duplicate_names() {
    let dir = tempfile::tempdir().unwrap();
    let services = services(&dir);
    services.store.migrate().await.unwrap();

    let twice = r#"[
      {"name": "contact", "title": "First"},
      {"name": "newsletter"},
      {"name": "contact", "title": "Second"}
    ]"#;
    let err = load_definitions(&services, twice).await.unwrap_err();
    assert!(err.to_string().contains("contact"));
    assert!(services.store.list_definitions().await.unwrap().is_empty());
}

// ============================================================================
// exportlogs / check
// ============================================================================

#[tokio::test]
async fn test_exportlogs() {
    let dir = tempfile::tempdir().unwrap();
    let services = services(&dir);
    services.store.migrate().await.unwrap();
    load_definitions(&services, FIXTURE).await.unwrap();

    let contact = services.store.get_definition_by_name("contact").await.unwrap();
    let mut form = build_form(&contact, &services.registry, &services.settings, None).unwrap();
    form.bind(&QueryDict::parse("name=Ann&message=Hi%2C+there"));
    assert!(form.is_valid());
    delivery::log(services.store.as_ref(), &contact, &form)
        .await
        .unwrap();

    let csv = export_logs(&services, "contact").await.unwrap();
    let lines: Vec<_> = csv.lines().collect();
    assert_eq!(lines[0], "created,Name,Message");
    assert!(lines[1].ends_with(",Ann,\"Hi, there\""));

    assert!(export_logs(&services, "missing").await.is_err());
}

#[tokio::test]
async fn test_check_command() {
    let dir = tempfile::tempdir().unwrap();
    let services = services(&dir);
    run(&services, &["migrate"]).await.unwrap();
    load_definitions(&services, FIXTURE).await.unwrap();
    run(&services, &["check"]).await.unwrap();

    let mut contact = services.store.get_definition_by_name("contact").await.unwrap();
    contact.fields[0].field_class = "forms.RegexField".into();
    services.store.update_definition(&contact).await.unwrap();
    assert!(run(&services, &["check"]).await.is_err());
}
