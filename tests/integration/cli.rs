use derived_data::core::schema::{props, types};
use derived_data::function::stock;
use derived_data::repository::Session;
use derived_data::test_utils::fixtures::RepositoryFixture;
use predicates::prelude::*;

use crate::common::TestProject;

/// `/doc` copies `title` into `summary`.
fn copy_fixture() -> RepositoryFixture {
    let mut fixture = RepositoryFixture::new();
    fixture
        .function("copy-title", stock::COPY, types::HIPPO_DOCUMENT)
        .accessed_relative("title", "title")
        .derived_relative("title", "summary");
    let doc = fixture.document(fixture.root(), "doc");
    fixture.set(doc, "title", "Hello");
    fixture
}

#[tokio::test]
async fn test_save_touched_node() {
    let project = TestProject::new(&copy_fixture()).await.unwrap();

    project
        .command()
        .args(["save", &project.snapshot_arg(), "--touch", "/doc"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 node(s) computed, 1 changed"));

    let repository = project.load(project.snapshot_path()).await.unwrap();
    let doc = repository.node_by_path("/doc").unwrap();
    assert_eq!(
        repository.get_property(doc, "summary").and_then(|p| p.string()).as_deref(),
        Some("Hello")
    );
}

#[tokio::test]
async fn test_validate_to_separate_output() {
    let project = TestProject::new(&copy_fixture()).await.unwrap();
    let output = project.dir().join("out/validated.json");

    let result = project
        .run(&["validate", &project.snapshot_arg(), "--output", &output.display().to_string()])
        .unwrap();
    assert!(result.success, "stderr: {}", result.stderr);
    assert!(result.stdout.contains("1 node(s) validated, 1 changed, 0 failed"));

    let input = project.load(project.snapshot_path()).await.unwrap();
    let doc = input.node_by_path("/doc").unwrap();
    assert!(input.get_property(doc, "summary").is_none());

    let validated = project.load(&output).await.unwrap();
    let doc = validated.node_by_path("/doc").unwrap();
    assert!(validated.get_property(doc, "summary").is_some());
}

#[tokio::test]
async fn test_validate_reports_failures() {
    let mut fixture = RepositoryFixture::new();
    fixture
        .function("missing", "org.example.Missing", types::HIPPO_DOCUMENT)
        .derived_relative("x", "x");
    fixture.document(fixture.root(), "doc");
    let project = TestProject::new(&fixture).await.unwrap();

    project
        .command()
        .args(["validate", &project.snapshot_arg()])
        .assert()
        .failure()
        .stdout(predicate::str::contains("1 failed"))
        .stderr(predicate::str::contains("could not be computed"));
}

#[tokio::test]
async fn test_remove_cleans_related() {
    let mut fixture = copy_fixture();
    let source = fixture.document(fixture.root(), "source");
    let doc = fixture.node("/doc");
    let source_id = fixture.repository().identifier(source).unwrap();
    fixture.set_multi(doc, props::HIPPO_RELATED, vec![source_id.into()]);
    let project = TestProject::new(&fixture).await.unwrap();

    project
        .command()
        .args(["remove", &project.snapshot_arg(), "/source"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 related index(es) updated"));

    let repository = project.load(project.snapshot_path()).await.unwrap();
    assert!(repository.node_by_path("/source").is_none());
    let doc = repository.node_by_path("/doc").unwrap();
    assert!(repository.get_property(doc, props::HIPPO_RELATED).unwrap().values().is_empty());
}

#[tokio::test]
async fn test_graph_impact() {
    let mut fixture = copy_fixture();
    let source = fixture.document(fixture.root(), "source");
    let doc = fixture.node("/doc");
    let source_id = fixture.repository().identifier(source).unwrap();
    fixture.set_multi(doc, props::HIPPO_RELATED, vec![source_id.into()]);
    let project = TestProject::new(&fixture).await.unwrap();

    project
        .command()
        .args(["graph", &project.snapshot_arg(), "--impact", "/source"])
        .assert()
        .success()
        .stdout(predicate::str::contains("/doc"));

    project
        .command()
        .args(["graph", &project.snapshot_arg(), "--node", "/doc"])
        .assert()
        .success()
        .stdout(predicate::str::contains("└── /doc").and(predicate::str::contains("/source")));
}

#[tokio::test]
async fn test_functions_json() {
    let project = TestProject::new(&copy_fixture()).await.unwrap();

    let result = project.run(&["functions", &project.snapshot_arg(), "--format", "json"]).unwrap();
    assert!(result.success, "stderr: {}", result.stderr);
    let functions: serde_json::Value = serde_json::from_str(&result.stdout).unwrap();
    assert_eq!(functions[0]["name"], "copy-title");
    assert_eq!(functions[0]["implementation_id"], "copy");
    assert_eq!(functions[0]["accessed"]["title"]["kind"], "relative");
}

#[tokio::test]
async fn test_config_file_moves_function_folder() {
    let project = TestProject::new(&copy_fixture()).await.unwrap();
    project.write_config("derivatives_path = \"/elsewhere\"\n").await.unwrap();

    project
        .command()
        .args(["functions", &project.snapshot_arg()])
        .assert()
        .success()
        .stdout(predicate::str::contains("No derivation functions configured"));
}

#[tokio::test]
async fn test_invalid_config_is_reported() {
    let project = TestProject::new(&copy_fixture()).await.unwrap();
    project.write_config("validate_batch_size = 0\n").await.unwrap();

    project
        .command()
        .args(["validate", &project.snapshot_arg()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("validate_batch_size must be greater than zero"));
}

#[tokio::test]
async fn test_missing_snapshot() {
    let project = TestProject::new(&copy_fixture()).await.unwrap();

    project
        .command()
        .args(["graph", "does-not-exist.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read repository snapshot"));
}
