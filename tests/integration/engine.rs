use derived_data::config::EngineConfig;
use derived_data::core::schema::{props, types};
use derived_data::core::{PropertyValue, Value};
use derived_data::engine::{DependencyGraph, DerivedDataEngine, SaveOutcome};
use derived_data::function::{FunctionRegistry, stock};
use derived_data::repository::{NodeId, Permission, Session};
use derived_data::test_utils::fixtures::RepositoryFixture;
use derived_data::test_utils::init_test_logging;

fn engine() -> DerivedDataEngine {
    DerivedDataEngine::new(EngineConfig::default(), FunctionRegistry::with_stock_functions())
}

/// `/content/article` reads `title` through the mirror `link`, which points
/// at `/content/source`.
struct LinkedArticle {
    fixture: RepositoryFixture,
    article: NodeId,
    source: NodeId,
}

fn linked_article() -> LinkedArticle {
    init_test_logging(None);
    let mut fixture = RepositoryFixture::new();
    fixture
        .function("linked-title", stock::COPY, types::HIPPO_DOCUMENT)
        .accessed_resolve("title", "link/title")
        .derived_relative("title", "linkedTitle");
    let content = fixture.folder("content");
    let source = fixture.document(content, "source");
    fixture.set(source, "title", "Original");
    let article = fixture.document(content, "article");
    fixture.mirror(article, "link", source);
    fixture.commit();
    LinkedArticle {
        fixture,
        article,
        source,
    }
}

fn string(session: &dyn Session, node: NodeId, name: &str) -> Option<String> {
    session.get_property(node, name).and_then(|p| p.string())
}

#[test]
fn test_compute_reads_through_mirror_and_records_dependency() {
    let LinkedArticle {
        mut fixture,
        article,
        source,
    } = linked_article();
    let repo = fixture.repository_mut();

    assert!(engine().compute(repo, article).unwrap());
    assert_eq!(string(repo, article, "linkedTitle").as_deref(), Some("Original"));
    let related = repo.get_property(article, props::HIPPO_RELATED).unwrap().values();
    assert_eq!(related, vec![Value::Reference(repo.identifier(source).unwrap())]);
}

#[test]
fn test_second_compute_changes_nothing() {
    let LinkedArticle {
        mut fixture,
        article,
        ..
    } = linked_article();
    let engine = engine();
    let repo = fixture.repository_mut();

    assert!(engine.compute(repo, article).unwrap());
    repo.save().unwrap();
    assert!(!engine.compute(repo, article).unwrap());
    assert!(!repo.has_pending_changes());
}

#[test]
fn test_change_to_source_invalidates_dependent() {
    let LinkedArticle {
        mut fixture,
        article,
        source,
    } = linked_article();
    let engine = engine();
    let repo = fixture.repository_mut();
    assert_eq!(engine.save(repo, None).unwrap().changed(), 0);
    engine.compute(repo, article).unwrap();
    repo.save().unwrap();

    repo.set_property(source, "title", PropertyValue::Single(Value::from("Edited"))).unwrap();
    assert!(engine.find_nodes_to_compute(repo, None).unwrap().contains(&article));

    let outcome = engine.save(repo, None).unwrap();
    assert!(matches!(outcome, SaveOutcome::Computed { changed, .. } if changed >= 1));
    assert_eq!(string(repo, article, "linkedTitle").as_deref(), Some("Edited"));
}

#[test]
fn test_scope_limits_discovery() {
    let LinkedArticle {
        mut fixture,
        article,
        source,
    } = linked_article();
    let other = fixture.folder("other");
    let stray = fixture.document(other, "stray");
    let engine = engine();
    let repo = fixture.repository_mut();
    repo.touch(article).unwrap();
    repo.touch(stray).unwrap();

    let content = repo.node_by_path("/content").unwrap();
    let nodes = engine.find_nodes_to_compute(repo, Some(content)).unwrap();
    assert!(nodes.contains(&article));
    assert!(!nodes.contains(&stray));
    assert!(!nodes.contains(&source));
}

#[test]
fn test_removal_drops_dependency() {
    let LinkedArticle {
        mut fixture,
        article,
        source,
    } = linked_article();
    let engine = engine();
    let repo = fixture.repository_mut();
    engine.compute(repo, article).unwrap();

    assert_eq!(engine.removal(repo, source).unwrap(), 1);
    repo.remove_node(source).unwrap();
    assert!(repo.get_property(article, props::HIPPO_RELATED).unwrap().values().is_empty());
    assert!(DependencyGraph::from_session(repo).unwrap().is_empty());
}

#[test]
fn test_ancestors_of_nested_document() {
    init_test_logging(None);
    let mut fixture = RepositoryFixture::new();
    fixture
        .function("paths", stock::ANCESTORS, types::HIPPO_DOCUMENT)
        .accessed_builtin("ancestors", "ancestors")
        .derived_multi("paths", "hippo:paths");
    let content = fixture.folder("content");
    let news = fixture.folder_in(content, "news");
    let doc = fixture.document(news, "doc");
    let repo = fixture.repository_mut();

    assert!(engine().compute(repo, doc).unwrap());
    let paths = repo.get_property(doc, "hippo:paths").unwrap();
    assert!(paths.is_multiple());
    let expected: Vec<Value> = [doc, news, content, repo.root()]
        .iter()
        .map(|n| Value::from(repo.identifier(*n).unwrap().to_string()))
        .collect();
    assert_eq!(paths.values(), expected);
    // builtin values are not dependencies
    assert!(repo.get_property(doc, props::HIPPO_RELATED).is_none());
}

#[test]
fn test_denied_write_is_skipped() {
    let LinkedArticle {
        mut fixture,
        article,
        ..
    } = linked_article();
    let repo = fixture.repository_mut();
    repo.deny("/content/article/linkedTitle", Permission::SetProperty);

    engine().compute(repo, article).unwrap();
    assert!(repo.get_property(article, "linkedTitle").is_none());
    // the dependency is still recorded
    assert!(repo.get_property(article, props::HIPPO_RELATED).is_some());
}

#[test]
fn test_derived_value_creates_intermediate_nodes() {
    init_test_logging(None);
    let mut fixture = RepositoryFixture::new();
    fixture
        .function("nested", stock::COPY, types::HIPPO_DOCUMENT)
        .accessed_relative("title", "title")
        .derived_relative("title", "meta/seo/title");
    let doc = fixture.document(fixture.root(), "doc");
    fixture.set(doc, "title", "Deep");
    let repo = fixture.repository_mut();

    assert!(engine().compute(repo, doc).unwrap());
    let seo = repo.node_by_path("/doc/meta/seo").unwrap();
    assert_eq!(repo.primary_type(seo).unwrap(), types::NT_UNSTRUCTURED);
    assert_eq!(string(repo, seo, "title").as_deref(), Some("Deep"));
}

#[test]
fn test_missing_input_removes_derived_value() {
    init_test_logging(None);
    let mut fixture = RepositoryFixture::new();
    fixture
        .function("copy-title", stock::COPY, types::HIPPO_DOCUMENT)
        .accessed_relative("title", "title")
        .derived_relative("title", "copy");
    let doc = fixture.document(fixture.root(), "doc");
    fixture.set(doc, "title", "Present");
    let engine = engine();
    let repo = fixture.repository_mut();
    engine.compute(repo, doc).unwrap();
    assert!(repo.get_property(doc, "copy").is_some());

    repo.remove_property(doc, "title").unwrap();
    assert!(engine.compute(repo, doc).unwrap());
    assert!(repo.get_property(doc, "copy").is_none());
}

#[test]
fn test_validate_recomputes_everything() {
    let LinkedArticle {
        mut fixture,
        article,
        ..
    } = linked_article();
    let engine = engine();
    let repo = fixture.repository_mut();

    let report = engine.validate(repo).unwrap();
    // source and article both carry hippo:derived
    assert_eq!(report.total, 2);
    assert!(report.is_clean());
    assert_eq!(string(repo, article, "linkedTitle").as_deref(), Some("Original"));
}
