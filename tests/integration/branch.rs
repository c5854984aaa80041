use derived_data::config::EngineConfig;
use derived_data::core::schema::{props, types};
use derived_data::core::{DerivedDataError, Value};
use derived_data::engine::DerivedDataEngine;
use derived_data::function::{FunctionRegistry, stock};
use derived_data::repository::{NodeId, Session};
use derived_data::test_utils::fixtures::RepositoryFixture;
use derived_data::test_utils::init_test_logging;

/// A handle `news` whose first variant (published) carries a `body/title`,
/// and whose second variant (unpublished) copies that title into
/// `publishedTitle`.
struct Handle {
    fixture: RepositoryFixture,
    published: NodeId,
    unpublished: NodeId,
    body: NodeId,
}

fn handle() -> Handle {
    init_test_logging(None);
    let mut fixture = RepositoryFixture::new();
    fixture
        .function("published-title", stock::COPY, types::HIPPO_DOCUMENT)
        .accessed_relative("title", "../news/body/title")
        .derived_relative("title", "publishedTitle");
    let content = fixture.folder("content");
    let news = fixture.handle(content, "news");
    let published = fixture.variant(news, "published");
    let body = fixture.folder_in(published, "body");
    fixture.set(body, "title", "Live title");
    let unpublished = fixture.variant(news, "unpublished");
    fixture.commit();
    Handle {
        fixture,
        published,
        unpublished,
        body,
    }
}

fn engine() -> DerivedDataEngine {
    DerivedDataEngine::new(EngineConfig::default(), FunctionRegistry::with_stock_functions())
}

fn published_title(session: &dyn Session, node: NodeId) -> Option<String> {
    session.get_property(node, "publishedTitle").and_then(|p| p.string())
}

#[test]
fn test_unbranched_variants_read_live_value() {
    let Handle {
        mut fixture,
        unpublished,
        body,
        ..
    } = handle();
    let repo = fixture.repository_mut();

    assert!(engine().compute(repo, unpublished).unwrap());
    assert_eq!(published_title(repo, unpublished).as_deref(), Some("Live title"));
    let related = repo.get_property(unpublished, props::HIPPO_RELATED).unwrap().values();
    assert_eq!(related, vec![Value::Reference(repo.identifier(body).unwrap())]);
}

#[test]
fn test_cross_branch_read_uses_labelled_version() {
    let Handle {
        mut fixture,
        published,
        unpublished,
        body,
    } = handle();
    fixture.branch(published, "master");
    fixture.branch(unpublished, "feature");
    fixture.label(published, "feature-unpublished");
    fixture.set(body, "title", "Edited on master");
    let repo = fixture.repository_mut();

    assert!(engine().compute(repo, unpublished).unwrap());
    assert_eq!(published_title(repo, unpublished).as_deref(), Some("Live title"));
    // the frozen copy of body keeps the live identifier
    let related = repo.get_property(unpublished, props::HIPPO_RELATED).unwrap().values();
    assert_eq!(related, vec![Value::Reference(repo.identifier(body).unwrap())]);
}

#[test]
fn test_same_branch_reads_live_value() {
    let Handle {
        mut fixture,
        published,
        unpublished,
        body,
    } = handle();
    fixture.branch(published, "feature");
    fixture.branch(unpublished, "feature");
    fixture.set(body, "title", "Feature title");
    let repo = fixture.repository_mut();

    engine().compute(repo, unpublished).unwrap();
    assert_eq!(published_title(repo, unpublished).as_deref(), Some("Feature title"));
}

#[test]
fn test_one_sided_branch_info_is_rejected() {
    let Handle {
        mut fixture,
        unpublished,
        ..
    } = handle();
    fixture.branch(unpublished, "feature");
    let repo = fixture.repository_mut();

    let err = engine().compute(repo, unpublished).unwrap_err();
    assert!(matches!(err, DerivedDataError::AmbiguousBranchConfiguration { .. }));
    assert!(published_title(repo, unpublished).is_none());
}

#[test]
fn test_missing_label_aborts_computation() {
    let Handle {
        mut fixture,
        published,
        unpublished,
        ..
    } = handle();
    fixture.branch(published, "master");
    fixture.branch(unpublished, "feature");
    fixture.label(published, "master-published");
    let repo = fixture.repository_mut();

    match engine().compute(repo, unpublished) {
        Err(DerivedDataError::MissingFrozenVariant {
            variant,
            label,
        }) => {
            assert_eq!(variant, "/content/news/news");
            assert_eq!(label, "feature-unpublished");
        }
        other => panic!("expected MissingFrozenVariant, got {other:?}"),
    }
}

#[test]
fn test_validate_counts_branch_failures() {
    let Handle {
        mut fixture,
        unpublished,
        ..
    } = handle();
    fixture.branch(unpublished, "feature");
    let repo = fixture.repository_mut();

    let report = engine().validate(repo).unwrap();
    assert_eq!(report.total, 2);
    assert_eq!(report.failed, 1);
    assert!(!report.is_clean());
}
