use std::time::Duration;

use catalog_model::{BackendKind, CategoryFilter, ItemDraft, ItemKey, KeywordQuery};
use catalog_service::{CatalogService, ServiceConfig, ServiceError, CATALOG_DEFAULTS};

const BACKENDS: [BackendKind; 2] = [BackendKind::Relational, BackendKind::Document];

fn service(backend: BackendKind) -> CatalogService {
    CatalogService::new(ServiceConfig::in_memory(backend)).expect("in-memory service starts")
}

fn product(name: &str, main: &str, keywords: &[&str]) -> ItemDraft {
    ItemDraft::new(name)
        .with_category(main, "ETC")
        .with_keywords(keywords.iter().copied())
        .with_price(59_000, 2_500)
        .with_image(format!("https://img.example/{}.jpg", name.replace(' ', "_")))
        .with_brand("mallo")
}

#[test]
fn outer_listing_returns_only_active_outer_items_newest_first() {
    for backend in BACKENDS {
        let svc = service(backend);
        let mut drafts = Vec::new();
        for i in 0..15 {
            drafts.push(product(&format!("coat {i}"), "OUTER", &[]));
            drafts.push(product(&format!("shirt {i}"), "TOP", &[]));
        }
        let keys = svc.insert_items(drafts).expect("seed");
        svc.soft_delete_items(&keys[..1]).expect("delete oldest coat");

        let slice = svc
            .list_by_category(None, &CategoryFilter { main: Some("OUTER".into()), sub: None }, 20)
            .expect("listing");
        assert_eq!(slice.content.len(), 14, "{backend}");
        assert!(!slice.has_next, "fewer than 21 OUTER items exist");
        assert_eq!(slice.content[0].name, "coat 14");
        for view in &slice.content {
            let item = svc.detail(&view.id).expect("listed item resolves");
            assert_eq!(item.main_category, "OUTER");
            assert!(item.active);
        }
        assert!(slice.content.iter().all(|v| v.id != keys[0].to_string()));
    }
}

#[test]
fn next_cursor_walks_to_the_end() {
    for backend in BACKENDS {
        let svc = service(backend);
        svc.insert_items((0..25).map(|i| product(&format!("jacket {i}"), "OUTER", &[])).collect())
            .expect("seed");
        let filter = CategoryFilter::main("OUTER");

        let first = svc.list_by_category(None, &filter, 20).expect("first page");
        assert_eq!(first.content.len(), 20);
        assert!(first.has_next);
        let cursor = first.next_cursor.clone().expect("cursor on has_next");
        assert_eq!(Some(&cursor), first.content.last().map(|v| &v.id));

        let second = svc.list_by_category(Some(&cursor), &filter, 20).expect("second page");
        assert_eq!(second.content.len(), 5);
        assert!(!second.has_next);
        assert_eq!(second.next_cursor, None);

        let again = svc.list_by_category(Some(&cursor), &filter, 20).expect("repeat");
        assert_eq!(again, second, "same cursor and filters give the same page");
    }
}

#[test]
fn malformed_cursor_restarts_from_newest() {
    for backend in BACKENDS {
        let svc = service(backend);
        svc.insert_items((0..5).map(|i| product(&format!("hat {i}"), "ACC", &[])).collect())
            .expect("seed");
        let filter = CategoryFilter::default();
        let fresh = svc.list_by_category(None, &filter, 3).expect("fresh");
        for bad in ["garbage", "-1", "", "01ARZ3NDEKTSV4RRFFQ69G5FAVX"] {
            let fallback = svc.list_by_category(Some(bad), &filter, 3).expect("fallback");
            assert_eq!(fallback, fresh, "cursor `{bad}` on {backend}");
        }
    }
}

#[test]
fn search_by_name_ignores_case_and_uses_fixed_page_size() {
    for backend in BACKENDS {
        let svc = service(backend);
        svc.insert_items(vec![
            product("Denim Jacket", "OUTER", &[]),
            product("DENIM SKIRT", "BOTTOM", &[]),
            product("Linen Shirt", "TOP", &[]),
        ])
        .expect("seed");

        let slice = svc.search_by_name("denim", None).expect("search");
        let names: Vec<&str> = slice.content.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["DENIM SKIRT", "Denim Jacket"]);

        svc.insert_items((0..30).map(|i| product(&format!("denim tee {i}"), "TOP", &[])).collect())
            .expect("seed more");
        let page = svc.search_by_name("Denim", None).expect("search");
        assert_eq!(page.content.len(), CATALOG_DEFAULTS.search_page_size);
        assert!(page.has_next);

        let err = svc.search_by_name("   ", None).expect_err("blank term");
        assert_eq!(err.status_code(), 400);
    }
}

#[test]
fn keyword_recommendation_excludes_non_intersecting_items() {
    for backend in BACKENDS {
        let svc = service(backend);
        svc.insert_items(vec![
            product("cargo pants", "BOTTOM", &["street", "utility"]),
            product("tuxedo", "OUTER", &["formal"]),
            product("white tee", "TOP", &["minimal"]),
        ])
        .expect("seed");

        let keywords = KeywordQuery::from_terms(["street", "minimal"]);
        let slice = svc.recommend_by_keywords(&keywords, None, 20).expect("recommend");
        let names: Vec<&str> = slice.content.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["white tee", "cargo pants"]);

        let none = svc.recommend_by_keywords(&KeywordQuery::default(), None, 20).expect("empty set");
        assert!(none.content.is_empty());
    }
}

#[test]
fn detail_of_soft_deleted_item_is_not_found() {
    for backend in BACKENDS {
        let svc = service(backend);
        let keys = svc.insert_items(vec![product("trench", "OUTER", &[])]).expect("seed");
        let id = keys[0].to_string();
        assert_eq!(svc.detail(&id).expect("active").name, "trench");

        assert_eq!(svc.soft_delete_items(&keys).expect("delete"), 1);
        let err = svc.detail(&id).expect_err("deleted item");
        assert!(matches!(err, ServiceError::NotFound(_)));
        assert_eq!(err.status_code(), 404);
        assert!(!err.is_retryable());

        assert!(matches!(svc.detail("not-an-id"), Err(ServiceError::NotFound(_))));
    }
}

#[test]
fn page_size_is_validated_and_clamped() {
    let svc = service(BackendKind::Relational);
    svc.insert_items((0..120).map(|i| product(&format!("sock {i}"), "ACC", &[])).collect())
        .expect("seed");
    let filter = CategoryFilter::main("ACC");

    let err = svc.list_by_category(None, &filter, 0).expect_err("zero page size");
    assert!(matches!(err, ServiceError::InvalidRequest(_)));

    let slice = svc.list_by_category(None, &filter, 1_000).expect("clamped");
    assert_eq!(slice.content.len(), CATALOG_DEFAULTS.max_page_size);
    assert!(slice.has_next);
}

#[test]
fn exhausted_pool_is_a_retryable_store_outage() {
    let mut cfg = ServiceConfig::in_memory(BackendKind::Relational);
    cfg.pool_size = 1;
    cfg.acquire_timeout = Duration::from_millis(50);
    let svc = CatalogService::new(cfg).expect("service starts");
    svc.insert_items(vec![product("scarf", "ACC", &[])]).expect("seed");

    let held = svc.repo().pool().get().expect("hold the only connection");
    let err = svc.list_by_category(None, &CategoryFilter::default(), 10).expect_err("no connection");
    assert!(matches!(err, ServiceError::StoreUnavailable(_)), "got {err}");
    assert!(err.is_retryable());
    assert_eq!(err.status_code(), 503);
    drop(held);

    let slice = svc.list_by_category(None, &CategoryFilter::default(), 10).expect("recovered");
    assert_eq!(slice.content.len(), 1, "outage never looked like an empty page");
}

#[test]
fn file_backed_stores_survive_a_restart() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let mut cfg = ServiceConfig::default();
    cfg.db_path = Some(dir.path().join("catalog.db"));
    cfg.documents_path = Some(dir.path().join("products.jsonl"));

    let key: ItemKey = {
        let svc = CatalogService::new(cfg.clone()).expect("service starts");
        assert_eq!(svc.backend(), BackendKind::Document);
        let keys = svc.insert_items(vec![product("duffle coat", "OUTER", &["classic"])]).expect("seed");
        svc.persist().expect("persist documents");
        keys[0]
    };

    let svc = CatalogService::new(cfg).expect("service restarts");
    let item = svc.detail(&key.to_string()).expect("item survives");
    assert_eq!(item.name, "duffle coat");
}

#[test]
fn config_round_trips_and_rejects_invalid_values() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("conf").join("service.json");

    let mut cfg = ServiceConfig::in_memory(BackendKind::Relational);
    cfg.style_draw_size = 6;
    cfg.ranking_max_staleness = Duration::from_secs(90);
    cfg.save(&path).expect("save config");
    let loaded = ServiceConfig::load(&path).expect("load config");
    assert_eq!(loaded, cfg);

    std::fs::write(&path, r#"{ "max_page_size": 0 }"#).expect("write bad config");
    let err = ServiceConfig::load(&path).expect_err("zero max page size");
    assert!(matches!(err, ServiceError::Config(_)));

    std::fs::write(&path, r#"{ "sample_cap": 7 }"#).expect("write partial config");
    let partial = ServiceConfig::load(&path).expect("missing fields take defaults");
    assert_eq!(partial.sample_cap, 7);
    assert_eq!(partial.search_page_size, CATALOG_DEFAULTS.search_page_size);
}
