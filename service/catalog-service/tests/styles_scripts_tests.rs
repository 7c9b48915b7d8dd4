use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use catalog_model::{BackendKind, ItemDraft, ItemKey, MemberId, ScriptId, StyleId};
use catalog_service::{CatalogService, ServiceConfig, ServiceError};
use catalog_store::sqlite_repo::SqliteRepo;
use catalog_store::CatalogWriteStore;
use text_generation::generator::{GenerationError, GeneratorInfo, ProviderKind, TextGenerator};

struct DownGenerator {
    info: GeneratorInfo,
}

impl DownGenerator {
    fn new() -> Self {
        Self {
            info: GeneratorInfo { provider: ProviderKind::ChatCompletion, model_id: "down".into(), max_prompt_chars: 100 },
        }
    }
}

impl TextGenerator for DownGenerator {
    fn generate(&self, _prompt: &str) -> Result<String, GenerationError> {
        Err(GenerationError::ServiceUnavailable { message: "upstream timed out".into() })
    }

    fn info(&self) -> &GeneratorInfo {
        &self.info
    }
}

fn service(backend: BackendKind) -> CatalogService {
    CatalogService::new(ServiceConfig::in_memory(backend)).expect("in-memory service starts")
}

fn seed_products(svc: &CatalogService) -> Vec<ItemKey> {
    svc.insert_items(vec![
        ItemDraft::new("bomber").with_image("bomber.jpg").with_keywords(["street", "vintage", "olive"]),
        ItemDraft::new("chinos").with_image("chinos.jpg").with_keywords(["minimal", "office", "street"]),
        ItemDraft::new("loafers").with_image("loafers.jpg").with_keywords(["formal", "leather"]),
    ])
    .expect("seed products")
}

fn save_styles(svc: &CatalogService, member: &MemberId, keys: &[ItemKey], n: usize) -> Vec<StyleId> {
    (0..n)
        .map(|i| {
            svc.save_style(member, "mina", &format!("look {i}"), keys.to_vec())
                .expect("save style")
        })
        .collect()
}

#[test]
fn draw_returns_distinct_ranked_styles_resolved_live() {
    for backend in [BackendKind::Relational, BackendKind::Document] {
        let svc = service(backend);
        let keys = seed_products(&svc);
        let member = MemberId::new("m-1");
        let ids = save_styles(&svc, &member, &keys, 12);
        for (hearts, id) in ids.iter().enumerate() {
            for fan in 0..hearts {
                svc.like_style(&MemberId::new(format!("fan-{fan}")), *id).expect("like");
            }
        }

        let snapshot = svc.refresh_ranking().expect("refresh ranking");
        assert_eq!(snapshot.ids.first(), ids.last(), "most hearts ranks first");

        let drawn = svc.draw_style_set(8).expect("draw");
        assert_eq!(drawn.len(), 8, "{backend}");
        let distinct: HashSet<StyleId> = drawn.iter().map(|s| s.id).collect();
        assert_eq!(distinct.len(), 8);
        assert!(drawn.iter().all(|s| snapshot.contains(s.id)));

        let card = &drawn[0];
        assert_eq!(card.url_list, vec!["bomber.jpg", "chinos.jpg", "loafers.jpg"]);
        assert_eq!(card.keyword_list.len(), 5);
        assert_eq!(card.member_nickname, "mina");

        assert_eq!(svc.draw_default_style_set().expect("default draw").len(), 8);
    }
}

#[test]
fn draw_without_ranking_is_a_feature_outage() {
    let svc = service(BackendKind::Document);
    let err = svc.draw_style_set(8).expect_err("no ranking yet");
    assert!(matches!(err, ServiceError::RankingUnavailable(_)));
    assert!(err.is_retryable());

    svc.refresh_ranking().expect("refresh with no styles");
    assert!(matches!(svc.draw_style_set(8), Err(ServiceError::RankingUnavailable(_))));

    let keys = seed_products(&svc);
    assert!(svc.detail(&keys[0].to_string()).is_ok(), "browsing is unaffected");
}

#[test]
fn draw_skips_styles_deleted_after_ranking() {
    let svc = service(BackendKind::Relational);
    let keys = seed_products(&svc);
    let member = MemberId::new("m-2");
    let ids = save_styles(&svc, &member, &keys, 4);
    svc.refresh_ranking().expect("refresh");

    assert_eq!(svc.soft_delete_styles(&member, &ids[..1]).expect("delete"), 1);
    assert_eq!(
        svc.soft_delete_styles(&MemberId::new("someone-else"), &ids[1..2]).expect("foreign delete"),
        0
    );
    let drawn = svc.draw_style_set(10).expect("draw");
    assert_eq!(drawn.len(), 3);
    assert!(drawn.iter().all(|s| s.id != ids[0]));
}

#[test]
fn style_listing_detail_and_member_pages() {
    let svc = service(BackendKind::Document);
    let keys = seed_products(&svc);
    let member = MemberId::new("m-3");
    let ids = save_styles(&svc, &member, &keys[..2], 5);
    save_styles(&svc, &MemberId::new("m-4"), &keys[2..], 1);

    let first = svc.list_styles(None, 4).expect("first page");
    assert_eq!(first.content.len(), 4);
    assert!(first.has_next);
    assert_eq!(first.content[1].id, ids[4]);
    assert_eq!(first.content[1].products.len(), 2);
    let second = svc.list_styles(first.next_cursor.as_deref(), 4).expect("second page");
    assert_eq!(second.content.len(), 2);
    assert!(!second.has_next);

    svc.soft_delete_items(&keys[..1]).expect("delete a product");
    let detail = svc.style_detail(ids[0]).expect("detail");
    assert_eq!(detail.products.len(), 1, "deleted products drop out of styles");

    let page = svc.member_styles(&member, 1, 2).expect("member page");
    assert_eq!(page.current_page, 1);
    assert_eq!(page.total_page, 3);
    assert_eq!(page.content.iter().map(|s| s.id).collect::<Vec<_>>(), vec![ids[2], ids[1]]);

    svc.soft_delete_styles(&member, &ids[..1]).expect("delete style");
    assert!(matches!(svc.style_detail(ids[0]), Err(ServiceError::NotFound(_))));
    assert!(matches!(svc.like_style(&member, ids[0]), Err(ServiceError::NotFound(_))));
}

#[test]
fn style_hearts_count_each_member_once() {
    let svc = service(BackendKind::Relational);
    let keys = seed_products(&svc);
    let owner = MemberId::new("m-10");
    let ids = save_styles(&svc, &owner, &keys, 2);
    let (ana, ben) = (MemberId::new("ana"), MemberId::new("ben"));

    svc.like_style(&ana, ids[0]).expect("like");
    svc.like_style(&ana, ids[0]).expect("repeat like");
    svc.like_style(&ben, ids[0]).expect("like");
    assert_eq!(svc.style_detail(ids[0]).expect("detail").heart_count, 2);

    svc.unlike_style(&ana, ids[0]).expect("unlike");
    svc.unlike_style(&ana, ids[0]).expect("repeat unlike");
    svc.unlike_style(&ana, ids[1]).expect("unlike without a like");
    assert_eq!(svc.style_detail(ids[0]).expect("detail").heart_count, 1);
    assert_eq!(svc.style_detail(ids[1]).expect("detail").heart_count, 0);

    svc.like_style(&ana, ids[0]).expect("like again");
    assert_eq!(svc.style_detail(ids[0]).expect("detail").heart_count, 2);
    assert!(matches!(svc.unlike_style(&ana, StyleId(404)), Err(ServiceError::NotFound(_))));
}

#[test]
fn script_hearts_are_idempotent_and_reported_to_the_viewer() {
    let svc = service(BackendKind::Document);
    seed_products(&svc);
    let owner = MemberId::new("m-11");
    let id = svc.create_script(&owner, "commute", &["street".into()]).expect("create script");
    let (ana, ben) = (MemberId::new("ana"), MemberId::new("ben"));

    svc.like_script(&ana, id).expect("like");
    svc.like_script(&ana, id).expect("repeat like");
    let seen_by_ana = svc.script_detail(id, Some(&ana)).expect("detail");
    assert!(seen_by_ana.has_like);
    assert_eq!(seen_by_ana.summary.heart_count, 1);
    assert!(!svc.script_detail(id, Some(&ben)).expect("detail").has_like);
    assert!(!svc.script_detail(id, None).expect("detail").has_like);

    svc.like_script(&ben, id).expect("like");
    svc.unlike_script(&ana, id).expect("unlike");
    let seen_by_ana = svc.script_detail(id, Some(&ana)).expect("detail");
    assert!(!seen_by_ana.has_like);
    assert_eq!(seen_by_ana.summary.heart_count, 1);
    assert!(svc.script_detail(id, Some(&ben)).expect("detail").has_like);

    svc.soft_delete_scripts(&owner, &[id]).expect("delete");
    assert!(matches!(svc.like_script(&ana, id), Err(ServiceError::NotFound(_))));
    assert!(matches!(svc.unlike_script(&ben, ScriptId(404)), Err(ServiceError::NotFound(_))));
}

#[test]
fn save_style_validates_input() {
    let svc = service(BackendKind::Relational);
    let keys = seed_products(&svc);
    let member = MemberId::new("m-5");
    assert!(matches!(
        svc.save_style(&member, "mina", "  ", keys.clone()),
        Err(ServiceError::InvalidRequest(_))
    ));
    assert!(matches!(svc.save_style(&member, "mina", "empty", Vec::new()), Err(ServiceError::InvalidRequest(_))));
    assert!(matches!(
        svc.save_style(&member, "mina", "ghost", vec![ItemKey::Relational(9_999)]),
        Err(ServiceError::InvalidRequest(_))
    ));
}

#[test]
fn scripts_are_generated_listed_and_recommended() {
    let svc = service(BackendKind::Document);
    seed_products(&svc);
    let member = MemberId::new("m-6");

    let id = svc
        .create_script(&member, "weekend", &[" street ".into(), "minimal".into(), "street".into()])
        .expect("create script");
    let other = svc.create_script(&member, "gala", &["black-tie".into()]).expect("create script");

    let detail = svc.script_detail(id, None).expect("detail");
    assert_eq!(detail.summary.keywords, vec!["street", "minimal"]);
    assert!(detail.content.contains("street"));
    let image = detail.summary.image.expect("keywords match products");
    assert!(image == "bomber.jpg" || image == "chinos.jpg");

    let listed = svc.list_scripts(None, 10, Some(&member)).expect("list");
    assert_eq!(listed.content.iter().map(|s| s.id).collect::<Vec<_>>(), vec![other, id]);
    assert_eq!(listed.content[0].image, None, "no product matches black-tie");
    assert!(!listed.has_next);

    let latest = svc.latest_script(&member).expect("latest");
    assert_eq!(latest.id, other);
    assert!(matches!(svc.latest_script(&MemberId::new("nobody")), Err(ServiceError::NotFound(_))));

    let recs = svc.recommend_for_script(id, None, 10).expect("recommend");
    let names: Vec<&str> = recs.content.iter().map(|v| v.name.as_str()).collect();
    assert_eq!(names, vec!["chinos", "bomber"]);

    assert_eq!(svc.soft_delete_scripts(&member, &[id]).expect("delete"), 1);
    assert!(matches!(svc.script_detail(id, None), Err(ServiceError::NotFound(_))));
    assert!(matches!(svc.script_detail(ScriptId(404), Some(&member)), Err(ServiceError::NotFound(_))));
}

#[test]
fn script_listing_pages_by_id() {
    let svc = service(BackendKind::Relational);
    let member = MemberId::new("m-7");
    let ids: Vec<ScriptId> = (0..5)
        .map(|i| svc.create_script(&member, &format!("s{i}"), &["casual".into()]).expect("create"))
        .collect();

    let first = svc.list_scripts(None, 3, None).expect("first page");
    assert!(first.has_next);
    let second = svc.list_scripts(first.next_cursor.as_deref(), 3, None).expect("second page");
    assert_eq!(second.content.iter().map(|s| s.id).collect::<Vec<_>>(), vec![ids[1], ids[0]]);
    assert!(!second.has_next);
}

#[test]
fn generation_outage_propagates_and_stores_nothing() {
    let cfg = ServiceConfig::in_memory(BackendKind::Relational);
    let repo = Arc::new(SqliteRepo::open_in_memory(cfg.pool_options()).expect("sqlite opens"));
    let catalog: Arc<dyn CatalogWriteStore> = repo.clone();
    let svc = CatalogService::with_parts(cfg, catalog, repo, Arc::new(DownGenerator::new()));
    let member = MemberId::new("m-8");

    let err = svc.create_script(&member, "rainy day", &["trench".into()]).expect_err("generator down");
    assert_eq!(err, ServiceError::ServiceUnavailable("upstream timed out".into()));
    assert_eq!(err.status_code(), 503);
    assert!(svc.list_scripts(None, 10, Some(&member)).expect("list").content.is_empty());

    assert!(matches!(svc.create_script(&member, "x", &[" ".into()]), Err(ServiceError::InvalidRequest(_))));
}

#[test]
fn refresher_installs_a_ranking_in_the_background() {
    let svc = service(BackendKind::Relational);
    let keys = seed_products(&svc);
    save_styles(&svc, &MemberId::new("m-9"), &keys, 3);

    let refresher = svc.start_refresher();
    let deadline = Instant::now() + Duration::from_secs(5);
    while svc.ranking().snapshot().is_err() && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(10));
    }
    assert!(refresher.is_running());
    assert_eq!(svc.ranking().snapshot().expect("ranking installed").len(), 3);
    refresher.stop();
}
