use std::time::Duration;

use catalog_model::{CatalogItem, CategoryFilter, ItemDraft, ItemKey, KeywordQuery, MemberId, NewStyle};
use catalog_store::document_store::DocumentStore;
use catalog_store::pool::PoolOptions;
use catalog_store::sqlite_repo::SqliteRepo;
use catalog_store::{
    execute_slice, lookahead_position, CatalogSliceStore, CatalogWriteStore, FilterOp, SliceQuery,
};

fn backends() -> Vec<Box<dyn CatalogWriteStore>> {
    let repo = SqliteRepo::open_in_memory(PoolOptions::default()).expect("in-memory sqlite opens");
    vec![Box::new(repo), Box::new(DocumentStore::new())]
}

fn item(name: &str, main: &str, keywords: &[&str]) -> ItemDraft {
    ItemDraft::new(name)
        .with_category(main, "ETC")
        .with_keywords(keywords.iter().copied())
        .with_price(39_000, 3_000)
        .with_image(format!("https://img.example/{}.jpg", name.replace(' ', "-")))
        .with_brand("acme")
}

fn assert_descending(items: &[CatalogItem]) {
    for pair in items.windows(2) {
        assert!(pair[0].key > pair[1].key, "items must be newest first");
    }
}

#[test]
fn outer_category_first_page_is_bounded_and_newest_first() {
    for store in backends() {
        let mut drafts = Vec::new();
        for i in 0..20 {
            drafts.push(item(&format!("coat {i}"), "OUTER", &["warm"]));
            drafts.push(item(&format!("tee {i}"), "TOP", &["cotton"]));
        }
        let keys = store.insert_items(drafts).expect("seed items");
        let sentinel = store.max_key().expect("max key").map(|k| k.successor());

        let query = SliceQuery::new(sentinel).with_category(&CategoryFilter::main("OUTER"));
        let slice = execute_slice(store.as_ref(), &query, 20).expect("slice runs");

        assert_eq!(slice.content.len(), 20, "{} backend", store.kind());
        assert!(slice.content.iter().all(|i| i.main_category == "OUTER" && i.active));
        assert_descending(&slice.content);
        assert!(!slice.has_next, "exactly 20 matches leaves nothing beyond");
        assert_eq!(slice.next_cursor, None);
        assert_eq!(slice.content[0].key, keys[38]);
    }
}

#[test]
fn pages_continue_from_the_last_key_until_exhausted() {
    for store in backends() {
        let drafts = (0..25).map(|i| item(&format!("parka {i}"), "OUTER", &[])).collect();
        store.insert_items(drafts).expect("seed items");

        let query = SliceQuery::new(None).with_category(&CategoryFilter::main("OUTER"));
        let first = execute_slice(store.as_ref(), &query, 20).expect("first page");
        assert_eq!(first.content.len(), 20);
        assert!(first.has_next);
        let last = first.content.last().expect("non-empty page").key;
        assert_eq!(first.next_cursor, Some(last.to_string()));

        let second = execute_slice(store.as_ref(), &query.continue_after(last), 20).expect("second page");
        assert_eq!(second.content.len(), 5, "short pages are not padded");
        assert!(!second.has_next);
        assert!(second.content.iter().all(|i| i.key < last));
        assert_descending(&second.content);
    }
}

#[test]
fn has_next_agrees_with_the_following_page() {
    for store in backends() {
        let drafts = (0..23)
            .map(|i| item(&format!("item {i}"), if i % 3 == 0 { "OUTER" } else { "TOP" }, &[]))
            .collect();
        store.insert_items(drafts).expect("seed items");

        for size in [1_usize, 3, 7, 8, 30] {
            let query = SliceQuery::new(None).with_category(&CategoryFilter::main("OUTER"));
            let mut current = query.clone();
            loop {
                let slice = execute_slice(store.as_ref(), &current, size).expect("slice runs");
                assert!(slice.content.len() <= size);
                let Some(last) = slice.content.last() else {
                    assert!(!slice.has_next);
                    break;
                };
                let next = query.continue_after(last.key);
                let following = execute_slice(store.as_ref(), &next, size).expect("next slice runs");
                assert_eq!(slice.has_next, !following.content.is_empty(), "size {size}");
                if !slice.has_next {
                    break;
                }
                current = next;
            }
        }
    }
}

#[test]
fn repeating_a_slice_is_idempotent() {
    for store in backends() {
        let drafts = (0..12).map(|i| item(&format!("knit {i}"), "TOP", &["wool"])).collect();
        store.insert_items(drafts).expect("seed items");
        let cursor = store.max_key().expect("max key").map(|k| k.successor());
        let query = SliceQuery::new(cursor).with_category(&CategoryFilter::main("TOP").with_sub("ETC"));

        let a = execute_slice(store.as_ref(), &query, 5).expect("first read");
        let b = execute_slice(store.as_ref(), &query, 5).expect("second read");
        assert_eq!(a, b);
    }
}

#[test]
fn empty_filter_set_lists_every_active_item() {
    for store in backends() {
        let keys = store
            .insert_items((0..6).map(|i| item(&format!("bag {i}"), "BAG", &[])).collect())
            .expect("seed items");
        store.soft_delete_items(&keys[1..3]).expect("soft delete");

        let slice = execute_slice(store.as_ref(), &SliceQuery::new(None), 10).expect("open listing");
        assert_eq!(slice.content.len(), 4);
        assert!(slice.content.iter().all(|i| i.key != keys[1] && i.key != keys[2]));
    }
}

#[test]
fn name_search_is_case_insensitive() {
    for store in backends() {
        store
            .insert_items(vec![
                item("Denim Jacket", "OUTER", &[]),
                item("Cotton Shirt", "TOP", &[]),
                item("DENIM SKIRT", "BOTTOM", &[]),
                item("washed denim 100%", "BOTTOM", &[]),
            ])
            .expect("seed items");

        let query = SliceQuery::new(None).with_filter(FilterOp::NameContains("denim".into()));
        let slice = execute_slice(store.as_ref(), &query, 20).expect("search runs");
        let names: Vec<&str> = slice.content.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["washed denim 100%", "DENIM SKIRT", "Denim Jacket"]);

        let literal = SliceQuery::new(None).with_filter(FilterOp::NameContains("100%".into()));
        let slice = execute_slice(store.as_ref(), &literal, 20).expect("search runs");
        assert_eq!(slice.content.len(), 1, "wildcard characters match literally");

        store
            .insert_items(vec![item("ÉTÉ Jacket", "OUTER", &[]), item("été skirt", "BOTTOM", &[])])
            .expect("seed accented items");
        let accented = SliceQuery::new(None).with_filter(FilterOp::NameContains("été".into()));
        let slice = execute_slice(store.as_ref(), &accented, 20).expect("search runs");
        let names: Vec<&str> = slice.content.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["été skirt", "ÉTÉ Jacket"], "non-ASCII letters fold too");
    }
}

#[test]
fn keyword_filter_requires_an_intersection() {
    for store in backends() {
        let keys = store
            .insert_items(vec![
                item("hoodie", "TOP", &["street", "casual"]),
                item("blazer", "OUTER", &["formal"]),
                item("slacks", "BOTTOM", &["minimal", "office"]),
            ])
            .expect("seed items");

        let keywords = KeywordQuery::from_terms(["street", "minimal"]);
        let query = SliceQuery::new(None).with_keywords(&keywords);
        let slice = execute_slice(store.as_ref(), &query, 20).expect("keyword slice");
        let got: Vec<ItemKey> = slice.content.iter().map(|i| i.key).collect();
        assert_eq!(got, vec![keys[2], keys[0]]);
        assert!(slice.content.iter().all(|i| keywords.intersects(&i.keywords)));

        let none = SliceQuery::new(None).with_filter(FilterOp::KeywordsAny(Vec::new()));
        let slice = execute_slice(store.as_ref(), &none, 20).expect("empty keyword slice");
        assert!(slice.content.is_empty());
    }
}

#[test]
fn soft_deleted_items_are_invisible_to_lookups() {
    for store in backends() {
        let keys = store
            .insert_items(vec![item("scarf", "ACC", &[]), item("gloves", "ACC", &[])])
            .expect("seed items");
        assert_eq!(store.soft_delete_items(&keys[..1]).expect("delete"), 1);
        assert_eq!(store.soft_delete_items(&keys[..1]).expect("repeat delete"), 0);

        assert!(store.get_active(&keys[0]).expect("lookup").is_none());
        assert!(store.get_active(&keys[1]).expect("lookup").is_some());
        let many = store.get_active_many(&[keys[1], keys[0]]).expect("batch lookup");
        assert_eq!(many.len(), 1);
        assert_eq!(store.max_key().expect("max key"), Some(keys[1]));
    }
}

#[test]
fn zero_size_reports_existence_without_content() {
    for store in backends() {
        store.insert_items(vec![item("cap", "ACC", &[])]).expect("seed");
        let slice = execute_slice(store.as_ref(), &SliceQuery::new(None), 0).expect("zero slice");
        assert!(slice.content.is_empty());
        assert!(slice.has_next);
    }
}

#[test]
fn key_of_the_other_backend_is_a_backend_error() {
    let repo = SqliteRepo::open_in_memory(PoolOptions::default()).expect("sqlite opens");
    let docs = DocumentStore::new();
    let doc_key = docs.insert_items(vec![item("belt", "ACC", &[])]).expect("seed")[0];

    let err = execute_slice(&repo, &SliceQuery::new(Some(doc_key)), 5).expect_err("kind mismatch");
    assert!(!err.is_unavailable());
    assert!(repo.get_active(&doc_key).expect("lookup").is_none());
}

#[test]
fn exhausted_pool_surfaces_unavailable() {
    let repo = SqliteRepo::open_in_memory(PoolOptions { size: 1, acquire_timeout: Duration::from_millis(50) })
        .expect("sqlite opens");
    repo.insert_items(vec![item("sock", "ACC", &[])]).expect("seed");

    let held = repo.pool().get().expect("take the only connection");
    let err = execute_slice(&repo, &SliceQuery::new(None), 5).expect_err("pool exhausted");
    assert!(err.is_unavailable(), "got {err}");

    drop(held);
    let slice = execute_slice(&repo, &SliceQuery::new(None), 5).expect("connection returned");
    assert_eq!(slice.content.len(), 1);
    assert_eq!(repo.pool().idle_count(), 1);
}

#[test]
fn lookahead_sits_just_past_the_page() {
    assert_eq!(lookahead_position(0, 20), 20);
    assert_eq!(lookahead_position(2, 20), 60);
    assert_eq!(lookahead_position(usize::MAX, 2), usize::MAX);
}

#[test]
fn corrupt_json_columns_are_errors_not_empty_values() {
    let repo = SqliteRepo::open_in_memory(PoolOptions::default()).expect("sqlite opens");
    let keys = repo.insert_items(vec![item("scarf", "ACC", &["wool"])]).expect("seed");
    let style = repo
        .insert_style(&NewStyle {
            member_id: MemberId::new("m1"),
            member_nickname: "nick".into(),
            name: "winter".into(),
            product_keys: keys.clone(),
        })
        .expect("insert style");

    {
        let conn = repo.pool().get().expect("connection");
        conn.execute("UPDATE catalog_items SET keywords_json = 'not json'", []).expect("corrupt item");
        conn.execute("UPDATE styles SET product_keys_json = '[{'", []).expect("corrupt style");
    }

    let err = repo.get_active(&keys[0]).expect_err("corrupt keywords");
    assert!(!err.is_unavailable(), "got {err}");
    let err = execute_slice(&repo, &SliceQuery::new(None), 5).expect_err("corrupt row in a slice");
    assert!(!err.is_unavailable(), "got {err}");
    assert!(repo.get_style(style).is_err(), "corrupt product keys");
}
