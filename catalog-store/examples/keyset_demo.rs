use std::env;

use catalog_model::{CategoryFilter, ItemDraft};
use catalog_store::pool::PoolOptions;
use catalog_store::sqlite_repo::SqliteRepo;
use catalog_store::{execute_slice, CatalogWriteStore, SliceQuery};

fn print_usage() {
    eprintln!(
        "Usage: keyset_demo [db_path] [--main CATEGORY] [--size N] [--seed N]\n\
         Examples:\n\
           keyset_demo                         (uses target/demo/catalog.db)\n\
           keyset_demo ./catalog.db --main OUTER --size 5 --seed 12\n"
    );
}

fn main() {
    let mut args = env::args().skip(1).peekable();
    let db_path = match args.peek() {
        Some(s) if !s.starts_with('-') => args.next().unwrap_or_default(),
        _ => String::from("target/demo/catalog.db"),
    };
    let rest: Vec<String> = args.collect();

    let mut main_category: Option<String> = None;
    let mut size: usize = 5;
    let mut seed: usize = 0;
    let mut i = 0;
    while i < rest.len() {
        match rest[i].as_str() {
            "--main" => { if i + 1 < rest.len() { main_category = Some(rest[i+1].clone()); i += 2; } else { print_usage(); return; } }
            "--size" => { if i + 1 < rest.len() { size = rest[i+1].parse().unwrap_or(5); i += 2; } else { print_usage(); return; } }
            "--seed" => { if i + 1 < rest.len() { seed = rest[i+1].parse().unwrap_or(0); i += 2; } else { print_usage(); return; } }
            _ => { eprintln!("Unknown arg: {}", rest[i]); print_usage(); return; }
        }
    }

    if let Some(dir) = std::path::Path::new(&db_path).parent() {
        let _ = std::fs::create_dir_all(dir);
    }
    let repo = match SqliteRepo::open(&db_path, PoolOptions::default()) {
        Ok(r) => r,
        Err(e) => { eprintln!("open failed: {e}"); return; }
    };

    if seed > 0 {
        let drafts = (0..seed)
            .map(|n| {
                let main = if n % 2 == 0 { "OUTER" } else { "TOP" };
                ItemDraft::new(format!("demo item {n}")).with_category(main, "ETC").with_price(10_000 + n as i64, 0)
            })
            .collect();
        match repo.insert_items(drafts) {
            Ok(keys) => println!("seeded {} items", keys.len()),
            Err(e) => { eprintln!("seed failed: {e}"); return; }
        }
    }

    let filter = CategoryFilter { main: main_category, sub: None };
    let base = SliceQuery::new(None).with_category(&filter);
    let mut query = base.clone();
    let mut page = 0;
    loop {
        let slice = match execute_slice(&repo, &query, size) {
            Ok(s) => s,
            Err(e) => { eprintln!("slice failed: {e}"); return; }
        };
        page += 1;
        println!("page {page}: {} items, has_next={}", slice.content.len(), slice.has_next);
        for item in &slice.content {
            println!("  {:>6}  {}  [{}]", item.key, item.name, item.main_category);
        }
        match (slice.has_next, slice.content.last()) {
            (true, Some(last)) => query = base.continue_after(last.key),
            _ => break,
        }
    }
}
