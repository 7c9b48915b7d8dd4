use catalog_model::{BackendKind, CategoryFilter, ItemDraft, KeywordQuery, MemberId};
use catalog_service::{CatalogService, ServiceConfig};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();
    let backend = match args.get(1).map(String::as_str) {
        Some("relational") => BackendKind::Relational,
        Some("document") | None => BackendKind::Document,
        Some(other) => {
            eprintln!("Usage: cargo run -p catalog-service --example browse_catalog -- [relational|document]");
            eprintln!("unknown backend `{other}`");
            std::process::exit(1);
        }
    };

    let svc = CatalogService::new(ServiceConfig::in_memory(backend))?;
    let palette = ["street", "minimal", "vintage", "formal"];
    let drafts: Vec<ItemDraft> = (0..40)
        .map(|i| {
            let main = if i % 2 == 0 { "OUTER" } else { "TOP" };
            ItemDraft::new(format!("{} {i}", main.to_lowercase()))
                .with_category(main, "BASIC")
                .with_keywords([palette[i % palette.len()]])
                .with_price(30_000 + (i as i64) * 1_000, 3_000)
                .with_image(format!("https://img.example/{i}.jpg"))
        })
        .collect();
    let keys = svc.insert_items(drafts)?;
    println!("Seeded {} items on the {backend} backend", keys.len());

    let filter = CategoryFilter::main("OUTER");
    let mut cursor: Option<String> = None;
    let mut page = 1;
    loop {
        let slice = svc.list_by_category(cursor.as_deref(), &filter, 8)?;
        let names: Vec<&str> = slice.content.iter().map(|v| v.name.as_str()).collect();
        println!("OUTER page {page}: {}", names.join(", "));
        if !slice.has_next {
            break;
        }
        cursor = slice.next_cursor;
        page += 1;
    }

    let recs = svc.recommend_by_keywords(&KeywordQuery::from_terms(["street", "minimal"]), None, 5)?;
    println!("street/minimal: {} items (has_next={})", recs.content.len(), recs.has_next);

    let member = MemberId::new("demo");
    for i in 0..12 {
        let id = svc.save_style(&member, "demo", &format!("look {i}"), keys[i..i + 3].to_vec())?;
        for fan in 0..i {
            svc.like_style(&MemberId::new(format!("fan-{fan}")), id)?;
        }
    }
    svc.refresh_ranking()?;
    for style in svc.draw_default_style_set()? {
        println!("style {:>3} hearts={:>2} {:?}", style.id.0, style.heart_count, style.keyword_list);
    }
    Ok(())
}
