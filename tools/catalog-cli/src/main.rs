use std::env;
use std::fs;
use std::path::PathBuf;

use catalog_model::{BackendKind, CategoryFilter, ItemDraft, ItemKey, KeywordQuery, MemberId, ScriptId, StyleId};
use catalog_service::{CatalogService, ServiceConfig};
use serde::Serialize;
use text_generation::config::{default_chat_config, GeneratorConfig};
use tracing_subscriber::EnvFilter;

fn print_usage() {
    eprintln!(
        "Usage:\n\
         catalog-cli seed --file ITEMS_JSON | --demo N\n\
         catalog-cli list [--main M] [--sub S] [--cursor C] [--size N]\n\
         catalog-cli search --term T [--cursor C]\n\
         catalog-cli recommend --keywords a,b,c [--cursor C] [--size N]\n\
         catalog-cli detail --id ID\n\
         catalog-cli delete --id ID [--id ID ...]\n\
         catalog-cli style --member M --nickname N --name NAME --products ID,ID\n\
         catalog-cli like --member M --style N | --script N [--undo]\n\
         catalog-cli draw [--k N]\n\
         catalog-cli script --member M --name NAME --keywords a,b [--chat]\n\
         catalog-cli scripts [--member M] [--cursor C] [--size N]\n\
         catalog-cli script-items --script N [--cursor C] [--size N]\n\
         \n\
         Store options (any command):\n\
           --config PATH_JSON   --backend relational|document   --db PATH   --docs PATH\n\
         Notes: stores default to target/demo/; RUST_LOG controls diagnostics on stderr\n"
    );
}

/// Pull global store options out of `args`, leaving the command's own flags.
fn build_config(args: &mut Vec<String>) -> Result<ServiceConfig, String> {
    let mut cfg: Option<ServiceConfig> = None;
    let mut backend: Option<BackendKind> = None;
    let mut db: Option<PathBuf> = None;
    let mut docs: Option<PathBuf> = None;
    let mut rest = Vec::with_capacity(args.len());

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--config" => { let v = value(args, i, "--config")?; cfg = Some(ServiceConfig::load(v).map_err(|e| e.to_string())?); i += 2; }
            "--backend" => {
                backend = Some(match value(args, i, "--backend")? {
                    "relational" => BackendKind::Relational,
                    "document" => BackendKind::Document,
                    other => return Err(format!("unknown backend `{other}`")),
                });
                i += 2;
            }
            "--db" => { db = Some(PathBuf::from(value(args, i, "--db")?)); i += 2; }
            "--docs" => { docs = Some(PathBuf::from(value(args, i, "--docs")?)); i += 2; }
            _ => { rest.push(args[i].clone()); i += 1; }
        }
    }
    *args = rest;

    let mut cfg = cfg.unwrap_or_default();
    if let Some(b) = backend { cfg.catalog_backend = b; }
    if db.is_some() { cfg.db_path = db; }
    if docs.is_some() { cfg.documents_path = docs; }
    Ok(cfg)
}

fn value<'a>(args: &'a [String], i: usize, flag: &str) -> Result<&'a str, String> {
    args.get(i + 1).map(String::as_str).ok_or_else(|| format!("{flag} requires value"))
}

fn number(args: &[String], i: usize, flag: &str) -> Result<usize, String> {
    value(args, i, flag)?.parse().map_err(|_| format!("{flag} requires number"))
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty()).map(String::from).collect()
}

fn print_json<T: Serialize>(value: &T) -> Result<(), String> {
    let out = serde_json::to_string_pretty(value).map_err(|e| e.to_string())?;
    println!("{out}");
    Ok(())
}

/// Resolve encoded product ids to keys; each must name an active item.
fn resolve_keys(svc: &CatalogService, ids: &[String]) -> Result<Vec<ItemKey>, String> {
    ids.iter()
        .map(|id| svc.detail(id).map(|item| item.key).map_err(|e| e.to_string()))
        .collect()
}

fn demo_drafts(n: usize) -> Vec<ItemDraft> {
    const MAINS: [&str; 4] = ["OUTER", "TOP", "BOTTOM", "ACC"];
    const KEYWORDS: [&str; 6] = ["street", "minimal", "vintage", "formal", "denim", "casual"];
    (0..n)
        .map(|i| {
            let main = MAINS[i % MAINS.len()];
            ItemDraft::new(format!("{} item {i}", main.to_lowercase()))
                .with_category(main, "BASIC")
                .with_keywords([KEYWORDS[i % KEYWORDS.len()], KEYWORDS[(i / 2) % KEYWORDS.len()]])
                .with_price(20_000 + (i as i64 % 50) * 1_000, 3_000)
                .with_image(format!("https://img.example/demo/{i}.jpg"))
                .with_brand("demo")
        })
        .collect()
}

fn do_seed(svc: &CatalogService, rest: &[String]) -> Result<(), String> {
    let mut file: Option<String> = None;
    let mut demo: Option<usize> = None;
    let mut i = 0;
    while i < rest.len() {
        match rest[i].as_str() {
            "--file" => { file = Some(value(rest, i, "--file")?.to_string()); i += 2; }
            "--demo" => { demo = Some(number(rest, i, "--demo")?); i += 2; }
            _ => { i += 1; }
        }
    }
    let drafts: Vec<ItemDraft> = match (file, demo) {
        (Some(path), _) => {
            let raw = fs::read_to_string(&path).map_err(|e| format!("read {path}: {e}"))?;
            serde_json::from_str(&raw).map_err(|e| format!("parse {path}: {e}"))?
        }
        (None, Some(n)) => demo_drafts(n),
        (None, None) => return Err("provide --file or --demo".into()),
    };
    let keys = svc.insert_items(drafts).map_err(|e| e.to_string())?;
    svc.persist().map_err(|e| e.to_string())?;
    println!("Inserted {} items on the {} backend", keys.len(), svc.backend());
    Ok(())
}

fn do_list(svc: &CatalogService, rest: &[String]) -> Result<(), String> {
    let mut filter = CategoryFilter::default();
    let mut cursor: Option<String> = None;
    let mut size = svc.config().default_page_size;
    let mut i = 0;
    while i < rest.len() {
        match rest[i].as_str() {
            "--main" => { filter.main = Some(value(rest, i, "--main")?.to_string()); i += 2; }
            "--sub" => { filter.sub = Some(value(rest, i, "--sub")?.to_string()); i += 2; }
            "--cursor" => { cursor = Some(value(rest, i, "--cursor")?.to_string()); i += 2; }
            "--size" => { size = number(rest, i, "--size")?; i += 2; }
            _ => { i += 1; }
        }
    }
    let slice = svc.list_by_category(cursor.as_deref(), &filter, size).map_err(|e| e.to_string())?;
    print_json(&slice)
}

fn do_search(svc: &CatalogService, rest: &[String]) -> Result<(), String> {
    let mut term: Option<String> = None;
    let mut cursor: Option<String> = None;
    let mut i = 0;
    while i < rest.len() {
        match rest[i].as_str() {
            "--term" => { term = Some(value(rest, i, "--term")?.to_string()); i += 2; }
            "--cursor" => { cursor = Some(value(rest, i, "--cursor")?.to_string()); i += 2; }
            _ => { i += 1; }
        }
    }
    let term = term.ok_or("--term required")?;
    let slice = svc.search_by_name(&term, cursor.as_deref()).map_err(|e| e.to_string())?;
    print_json(&slice)
}

fn do_recommend(svc: &CatalogService, rest: &[String]) -> Result<(), String> {
    let mut keywords = KeywordQuery::default();
    let mut cursor: Option<String> = None;
    let mut size = svc.config().default_page_size;
    let mut i = 0;
    while i < rest.len() {
        match rest[i].as_str() {
            "--keywords" => { keywords = KeywordQuery::from_text(value(rest, i, "--keywords")?); i += 2; }
            "--cursor" => { cursor = Some(value(rest, i, "--cursor")?.to_string()); i += 2; }
            "--size" => { size = number(rest, i, "--size")?; i += 2; }
            _ => { i += 1; }
        }
    }
    let slice = svc.recommend_by_keywords(&keywords, cursor.as_deref(), size).map_err(|e| e.to_string())?;
    print_json(&slice)
}

fn do_detail(svc: &CatalogService, rest: &[String]) -> Result<(), String> {
    let id = match rest.iter().position(|a| a == "--id") {
        Some(i) => value(rest, i, "--id")?,
        None => return Err("--id required".into()),
    };
    let item = svc.detail(id).map_err(|e| e.to_string())?;
    print_json(&item)
}

fn do_delete(svc: &CatalogService, rest: &[String]) -> Result<(), String> {
    let mut ids: Vec<String> = Vec::new();
    let mut i = 0;
    while i < rest.len() {
        match rest[i].as_str() {
            "--id" => { ids.push(value(rest, i, "--id")?.to_string()); i += 2; }
            _ => { i += 1; }
        }
    }
    if ids.is_empty() {
        return Err("--id required".into());
    }
    let keys = resolve_keys(svc, &ids)?;
    let n = svc.soft_delete_items(&keys).map_err(|e| e.to_string())?;
    svc.persist().map_err(|e| e.to_string())?;
    println!("Deleted {n} items");
    Ok(())
}

fn do_style(svc: &CatalogService, rest: &[String]) -> Result<(), String> {
    let mut member: Option<String> = None;
    let mut nickname = String::new();
    let mut name: Option<String> = None;
    let mut products: Vec<String> = Vec::new();
    let mut i = 0;
    while i < rest.len() {
        match rest[i].as_str() {
            "--member" => { member = Some(value(rest, i, "--member")?.to_string()); i += 2; }
            "--nickname" => { nickname = value(rest, i, "--nickname")?.to_string(); i += 2; }
            "--name" => { name = Some(value(rest, i, "--name")?.to_string()); i += 2; }
            "--products" => { products = split_list(value(rest, i, "--products")?); i += 2; }
            _ => { i += 1; }
        }
    }
    let member = MemberId::new(member.ok_or("--member required")?);
    let name = name.ok_or("--name required")?;
    let keys = resolve_keys(svc, &products)?;
    let id = svc.save_style(&member, &nickname, &name, keys).map_err(|e| e.to_string())?;
    println!("Saved style {}", id.0);
    Ok(())
}

fn do_like(svc: &CatalogService, rest: &[String]) -> Result<(), String> {
    let mut member: Option<String> = None;
    let mut style: Option<usize> = None;
    let mut script: Option<usize> = None;
    let mut undo = false;
    let mut i = 0;
    while i < rest.len() {
        match rest[i].as_str() {
            "--member" => { member = Some(value(rest, i, "--member")?.to_string()); i += 2; }
            "--style" => { style = Some(number(rest, i, "--style")?); i += 2; }
            "--script" => { script = Some(number(rest, i, "--script")?); i += 2; }
            "--undo" => { undo = true; i += 1; }
            _ => { i += 1; }
        }
    }
    let member = MemberId::new(member.ok_or("--member required")?);
    let verb = if undo { "Unliked" } else { "Liked" };
    match (style, script) {
        (Some(id), None) => {
            let id = StyleId(i64::try_from(id).map_err(|e| e.to_string())?);
            let res = if undo { svc.unlike_style(&member, id) } else { svc.like_style(&member, id) };
            res.map_err(|e| e.to_string())?;
            println!("{verb} style {}", id.0);
        }
        (None, Some(id)) => {
            let id = ScriptId(i64::try_from(id).map_err(|e| e.to_string())?);
            let res = if undo { svc.unlike_script(&member, id) } else { svc.like_script(&member, id) };
            res.map_err(|e| e.to_string())?;
            println!("{verb} script {}", id.0);
        }
        _ => return Err("exactly one of --style or --script required".into()),
    }
    Ok(())
}

fn do_draw(svc: &CatalogService, rest: &[String]) -> Result<(), String> {
    let mut k = svc.config().style_draw_size;
    let mut i = 0;
    while i < rest.len() {
        match rest[i].as_str() {
            "--k" => { k = number(rest, i, "--k")?; i += 2; }
            _ => { i += 1; }
        }
    }
    // One-shot process: compute the ranking before drawing from it.
    svc.refresh_ranking().map_err(|e| e.to_string())?;
    let styles = svc.draw_style_set(k).map_err(|e| e.to_string())?;
    print_json(&styles)
}

fn do_script(svc: &CatalogService, rest: &[String]) -> Result<(), String> {
    let mut member: Option<String> = None;
    let mut name: Option<String> = None;
    let mut keywords: Vec<String> = Vec::new();
    let mut i = 0;
    while i < rest.len() {
        match rest[i].as_str() {
            "--member" => { member = Some(value(rest, i, "--member")?.to_string()); i += 2; }
            "--name" => { name = Some(value(rest, i, "--name")?.to_string()); i += 2; }
            "--keywords" => { keywords = split_list(value(rest, i, "--keywords")?); i += 2; }
            _ => { i += 1; }
        }
    }
    let member = MemberId::new(member.ok_or("--member required")?);
    let name = name.ok_or("--name required")?;
    let id = svc.create_script(&member, &name, &keywords).map_err(|e| e.to_string())?;
    let detail = svc.script_detail(id, Some(&member)).map_err(|e| e.to_string())?;
    print_json(&detail)
}

fn do_scripts(svc: &CatalogService, rest: &[String]) -> Result<(), String> {
    let mut member: Option<MemberId> = None;
    let mut cursor: Option<String> = None;
    let mut size = svc.config().default_page_size;
    let mut i = 0;
    while i < rest.len() {
        match rest[i].as_str() {
            "--member" => { member = Some(MemberId::new(value(rest, i, "--member")?)); i += 2; }
            "--cursor" => { cursor = Some(value(rest, i, "--cursor")?.to_string()); i += 2; }
            "--size" => { size = number(rest, i, "--size")?; i += 2; }
            _ => { i += 1; }
        }
    }
    let slice = svc.list_scripts(cursor.as_deref(), size, member.as_ref()).map_err(|e| e.to_string())?;
    print_json(&slice)
}

fn do_script_items(svc: &CatalogService, rest: &[String]) -> Result<(), String> {
    let mut script: Option<usize> = None;
    let mut cursor: Option<String> = None;
    let mut size = svc.config().default_page_size;
    let mut i = 0;
    while i < rest.len() {
        match rest[i].as_str() {
            "--script" => { script = Some(number(rest, i, "--script")?); i += 2; }
            "--cursor" => { cursor = Some(value(rest, i, "--cursor")?.to_string()); i += 2; }
            "--size" => { size = number(rest, i, "--size")?; i += 2; }
            _ => { i += 1; }
        }
    }
    let script = script.ok_or("--script required")?;
    let id = ScriptId(i64::try_from(script).map_err(|e| e.to_string())?);
    let slice = svc.recommend_for_script(id, cursor.as_deref(), size).map_err(|e| e.to_string())?;
    print_json(&slice)
}

fn run(cmd: &str, mut args: Vec<String>) -> Result<(), String> {
    let mut cfg = build_config(&mut args)?;
    if cmd == "script" && args.iter().any(|a| a == "--chat") {
        cfg.generator = GeneratorConfig::ChatCompletion(default_chat_config());
    }
    let svc = CatalogService::new(cfg).map_err(|e| e.to_string())?;
    match cmd {
        "seed" => do_seed(&svc, &args),
        "list" => do_list(&svc, &args),
        "search" => do_search(&svc, &args),
        "recommend" => do_recommend(&svc, &args),
        "detail" => do_detail(&svc, &args),
        "delete" => do_delete(&svc, &args),
        "style" => do_style(&svc, &args),
        "like" => do_like(&svc, &args),
        "draw" => do_draw(&svc, &args),
        "script" => do_script(&svc, &args),
        "scripts" => do_scripts(&svc, &args),
        "script-items" => do_script_items(&svc, &args),
        other => Err(format!("unknown command `{other}`")),
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let mut args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() { print_usage(); return; }
    let cmd = args.remove(0);
    if let Err(err) = run(&cmd, args) {
        tracing::debug!(command = %cmd, error = %err, "command failed");
        eprintln!("Error: {}", err);
        print_usage();
        std::process::exit(1);
    }
}
