//! Document backend: products keyed by ULID object ids, held in an ordered
//! map so "newest first" is a reverse range scan.
//!
//! Persisted as JSON lines; saves go through a temp file and rename.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use catalog_model::{BackendKind, CatalogItem, ItemDraft, ItemKey};
use regex::Regex;
use serde::{Deserialize, Serialize};
use ulid::{Generator, Ulid};

use crate::{CatalogSliceStore, CatalogWriteStore, FilterOp, SliceQuery, StoreError};

/// On-disk document shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDocument {
    #[serde(rename = "_id")]
    pub id: Ulid,
    pub name: String,
    #[serde(default)]
    pub price: i64,
    #[serde(default)]
    pub fee: i64,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub main_category: String,
    #[serde(default)]
    pub sub_category: String,
    #[serde(default)]
    pub keywords: BTreeSet<String>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl ProductDocument {
    fn from_draft(id: Ulid, d: ItemDraft) -> Self {
        Self {
            id,
            name: d.name,
            price: d.price,
            fee: d.fee,
            image: d.image,
            brand: d.brand,
            main_category: d.main_category,
            sub_category: d.sub_category,
            keywords: d.keywords,
            active: true,
        }
    }

    fn to_item(&self) -> CatalogItem {
        CatalogItem {
            key: ItemKey::Document(self.id),
            name: self.name.clone(),
            price: self.price,
            fee: self.fee,
            image: self.image.clone(),
            brand: self.brand.clone(),
            main_category: self.main_category.clone(),
            sub_category: self.sub_category.clone(),
            keywords: self.keywords.clone(),
            active: self.active,
        }
    }
}

enum Predicate {
    Main(String),
    Sub(String),
    KeywordsAny(Vec<String>),
    Name(Regex),
}

impl Predicate {
    fn matches(&self, doc: &ProductDocument) -> bool {
        match self {
            Predicate::Main(v) => &doc.main_category == v,
            Predicate::Sub(v) => &doc.sub_category == v,
            Predicate::KeywordsAny(vs) => vs.iter().any(|k| doc.keywords.contains(k)),
            Predicate::Name(re) => re.is_match(&doc.name),
        }
    }
}

struct CompiledQuery {
    before: Option<Ulid>,
    predicates: Vec<Predicate>,
}

impl CompiledQuery {
    fn compile(query: &SliceQuery) -> Result<Self, StoreError> {
        let before = match query.before {
            Some(ItemKey::Document(oid)) => Some(oid),
            Some(other) => {
                return Err(StoreError::Backend(format!(
                    "{} key {other} used against the document store",
                    other.kind()
                )))
            }
            None => None,
        };
        let mut predicates = Vec::with_capacity(query.filters.len());
        for op in &query.filters {
            predicates.push(match op {
                FilterOp::MainCategoryEq(v) => Predicate::Main(v.clone()),
                FilterOp::SubCategoryEq(v) => Predicate::Sub(v.clone()),
                FilterOp::KeywordsAny(vs) => Predicate::KeywordsAny(vs.clone()),
                FilterOp::NameContains(term) => {
                    let re = Regex::new(&format!("(?i){}", regex::escape(term)))
                        .map_err(|e| StoreError::Backend(e.to_string()))?;
                    Predicate::Name(re)
                }
            });
        }
        Ok(Self { before, predicates })
    }

    fn accepts(&self, doc: &ProductDocument) -> bool {
        doc.active && self.predicates.iter().all(|p| p.matches(doc))
    }
}

#[derive(Clone)]
pub struct DocumentStore {
    docs: Arc<RwLock<BTreeMap<Ulid, ProductDocument>>>,
    ids: Arc<Mutex<Generator>>,
}

impl Default for DocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentStore {
    pub fn new() -> Self {
        Self {
            docs: Arc::new(RwLock::new(BTreeMap::new())),
            ids: Arc::new(Mutex::new(Generator::new())),
        }
    }

    /// Load a JSON-lines file. A missing file yields an empty store.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let store = Self::new();
        if !path.exists() {
            return Ok(store);
        }
        let file = fs::File::open(path).map_err(|e| StoreError::Unavailable(e.to_string()))?;
        let mut map = BTreeMap::new();
        for line in BufReader::new(file).lines() {
            let line = line.map_err(|e| StoreError::Backend(e.to_string()))?;
            if line.trim().is_empty() {
                continue;
            }
            let doc: ProductDocument = serde_json::from_str(&line)?;
            map.insert(doc.id, doc);
        }
        tracing::debug!(path = %path.display(), documents = map.len(), "loaded document store");
        *store.write()? = map;
        Ok(store)
    }

    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<(), StoreError> {
        let path = path.as_ref();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|e| StoreError::Backend(e.to_string()))?;
        }
        let tmp = path.with_extension("jsonl.tmp");
        {
            let docs = self.read()?;
            let file = fs::File::create(&tmp).map_err(|e| StoreError::Backend(e.to_string()))?;
            let mut w = BufWriter::new(file);
            for doc in docs.values() {
                serde_json::to_writer(&mut w, doc)?;
                w.write_all(b"\n").map_err(|e| StoreError::Backend(e.to_string()))?;
            }
            w.flush().map_err(|e| StoreError::Backend(e.to_string()))?;
        }
        fs::rename(&tmp, path).map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(())
    }

    pub fn len(&self) -> Result<usize, StoreError> {
        Ok(self.read()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.read()?.is_empty())
    }

    /// Insert a draft under a caller-chosen object id, replacing any existing document.
    pub fn insert_at(&self, id: Ulid, draft: ItemDraft) -> Result<ItemKey, StoreError> {
        self.write()?.insert(id, ProductDocument::from_draft(id, draft));
        Ok(ItemKey::Document(id))
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, BTreeMap<Ulid, ProductDocument>>, StoreError> {
        self.docs
            .read()
            .map_err(|_| StoreError::Unavailable("document store lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, BTreeMap<Ulid, ProductDocument>>, StoreError> {
        self.docs
            .write()
            .map_err(|_| StoreError::Unavailable("document store lock poisoned".into()))
    }

    fn next_id(&self, current_max: Option<Ulid>) -> Result<Ulid, StoreError> {
        let mut generator = self
            .ids
            .lock()
            .map_err(|_| StoreError::Unavailable("id generator lock poisoned".into()))?;
        let id = generator.generate().map_err(|e| StoreError::Backend(e.to_string()))?;
        // Loaded or caller-placed ids may sit ahead of the generator.
        Ok(match current_max {
            Some(max) if id <= max => Ulid(max.0.saturating_add(1)),
            _ => id,
        })
    }

    fn scan<'a>(
        docs: &'a BTreeMap<Ulid, ProductDocument>,
        compiled: &'a CompiledQuery,
    ) -> impl Iterator<Item = &'a ProductDocument> + 'a {
        let range = match compiled.before {
            Some(b) => docs.range(..b),
            None => docs.range::<Ulid, _>(..),
        };
        range.rev().map(|(_, d)| d).filter(move |d| compiled.accepts(d))
    }
}

impl CatalogSliceStore for DocumentStore {
    fn kind(&self) -> BackendKind {
        BackendKind::Document
    }

    fn fetch_slice(&self, query: &SliceQuery, limit: usize) -> Result<Vec<CatalogItem>, StoreError> {
        let compiled = CompiledQuery::compile(query)?;
        let docs = self.read()?;
        Ok(Self::scan(&docs, &compiled).take(limit).map(ProductDocument::to_item).collect())
    }

    fn exists_beyond(&self, query: &SliceQuery, position: usize) -> Result<bool, StoreError> {
        let compiled = CompiledQuery::compile(query)?;
        let docs = self.read()?;
        let found = Self::scan(&docs, &compiled).nth(position).is_some();
        Ok(found)
    }

    fn get_active(&self, key: &ItemKey) -> Result<Option<CatalogItem>, StoreError> {
        let ItemKey::Document(oid) = key else { return Ok(None) };
        let docs = self.read()?;
        Ok(docs.get(oid).filter(|d| d.active).map(ProductDocument::to_item))
    }

    fn max_key(&self) -> Result<Option<ItemKey>, StoreError> {
        let docs = self.read()?;
        Ok(docs.keys().next_back().copied().map(ItemKey::Document))
    }
}

impl CatalogWriteStore for DocumentStore {
    fn insert_items(&self, drafts: Vec<ItemDraft>) -> Result<Vec<ItemKey>, StoreError> {
        let mut docs = self.write()?;
        let mut keys = Vec::with_capacity(drafts.len());
        for draft in drafts {
            let id = self.next_id(docs.keys().next_back().copied())?;
            docs.insert(id, ProductDocument::from_draft(id, draft));
            keys.push(ItemKey::Document(id));
        }
        Ok(keys)
    }

    fn soft_delete_items(&self, keys: &[ItemKey]) -> Result<usize, StoreError> {
        let mut docs = self.write()?;
        let mut n = 0;
        for key in keys {
            if let ItemKey::Document(oid) = key {
                if let Some(doc) = docs.get_mut(oid).filter(|d| d.active) {
                    doc.active = false;
                    n += 1;
                }
            }
        }
        Ok(n)
    }
}
