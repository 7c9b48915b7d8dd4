//! Shared models used across crates

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Storage backend that owns a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Auto-increment relational store (SQLite).
    Relational,
    /// Object-id ordered document store.
    Document,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Relational => f.write_str("relational"),
            BackendKind::Document => f.write_str("document"),
        }
    }
}

/// Backend-native identity of a catalog item.
///
/// Keys of the same kind compare in their backend's native order; newer
/// items always carry greater keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ItemKey {
    Relational(i64),
    Document(Ulid),
}

impl ItemKey {
    pub fn kind(&self) -> BackendKind {
        match self {
            ItemKey::Relational(_) => BackendKind::Relational,
            ItemKey::Document(_) => BackendKind::Document,
        }
    }

    /// The smallest key strictly greater than `self` (saturating).
    pub fn successor(&self) -> Self {
        match self {
            ItemKey::Relational(id) => ItemKey::Relational(id.saturating_add(1)),
            ItemKey::Document(oid) => ItemKey::Document(Ulid(oid.0.saturating_add(1))),
        }
    }

    pub fn as_relational(&self) -> Option<i64> {
        match self {
            ItemKey::Relational(id) => Some(*id),
            ItemKey::Document(_) => None,
        }
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemKey::Relational(id) => write!(f, "{id}"),
            ItemKey::Document(oid) => write!(f, "{oid}"),
        }
    }
}

/// Catalog fields supplied by ingestion, before a backend assigns a key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemDraft {
    pub name: String,
    pub price: i64,
    pub fee: i64,
    pub image: String,
    pub brand: String,
    pub main_category: String,
    pub sub_category: String,
    pub keywords: BTreeSet<String>,
}

impl ItemDraft {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Self::default() }
    }

    pub fn with_category(mut self, main: impl Into<String>, sub: impl Into<String>) -> Self {
        self.main_category = main.into();
        self.sub_category = sub.into();
        self
    }

    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_price(mut self, price: i64, fee: i64) -> Self {
        self.price = price;
        self.fee = fee;
        self
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = image.into();
        self
    }

    pub fn with_brand(mut self, brand: impl Into<String>) -> Self {
        self.brand = brand.into();
        self
    }
}

/// A product as held by one of the storage backends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub key: ItemKey,
    pub name: String,
    pub price: i64,
    pub fee: i64,
    pub image: String,
    pub brand: String,
    pub main_category: String,
    pub sub_category: String,
    /// Unordered, deduplicated keyword set.
    pub keywords: BTreeSet<String>,
    /// False once soft-deleted. Inactive items never leave the query layer.
    pub active: bool,
}

/// List-view projection of a catalog item returned by paged operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemView {
    /// Encoded key; doubles as the cursor for the next page.
    pub id: String,
    pub name: String,
    pub price: i64,
    pub fee: i64,
    pub image: String,
    pub brand_name: String,
}

impl From<&CatalogItem> for ItemView {
    fn from(item: &CatalogItem) -> Self {
        Self {
            id: item.key.to_string(),
            name: item.name.clone(),
            price: item.price,
            fee: item.fee,
            image: item.image.clone(),
            brand_name: item.brand.clone(),
        }
    }
}

/// Optional main/sub category matchers. `None` means no filter on that axis.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryFilter {
    pub main: Option<String>,
    pub sub: Option<String>,
}

impl CategoryFilter {
    pub fn main(main: impl Into<String>) -> Self {
        Self { main: Some(main.into()), sub: None }
    }

    pub fn with_sub(mut self, sub: impl Into<String>) -> Self {
        self.sub = Some(sub.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.main.is_none() && self.sub.is_none()
    }
}

/// Deduplicated keyword set used for matching; order is irrelevant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordQuery(BTreeSet<String>);

impl KeywordQuery {
    /// Build from individual terms, trimming and dropping blanks.
    pub fn from_terms<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(
            terms
                .into_iter()
                .map(|t| t.as_ref().trim().to_string())
                .filter(|t| !t.is_empty())
                .collect(),
        )
    }

    /// Split a free-text term on commas and whitespace.
    pub fn from_text(text: &str) -> Self {
        Self::from_terms(text.split(|c: char| c == ',' || c.is_whitespace()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.0.iter()
    }

    pub fn contains(&self, keyword: &str) -> bool {
        self.0.contains(keyword)
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.0.iter().cloned().collect()
    }

    /// True when `keywords` shares at least one entry with this query.
    pub fn intersects<'a, I>(&self, keywords: I) -> bool
    where
        I: IntoIterator<Item = &'a String>,
    {
        keywords.into_iter().any(|k| self.0.contains(k))
    }
}

/// Keyset slice: an ordered bounded page plus a continuation signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slice<T> {
    pub content: Vec<T>,
    pub has_next: bool,
    /// Cursor of the last returned item, present only when `has_next`.
    pub next_cursor: Option<String>,
}

impl<T> Slice<T> {
    pub fn empty() -> Self {
        Self { content: Vec::new(), has_next: false, next_cursor: None }
    }

    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> Slice<U> {
        Slice {
            content: self.content.into_iter().map(f).collect(),
            has_next: self.has_next,
            next_cursor: self.next_cursor,
        }
    }

    pub fn try_map<U, E, F>(self, f: F) -> Result<Slice<U>, E>
    where
        F: FnMut(T) -> Result<U, E>,
    {
        Ok(Slice {
            content: self.content.into_iter().map(f).collect::<Result<Vec<_>, E>>()?,
            has_next: self.has_next,
            next_cursor: self.next_cursor,
        })
    }
}

/// Offset page with totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub content: Vec<T>,
    pub current_page: usize,
    pub total_page: usize,
}

impl<T> Page<T> {
    pub fn new(content: Vec<T>, current_page: usize, total_items: usize, page_size: usize) -> Self {
        let total_page = if page_size == 0 { 0 } else { total_items.div_ceil(page_size) };
        Self { content, current_page, total_page }
    }
}

/// Opaque authenticated member identity supplied by the identity collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemberId(pub String);

impl MemberId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StyleId(pub i64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ScriptId(pub i64);

/// A member-curated outfit made of catalog items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Style {
    pub id: StyleId,
    pub member_id: MemberId,
    pub member_nickname: String,
    pub name: String,
    pub heart_count: i64,
    pub product_keys: Vec<ItemKey>,
    pub active: bool,
}

/// Fields needed to record a new style.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewStyle {
    pub member_id: MemberId,
    pub member_nickname: String,
    pub name: String,
    pub product_keys: Vec<ItemKey>,
}

/// Precomputed rank metric for one style, produced by the ranking batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankingEntry {
    pub style_id: StyleId,
    pub heart_count: i64,
}

/// Style card used by the randomized style-off draw and member listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleSummary {
    pub id: StyleId,
    pub name: String,
    pub heart_count: i64,
    pub member_nickname: String,
    pub url_list: Vec<String>,
    pub keyword_list: Vec<String>,
}

/// Style row with its products resolved to list views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleListing {
    pub id: StyleId,
    pub name: String,
    pub heart_count: i64,
    pub member_nickname: String,
    pub products: Vec<ItemView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleDetail {
    pub member_nickname: String,
    pub name: String,
    pub heart_count: i64,
    pub products: Vec<ItemView>,
}

/// Generated outfit script owned by a member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Script {
    pub id: ScriptId,
    pub member_id: MemberId,
    pub name: String,
    pub content: String,
    pub keywords: Vec<String>,
    pub heart_count: i64,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewScript {
    pub member_id: MemberId,
    pub name: String,
    pub content: String,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptSummary {
    pub id: ScriptId,
    pub name: String,
    pub heart_count: i64,
    pub keywords: Vec<String>,
    /// Representative thumbnail; absent when no catalog item matches the keywords.
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptDetail {
    #[serde(flatten)]
    pub summary: ScriptSummary,
    pub content: String,
    /// Whether the viewing member has hearted this script. False without a viewer.
    pub has_like: bool,
}
