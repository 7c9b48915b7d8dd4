use std::collections::BTreeSet;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use catalog_model::{
    BackendKind, CatalogItem, ItemDraft, ItemKey, MemberId, NewScript, NewStyle, RankingEntry,
    Script, ScriptId, Style, StyleId,
};
use rusqlite::functions::FunctionFlags;
use rusqlite::types::{Type, Value};
use rusqlite::{params, Connection, OpenFlags, OptionalExtension, Row, TransactionBehavior};
use serde::de::DeserializeOwned;

use crate::pool::{ConnectionPool, PoolOptions, PooledConnection};
use crate::{CatalogSliceStore, CatalogWriteStore, FilterOp, SliceQuery, StoreError};

const ITEM_COLUMNS: &str =
    "id, name, price, fee, image, brand, main_category, sub_category, keywords_json, active";
const STYLE_COLUMNS: &str =
    "id, member_id, member_nickname, name, heart_count, product_keys_json, active";
const SCRIPT_COLUMNS: &str = "id, member_id, name, content, keywords_json, heart_count, active";

static MEMORY_DB_SEQ: AtomicU64 = AtomicU64::new(0);

/// SQLite-backed relational store: catalog items keyed by an auto-increment
/// surrogate, plus the style and script tables.
pub struct SqliteRepo {
    pool: ConnectionPool,
    location: String,
}

impl SqliteRepo {
    /// Open a private in-memory database shared by all pooled connections.
    pub fn open_in_memory(opts: PoolOptions) -> Result<Self, StoreError> {
        let seq = MEMORY_DB_SEQ.fetch_add(1, Ordering::Relaxed);
        let uri = format!("file:catalog-{}-{}?mode=memory&cache=shared", std::process::id(), seq);
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let pool = ConnectionPool::build(opts, || {
            let conn = Connection::open_with_flags(&uri, flags)?;
            prepare_connection(&conn, opts.acquire_timeout)?;
            Ok(conn)
        })?;
        let repo = Self { pool, location: uri };
        repo.init(false)?;
        Ok(repo)
    }

    /// Open a file-backed database at `path` and initialize schema if absent.
    pub fn open<P: AsRef<Path>>(path: P, opts: PoolOptions) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let pool = ConnectionPool::build(opts, || {
            let conn = Connection::open(&path)?;
            prepare_connection(&conn, opts.acquire_timeout)?;
            Ok(conn)
        })?;
        let repo = Self { pool, location: path.display().to_string() };
        repo.init(true)?;
        Ok(repo)
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }

    fn conn(&self) -> Result<PooledConnection<'_>, StoreError> {
        self.pool.get()
    }

    fn init(&self, file_backed: bool) -> Result<(), StoreError> {
        let conn = self.conn()?;
        if file_backed {
            let _mode: String =
                conn.pragma_update_and_check(None, "journal_mode", "WAL", |r| r.get(0))?;
            conn.pragma_update(None, "synchronous", "NORMAL")?;
        }
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS catalog_items (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                price INTEGER NOT NULL,
                fee INTEGER NOT NULL,
                image TEXT NOT NULL,
                brand TEXT NOT NULL,
                main_category TEXT NOT NULL,
                sub_category TEXT NOT NULL,
                keywords_json TEXT NOT NULL,
                active INTEGER NOT NULL DEFAULT 1
            );
            CREATE INDEX IF NOT EXISTS idx_items_category
                ON catalog_items(main_category, sub_category, id);

            CREATE TABLE IF NOT EXISTS styles (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                member_id TEXT NOT NULL,
                member_nickname TEXT NOT NULL,
                name TEXT NOT NULL,
                heart_count INTEGER NOT NULL DEFAULT 0,
                product_keys_json TEXT NOT NULL,
                active INTEGER NOT NULL DEFAULT 1
            );
            CREATE INDEX IF NOT EXISTS idx_styles_member ON styles(member_id, id);
            CREATE INDEX IF NOT EXISTS idx_styles_hearts ON styles(heart_count, id);

            CREATE TABLE IF NOT EXISTS scripts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                member_id TEXT NOT NULL,
                name TEXT NOT NULL,
                content TEXT NOT NULL,
                keywords_json TEXT NOT NULL,
                heart_count INTEGER NOT NULL DEFAULT 0,
                active INTEGER NOT NULL DEFAULT 1
            );
            CREATE INDEX IF NOT EXISTS idx_scripts_member ON scripts(member_id, id);

            CREATE TABLE IF NOT EXISTS style_hearts (
                member_id TEXT NOT NULL,
                style_id INTEGER NOT NULL,
                PRIMARY KEY (member_id, style_id)
            );
            CREATE TABLE IF NOT EXISTS script_hearts (
                member_id TEXT NOT NULL,
                script_id INTEGER NOT NULL,
                PRIMARY KEY (member_id, script_id)
            );
            "#,
        )?;
        Ok(())
    }

    fn query_rows<T, F>(&self, sql: &str, params: Vec<Value>, map: F) -> Result<Vec<T>, StoreError>
    where
        F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
    {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(params), map)?;
        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }

    fn query_exists(&self, sql: &str, params: Vec<Value>) -> Result<bool, StoreError> {
        let conn = self.conn()?;
        let found: i64 = conn.query_row(sql, rusqlite::params_from_iter(params), |r| r.get(0))?;
        Ok(found != 0)
    }

    // ------------------------------
    // Styles
    // ------------------------------

    pub fn insert_style(&self, style: &NewStyle) -> Result<StyleId, StoreError> {
        let keys_json = serde_json::to_string(&style.product_keys)?;
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO styles (member_id, member_nickname, name, heart_count, product_keys_json, active)
             VALUES (?1, ?2, ?3, 0, ?4, 1)",
            params![style.member_id.0, style.member_nickname, style.name, keys_json],
        )?;
        Ok(StyleId(conn.last_insert_rowid()))
    }

    pub fn get_style(&self, id: StyleId) -> Result<Option<Style>, StoreError> {
        let conn = self.conn()?;
        let sql = format!("SELECT {STYLE_COLUMNS} FROM styles WHERE id = ?1 AND active = 1");
        let style = conn.query_row(&sql, [id.0], row_to_style).optional()?;
        Ok(style)
    }

    /// Active styles for `ids`, preserving the requested order and skipping misses.
    pub fn get_styles(&self, ids: &[StyleId]) -> Result<Vec<Style>, StoreError> {
        let conn = self.conn()?;
        let sql = format!("SELECT {STYLE_COLUMNS} FROM styles WHERE id = ?1 AND active = 1");
        let mut stmt = conn.prepare(&sql)?;
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(style) = stmt.query_row([id.0], row_to_style).optional()? {
                out.push(style);
            }
        }
        Ok(out)
    }

    /// Up to `limit` active styles with id strictly below `before`, newest first.
    pub fn list_styles(&self, before: Option<StyleId>, limit: usize) -> Result<Vec<Style>, StoreError> {
        let (where_sql, mut params) = keyset_where(before.map(|s| s.0), None);
        let sql = format!("SELECT {STYLE_COLUMNS} FROM styles {where_sql} ORDER BY id DESC LIMIT ?");
        params.push(limit_value(limit));
        self.query_rows(&sql, params, row_to_style)
    }

    pub fn styles_exist_beyond(&self, before: Option<StyleId>, position: usize) -> Result<bool, StoreError> {
        let (where_sql, mut params) = keyset_where(before.map(|s| s.0), None);
        let sql = format!(
            "SELECT EXISTS (SELECT 1 FROM styles {where_sql} ORDER BY id DESC LIMIT 1 OFFSET ?)"
        );
        params.push(limit_value(position));
        self.query_exists(&sql, params)
    }

    pub fn max_style_id(&self) -> Result<Option<StyleId>, StoreError> {
        let conn = self.conn()?;
        let max: Option<i64> = conn.query_row("SELECT MAX(id) FROM styles", [], |r| r.get(0))?;
        Ok(max.map(StyleId))
    }

    /// Ranking batch input: active styles ordered by heart count, ties newest first.
    pub fn top_styles_by_hearts(&self, limit: usize) -> Result<Vec<RankingEntry>, StoreError> {
        let sql = "SELECT id, heart_count FROM styles WHERE active = 1
                   ORDER BY heart_count DESC, id DESC LIMIT ?";
        self.query_rows(sql, vec![limit_value(limit)], |r| {
            Ok(RankingEntry { style_id: StyleId(r.get(0)?), heart_count: r.get(1)? })
        })
    }

    /// Record (`liked`) or withdraw `member`'s heart on an active style.
    /// `None` when the style is absent or deleted, otherwise whether the
    /// member's heart actually changed.
    pub fn set_style_heart(
        &self,
        member: &MemberId,
        id: StyleId,
        liked: bool,
    ) -> Result<Option<bool>, StoreError> {
        self.set_heart(HeartTable::Styles, member, id.0, liked)
    }

    pub fn has_style_heart(&self, member: &MemberId, id: StyleId) -> Result<bool, StoreError> {
        self.has_heart(HeartTable::Styles, member, id.0)
    }

    pub fn count_member_styles(&self, member: &MemberId) -> Result<usize, StoreError> {
        let conn = self.conn()?;
        let n: i64 = conn.query_row(
            "SELECT count(*) FROM styles WHERE member_id = ?1 AND active = 1",
            [member.0.as_str()],
            |r| r.get(0),
        )?;
        Ok(usize::try_from(n).unwrap_or(0))
    }

    /// Offset listing of a member's active styles, newest first.
    pub fn member_styles(
        &self,
        member: &MemberId,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Style>, StoreError> {
        let sql = format!(
            "SELECT {STYLE_COLUMNS} FROM styles WHERE member_id = ? AND active = 1
             ORDER BY id DESC LIMIT ? OFFSET ?"
        );
        let params = vec![Value::from(member.0.clone()), limit_value(limit), limit_value(offset)];
        self.query_rows(&sql, params, row_to_style)
    }

    /// Soft-delete styles owned by `member`. Returns the number deactivated.
    pub fn soft_delete_styles(&self, member: &MemberId, ids: &[StyleId]) -> Result<usize, StoreError> {
        let raw: Vec<i64> = ids.iter().map(|s| s.0).collect();
        self.soft_delete_owned("styles", member, &raw)
    }

    // ------------------------------
    // Scripts
    // ------------------------------

    pub fn insert_script(&self, script: &NewScript) -> Result<ScriptId, StoreError> {
        let keywords_json = serde_json::to_string(&script.keywords)?;
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO scripts (member_id, name, content, keywords_json, heart_count, active)
             VALUES (?1, ?2, ?3, ?4, 0, 1)",
            params![script.member_id.0, script.name, script.content, keywords_json],
        )?;
        Ok(ScriptId(conn.last_insert_rowid()))
    }

    pub fn get_script(&self, id: ScriptId) -> Result<Option<Script>, StoreError> {
        let conn = self.conn()?;
        let sql = format!("SELECT {SCRIPT_COLUMNS} FROM scripts WHERE id = ?1 AND active = 1");
        let script = conn.query_row(&sql, [id.0], row_to_script).optional()?;
        Ok(script)
    }

    /// Up to `limit` active scripts below `before`, optionally for one member, newest first.
    pub fn list_scripts(
        &self,
        before: Option<ScriptId>,
        member: Option<&MemberId>,
        limit: usize,
    ) -> Result<Vec<Script>, StoreError> {
        let (where_sql, mut params) = keyset_where(before.map(|s| s.0), member);
        let sql = format!("SELECT {SCRIPT_COLUMNS} FROM scripts {where_sql} ORDER BY id DESC LIMIT ?");
        params.push(limit_value(limit));
        self.query_rows(&sql, params, row_to_script)
    }

    pub fn scripts_exist_beyond(
        &self,
        before: Option<ScriptId>,
        member: Option<&MemberId>,
        position: usize,
    ) -> Result<bool, StoreError> {
        let (where_sql, mut params) = keyset_where(before.map(|s| s.0), member);
        let sql = format!(
            "SELECT EXISTS (SELECT 1 FROM scripts {where_sql} ORDER BY id DESC LIMIT 1 OFFSET ?)"
        );
        params.push(limit_value(position));
        self.query_exists(&sql, params)
    }

    pub fn max_script_id(&self) -> Result<Option<ScriptId>, StoreError> {
        let conn = self.conn()?;
        let max: Option<i64> = conn.query_row("SELECT MAX(id) FROM scripts", [], |r| r.get(0))?;
        Ok(max.map(ScriptId))
    }

    pub fn latest_script(&self, member: &MemberId) -> Result<Option<Script>, StoreError> {
        Ok(self.list_scripts(None, Some(member), 1)?.into_iter().next())
    }

    pub fn soft_delete_scripts(&self, member: &MemberId, ids: &[ScriptId]) -> Result<usize, StoreError> {
        let raw: Vec<i64> = ids.iter().map(|s| s.0).collect();
        self.soft_delete_owned("scripts", member, &raw)
    }

    /// Script counterpart of [`SqliteRepo::set_style_heart`].
    pub fn set_script_heart(
        &self,
        member: &MemberId,
        id: ScriptId,
        liked: bool,
    ) -> Result<Option<bool>, StoreError> {
        self.set_heart(HeartTable::Scripts, member, id.0, liked)
    }

    pub fn has_script_heart(&self, member: &MemberId, id: ScriptId) -> Result<bool, StoreError> {
        self.has_heart(HeartTable::Scripts, member, id.0)
    }

    // ------------------------------
    // Hearts
    // ------------------------------

    fn set_heart(
        &self,
        table: HeartTable,
        member: &MemberId,
        id: i64,
        liked: bool,
    ) -> Result<Option<bool>, StoreError> {
        let (target, hearts, column) = table.names();
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let live: i64 = tx.query_row(
            &format!("SELECT EXISTS (SELECT 1 FROM {target} WHERE id = ?1 AND active = 1)"),
            [id],
            |r| r.get(0),
        )?;
        if live == 0 {
            return Ok(None);
        }
        let rows = if liked {
            tx.execute(
                &format!("INSERT OR IGNORE INTO {hearts} (member_id, {column}) VALUES (?1, ?2)"),
                params![member.0, id],
            )?
        } else {
            tx.execute(
                &format!("DELETE FROM {hearts} WHERE member_id = ?1 AND {column} = ?2"),
                params![member.0, id],
            )?
        };
        let changed = rows > 0;
        if changed {
            let delta: i64 = if liked { 1 } else { -1 };
            tx.execute(
                &format!("UPDATE {target} SET heart_count = MAX(heart_count + ?1, 0) WHERE id = ?2"),
                params![delta, id],
            )?;
        }
        tx.commit()?;
        Ok(Some(changed))
    }

    fn has_heart(&self, table: HeartTable, member: &MemberId, id: i64) -> Result<bool, StoreError> {
        let (_, hearts, column) = table.names();
        let sql = format!("SELECT EXISTS (SELECT 1 FROM {hearts} WHERE member_id = ? AND {column} = ?)");
        self.query_exists(&sql, vec![Value::from(member.0.clone()), Value::from(id)])
    }

    fn soft_delete_owned(&self, table: &str, member: &MemberId, ids: &[i64]) -> Result<usize, StoreError> {
        if ids.is_empty() {
            return Ok(0);
        }
        let sql = format!(
            "UPDATE {table} SET active = 0 WHERE active = 1 AND member_id = ? AND id IN {}",
            placeholders(ids.len())
        );
        let mut params: Vec<Value> = Vec::with_capacity(ids.len() + 1);
        params.push(member.0.clone().into());
        params.extend(ids.iter().map(|id| Value::from(*id)));
        let conn = self.conn()?;
        let n = conn.execute(&sql, rusqlite::params_from_iter(params))?;
        Ok(n)
    }
}

#[derive(Clone, Copy)]
enum HeartTable {
    Styles,
    Scripts,
}

impl HeartTable {
    /// (target table, heart table, target column in the heart table)
    fn names(self) -> (&'static str, &'static str, &'static str) {
        match self {
            HeartTable::Styles => ("styles", "style_hearts", "style_id"),
            HeartTable::Scripts => ("scripts", "script_hearts", "script_id"),
        }
    }
}

impl CatalogSliceStore for SqliteRepo {
    fn kind(&self) -> BackendKind {
        BackendKind::Relational
    }

    fn fetch_slice(&self, query: &SliceQuery, limit: usize) -> Result<Vec<CatalogItem>, StoreError> {
        let (where_sql, mut params) = item_where(query)?;
        let sql = format!("SELECT {ITEM_COLUMNS} FROM catalog_items {where_sql} ORDER BY id DESC LIMIT ?");
        params.push(limit_value(limit));
        self.query_rows(&sql, params, row_to_item)
    }

    fn exists_beyond(&self, query: &SliceQuery, position: usize) -> Result<bool, StoreError> {
        let (where_sql, mut params) = item_where(query)?;
        let sql = format!(
            "SELECT EXISTS (SELECT 1 FROM catalog_items {where_sql} ORDER BY id DESC LIMIT 1 OFFSET ?)"
        );
        params.push(limit_value(position));
        self.query_exists(&sql, params)
    }

    fn get_active(&self, key: &ItemKey) -> Result<Option<CatalogItem>, StoreError> {
        let Some(id) = key.as_relational() else { return Ok(None) };
        let conn = self.conn()?;
        let sql = format!("SELECT {ITEM_COLUMNS} FROM catalog_items WHERE id = ?1 AND active = 1");
        let item = conn.query_row(&sql, [id], row_to_item).optional()?;
        Ok(item)
    }

    fn get_active_many(&self, keys: &[ItemKey]) -> Result<Vec<CatalogItem>, StoreError> {
        let conn = self.conn()?;
        let sql = format!("SELECT {ITEM_COLUMNS} FROM catalog_items WHERE id = ?1 AND active = 1");
        let mut stmt = conn.prepare(&sql)?;
        let mut out = Vec::with_capacity(keys.len());
        for id in keys.iter().filter_map(ItemKey::as_relational) {
            if let Some(item) = stmt.query_row([id], row_to_item).optional()? {
                out.push(item);
            }
        }
        Ok(out)
    }

    fn max_key(&self) -> Result<Option<ItemKey>, StoreError> {
        let conn = self.conn()?;
        let max: Option<i64> = conn.query_row("SELECT MAX(id) FROM catalog_items", [], |r| r.get(0))?;
        Ok(max.map(ItemKey::Relational))
    }
}

impl CatalogWriteStore for SqliteRepo {
    fn insert_items(&self, drafts: Vec<ItemDraft>) -> Result<Vec<ItemKey>, StoreError> {
        if drafts.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let mut keys = Vec::with_capacity(drafts.len());
        {
            let mut stmt = tx.prepare(
                "INSERT INTO catalog_items (
                    name, price, fee, image, brand, main_category, sub_category, keywords_json, active
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 1)",
            )?;
            for d in drafts {
                let keywords_json = serde_json::to_string(&d.keywords)?;
                stmt.execute(params![
                    d.name,
                    d.price,
                    d.fee,
                    d.image,
                    d.brand,
                    d.main_category,
                    d.sub_category,
                    keywords_json,
                ])?;
                keys.push(ItemKey::Relational(tx.last_insert_rowid()));
            }
        }
        tx.commit()?;
        Ok(keys)
    }

    fn soft_delete_items(&self, keys: &[ItemKey]) -> Result<usize, StoreError> {
        let ids: Vec<i64> = keys.iter().filter_map(ItemKey::as_relational).collect();
        if ids.is_empty() {
            return Ok(0);
        }
        let sql = format!(
            "UPDATE catalog_items SET active = 0 WHERE active = 1 AND id IN {}",
            placeholders(ids.len())
        );
        let conn = self.conn()?;
        let n = conn.execute(&sql, rusqlite::params_from_iter(ids))?;
        Ok(n)
    }
}

/// Compose the WHERE clause for a catalog slice. The lifecycle predicate is
/// always the first conjunct.
fn item_where(query: &SliceQuery) -> Result<(String, Vec<Value>), StoreError> {
    let mut where_sql = String::from("WHERE active = 1");
    let mut params: Vec<Value> = Vec::new();

    match query.before {
        Some(ItemKey::Relational(id)) => {
            where_sql.push_str(" AND id < ?");
            params.push(id.into());
        }
        Some(other) => {
            return Err(StoreError::Backend(format!(
                "{} key {other} used against the relational store",
                other.kind()
            )));
        }
        None => {}
    }

    for op in &query.filters {
        match op {
            FilterOp::MainCategoryEq(v) => {
                where_sql.push_str(" AND main_category = ?");
                params.push(v.clone().into());
            }
            FilterOp::SubCategoryEq(v) => {
                where_sql.push_str(" AND sub_category = ?");
                params.push(v.clone().into());
            }
            FilterOp::KeywordsAny(vs) => {
                if vs.is_empty() {
                    where_sql.push_str(" AND 0");
                } else {
                    where_sql.push_str(
                        " AND EXISTS (SELECT 1 FROM json_each(catalog_items.keywords_json) AS kw WHERE kw.value IN ",
                    );
                    where_sql.push_str(&placeholders(vs.len()));
                    where_sql.push(')');
                    params.extend(vs.iter().map(|v| Value::from(v.clone())));
                }
            }
            FilterOp::NameContains(term) => {
                // Built-in LIKE only folds ASCII; fold both sides first.
                where_sql.push_str(" AND fold(name) LIKE fold(?) ESCAPE '\\'");
                params.push(format!("%{}%", escape_like(term)).into());
            }
        }
    }
    Ok((where_sql, params))
}

fn keyset_where(before: Option<i64>, member: Option<&MemberId>) -> (String, Vec<Value>) {
    let mut where_sql = String::from("WHERE active = 1");
    let mut params: Vec<Value> = Vec::new();
    if let Some(id) = before {
        where_sql.push_str(" AND id < ?");
        params.push(id.into());
    }
    if let Some(m) = member {
        where_sql.push_str(" AND member_id = ?");
        params.push(m.0.clone().into());
    }
    (where_sql, params)
}

fn placeholders(n: usize) -> String {
    let mut s = String::from("(");
    for i in 0..n {
        if i > 0 {
            s.push(',');
        }
        s.push('?');
    }
    s.push(')');
    s
}

fn escape_like(term: &str) -> String {
    let mut out = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Busy timeout plus the `fold` scalar (Unicode lowercase) used by name search.
fn prepare_connection(conn: &Connection, busy: Duration) -> rusqlite::Result<()> {
    conn.busy_timeout(busy)?;
    conn.create_scalar_function(
        "fold",
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let text: Option<String> = ctx.get(0)?;
            Ok(text.map(|t| t.to_lowercase()))
        },
    )
}

fn limit_value(n: usize) -> Value {
    Value::Integer(i64::try_from(n).unwrap_or(i64::MAX))
}

/// Decode a JSON text column. Malformed content is a conversion failure,
/// never an empty default.
fn json_column<T: DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn row_to_item(row: &Row<'_>) -> rusqlite::Result<CatalogItem> {
    let keywords: BTreeSet<String> = json_column(row, 8)?;
    let active: i64 = row.get(9)?;
    Ok(CatalogItem {
        key: ItemKey::Relational(row.get(0)?),
        name: row.get(1)?,
        price: row.get(2)?,
        fee: row.get(3)?,
        image: row.get(4)?,
        brand: row.get(5)?,
        main_category: row.get(6)?,
        sub_category: row.get(7)?,
        keywords,
        active: active != 0,
    })
}

fn row_to_style(row: &Row<'_>) -> rusqlite::Result<Style> {
    let product_keys: Vec<ItemKey> = json_column(row, 5)?;
    let active: i64 = row.get(6)?;
    Ok(Style {
        id: StyleId(row.get(0)?),
        member_id: MemberId(row.get(1)?),
        member_nickname: row.get(2)?,
        name: row.get(3)?,
        heart_count: row.get(4)?,
        product_keys,
        active: active != 0,
    })
}

fn row_to_script(row: &Row<'_>) -> rusqlite::Result<Script> {
    let keywords: Vec<String> = json_column(row, 4)?;
    let active: i64 = row.get(6)?;
    Ok(Script {
        id: ScriptId(row.get(0)?),
        member_id: MemberId(row.get(1)?),
        name: row.get(2)?,
        content: row.get(3)?,
        keywords,
        heart_count: row.get(5)?,
        active: active != 0,
    })
}
