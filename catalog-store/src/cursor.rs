//! Cursor codec: the opaque position marker handed to callers is the
//! backend-native key of the last seen item.
//!
//! Relational keys travel as decimal integers, document keys as canonical
//! 26-character ULID strings. Both decode back to the exact key.

use catalog_model::{BackendKind, CatalogItem, ItemKey};
use ulid::Ulid;

const MAX_CURSOR_LEN: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CursorError {
    #[error("invalid {kind} cursor `{raw}`: {reason}")]
    InvalidCursor {
        kind: BackendKind,
        raw: String,
        reason: String,
    },
}

impl CursorError {
    fn invalid(kind: BackendKind, raw: &str, reason: impl Into<String>) -> Self {
        let raw: String = raw.chars().take(MAX_CURSOR_LEN).collect();
        CursorError::InvalidCursor { kind, raw, reason: reason.into() }
    }
}

pub fn encode(key: &ItemKey) -> String {
    key.to_string()
}

pub fn encode_item(item: &CatalogItem) -> String {
    encode(&item.key)
}

/// Decode a caller-supplied cursor for a backend of `kind`.
pub fn decode(kind: BackendKind, raw: &str) -> Result<ItemKey, CursorError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(CursorError::invalid(kind, raw, "empty cursor"));
    }
    if trimmed.len() > MAX_CURSOR_LEN {
        return Err(CursorError::invalid(kind, raw, "cursor exceeds max length"));
    }
    match kind {
        BackendKind::Relational => {
            let id: i64 = trimmed
                .parse()
                .map_err(|e: std::num::ParseIntError| CursorError::invalid(kind, raw, e.to_string()))?;
            if id < 0 {
                return Err(CursorError::invalid(kind, raw, "negative key"));
            }
            Ok(ItemKey::Relational(id))
        }
        BackendKind::Document => Ulid::from_string(trimmed)
            .map(ItemKey::Document)
            .map_err(|e| CursorError::invalid(kind, raw, e.to_string())),
    }
}

/// The "start from newest" sentinel: just past the greatest known key.
/// `None` when the backend holds no rows at all.
pub fn sentinel_after(max_key: Option<ItemKey>) -> Option<ItemKey> {
    max_key.map(|k| k.successor())
}
