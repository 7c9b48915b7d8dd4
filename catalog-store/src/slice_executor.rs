use catalog_model::{CatalogItem, Slice};

use crate::cursor;
use crate::{CatalogSliceStore, SliceQuery, StoreError};

/// Zero-based position of the first row past page `page_index` of `size`
/// rows, i.e. `(page_index + 1) * size`. Keyset reads always sit at page
/// zero of their bound.
pub fn lookahead_position(page_index: usize, size: usize) -> usize {
    page_index.saturating_add(1).saturating_mul(size)
}

/// Run one keyset slice: fetch up to `size` items below the query bound and
/// check whether any item exists past them.
///
/// `next_cursor` is the key of the last returned item and is only set when
/// `has_next` is true.
pub fn execute_slice<S>(store: &S, query: &SliceQuery, size: usize) -> Result<Slice<CatalogItem>, StoreError>
where
    S: CatalogSliceStore + ?Sized,
{
    if size == 0 {
        let has_next = store.exists_beyond(query, 0)?;
        return Ok(Slice { content: Vec::new(), has_next, next_cursor: None });
    }
    let content = store.fetch_slice(query, size)?;
    let has_next = if content.len() < size {
        false
    } else {
        store.exists_beyond(query, lookahead_position(0, size))?
    };
    let next_cursor = if has_next { content.last().map(cursor::encode_item) } else { None };
    tracing::debug!(
        backend = %store.kind(),
        before = ?query.before,
        filters = query.filters.len(),
        returned = content.len(),
        has_next,
        "executed keyset slice"
    );
    Ok(Slice { content, has_next, next_cursor })
}
