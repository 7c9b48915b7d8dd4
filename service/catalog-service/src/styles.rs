use std::sync::Arc;

use catalog_model::{
    BackendKind, CatalogItem, ItemKey, MemberId, NewStyle, Page, Slice, Style, StyleDetail,
    StyleId, StyleListing, StyleSummary,
};
use catalog_store::{cursor, CatalogSliceStore, RankingSnapshot};

use crate::refresher::refresh_once;
use crate::{CatalogService, ServiceError};

const STYLE_KEYWORD_LIMIT: usize = 5;

/// Row-id cursor for the relational style and script listings.
pub(crate) fn decode_row_cursor(raw: Option<&str>) -> Option<i64> {
    let raw = raw?;
    match cursor::decode(BackendKind::Relational, raw) {
        Ok(key) => key.as_relational(),
        Err(e) => {
            tracing::debug!(error = %e, "ignoring cursor, starting from newest");
            None
        }
    }
}

fn summarize(style: &Style, products: &[CatalogItem]) -> StyleSummary {
    let mut keyword_list: Vec<String> = Vec::new();
    for keyword in products.iter().flat_map(|p| p.keywords.iter()) {
        if keyword_list.len() == STYLE_KEYWORD_LIMIT {
            break;
        }
        if !keyword_list.contains(keyword) {
            keyword_list.push(keyword.clone());
        }
    }
    StyleSummary {
        id: style.id,
        name: style.name.clone(),
        heart_count: style.heart_count,
        member_nickname: style.member_nickname.clone(),
        url_list: products.iter().map(|p| p.image.clone()).collect(),
        keyword_list,
    }
}

impl CatalogService {
    /// Randomized style-off draw: `k` distinct top-ranked styles, each
    /// resolved live. Ranked ids whose style is gone are skipped.
    pub fn draw_style_set(&self, k: usize) -> Result<Vec<StyleSummary>, ServiceError> {
        let ids = self.ranking.draw_random(k)?;
        let styles = self.repo.get_styles(&ids)?;
        if styles.len() < ids.len() {
            tracing::warn!(drawn = ids.len(), resolved = styles.len(), "ranking references missing styles");
        }
        styles.iter().map(|s| self.style_summary(s)).collect()
    }

    pub fn draw_default_style_set(&self) -> Result<Vec<StyleSummary>, ServiceError> {
        self.draw_style_set(self.cfg.style_draw_size)
    }

    /// Recompute the top-N styles by hearts and swap them into the cache.
    pub fn refresh_ranking(&self) -> Result<Arc<RankingSnapshot>, ServiceError> {
        refresh_once(&self.repo, &self.ranking)
    }

    /// Newest-first keyset listing of styles with their products resolved.
    pub fn list_styles(&self, cursor: Option<&str>, page_size: usize) -> Result<Slice<StyleListing>, ServiceError> {
        let size = self.resolve_page_size(page_size)?;
        let before = match decode_row_cursor(cursor) {
            Some(id) => Some(StyleId(id)),
            None => self.repo.max_style_id()?.map(|StyleId(id)| StyleId(id.saturating_add(1))),
        };
        let styles = self.repo.list_styles(before, size)?;
        let has_next = styles.len() == size && self.repo.styles_exist_beyond(before, size)?;
        let next_cursor = if has_next { styles.last().map(|s| s.id.0.to_string()) } else { None };

        let mut content = Vec::with_capacity(styles.len());
        for style in styles {
            content.push(StyleListing {
                id: style.id,
                products: self.item_views(&style.product_keys)?,
                name: style.name,
                heart_count: style.heart_count,
                member_nickname: style.member_nickname,
            });
        }
        Ok(Slice { content, has_next, next_cursor })
    }

    pub fn style_detail(&self, id: StyleId) -> Result<StyleDetail, ServiceError> {
        let style = self.active_style(id)?;
        Ok(StyleDetail {
            products: self.item_views(&style.product_keys)?,
            member_nickname: style.member_nickname,
            name: style.name,
            heart_count: style.heart_count,
        })
    }

    /// Offset page of one member's styles with totals.
    pub fn member_styles(
        &self,
        member: &MemberId,
        page_index: usize,
        page_size: usize,
    ) -> Result<Page<StyleSummary>, ServiceError> {
        let size = self.resolve_page_size(page_size)?;
        let total = self.repo.count_member_styles(member)?;
        let styles = self.repo.member_styles(member, page_index.saturating_mul(size), size)?;
        let content = styles.iter().map(|s| self.style_summary(s)).collect::<Result<Vec<_>, _>>()?;
        Ok(Page::new(content, page_index, total, size))
    }

    /// Record a new style. Every product must be an active catalog item.
    pub fn save_style(
        &self,
        member: &MemberId,
        member_nickname: &str,
        name: &str,
        product_keys: Vec<ItemKey>,
    ) -> Result<StyleId, ServiceError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ServiceError::InvalidRequest("style name must not be blank".into()));
        }
        if product_keys.is_empty() {
            return Err(ServiceError::InvalidRequest("a style needs at least one product".into()));
        }
        for key in &product_keys {
            if self.catalog.get_active(key)?.is_none() {
                return Err(ServiceError::InvalidRequest(format!("unknown product {key}")));
            }
        }
        let id = self.repo.insert_style(&NewStyle {
            member_id: member.clone(),
            member_nickname: member_nickname.to_string(),
            name: name.to_string(),
            product_keys,
        })?;
        tracing::info!(style = id.0, member = %member.0, "saved style");
        Ok(id)
    }

    /// Heart a style on behalf of `member`. Repeat likes by the same member
    /// leave the count unchanged.
    pub fn like_style(&self, member: &MemberId, id: StyleId) -> Result<(), ServiceError> {
        self.set_style_heart(member, id, true)
    }

    pub fn unlike_style(&self, member: &MemberId, id: StyleId) -> Result<(), ServiceError> {
        self.set_style_heart(member, id, false)
    }

    /// Soft-delete styles owned by `member`; others' styles are left alone.
    pub fn soft_delete_styles(&self, member: &MemberId, ids: &[StyleId]) -> Result<usize, ServiceError> {
        let n = self.repo.soft_delete_styles(member, ids)?;
        tracing::info!(member = %member.0, requested = ids.len(), deleted = n, "soft-deleted styles");
        Ok(n)
    }

    fn set_style_heart(&self, member: &MemberId, id: StyleId, liked: bool) -> Result<(), ServiceError> {
        match self.repo.set_style_heart(member, id, liked)? {
            Some(changed) => {
                tracing::debug!(style = id.0, member = %member.0, liked, changed, "style heart");
                Ok(())
            }
            None => Err(ServiceError::NotFound(format!("style {}", id.0))),
        }
    }

    fn active_style(&self, id: StyleId) -> Result<Style, ServiceError> {
        self.repo
            .get_style(id)?
            .ok_or_else(|| ServiceError::NotFound(format!("style {}", id.0)))
    }

    fn style_summary(&self, style: &Style) -> Result<StyleSummary, ServiceError> {
        let products = self.catalog.get_active_many(&style.product_keys)?;
        Ok(summarize(style, &products))
    }
}
