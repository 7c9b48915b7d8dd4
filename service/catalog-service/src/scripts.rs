use catalog_model::{
    ItemView, KeywordQuery, MemberId, NewScript, Script, ScriptDetail, ScriptId, ScriptSummary, Slice,
};
use catalog_store::KeywordError;

use crate::styles::decode_row_cursor;
use crate::{CatalogService, ServiceError};

/// Trim, drop blanks and dedupe while keeping the caller's order.
fn normalize_keywords(keywords: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(keywords.len());
    for k in keywords.iter().map(|k| k.trim()).filter(|k| !k.is_empty()) {
        if !out.iter().any(|seen| seen == k) {
            out.push(k.to_string());
        }
    }
    out
}

impl CatalogService {
    /// Generate script content from the keywords and store it for `member`.
    /// Generation failures propagate unchanged; nothing is stored then.
    pub fn create_script(&self, member: &MemberId, name: &str, keywords: &[String]) -> Result<ScriptId, ServiceError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ServiceError::InvalidRequest("script name must not be blank".into()));
        }
        let keywords = normalize_keywords(keywords);
        if keywords.is_empty() {
            return Err(ServiceError::InvalidRequest("a script needs at least one keyword".into()));
        }

        let prompt = keywords.join(", ");
        let content = self.generator.generate(&prompt)?;
        let id = self.repo.insert_script(&NewScript {
            member_id: member.clone(),
            name: name.to_string(),
            content,
            keywords,
        })?;
        tracing::info!(script = id.0, member = %member.0, "created script");
        Ok(id)
    }

    /// Newest-first keyset listing of scripts, optionally for one member, each
    /// with a keyword-sampled thumbnail.
    pub fn list_scripts(
        &self,
        cursor: Option<&str>,
        page_size: usize,
        member: Option<&MemberId>,
    ) -> Result<Slice<ScriptSummary>, ServiceError> {
        let size = self.resolve_page_size(page_size)?;
        let before = match decode_row_cursor(cursor) {
            Some(id) => Some(ScriptId(id)),
            None => self.repo.max_script_id()?.map(|ScriptId(id)| ScriptId(id.saturating_add(1))),
        };
        let scripts = self.repo.list_scripts(before, member, size)?;
        let has_next = scripts.len() == size && self.repo.scripts_exist_beyond(before, member, size)?;
        let next_cursor = if has_next { scripts.last().map(|s| s.id.0.to_string()) } else { None };

        let content = scripts
            .into_iter()
            .map(|s| self.script_summary(s))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Slice { content, has_next, next_cursor })
    }

    pub fn latest_script(&self, member: &MemberId) -> Result<ScriptSummary, ServiceError> {
        let script = self
            .repo
            .latest_script(member)?
            .ok_or_else(|| ServiceError::NotFound(format!("script for member {}", member.0)))?;
        self.script_summary(script)
    }

    /// Full script with content. `has_like` reflects `viewer`'s heart and is
    /// false for anonymous reads.
    pub fn script_detail(&self, id: ScriptId, viewer: Option<&MemberId>) -> Result<ScriptDetail, ServiceError> {
        let mut script = self.active_script(id)?;
        let has_like = match viewer {
            Some(member) => self.repo.has_script_heart(member, id)?,
            None => false,
        };
        let content = std::mem::take(&mut script.content);
        Ok(ScriptDetail { summary: self.script_summary(script)?, content, has_like })
    }

    pub fn like_script(&self, member: &MemberId, id: ScriptId) -> Result<(), ServiceError> {
        self.set_script_heart(member, id, true)
    }

    pub fn unlike_script(&self, member: &MemberId, id: ScriptId) -> Result<(), ServiceError> {
        self.set_script_heart(member, id, false)
    }

    /// Catalog items sharing a keyword with the script, newest first.
    pub fn recommend_for_script(
        &self,
        id: ScriptId,
        cursor: Option<&str>,
        page_size: usize,
    ) -> Result<Slice<ItemView>, ServiceError> {
        let script = self.active_script(id)?;
        let keywords = KeywordQuery::from_terms(&script.keywords);
        self.recommend_by_keywords(&keywords, cursor, page_size)
    }

    pub fn soft_delete_scripts(&self, member: &MemberId, ids: &[ScriptId]) -> Result<usize, ServiceError> {
        let n = self.repo.soft_delete_scripts(member, ids)?;
        tracing::info!(member = %member.0, requested = ids.len(), deleted = n, "soft-deleted scripts");
        Ok(n)
    }

    /// Representative image for a keyword set; `None` when nothing matches.
    pub fn thumbnail_for(&self, keywords: &KeywordQuery) -> Result<Option<String>, ServiceError> {
        match self.matcher().sample_one(keywords) {
            Ok(item) => Ok(Some(item.image)),
            Err(KeywordError::NoMatchFound(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set_script_heart(&self, member: &MemberId, id: ScriptId, liked: bool) -> Result<(), ServiceError> {
        match self.repo.set_script_heart(member, id, liked)? {
            Some(changed) => {
                tracing::debug!(script = id.0, member = %member.0, liked, changed, "script heart");
                Ok(())
            }
            None => Err(ServiceError::NotFound(format!("script {}", id.0))),
        }
    }

    fn active_script(&self, id: ScriptId) -> Result<Script, ServiceError> {
        self.repo
            .get_script(id)?
            .ok_or_else(|| ServiceError::NotFound(format!("script {}", id.0)))
    }

    fn script_summary(&self, script: Script) -> Result<ScriptSummary, ServiceError> {
        let image = self.thumbnail_for(&KeywordQuery::from_terms(&script.keywords))?;
        Ok(ScriptSummary {
            id: script.id,
            name: script.name,
            heart_count: script.heart_count,
            keywords: script.keywords,
            image,
        })
    }
}
