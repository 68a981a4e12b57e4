//! Lua type conversions for bufrecall-core types
//!
//! Column data handed to Lua is always a 0-based byte range so it can go
//! straight into `nvim_buf_set_extmark`. Byte ranges of a search item are
//! clipped to its (possibly truncated) `text` field. Character spans refer to
//! the full buffer line.

use bufrecall_core::path_utils::truncate_for_display;
use bufrecall_core::{
    HighlightSpan, LineHighlights, MatchResult, RecallConfig, RecentListing, SearchOutcome,
    SessionHealth, clip_byte_ranges, spans_to_byte_ranges,
};
use mlua::prelude::*;
use std::path::PathBuf;

/// Config table passed to `initialize`. Missing keys keep their defaults.
pub struct LuaConfig(pub RecallConfig);

impl FromLua for LuaConfig {
    fn from_lua(value: LuaValue, _: &Lua) -> LuaResult<Self> {
        let table = match value {
            LuaValue::Table(table) => table,
            LuaValue::Nil => return Ok(Self(RecallConfig::default())),
            other => {
                return Err(LuaError::RuntimeError(format!(
                    "bufrecall config must be a table, got {}",
                    other.type_name()
                )));
            }
        };

        let mut config = RecallConfig::default();
        if let Some(max_entries) = table.get::<Option<usize>>("max_entries")? {
            config.max_entries = max_entries;
        }
        if let Some(data_dir) = table.get::<Option<String>>("data_dir")? {
            config.data_dir = Some(PathBuf::from(data_dir));
        }
        if let Some(cache_file_name) = table.get::<Option<String>>("cache_file_name")? {
            config.cache_file_name = cache_file_name;
        }
        if let Some(max_len) = table.get::<Option<usize>>("max_line_display_len")? {
            config.max_line_display_len = max_len;
        }

        Ok(Self(config))
    }
}

fn span_into_lua(span: &HighlightSpan, lua: &Lua) -> LuaResult<LuaTable> {
    let table = lua.create_table()?;
    table.set("start", span.start)?;
    table.set("end", span.end)?;
    Ok(table)
}

fn highlights_into_lua(
    text: &str,
    visible_len: usize,
    highlights: &LineHighlights,
    lua: &Lua,
) -> LuaResult<LuaTable> {
    let table = lua.create_table()?;
    table.set("line", span_into_lua(&highlights.line, lua)?)?;

    let matches = lua.create_table()?;
    for (i, span) in highlights.matches.iter().enumerate() {
        matches.set(i + 1, span_into_lua(span, lua)?)?;
    }
    table.set("matches", matches)?;

    let byte_ranges = lua.create_table()?;
    let ranges = spans_to_byte_ranges(text, &highlights.matches);
    for (i, (start, end)) in clip_byte_ranges(&ranges, visible_len)
        .into_iter()
        .enumerate()
    {
        let range = lua.create_table()?;
        range.set("start", start)?;
        range.set("end", end)?;
        byte_ranges.set(i + 1, range)?;
    }
    table.set("byte_ranges", byte_ranges)?;

    Ok(table)
}

/// Highlights of a single line, as returned by `highlight`.
pub struct LineHighlightsLua<'a> {
    pub text: &'a str,
    pub highlights: LineHighlights,
}

impl IntoLua for LineHighlightsLua<'_> {
    fn into_lua(self, lua: &Lua) -> LuaResult<LuaValue> {
        highlights_into_lua(self.text, self.text.len(), &self.highlights, lua)
            .map(LuaValue::Table)
    }
}

pub struct RecentListingsLua(pub Vec<RecentListing>);

impl IntoLua for RecentListingsLua {
    fn into_lua(self, lua: &Lua) -> LuaResult<LuaValue> {
        let list = lua.create_table()?;
        for (i, listing) in self.0.iter().enumerate() {
            let table = lua.create_table()?;
            table.set("identity", listing.entry.identity.as_str())?;
            table.set("label", listing.entry.display_label.as_str())?;
            table.set("last_used", listing.entry.last_used)?;
            table.set("is_live", listing.is_live)?;
            // nil for live entries, existence is only probed otherwise
            table.set("exists", listing.exists)?;
            table.set("handle", listing.entry.live_handle)?;
            list.set(i + 1, table)?;
        }
        Ok(LuaValue::Table(list))
    }
}

/// Wrapper for SearchOutcome that implements IntoLua
pub struct SearchOutcomeLua<'a> {
    pub outcome: SearchOutcome<'a>,
    pub max_line_display_len: usize,
}

fn match_result_into_lua(item: &MatchResult<'_>, max_len: usize, lua: &Lua) -> LuaResult<LuaTable> {
    let entry = item.entry;
    let table = lua.create_table()?;
    // lua side indexes are 1-based, this one goes back into `highlight`
    table.set("entry_index", item.entry_index + 1)?;
    table.set("identity", entry.document_identity.as_ref())?;
    table.set("label", entry.display_label.as_ref())?;
    table.set("handle", entry.handle)?;
    table.set("line_number", entry.line_number)?;
    let text = truncate_for_display(&entry.text, max_len);
    table.set("text", text)?;
    table.set("score", item.rank.score())?;

    if let Some(highlights) = &item.highlights {
        table.set(
            "highlights",
            highlights_into_lua(&entry.text, text.len(), highlights, lua)?,
        )?;
    }

    Ok(table)
}

impl IntoLua for SearchOutcomeLua<'_> {
    fn into_lua(self, lua: &Lua) -> LuaResult<LuaValue> {
        let table = lua.create_table()?;

        let items = lua.create_table()?;
        for (i, item) in self.outcome.items.iter().enumerate() {
            items.set(
                i + 1,
                match_result_into_lua(item, self.max_line_display_len, lua)?,
            )?;
        }
        table.set("items", items)?;
        table.set("total_matched", self.outcome.total_matched)?;
        table.set("total_lines", self.outcome.total_lines)?;

        Ok(LuaValue::Table(table))
    }
}

pub struct SessionHealthLua(pub SessionHealth);

impl IntoLua for SessionHealthLua {
    fn into_lua(self, lua: &Lua) -> LuaResult<LuaValue> {
        let health = self.0;
        let table = lua.create_table()?;
        table.set("tracked_entries", health.tracked_entries)?;
        table.set("max_entries", health.max_entries)?;

        let store = lua.create_table()?;
        store.set("path", health.store.path)?;
        store.set("exists", health.store.exists)?;
        store.set("disk_size", health.store.disk_size)?;
        store.set("entry_count", health.store.entry_count)?;
        table.set("store", store)?;

        Ok(LuaValue::Table(table))
    }
}
