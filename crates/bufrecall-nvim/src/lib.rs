use ahash::AHashSet;
use bufrecall_core::config::DEFAULT_MAX_LINE_DISPLAY_LEN;
use bufrecall_core::path_utils::identity_exists;
use bufrecall_core::{
    Document, DocumentHandle, Error, HostProbe, LineSearch, LoadedDocument, MatchMode,
    PaginationArgs, RecallSession, RecencyEntry,
};
use error::{ApiContext, HostError, IntoCoreError, IntoLuaResult};
use lua_types::{
    LineHighlightsLua, LuaConfig, RecentListingsLua, SearchOutcomeLua, SessionHealthLua,
};
use mimalloc::MiMalloc;
use mlua::prelude::*;
use once_cell::sync::Lazy;
use std::str::FromStr;
use std::sync::RwLock;

mod error;
mod log;
mod lua_types;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

const AUGROUP: &str = "BufrecallRecent";

// editor state is process-wide, lua only ever sees plain tables
pub static SESSION: Lazy<RwLock<Option<RecallSession>>> = Lazy::new(|| RwLock::new(None));
pub static LINE_SEARCH: Lazy<RwLock<Option<LineSearch>>> = Lazy::new(|| RwLock::new(None));

fn call_api<R: FromLuaMulti>(
    lua: &Lua,
    function: &'static str,
    args: impl IntoLuaMulti,
) -> Result<R, HostError> {
    let vim: LuaTable = lua.globals().get("vim").api_context(function)?;
    let api: LuaTable = vim.get("api").api_context(function)?;
    api.get::<LuaFunction>(function)
        .and_then(|f| f.call::<R>(args))
        .api_context(function)
}

fn call_fn<R: FromLuaMulti>(
    lua: &Lua,
    function: &'static str,
    args: impl IntoLuaMulti,
) -> Result<R, HostError> {
    let vim: LuaTable = lua.globals().get("vim").api_context(function)?;
    let vim_fn: LuaTable = vim.get("fn").api_context(function)?;
    vim_fn
        .get::<LuaFunction>(function)
        .and_then(|f| f.call::<R>(args))
        .api_context(function)
}

fn buffer_option<R: FromLua>(lua: &Lua, handle: DocumentHandle, name: &str) -> Result<R, HostError> {
    let opts = lua.create_table().api_context("nvim_get_option_value")?;
    opts.set("buf", handle).api_context("nvim_get_option_value")?;
    call_api(lua, "nvim_get_option_value", (name, opts))
}

fn resolve_buffer(lua: &Lua, handle: Option<DocumentHandle>) -> Result<DocumentHandle, HostError> {
    match handle {
        Some(handle) if handle > 0 => Ok(handle),
        _ => call_api(lua, "nvim_get_current_buf", ()),
    }
}

/// Identity, display name and trackability of a buffer. Unlisted buffers and
/// special ones (help, quickfix, terminal, prompt) are not trackable.
fn inspect_buffer(lua: &Lua, handle: DocumentHandle) -> Result<LoadedDocument, HostError> {
    let identity: LuaString = call_api(lua, "nvim_buf_get_name", handle)?;
    let raw_name: LuaString = call_fn(lua, "bufname", handle)?;
    let listed: bool = buffer_option(lua, handle, "buflisted")?;
    let buftype: String = buffer_option(lua, handle, "buftype")?;

    Ok(LoadedDocument {
        handle,
        identity: identity.to_string_lossy(),
        raw_name: raw_name.to_string_lossy(),
        trackable: listed && buftype.is_empty(),
    })
}

fn loaded_buffers(lua: &Lua) -> Result<Vec<LoadedDocument>, HostError> {
    let handles: Vec<DocumentHandle> = call_api(lua, "nvim_list_bufs", ())?;
    let mut loaded = Vec::with_capacity(handles.len());
    for handle in handles {
        let is_loaded: bool = call_api(lua, "nvim_buf_is_loaded", handle)?;
        if is_loaded {
            loaded.push(inspect_buffer(lua, handle)?);
        }
    }

    Ok(loaded)
}

fn buffer_lines(lua: &Lua, handle: DocumentHandle) -> Result<Vec<String>, HostError> {
    let lines: Vec<LuaString> = call_api(lua, "nvim_buf_get_lines", (handle, 0, -1, false))?;
    Ok(lines.iter().map(|line| line.to_string_lossy()).collect())
}

fn parse_mode(mode: Option<String>) -> LuaResult<MatchMode> {
    mode.as_deref()
        .map(MatchMode::from_str)
        .transpose()
        .into_lua_result()
        .map(Option::unwrap_or_default)
}

fn to_entry_index(entry_index: usize) -> Result<usize, HostError> {
    entry_index
        .checked_sub(1)
        .ok_or_else(|| HostError::InvalidArgument {
            name: "entry_index",
            reason: "indexes start at 1".to_string(),
        })
}

/// Liveness from the buffers Neovim has loaded right now, existence from the
/// filesystem.
struct LoadedBuffersProbe {
    loaded: AHashSet<String>,
}

impl LoadedBuffersProbe {
    fn collect(lua: &Lua) -> Result<Self, HostError> {
        let loaded = loaded_buffers(lua)?
            .into_iter()
            .filter(|buffer| !buffer.identity.is_empty())
            .map(|buffer| buffer.identity)
            .collect();
        Ok(Self { loaded })
    }
}

impl HostProbe for LoadedBuffersProbe {
    fn is_live(&self, entry: &RecencyEntry) -> bool {
        self.loaded.contains(&entry.identity)
    }

    fn exists(&self, identity: &str) -> bool {
        identity_exists(identity)
    }
}

fn create_autocmds(lua: &Lua) -> Result<(), HostError> {
    let group_opts = lua.create_table().api_context("nvim_create_augroup")?;
    group_opts
        .set("clear", true)
        .api_context("nvim_create_augroup")?;
    let group: i64 = call_api(lua, "nvim_create_augroup", (AUGROUP, group_opts))?;

    let on_enter = lua
        .create_function(|lua, args: LuaTable| {
            record_access(lua, args.get::<Option<DocumentHandle>>("buf")?)?;
            Ok(())
        })
        .api_context("nvim_create_autocmd")?;
    let on_wipeout = lua
        .create_function(|lua, args: LuaTable| {
            forget_document(lua, args.get::<DocumentHandle>("buf")?)?;
            Ok(())
        })
        .api_context("nvim_create_autocmd")?;
    let on_leave = lua
        .create_function(|lua, _: LuaTable| {
            flush_to_store(lua, ())?;
            Ok(())
        })
        .api_context("nvim_create_autocmd")?;

    for (event, callback, desc) in [
        ("BufEnter", on_enter, "bufrecall: record buffer access"),
        ("BufWipeout", on_wipeout, "bufrecall: drop live handle"),
        ("VimLeavePre", on_leave, "bufrecall: persist recent buffers"),
    ] {
        let opts = lua.create_table().api_context("nvim_create_autocmd")?;
        opts.set("group", group).api_context("nvim_create_autocmd")?;
        opts.set("callback", callback)
            .api_context("nvim_create_autocmd")?;
        opts.set("desc", desc).api_context("nvim_create_autocmd")?;
        let _: i64 = call_api(lua, "nvim_create_autocmd", (event, opts))?;
    }

    Ok(())
}

pub fn initialize(lua: &Lua, config: Option<LuaConfig>) -> LuaResult<bool> {
    let config = config.map(|c| c.0).unwrap_or_default();
    let mut session = RecallSession::new(config).into_lua_result()?;

    // buffers are inspected before any lock is taken, api calls can run autocmds
    let loaded = loaded_buffers(lua)?;
    let current = resolve_buffer(lua, None)?;
    session.initialize(&loaded);
    if let Some(current) = loaded.iter().find(|buffer| buffer.handle == current) {
        session.record_access(
            &current.identity,
            &current.raw_name,
            Some(current.handle),
            current.trackable,
        );
    }

    {
        let mut guard = SESSION
            .write()
            .with_lock_error(Error::AcquireSessionLock)
            .into_lua_result()?;
        if guard.is_some() {
            ::tracing::info!("Replacing existing recall session");
        }
        *guard = Some(session);
    }

    create_autocmds(lua)?;
    Ok(true)
}

pub fn record_access(lua: &Lua, handle: Option<DocumentHandle>) -> LuaResult<bool> {
    let handle = resolve_buffer(lua, handle)?;
    let buffer = inspect_buffer(lua, handle)?;

    let mut guard = SESSION
        .write()
        .with_lock_error(Error::AcquireSessionLock)
        .into_lua_result()?;
    let Some(ref mut session) = *guard else {
        return Ok(false);
    };

    session.record_access(
        &buffer.identity,
        &buffer.raw_name,
        Some(buffer.handle),
        buffer.trackable,
    );
    Ok(buffer.trackable && !buffer.identity.is_empty())
}

pub fn forget_document(_: &Lua, handle: DocumentHandle) -> LuaResult<bool> {
    let mut guard = SESSION
        .write()
        .with_lock_error(Error::AcquireSessionLock)
        .into_lua_result()?;
    let Some(ref mut session) = *guard else {
        return Ok(false);
    };

    session.forget_document(handle);
    Ok(true)
}

pub fn flush_to_store(_: &Lua, _: ()) -> LuaResult<bool> {
    let guard = SESSION
        .read()
        .with_lock_error(Error::AcquireSessionLock)
        .into_lua_result()?;
    let Some(ref session) = *guard else {
        return Ok(false);
    };

    Ok(session.flush_to_store())
}

pub fn reset_history(_: &Lua, _: ()) -> LuaResult<bool> {
    let mut guard = SESSION
        .write()
        .with_lock_error(Error::AcquireSessionLock)
        .into_lua_result()?;
    let session = guard
        .as_mut()
        .ok_or(Error::SessionMissing)
        .into_lua_result()?;

    session.reset();
    ::tracing::info!("Recency history reset");
    Ok(true)
}

pub fn list_recent(lua: &Lua, _: ()) -> LuaResult<LuaValue> {
    let probe = LoadedBuffersProbe::collect(lua)?;

    let guard = SESSION
        .read()
        .with_lock_error(Error::AcquireSessionLock)
        .into_lua_result()?;
    let session = guard
        .as_ref()
        .ok_or(Error::SessionMissing)
        .into_lua_result()?;

    RecentListingsLua(session.list_recent(&probe)).into_lua(lua)
}

/// Snapshots every trackable loaded buffer and builds the line index the
/// following `search` calls run against.
pub fn open_search(lua: &Lua, _: ()) -> LuaResult<LuaValue> {
    let mut documents = Vec::new();
    for buffer in loaded_buffers(lua)? {
        if !buffer.trackable {
            continue;
        }
        let lines = buffer_lines(lua, buffer.handle)?;
        documents.push(Document::new(buffer.handle, buffer.identity, lines));
    }

    let search = LineSearch::open(&documents);
    let table = lua.create_table()?;
    table.set("documents", search.index().document_count())?;
    table.set("total_lines", search.index().len())?;

    let mut guard = LINE_SEARCH
        .write()
        .with_lock_error(Error::AcquireSearchLock)
        .into_lua_result()?;
    *guard = Some(search);

    Ok(LuaValue::Table(table))
}

#[allow(clippy::type_complexity)]
pub fn search(
    lua: &Lua,
    (query, mode, page_index, page_size, focus): (
        String,
        Option<String>,
        Option<usize>,
        Option<usize>,
        Option<usize>,
    ),
) -> LuaResult<LuaValue> {
    let mode = parse_mode(mode)?;
    let max_line_display_len = {
        let guard = SESSION
            .read()
            .with_lock_error(Error::AcquireSessionLock)
            .into_lua_result()?;
        guard
            .as_ref()
            .map_or(DEFAULT_MAX_LINE_DISPLAY_LEN, |s| s.config().max_line_display_len)
    };

    let page_size = page_size.unwrap_or(0);
    let pagination = PaginationArgs {
        offset: page_index.unwrap_or(0).saturating_mul(page_size),
        limit: page_size,
    };

    let mut guard = LINE_SEARCH
        .write()
        .with_lock_error(Error::AcquireSearchLock)
        .into_lua_result()?;
    let line_search = guard
        .as_mut()
        .ok_or(Error::SearchIndexMissing)
        .into_lua_result()?;

    ::tracing::debug!(?query, mode = mode.as_str(), ?pagination, "Line search");
    let mut outcome = line_search.search(&query, mode, pagination);
    if let Some(position) = focus.and_then(|p| p.checked_sub(1)) {
        outcome.focus(position, &query, mode);
    }

    SearchOutcomeLua {
        outcome,
        max_line_display_len,
    }
    .into_lua(lua)
}

pub fn highlight(
    lua: &Lua,
    (entry_index, query, mode): (usize, String, Option<String>),
) -> LuaResult<LuaValue> {
    let mode = parse_mode(mode)?;
    let entry_index = to_entry_index(entry_index)?;

    let guard = LINE_SEARCH
        .read()
        .with_lock_error(Error::AcquireSearchLock)
        .into_lua_result()?;
    let line_search = guard
        .as_ref()
        .ok_or(Error::SearchIndexMissing)
        .into_lua_result()?;

    match (
        line_search.index().get(entry_index),
        line_search.highlight(entry_index, &query, mode),
    ) {
        (Some(entry), Some(highlights)) => LineHighlightsLua {
            text: &entry.text,
            highlights,
        }
        .into_lua(lua),
        _ => Ok(LuaValue::Nil),
    }
}

pub fn close_search(_: &Lua, _: ()) -> LuaResult<bool> {
    let mut guard = LINE_SEARCH
        .write()
        .with_lock_error(Error::AcquireSearchLock)
        .into_lua_result()?;
    Ok(guard.take().is_some())
}

pub fn init_tracing(
    _: &Lua,
    (log_file_path, log_level): (String, Option<String>),
) -> LuaResult<String> {
    Ok(crate::log::init_tracing(&log_file_path, log_level.as_deref())?)
}

/// Returns health check information: version, session state with the store
/// details, and whether a search index is open.
pub fn health_check(lua: &Lua, _: ()) -> LuaResult<LuaValue> {
    let table = lua.create_table()?;
    table.set("version", env!("CARGO_PKG_VERSION"))?;

    let session_info = lua.create_table()?;
    match SESSION.read() {
        Ok(guard) => {
            session_info.set("initialized", guard.is_some())?;
            if let Some(ref session) = *guard {
                match session.health() {
                    Ok(health) => session_info.set("health", SessionHealthLua(health))?,
                    Err(e) => session_info.set("health_error", e.to_string())?,
                }
            }
        }
        Err(_) => {
            session_info.set("initialized", false)?;
            session_info.set("error", "Failed to acquire session lock")?;
        }
    }
    table.set("session", session_info)?;

    let search_info = lua.create_table()?;
    match LINE_SEARCH.read() {
        Ok(guard) => {
            search_info.set("open", guard.is_some())?;
            if let Some(ref line_search) = *guard {
                search_info.set("documents", line_search.index().document_count())?;
                search_info.set("indexed_lines", line_search.index().len())?;
            }
        }
        Err(_) => {
            search_info.set("open", false)?;
            search_info.set("error", "Failed to acquire search lock")?;
        }
    }
    table.set("search", search_info)?;

    Ok(LuaValue::Table(table))
}

/// Flushes the history and drops all state. Returns whether the flush
/// succeeded, false when there was no session.
pub fn shutdown(lua: &Lua, _: ()) -> LuaResult<bool> {
    // the group is gone already when the editor is exiting
    if let Err(e) = call_api::<()>(lua, "nvim_del_augroup_by_name", AUGROUP) {
        ::tracing::debug!(error = %e, "No autocmd group to remove");
    }

    close_search(lua, ())?;

    let mut guard = SESSION
        .write()
        .with_lock_error(Error::AcquireSessionLock)
        .into_lua_result()?;
    let flushed = guard
        .take()
        .is_some_and(|session| session.flush_to_store());
    ::tracing::info!(flushed, "Recall session shut down");

    Ok(flushed)
}

fn create_exports(lua: &Lua) -> LuaResult<LuaTable> {
    let exports = lua.create_table()?;
    exports.set("init_tracing", lua.create_function(init_tracing)?)?;
    exports.set("initialize", lua.create_function(initialize)?)?;
    exports.set("record_access", lua.create_function(record_access)?)?;
    exports.set("forget_document", lua.create_function(forget_document)?)?;
    exports.set("flush_to_store", lua.create_function(flush_to_store)?)?;
    exports.set("reset_history", lua.create_function(reset_history)?)?;
    exports.set("list_recent", lua.create_function(list_recent)?)?;
    exports.set("open_search", lua.create_function(open_search)?)?;
    exports.set("search", lua.create_function(search)?)?;
    exports.set("highlight", lua.create_function(highlight)?)?;
    exports.set("close_search", lua.create_function(close_search)?)?;
    exports.set("health_check", lua.create_function(health_check)?)?;
    exports.set("shutdown", lua.create_function(shutdown)?)?;

    Ok(exports)
}

// https://github.com/mlua-rs/mlua/issues/318
#[mlua::lua_module(skip_memory_check)]
fn bufrecall_nvim(lua: &Lua) -> LuaResult<LuaTable> {
    // before anything else so panics are logged even without init_tracing
    crate::log::install_panic_hook();

    create_exports(lua)
}
