//! Error handling for bufrecall-nvim
//!
//! Core errors and failures of Neovim API calls are both turned into
//! `mlua::Error::RuntimeError` at the module boundary, after being logged.

use bufrecall_core::Error as CoreError;

#[derive(thiserror::Error, Debug)]
pub enum HostError {
    #[error(transparent)]
    Core(#[from] CoreError),
    #[error("vim.api.{function} failed: {source}")]
    Api {
        function: &'static str,
        #[source]
        source: mlua::Error,
    },
    #[error("Invalid argument {name}: {reason}")]
    InvalidArgument { name: &'static str, reason: String },
    #[error("Failed to initialize tracing: {0}")]
    Tracing(String),
}

impl From<HostError> for mlua::Error {
    fn from(err: HostError) -> Self {
        let string_value = err.to_string();
        ::tracing::error!(string_value);
        mlua::Error::RuntimeError(string_value)
    }
}

/// Routes a core error through [`HostError`] so it gets logged on the way out.
pub fn to_lua_error(err: CoreError) -> mlua::Error {
    HostError::Core(err).into()
}

pub trait IntoLuaResult<T> {
    fn into_lua_result(self) -> mlua::Result<T>;
}

impl<T> IntoLuaResult<T> for Result<T, CoreError> {
    fn into_lua_result(self) -> mlua::Result<T> {
        self.map_err(to_lua_error)
    }
}

/// Tags a failed Neovim API call with the function name.
pub trait ApiContext<T> {
    fn api_context(self, function: &'static str) -> Result<T, HostError>;
}

impl<T> ApiContext<T> for mlua::Result<T> {
    fn api_context(self, function: &'static str) -> Result<T, HostError> {
        self.map_err(|source| HostError::Api { function, source })
    }
}

/// A poisoned session or search lock becomes the given core error.
pub trait IntoCoreError<T> {
    fn with_lock_error(self, err: CoreError) -> Result<T, CoreError>;
}

impl<T, G> IntoCoreError<T> for Result<T, std::sync::PoisonError<G>> {
    fn with_lock_error(self, err: CoreError) -> Result<T, CoreError> {
        self.map_err(|_| err)
    }
}
