//! URL encoding strategies
//!
//! - **History**: clean paths (`/app/users/1?tab=2`) behind an optional base
//! - **Hash**: the logical URL lives in the fragment (`/index.html#/users/1?tab=2`)
//!
//! Both variants expose the same operations through [`ModeAdapter`], so the
//! navigation layer never branches on the active mode.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::env::{EnvEvent, Environment, Location, Subscription};
use crate::error::ConfigError;
use crate::path::normalize_path;

/// Which URL strategy a router uses
///
/// Config files go through [`FromStr`], so `"Hash"` is accepted too.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Mode {
    Hash,
    #[default]
    History,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Hash => "hash",
            Mode::History => "history",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hash" => Ok(Mode::Hash),
            "history" => Ok(Mode::History),
            other => Err(ConfigError::InvalidMode(other.to_string())),
        }
    }
}

impl TryFrom<String> for Mode {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Mode selection plus the history base
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeConfig {
    #[serde(default)]
    pub mode: Mode,
    /// Ignored in hash mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,
}

impl ModeConfig {
    pub fn history() -> Self {
        Self::default()
    }

    pub fn hash() -> Self {
        Self {
            mode: Mode::Hash,
            base: None,
        }
    }

    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        self.base = Some(base.into());
        self
    }
}

/// Canonical base prefix: `""` for no base, otherwise `/seg[/seg...]`
///
/// ```
/// use rhtmx_client_router::mode::normalize_base;
///
/// assert_eq!(normalize_base(None), "");
/// assert_eq!(normalize_base(Some("/")), "");
/// assert_eq!(normalize_base(Some("app/")), "/app");
/// ```
pub fn normalize_base(base: Option<&str>) -> String {
    match base.map(normalize_path) {
        Some(base) if base != "/" => base.into_owned(),
        _ => String::new(),
    }
}

/// Clean-path URLs under an optional base
#[derive(Clone)]
pub struct HistoryMode {
    env: Arc<dyn Environment>,
    base: String,
}

impl HistoryMode {
    pub fn new(env: Arc<dyn Environment>, base: Option<&str>) -> Self {
        Self {
            env,
            base: normalize_base(base),
        }
    }

    fn strip_base<'a>(&self, pathname: &'a str) -> &'a str {
        if self.base.is_empty() {
            return pathname;
        }
        match pathname.strip_prefix(self.base.as_str()) {
            Some(rest) if rest.is_empty() || rest.starts_with('/') => rest,
            _ => pathname,
        }
    }

    fn path_of(&self, loc: &Location) -> String {
        normalize_path(self.strip_base(&loc.pathname)).into_owned()
    }

    fn build_url(&self, loc: &Location, path: &str, search: &str) -> String {
        let path = normalize_path(path);
        let path = if self.base.is_empty() || path != "/" {
            path.as_ref()
        } else {
            ""
        };
        format!("{}{}{}{}", loc.origin, self.base, path, search)
    }
}

/// URLs encoded in the fragment: `#/path?query`
#[derive(Clone)]
pub struct HashMode {
    env: Arc<dyn Environment>,
}

impl HashMode {
    pub fn new(env: Arc<dyn Environment>) -> Self {
        Self { env }
    }

    fn split_fragment(fragment: &str) -> (&str, &str) {
        match fragment.find('?') {
            Some(index) => fragment.split_at(index),
            None => (fragment, ""),
        }
    }

    fn path_of(&self, loc: &Location) -> String {
        let (path, _) = Self::split_fragment(loc.fragment());
        normalize_path(path).into_owned()
    }

    fn search_of(&self, loc: &Location) -> String {
        let (_, search) = Self::split_fragment(loc.fragment());
        if search == "?" {
            String::new()
        } else {
            search.to_string()
        }
    }

    fn build_url(&self, loc: &Location, path: &str, search: &str) -> String {
        format!(
            "{}{}#{}{}",
            loc.origin,
            loc.pathname,
            normalize_path(path),
            search
        )
    }
}

/// The active URL strategy of a router
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use rhtmx_client_router::env::{Environment, MemoryEnvironment};
/// use rhtmx_client_router::mode::{ModeAdapter, ModeConfig};
///
/// let env = Arc::new(MemoryEnvironment::new("http://localhost/app/users/1?tab=2"));
/// let adapter = ModeAdapter::new(&ModeConfig::history().with_base("/app"), env.clone());
///
/// assert_eq!(adapter.current_path(), "/users/1");
/// assert_eq!(adapter.current_search(), "?tab=2");
///
/// adapter.push("/users/2", "");
/// assert_eq!(env.href(), "http://localhost/app/users/2");
/// ```
#[derive(Clone)]
pub enum ModeAdapter {
    History(HistoryMode),
    Hash(HashMode),
}

impl ModeAdapter {
    pub fn new(config: &ModeConfig, env: Arc<dyn Environment>) -> Self {
        match config.mode {
            Mode::History => Self::history(env, config.base.as_deref()),
            Mode::Hash => Self::hash(env),
        }
    }

    pub fn history(env: Arc<dyn Environment>, base: Option<&str>) -> Self {
        Self::History(HistoryMode::new(env, base))
    }

    pub fn hash(env: Arc<dyn Environment>) -> Self {
        Self::Hash(HashMode::new(env))
    }

    /// Clean-path adapter with no base
    pub fn default_for(env: Arc<dyn Environment>) -> Self {
        Self::history(env, None)
    }

    pub fn mode(&self) -> Mode {
        match self {
            Self::History(_) => Mode::History,
            Self::Hash(_) => Mode::Hash,
        }
    }

    /// Normalized base; always empty in hash mode
    pub fn base(&self) -> &str {
        match self {
            Self::History(history) => &history.base,
            Self::Hash(_) => "",
        }
    }

    pub fn environment(&self) -> &Arc<dyn Environment> {
        match self {
            Self::History(history) => &history.env,
            Self::Hash(hash) => &hash.env,
        }
    }

    pub fn current_path(&self) -> String {
        self.path_of(&self.environment().href())
    }

    /// Includes the leading `?`, or is empty
    pub fn current_search(&self) -> String {
        self.search_of(&self.environment().href())
    }

    /// Logical path encoded in `href`
    pub fn path_of(&self, href: &str) -> String {
        match self.location(href) {
            Some(loc) => match self {
                Self::History(history) => history.path_of(&loc),
                Self::Hash(hash) => hash.path_of(&loc),
            },
            None => "/".to_string(),
        }
    }

    /// Logical query encoded in `href`
    pub fn search_of(&self, href: &str) -> String {
        match self.location(href) {
            Some(loc) => match self {
                Self::History(_) => loc.search,
                Self::Hash(hash) => hash.search_of(&loc),
            },
            None => String::new(),
        }
    }

    /// Absolute URL for `path` + `search` relative to the current location
    pub fn build_url(&self, path: &str, search: &str) -> String {
        let href = self.environment().href();
        let loc = self.location(&href).unwrap_or_else(|| Location {
            origin: String::new(),
            pathname: "/".to_string(),
            search: String::new(),
            hash: String::new(),
        });

        match self {
            Self::History(history) => history.build_url(&loc, path, search),
            Self::Hash(hash) => hash.build_url(&loc, path, search),
        }
    }

    pub fn push(&self, path: &str, search: &str) {
        let url = self.build_url(path, search);
        self.environment().push_state(&url);
    }

    pub fn replace(&self, path: &str, search: &str) {
        let url = self.build_url(path, search);
        self.environment().replace_state(&url);
    }

    /// Registers `callback` for externally triggered navigation
    pub fn setup_listener<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        let event = match self {
            Self::History(_) => EnvEvent::PopState,
            Self::Hash(_) => EnvEvent::HashChange,
        };
        let env = Arc::clone(self.environment());
        let id = env.add_listener(event, Arc::new(callback));
        Subscription::new(env, id)
    }

    fn location(&self, href: &str) -> Option<Location> {
        match Location::parse(href) {
            Ok(loc) => Some(loc),
            Err(err) => {
                tracing::warn!(href, error = %err, "unparsable environment URL, treating as root");
                None
            }
        }
    }
}

impl fmt::Debug for ModeAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModeAdapter")
            .field("mode", &self.mode())
            .field("base", &self.base())
            .finish()
    }
}
