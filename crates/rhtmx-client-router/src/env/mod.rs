//! The host environment a router drives
//!
//! An [`Environment`] is the addressable location plus session history of
//! whatever hosts the router: a browser window behind bindings, a webview,
//! or the in-memory [`MemoryEnvironment`] used by tests and tooling.

mod memory;

use std::fmt;
use std::sync::Arc;

use url::Url;

use crate::error::RouterError;

pub use memory::MemoryEnvironment;

/// Externally triggered navigation events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnvEvent {
    /// History traversal (back/forward or `go`)
    PopState,
    /// The fragment changed
    HashChange,
}

/// Called with the environment's new href
pub type EnvListener = Arc<dyn Fn(&str) + Send + Sync>;

/// Identifies a registered listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// Location and session history of the host
///
/// `push_state` and `replace_state` never fire listeners; only traversal and
/// user-driven fragment changes do, matching browser semantics.
pub trait Environment: Send + Sync {
    /// Full current URL
    fn href(&self) -> String;

    fn push_state(&self, url: &str);

    fn replace_state(&self, url: &str);

    /// Moves `delta` entries through history; out-of-range moves are clamped
    fn go(&self, delta: isize);

    fn add_listener(&self, event: EnvEvent, listener: EnvListener) -> ListenerId;

    fn remove_listener(&self, id: ListenerId);
}

/// Keeps a listener registered until dropped or [`unsubscribe`](Self::unsubscribe)d
#[must_use = "dropping a Subscription removes its listener"]
pub struct Subscription {
    env: Arc<dyn Environment>,
    id: Option<ListenerId>,
}

impl Subscription {
    pub fn new(env: Arc<dyn Environment>, id: ListenerId) -> Self {
        Self { env, id: Some(id) }
    }

    pub fn id(&self) -> Option<ListenerId> {
        self.id
    }

    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(id) = self.id.take() {
            self.env.remove_listener(id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

/// The parts of an href the mode adapters care about
///
/// `search` and `hash` keep their `?` / `#` and are empty when absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub origin: String,
    pub pathname: String,
    pub search: String,
    pub hash: String,
}

impl Location {
    /// ```
    /// use rhtmx_client_router::env::Location;
    ///
    /// let loc = Location::parse("https://example.com/app/users?tab=1#top").unwrap();
    /// assert_eq!(loc.origin, "https://example.com");
    /// assert_eq!(loc.pathname, "/app/users");
    /// assert_eq!(loc.search, "?tab=1");
    /// assert_eq!(loc.hash, "#top");
    /// ```
    pub fn parse(href: &str) -> Result<Self, RouterError> {
        let url = Url::parse(href).map_err(|source| RouterError::Url {
            href: href.to_string(),
            source,
        })?;

        Ok(Self {
            origin: url.origin().ascii_serialization(),
            pathname: url.path().to_string(),
            search: prefixed('?', url.query()),
            hash: prefixed('#', url.fragment()),
        })
    }

    /// Fragment without its leading `#`
    pub fn fragment(&self) -> &str {
        self.hash.strip_prefix('#').unwrap_or(&self.hash)
    }
}

fn prefixed(marker: char, part: Option<&str>) -> String {
    match part {
        Some(part) if !part.is_empty() => format!("{}{}", marker, part),
        _ => String::new(),
    }
}
