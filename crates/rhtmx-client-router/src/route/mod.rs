//! Route tree definitions and template compilation
//!
//! A route tree is plain data: [`RouteNode`]s nest through `children`, and
//! every node's `path` is resolved against its parent's full path. The
//! router never mutates the tree it is given.

pub mod compiled;
pub mod pattern;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Params;

// Re-export commonly used types
pub use compiled::{CompiledPattern, PatternCache};
pub use pattern::{classify_segment, PatternSegmentType};

/// Free-form route metadata (`requiresAuth`, `title`, ...)
pub type RouteMeta = serde_json::Map<String, Value>;

/// Opaque handle to whatever renders a route
///
/// The router carries it around and hands it back on a match; it never
/// looks inside.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentRef(pub String);

impl ComponentRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ComponentRef {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ComponentRef {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A single node of the route tree
///
/// # Examples
///
/// ```
/// use rhtmx_client_router::RouteNode;
///
/// let users = RouteNode::new("users")
///     .with_component("UsersLayout")
///     .with_child(RouteNode::new(":id").with_component("UserDetail"))
///     .with_meta("requiresAuth", true);
///
/// assert_eq!(users.children.len(), 1);
/// assert!(users.has_meta("requiresAuth"));
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RouteNode {
    /// Template segment(s), relative to the parent; `/` for the tree root
    pub path: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component: Option<ComponentRef>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<RouteNode>,

    /// Target path, may reference this route's params as `:name`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect: Option<String>,

    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub meta: RouteMeta,
}

impl RouteNode {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// The root of a tree: children are resolved directly under `/`
    pub fn root() -> Self {
        Self::new("/")
    }

    pub fn with_component(mut self, component: impl Into<ComponentRef>) -> Self {
        self.component = Some(component.into());
        self
    }

    pub fn with_child(mut self, child: RouteNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_children<I>(mut self, children: I) -> Self
    where
        I: IntoIterator<Item = RouteNode>,
    {
        self.children.extend(children);
        self
    }

    /// Makes this node a redirect
    ///
    /// ```
    /// use rhtmx_client_router::RouteNode;
    ///
    /// let old = RouteNode::new("blog/:slug").with_redirect("/articles/:slug");
    /// assert_eq!(old.redirect.as_deref(), Some("/articles/:slug"));
    /// ```
    pub fn with_redirect(mut self, target: impl Into<String>) -> Self {
        self.redirect = Some(target.into());
        self
    }

    /// Sets a metadata entry
    ///
    /// ```
    /// use rhtmx_client_router::RouteNode;
    ///
    /// let route = RouteNode::new("admin")
    ///     .with_meta("title", "Admin")
    ///     .with_meta("level", 3);
    ///
    /// assert_eq!(route.get_meta("title").and_then(|v| v.as_str()), Some("Admin"));
    /// assert_eq!(route.get_meta("level").and_then(|v| v.as_u64()), Some(3));
    /// ```
    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn get_meta(&self, key: &str) -> Option<&Value> {
        self.meta.get(key)
    }

    pub fn has_meta(&self, key: &str) -> bool {
        self.meta.contains_key(key)
    }

    /// Whether this node is a tree root (`/`)
    pub fn is_root(&self) -> bool {
        self.path == "/"
    }

    /// Resolves this node's redirect against the params of the match
    ///
    /// Each `:name` segment (optionally `:name?`) is replaced with the
    /// matched value. Placeholders without a matched value are left as-is.
    ///
    /// ```
    /// use rhtmx_client_router::RouteNode;
    /// use std::collections::HashMap;
    ///
    /// let route = RouteNode::new("blog/:slug").with_redirect("/articles/:slug");
    ///
    /// let mut params = HashMap::new();
    /// params.insert("slug".to_string(), "hello-world".to_string());
    ///
    /// assert_eq!(route.redirect_target(&params).unwrap(), "/articles/hello-world");
    /// ```
    pub fn redirect_target(&self, params: &Params) -> Option<String> {
        let target = self.redirect.as_ref()?;

        if params.is_empty() {
            return Some(target.clone());
        }

        Some(
            target
                .split('/')
                .map(|segment| {
                    segment
                        .strip_prefix(':')
                        .map(|name| name.strip_suffix('?').unwrap_or(name))
                        .and_then(|name| params.get(name))
                        .map_or(segment, String::as_str)
                })
                .collect::<Vec<_>>()
                .join("/"),
        )
    }
}
