//! Route tree matching
//!
//! Matching is a depth-first walk in declaration order. Children are always
//! tried before their parent so the most specific descendant wins, and the
//! first subtree that produces a match ends the walk.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::error::PatternError;
use crate::path::{join_paths, normalize_path};
use crate::route::{PatternCache, RouteMeta, RouteNode};

/// Parameter name to decoded value
pub type Params = HashMap<String, String>;

/// One matched route
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult<'a> {
    pub route: &'a RouteNode,
    /// Fully resolved template of the route (`/users/:id`), not the literal URL
    pub path: String,
    pub params: Params,
    pub meta: &'a RouteMeta,
}

impl<'a> MatchResult<'a> {
    fn new(route: &'a RouteNode, path: String, params: Params) -> Self {
        Self {
            route,
            path,
            params,
            meta: &route.meta,
        }
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }
}

static SHARED: Lazy<RouteMatcher> = Lazy::new(RouteMatcher::new);

/// Matches pathnames against route trees, with its own template cache
#[derive(Debug, Default)]
pub struct RouteMatcher {
    cache: PatternCache,
}

impl RouteMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide matcher behind the crate-level matching functions
    pub fn shared() -> &'static RouteMatcher {
        &SHARED
    }

    pub fn cache(&self) -> &PatternCache {
        &self.cache
    }

    /// Compiles every template in the tree, surfacing the first malformed one
    pub fn prepare(&self, routes: &[RouteNode]) -> Result<(), PatternError> {
        self.prepare_level(routes, "")
    }

    fn prepare_level(&self, routes: &[RouteNode], prefix: &str) -> Result<(), PatternError> {
        for node in routes {
            let full = join_paths(prefix, &node.path);
            self.cache.compile(&full)?;
            self.prepare_level(&node.children, &full)?;
        }
        Ok(())
    }

    /// Finds the single most specific route for `pathname`
    ///
    /// # Examples
    ///
    /// ```
    /// use rhtmx_client_router::{RouteMatcher, RouteNode};
    ///
    /// let routes = vec![RouteNode::new("users").with_child(RouteNode::new(":id"))];
    /// let matcher = RouteMatcher::new();
    ///
    /// let found = matcher.match_route(&routes, "/users/42", "").unwrap().unwrap();
    /// assert_eq!(found.path, "/users/:id");
    /// assert_eq!(found.param("id"), Some("42"));
    ///
    /// assert!(matcher.match_route(&routes, "/posts", "").unwrap().is_none());
    /// ```
    pub fn match_route<'a>(
        &self,
        routes: &'a [RouteNode],
        pathname: &str,
        prefix: &str,
    ) -> Result<Option<MatchResult<'a>>, PatternError> {
        let pathname = normalize_path(pathname);
        Ok(self
            .walk(routes, &pathname, prefix)?
            .and_then(|chain| chain.into_iter().next()))
    }

    /// Root-to-leaf chain of matches for `pathname`
    ///
    /// The last element is what [`match_route`](Self::match_route) returns.
    /// Ancestors carry the params their own template binds.
    pub fn find_matching_routes<'a>(
        &self,
        routes: &'a [RouteNode],
        pathname: &str,
        prefix: &str,
    ) -> Result<Vec<MatchResult<'a>>, PatternError> {
        let pathname = normalize_path(pathname);
        let mut chain = self.walk(routes, &pathname, prefix)?.unwrap_or_default();
        chain.reverse();
        Ok(chain)
    }

    /// Params of `template` in `pathname`, empty when it does not match
    pub fn extract_params(&self, template: &str, pathname: &str) -> Result<Params, PatternError> {
        let pattern = self.cache.compile(template)?;
        Ok(pattern.extract(pathname).unwrap_or_default())
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Leaf-first chain of the first subtree that matches
    fn walk<'a>(
        &self,
        routes: &'a [RouteNode],
        pathname: &str,
        prefix: &str,
    ) -> Result<Option<Vec<MatchResult<'a>>>, PatternError> {
        for node in routes {
            // A top-level `/` only groups its children; it matches on its own
            // for the root URL alone.
            if node.is_root() && prefix.is_empty() {
                if let Some(mut chain) = self.walk(&node.children, pathname, "/")? {
                    chain.push(MatchResult::new(node, "/".to_string(), Params::new()));
                    return Ok(Some(chain));
                }
                if pathname == "/" {
                    return Ok(Some(vec![MatchResult::new(
                        node,
                        "/".to_string(),
                        Params::new(),
                    )]));
                }
                continue;
            }

            let full = join_paths(prefix, &node.path);
            let pattern = self.cache.compile(&full)?;
            let exact = pattern.extract(pathname);

            if !node.children.is_empty() {
                if let Some(mut chain) = self.walk(&node.children, pathname, &full)? {
                    let params = exact
                        .or_else(|| pattern.extract_prefix(pathname))
                        .unwrap_or_default();
                    chain.push(MatchResult::new(node, full, params));
                    return Ok(Some(chain));
                }
            }

            if let Some(params) = exact {
                return Ok(Some(vec![MatchResult::new(node, full, params)]));
            }
        }

        Ok(None)
    }
}

/// [`RouteMatcher::match_route`] on the shared matcher with an empty prefix
pub fn match_route<'a>(
    routes: &'a [RouteNode],
    pathname: &str,
) -> Result<Option<MatchResult<'a>>, PatternError> {
    RouteMatcher::shared().match_route(routes, pathname, "")
}

/// [`RouteMatcher::find_matching_routes`] on the shared matcher with an empty prefix
pub fn find_matching_routes<'a>(
    routes: &'a [RouteNode],
    pathname: &str,
) -> Result<Vec<MatchResult<'a>>, PatternError> {
    RouteMatcher::shared().find_matching_routes(routes, pathname, "")
}

/// Params of `template` in `pathname` using the shared cache
///
/// ```
/// use rhtmx_client_router::extract_params;
///
/// let params = extract_params("/users/:id", "/users/john%20doe").unwrap();
/// assert_eq!(params.get("id").map(String::as_str), Some("john doe"));
///
/// assert!(extract_params("/users/:id", "/posts/1").unwrap().is_empty());
/// ```
pub fn extract_params(template: &str, pathname: &str) -> Result<Params, PatternError> {
    RouteMatcher::shared().extract_params(template, pathname)
}

/// Drops every template compiled by the shared matcher
pub fn clear_matcher_cache() {
    RouteMatcher::shared().clear_cache();
}
