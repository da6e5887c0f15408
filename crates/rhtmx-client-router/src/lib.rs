//! # RHTMX Client Router
//!
//! Client-side routing for single-page RHTMX apps:
//! - Nested route trees (`users` > `:id` > `posts`)
//! - Dynamic parameters (`/users/:id`), optional (`/posts/:id?`),
//!   constrained (`/orders/:id(\d+)`) and trailing wildcards (`/docs/*path`)
//! - Navigation guards that allow, cancel or redirect
//! - After-hooks for analytics, titles, scroll restoration
//! - Clean-path (`/app/users/1`) or hash (`/#/users/1`) URLs behind one API
//!
//! ## Matching
//!
//! Matching is pure: a route tree plus a pathname in, the most specific
//! route (or the full root-to-leaf chain) out. Templates are compiled to
//! regexes once and cached.
//!
//! ```
//! use rhtmx_client_router::{find_matching_routes, match_route, RouteNode};
//!
//! let routes = vec![RouteNode::root().with_component("App").with_children([
//!     RouteNode::new("users").with_component("UsersLayout").with_child(
//!         RouteNode::new(":id").with_component("UserDetail"),
//!     ),
//! ])];
//!
//! let leaf = match_route(&routes, "/users/123").unwrap().unwrap();
//! assert_eq!(leaf.path, "/users/:id");
//! assert_eq!(leaf.params.get("id"), Some(&"123".to_string()));
//!
//! let chain = find_matching_routes(&routes, "/users/123").unwrap();
//! assert_eq!(chain.len(), 3);
//! ```
//!
//! ## Navigation
//!
//! A [`Router`] owns the tree, a guard pipeline, a mode adapter and the
//! current [`UrlState`], published through a `tokio::sync::watch` channel.
//! It drives an [`Environment`](env::Environment); the crate ships an
//! in-memory one for tests, headless hosts and tooling.
//!
//! ```
//! use std::sync::Arc;
//! use rhtmx_client_router::env::MemoryEnvironment;
//! use rhtmx_client_router::{ModeConfig, Query, RouteNode, Router};
//!
//! # futures::executor::block_on(async {
//! let env = Arc::new(MemoryEnvironment::new("http://localhost/index.html"));
//! let router = Router::new(
//!     vec![RouteNode::new("search")],
//!     ModeConfig::hash(),
//!     env.clone(),
//! )
//! .unwrap();
//!
//! router.push("/search", Some(&Query::new().with("q", "rust"))).await;
//! assert_eq!(
//!     router.current().url,
//!     "http://localhost/index.html#/search?q=rust"
//! );
//! # });
//! ```
//!
//! The library logs through `tracing` and never installs a subscriber.

pub mod config;
pub mod env;
pub mod error;
pub mod guard;
pub mod matcher;
pub mod mode;
pub mod navigation;
pub mod path;
pub mod query;
pub mod route;

pub use config::RouterConfig;
pub use error::{ConfigError, PatternError, PatternErrorKind, RouterError};
pub use guard::{
    async_guard, fallible_hook, AfterHook, GuardOutcome, GuardPipeline, NavigationGuard,
    Registration,
};
pub use matcher::{
    clear_matcher_cache, extract_params, find_matching_routes, match_route, MatchResult, Params,
    RouteMatcher,
};
pub use mode::{Mode, ModeAdapter, ModeConfig};
pub use navigation::{Router, RouterBuilder, UrlState, MAX_REDIRECT_DEPTH};
pub use path::{is_valid_path, join_paths, normalize_path};
pub use query::{build_search_string, parse_query, Query};
pub use route::{ComponentRef, CompiledPattern, PatternCache, RouteMeta, RouteNode};
