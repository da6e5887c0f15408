//! Navigation orchestration
//!
//! [`Router`] owns everything a navigation touches: the route tree, a
//! matcher with its own template cache, the guard pipeline, the mode
//! adapter and the published [`UrlState`]. Routers are cheap to clone and
//! share one context.
//!
//! Programmatic navigation (`push` / `replace`) runs the guards. History
//! traversal (`back` / `forward`, or the user pressing the browser buttons)
//! does not: the adapter listener only re-syncs the URL state.

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use tokio::sync::watch;

use crate::config::RouterConfig;
use crate::env::{Environment, Location, MemoryEnvironment, Subscription};
use crate::error::{PatternError, RouterError};
use crate::guard::{GuardOutcome, GuardPipeline, Registration};
use crate::matcher::{MatchResult, RouteMatcher};
use crate::mode::{Mode, ModeAdapter, ModeConfig};
use crate::path::normalize_path;
use crate::query::{build_search_string, Query};
use crate::route::{RouteMeta, RouteNode};

/// Redirects (route-level or from guards) one navigation may follow
pub const MAX_REDIRECT_DEPTH: usize = 16;

/// The URL a router currently points at
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UrlState {
    /// Full href as reported by the environment
    pub url: String,
    /// Logical path, base and fragment encoding removed
    pub path: String,
    /// Logical query, with `?` or empty
    pub search: String,
    /// Physical fragment, with `#` or empty
    pub hash: String,
    /// Meta of the most specific matched route
    pub meta: RouteMeta,
}

impl UrlState {
    pub fn query(&self) -> Query {
        Query::parse(&self.search)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NavigationKind {
    Push,
    Replace,
}

/// Builds a [`Router`]
///
/// # Examples
///
/// ```
/// use rhtmx_client_router::{ModeConfig, RouteNode, Router};
///
/// let router = Router::builder()
///     .route(RouteNode::new("users").with_child(RouteNode::new(":id")))
///     .mode(ModeConfig::hash())
///     .build()
///     .unwrap();
///
/// assert_eq!(router.current().path, "/");
/// ```
#[derive(Default)]
pub struct RouterBuilder {
    routes: Vec<RouteNode>,
    mode: Option<ModeConfig>,
    env: Option<Arc<dyn Environment>>,
}

impl RouterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn routes<I>(mut self, routes: I) -> Self
    where
        I: IntoIterator<Item = RouteNode>,
    {
        self.routes.extend(routes);
        self
    }

    pub fn route(mut self, route: RouteNode) -> Self {
        self.routes.push(route);
        self
    }

    /// Without a mode the router uses clean paths with no base
    pub fn mode(mut self, mode: ModeConfig) -> Self {
        self.mode = Some(mode);
        self
    }

    /// Defaults to a fresh [`MemoryEnvironment`] at `http://localhost/`
    pub fn environment(mut self, env: Arc<dyn Environment>) -> Self {
        self.env = Some(env);
        self
    }

    /// Compiles every route template and starts listening for external navigation
    pub fn build(self) -> Result<Router, RouterError> {
        let env = self
            .env
            .unwrap_or_else(|| Arc::new(MemoryEnvironment::default()) as Arc<dyn Environment>);
        Location::parse(&env.href())?;

        let adapter = match &self.mode {
            Some(config) => ModeAdapter::new(config, env),
            None => ModeAdapter::default_for(env),
        };

        let matcher = RouteMatcher::new();
        matcher.prepare(&self.routes)?;

        let (state, _) = watch::channel(UrlState::default());
        let inner = Arc::new(RouterInner {
            routes: RwLock::new(Arc::new(self.routes)),
            matcher,
            guards: GuardPipeline::new(),
            adapter,
            state,
            listener: Mutex::new(None),
        });

        let href = inner.adapter.environment().href();
        inner.state.send_replace(inner.derive_state(&href));

        let router = Router { inner };
        router.start_listening();

        tracing::debug!(
            mode = %router.mode(),
            base = router.inner.adapter.base(),
            path = %router.current().path,
            "router ready"
        );
        Ok(router)
    }
}

struct RouterInner {
    routes: RwLock<Arc<Vec<RouteNode>>>,
    matcher: RouteMatcher,
    guards: GuardPipeline,
    adapter: ModeAdapter,
    state: watch::Sender<UrlState>,
    listener: Mutex<Option<Subscription>>,
}

impl RouterInner {
    fn routes(&self) -> Arc<Vec<RouteNode>> {
        Arc::clone(&self.routes.read())
    }

    fn derive_state(&self, href: &str) -> UrlState {
        let path = self.adapter.path_of(href);
        let hash = Location::parse(href).map(|loc| loc.hash).unwrap_or_default();

        UrlState {
            url: href.to_string(),
            search: self.adapter.search_of(href),
            hash,
            meta: self.leaf_meta(&path),
            path,
        }
    }

    fn leaf_meta(&self, path: &str) -> RouteMeta {
        let routes = self.routes();
        match self.matcher.match_route(&routes, path, "") {
            Ok(Some(found)) => found.meta.clone(),
            Ok(None) => RouteMeta::new(),
            Err(err) => {
                tracing::warn!(path, error = %err, "route matching failed");
                RouteMeta::new()
            }
        }
    }

    /// Substituted redirect of the route `path` resolves to, if it has one
    fn route_redirect(&self, path: &str) -> Option<String> {
        let routes = self.routes();
        match self.matcher.match_route(&routes, path, "") {
            Ok(found) => found.and_then(|found| found.route.redirect_target(&found.params)),
            Err(err) => {
                tracing::warn!(path, error = %err, "route matching failed");
                None
            }
        }
    }

    fn sync_from_env(&self, href: &str) {
        let state = self.derive_state(href);
        tracing::debug!(path = %state.path, url = href, "external navigation");
        self.state.send_replace(state);
    }
}

/// A client-side router
///
/// # Examples
///
/// ```
/// use rhtmx_client_router::{GuardOutcome, RouteNode, Router};
///
/// # futures::executor::block_on(async {
/// let router = Router::builder()
///     .route(RouteNode::new("admin").with_meta("requiresAuth", true))
///     .route(RouteNode::new("login"))
///     .build()
///     .unwrap();
///
/// router.before_each(|_from, to| {
///     if to.starts_with("/admin") {
///         GuardOutcome::redirect("/login")
///     } else {
///         GuardOutcome::Allow
///     }
/// });
///
/// assert!(router.push("/admin", None).await);
/// assert_eq!(router.current().path, "/login");
/// # });
/// ```
#[derive(Clone)]
pub struct Router {
    inner: Arc<RouterInner>,
}

impl Router {
    pub fn builder() -> RouterBuilder {
        RouterBuilder::new()
    }

    pub fn new(
        routes: Vec<RouteNode>,
        mode: ModeConfig,
        env: Arc<dyn Environment>,
    ) -> Result<Self, RouterError> {
        RouterBuilder::new()
            .routes(routes)
            .mode(mode)
            .environment(env)
            .build()
    }

    pub fn from_config(config: RouterConfig, env: Arc<dyn Environment>) -> Result<Self, RouterError> {
        let mode = config.mode_config();
        Self::new(config.routes, mode, env)
    }

    /// Navigates to `to`, adding a history entry
    ///
    /// Returns `false` if a guard cancelled, a guard failed, or redirects
    /// exceeded [`MAX_REDIRECT_DEPTH`].
    pub async fn push(&self, to: &str, query: Option<&Query>) -> bool {
        self.navigate(to, query, NavigationKind::Push).await
    }

    /// Navigates to `to`, replacing the current history entry
    pub async fn replace(&self, to: &str, query: Option<&Query>) -> bool {
        self.navigate(to, query, NavigationKind::Replace).await
    }

    /// One step back through history; guards do not run
    pub fn back(&self) {
        self.go(-1);
    }

    /// One step forward through history; guards do not run
    pub fn forward(&self) {
        self.go(1);
    }

    pub fn go(&self, delta: isize) {
        self.inner.adapter.environment().go(delta);
    }

    async fn navigate(&self, to: &str, query: Option<&Query>, kind: NavigationKind) -> bool {
        let inner = &self.inner;
        let from = inner.adapter.current_path();

        let mut target = to.to_string();
        let mut search = query.map(build_search_string).unwrap_or_default();
        let mut redirects = 0usize;

        loop {
            if redirects > MAX_REDIRECT_DEPTH {
                tracing::error!(
                    from = %from,
                    to,
                    last = %target,
                    limit = MAX_REDIRECT_DEPTH,
                    "too many redirects, navigation aborted"
                );
                return false;
            }

            let (raw_path, inline_search) = split_search(&target);
            if search.is_empty() {
                search = inline_search.to_string();
            }
            let path = normalize_path(raw_path).into_owned();

            if let Some(redirect) = inner.route_redirect(&path) {
                let (redirect_path, redirect_search) = split_search(&redirect);
                if normalize_path(redirect_path) != path {
                    tracing::debug!(from = %path, to = %redirect, "following route redirect");
                    target = redirect;
                    search.clear();
                    redirects += 1;
                    continue;
                }
                // Same route, so only the query changes
                search = redirect_search.to_string();
            }

            match inner.guards.run_guards(&from, &path).await {
                GuardOutcome::Allow => {}
                GuardOutcome::Cancel => return false,
                GuardOutcome::RedirectTo(next) => {
                    target = next;
                    search.clear();
                    redirects += 1;
                    continue;
                }
            }

            match kind {
                NavigationKind::Push => inner.adapter.push(&path, &search),
                NavigationKind::Replace => inner.adapter.replace(&path, &search),
            }

            let href = inner.adapter.environment().href();
            inner.state.send_replace(inner.derive_state(&href));

            tracing::info!(
                from = %from,
                to = %path,
                search = %search,
                kind = ?kind,
                mode = %inner.adapter.mode(),
                "navigation committed"
            );

            inner.guards.run_after_hooks(&from, &path);
            return true;
        }
    }

    /// Snapshot of the current URL state
    pub fn current(&self) -> UrlState {
        self.inner.state.borrow().clone()
    }

    /// Receiver that observes every URL state change
    pub fn subscribe(&self) -> watch::Receiver<UrlState> {
        self.inner.state.subscribe()
    }

    pub fn routes(&self) -> Arc<Vec<RouteNode>> {
        self.inner.routes()
    }

    /// Swaps the route tree, validating every template first
    ///
    /// On error the previous tree stays active.
    pub fn set_routes(&self, routes: Vec<RouteNode>) -> Result<(), PatternError> {
        RouteMatcher::new().prepare(&routes)?;

        *self.inner.routes.write() = Arc::new(routes);
        self.inner.matcher.clear_cache();
        self.inner.matcher.prepare(&self.inner.routes())?;

        let href = self.inner.adapter.environment().href();
        self.inner.state.send_replace(self.inner.derive_state(&href));
        Ok(())
    }

    /// Runs `f` with the root-to-leaf match chain of the current path
    ///
    /// ```
    /// use rhtmx_client_router::{RouteNode, Router};
    ///
    /// let router = Router::builder()
    ///     .route(RouteNode::root().with_child(RouteNode::new("about")))
    ///     .build()
    ///     .unwrap();
    ///
    /// let depth = router.with_current_matches(|chain| chain.len());
    /// assert_eq!(depth, 1);
    /// ```
    pub fn with_current_matches<R>(&self, f: impl FnOnce(&[MatchResult<'_>]) -> R) -> R {
        let routes = self.inner.routes();
        let path = self.inner.state.borrow().path.clone();

        let chain = self
            .inner
            .matcher
            .find_matching_routes(&routes, &path, "")
            .unwrap_or_else(|err| {
                tracing::warn!(path = %path, error = %err, "route matching failed");
                Vec::new()
            });
        f(&chain)
    }

    pub fn mode(&self) -> Mode {
        self.inner.adapter.mode()
    }

    pub fn adapter(&self) -> &ModeAdapter {
        &self.inner.adapter
    }

    pub fn matcher(&self) -> &RouteMatcher {
        &self.inner.matcher
    }

    pub fn guards(&self) -> &GuardPipeline {
        &self.inner.guards
    }

    pub fn before_each<F>(&self, guard: F) -> Registration
    where
        F: Fn(&str, &str) -> GuardOutcome + Send + Sync + 'static,
    {
        self.inner.guards.before_each(guard)
    }

    pub fn after_each<F>(&self, hook: F) -> Registration
    where
        F: Fn(&str, &str) + Send + Sync + 'static,
    {
        self.inner.guards.after_each(hook)
    }

    /// Follows external navigation (back/forward, fragment edits)
    ///
    /// Called by [`RouterBuilder::build`]; calling it again is a no-op.
    pub fn start_listening(&self) {
        let mut listener = self.inner.listener.lock();
        if listener.is_some() {
            return;
        }

        let weak: Weak<RouterInner> = Arc::downgrade(&self.inner);
        *listener = Some(self.inner.adapter.setup_listener(move |href: &str| {
            if let Some(inner) = weak.upgrade() {
                inner.sync_from_env(href);
            }
        }));
    }

    pub fn stop_listening(&self) {
        // Dropping the subscription removes the listener
        self.inner.listener.lock().take();
    }

    pub fn is_listening(&self) -> bool {
        self.inner.listener.lock().is_some()
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("mode", &self.mode())
            .field("base", &self.inner.adapter.base())
            .field("url", &self.inner.state.borrow().url)
            .field("routes", &self.inner.routes.read().len())
            .field("guards", &self.inner.guards)
            .finish()
    }
}

/// `("/path", "?query")`; the query part is empty when absent or bare `?`
fn split_search(target: &str) -> (&str, &str) {
    match target.find('?') {
        Some(index) if index + 1 < target.len() => target.split_at(index),
        Some(index) => (&target[..index], ""),
        None => (target, ""),
    }
}
