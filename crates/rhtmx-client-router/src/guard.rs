//! Navigation guards and after-hooks
//!
//! Guards run before a navigation commits and may allow, cancel or redirect
//! it. After-hooks run once it has committed and can only observe.
//!
//! A failing guard never takes the router down: an `Err` or a panic is
//! logged and counts as a cancel. Failing hooks are logged and skipped.

use std::any::Any;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use futures::FutureExt;
use parking_lot::RwLock;

/// What a guard decided
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardOutcome {
    Allow,
    Cancel,
    /// Abandon this navigation and navigate here instead
    RedirectTo(String),
}

impl GuardOutcome {
    pub fn redirect(to: impl Into<String>) -> Self {
        Self::RedirectTo(to.into())
    }

    pub fn is_allow(&self) -> bool {
        matches!(self, Self::Allow)
    }
}

impl From<bool> for GuardOutcome {
    fn from(allow: bool) -> Self {
        if allow {
            Self::Allow
        } else {
            Self::Cancel
        }
    }
}

/// A check that runs before every navigation
///
/// Plain closures `Fn(&str, &str) -> GuardOutcome` implement this trait;
/// use [`async_guard`] for guards that need to await.
#[async_trait]
pub trait NavigationGuard: Send + Sync {
    async fn check(&self, from: &str, to: &str) -> anyhow::Result<GuardOutcome>;

    /// Name used in logs
    fn name(&self) -> &str {
        "unnamed_guard"
    }
}

#[async_trait]
impl<F> NavigationGuard for F
where
    F: Fn(&str, &str) -> GuardOutcome + Send + Sync,
{
    async fn check(&self, from: &str, to: &str) -> anyhow::Result<GuardOutcome> {
        Ok(self(from, to))
    }
}

/// A guard backed by an async closure
pub struct AsyncFnGuard<F> {
    name: String,
    f: F,
}

#[async_trait]
impl<F, Fut> NavigationGuard for AsyncFnGuard<F>
where
    F: Fn(String, String) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<GuardOutcome>> + Send + 'static,
{
    async fn check(&self, from: &str, to: &str) -> anyhow::Result<GuardOutcome> {
        (self.f)(from.to_string(), to.to_string()).await
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Wraps an async closure as a named guard
///
/// ```
/// use rhtmx_client_router::guard::{async_guard, GuardOutcome, NavigationGuard};
///
/// let guard = async_guard("auth", |_from, to: String| async move {
///     Ok(if to.starts_with("/admin") {
///         GuardOutcome::redirect("/login")
///     } else {
///         GuardOutcome::Allow
///     })
/// });
/// assert_eq!(guard.name(), "auth");
/// ```
pub fn async_guard<F, Fut>(name: impl Into<String>, f: F) -> AsyncFnGuard<F>
where
    F: Fn(String, String) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<GuardOutcome>> + Send + 'static,
{
    AsyncFnGuard {
        name: name.into(),
        f,
    }
}

/// Observer invoked after a navigation commits
pub trait AfterHook: Send + Sync {
    fn after(&self, from: &str, to: &str) -> anyhow::Result<()>;

    fn name(&self) -> &str {
        "unnamed_hook"
    }
}

impl<F> AfterHook for F
where
    F: Fn(&str, &str) + Send + Sync,
{
    fn after(&self, from: &str, to: &str) -> anyhow::Result<()> {
        self(from, to);
        Ok(())
    }
}

/// A named hook whose closure can fail
pub struct FallibleHook<F> {
    name: String,
    f: F,
}

impl<F> AfterHook for FallibleHook<F>
where
    F: Fn(&str, &str) -> anyhow::Result<()> + Send + Sync,
{
    fn after(&self, from: &str, to: &str) -> anyhow::Result<()> {
        (self.f)(from, to)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

pub fn fallible_hook<F>(name: impl Into<String>, f: F) -> FallibleHook<F>
where
    F: Fn(&str, &str) -> anyhow::Result<()> + Send + Sync,
{
    FallibleHook {
        name: name.into(),
        f,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationKind {
    BeforeGuard,
    AfterHook,
}

#[derive(Default)]
struct Registries {
    guards: RwLock<Vec<(u64, Arc<dyn NavigationGuard>)>>,
    hooks: RwLock<Vec<(u64, Arc<dyn AfterHook>)>>,
    next_id: AtomicU64,
}

impl Registries {
    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }
}

/// Handle to one registered guard or hook
///
/// Dropping it leaves the entry registered; call [`remove`](Self::remove).
#[derive(Debug, Clone)]
pub struct Registration {
    id: u64,
    kind: RegistrationKind,
    registries: Weak<Registries>,
}

impl Registration {
    pub fn kind(&self) -> RegistrationKind {
        self.kind
    }

    /// Unregisters exactly this entry; `false` if it was already gone
    pub fn remove(&self) -> bool {
        let Some(registries) = self.registries.upgrade() else {
            return false;
        };

        match self.kind {
            RegistrationKind::BeforeGuard => remove_by_id(&registries.guards, self.id),
            RegistrationKind::AfterHook => remove_by_id(&registries.hooks, self.id),
        }
    }
}

fn remove_by_id<T>(list: &RwLock<Vec<(u64, T)>>, id: u64) -> bool {
    let mut list = list.write();
    let before = list.len();
    list.retain(|(existing, _)| *existing != id);
    list.len() != before
}

/// Ordered registries of guards and hooks
///
/// Clones share the same registries.
#[derive(Clone, Default)]
pub struct GuardPipeline {
    inner: Arc<Registries>,
}

impl GuardPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_before_guard(&self, guard: impl NavigationGuard + 'static) -> Registration {
        let id = self.inner.next_id();
        self.inner.guards.write().push((id, Arc::new(guard)));
        self.registration(id, RegistrationKind::BeforeGuard)
    }

    /// Registers a closure guard
    ///
    /// Same as [`register_before_guard`](Self::register_before_guard) but
    /// lets the closure's argument types be inferred.
    pub fn before_each<F>(&self, guard: F) -> Registration
    where
        F: Fn(&str, &str) -> GuardOutcome + Send + Sync + 'static,
    {
        self.register_before_guard(guard)
    }

    pub fn register_after_hook(&self, hook: impl AfterHook + 'static) -> Registration {
        let id = self.inner.next_id();
        self.inner.hooks.write().push((id, Arc::new(hook)));
        self.registration(id, RegistrationKind::AfterHook)
    }

    pub fn after_each<F>(&self, hook: F) -> Registration
    where
        F: Fn(&str, &str) + Send + Sync + 'static,
    {
        self.register_after_hook(hook)
    }

    fn registration(&self, id: u64, kind: RegistrationKind) -> Registration {
        Registration {
            id,
            kind,
            registries: Arc::downgrade(&self.inner),
        }
    }

    /// Runs the guards in registration order until one does not allow
    ///
    /// Guards registered or removed while this runs do not affect it.
    pub async fn run_guards(&self, from: &str, to: &str) -> GuardOutcome {
        let guards: Vec<Arc<dyn NavigationGuard>> = self
            .inner
            .guards
            .read()
            .iter()
            .map(|(_, guard)| Arc::clone(guard))
            .collect();

        for guard in guards {
            let result = AssertUnwindSafe(async { guard.check(from, to).await })
                .catch_unwind()
                .await;

            match result {
                Ok(Ok(GuardOutcome::Allow)) => continue,
                Ok(Ok(GuardOutcome::Cancel)) => {
                    tracing::debug!(guard = guard.name(), from, to, "navigation cancelled by guard");
                    return GuardOutcome::Cancel;
                }
                Ok(Ok(GuardOutcome::RedirectTo(target))) => {
                    tracing::debug!(
                        guard = guard.name(),
                        from,
                        to,
                        redirect = %target,
                        "navigation redirected by guard"
                    );
                    return GuardOutcome::RedirectTo(target);
                }
                Ok(Err(err)) => {
                    tracing::error!(
                        guard = guard.name(),
                        from,
                        to,
                        error = %err,
                        "navigation guard failed, cancelling"
                    );
                    return GuardOutcome::Cancel;
                }
                Err(payload) => {
                    tracing::error!(
                        guard = guard.name(),
                        from,
                        to,
                        panic = %panic_message(payload.as_ref()),
                        "navigation guard panicked, cancelling"
                    );
                    return GuardOutcome::Cancel;
                }
            }
        }

        GuardOutcome::Allow
    }

    /// Runs every after-hook in order; failures are logged and skipped
    pub fn run_after_hooks(&self, from: &str, to: &str) {
        let hooks: Vec<Arc<dyn AfterHook>> = self
            .inner
            .hooks
            .read()
            .iter()
            .map(|(_, hook)| Arc::clone(hook))
            .collect();

        for hook in hooks {
            match panic::catch_unwind(AssertUnwindSafe(|| hook.after(from, to))) {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    tracing::error!(hook = hook.name(), from, to, error = %err, "after-hook failed");
                }
                Err(payload) => {
                    tracing::error!(
                        hook = hook.name(),
                        from,
                        to,
                        panic = %panic_message(payload.as_ref()),
                        "after-hook panicked"
                    );
                }
            }
        }
    }

    /// Removes every guard and hook
    pub fn clear(&self) {
        self.inner.guards.write().clear();
        self.inner.hooks.write().clear();
    }

    pub fn guard_count(&self) -> usize {
        self.inner.guards.read().len()
    }

    pub fn hook_count(&self) -> usize {
        self.inner.hooks.read().len()
    }
}

impl std::fmt::Debug for GuardPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuardPipeline")
            .field("guards", &self.guard_count())
            .field("hooks", &self.hook_count())
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;

    fn log() -> Arc<Mutex<Vec<String>>> {
        Arc::new(Mutex::new(Vec::new()))
    }

    #[tokio::test]
    async fn test_empty_pipeline_allows() {
        let pipeline = GuardPipeline::new();
        assert_eq!(pipeline.run_guards("/", "/a").await, GuardOutcome::Allow);
    }

    #[tokio::test]
    async fn test_cancel_short_circuits() {
        let pipeline = GuardPipeline::new();
        let calls = log();

        let seen = calls.clone();
        pipeline.before_each(move |_, _| {
            seen.lock().push("first".to_string());
            GuardOutcome::Cancel
        });
        let seen = calls.clone();
        pipeline.before_each(move |_, _| {
            seen.lock().push("second".to_string());
            GuardOutcome::Allow
        });

        assert_eq!(pipeline.run_guards("/", "/a").await, GuardOutcome::Cancel);
        assert_eq!(*calls.lock(), vec!["first"]);
    }

    #[tokio::test]
    async fn test_redirect_short_circuits() {
        let pipeline = GuardPipeline::new();
        pipeline.before_each(|_, to| {
            if to == "/admin" {
                GuardOutcome::redirect("/login")
            } else {
                GuardOutcome::Allow
            }
        });
        pipeline.before_each(|_, _| panic!("must not run"));

        assert_eq!(
            pipeline.run_guards("/", "/admin").await,
            GuardOutcome::RedirectTo("/login".to_string())
        );
    }

    #[tokio::test]
    async fn test_async_guard() {
        let pipeline = GuardPipeline::new();
        pipeline.register_before_guard(async_guard("async", |from: String, _to: String| async move {
            tokio::task::yield_now().await;
            Ok(GuardOutcome::from(from == "/home"))
        }));

        assert_eq!(pipeline.run_guards("/home", "/x").await, GuardOutcome::Allow);
        assert_eq!(pipeline.run_guards("/other", "/x").await, GuardOutcome::Cancel);
    }

    #[tokio::test]
    async fn test_failing_guards_cancel() {
        let pipeline = GuardPipeline::new();
        let reg = pipeline.register_before_guard(async_guard("broken", |_: String, _: String| async {
            Err::<GuardOutcome, _>(anyhow::anyhow!("session store unavailable"))
        }));
        assert_eq!(pipeline.run_guards("/", "/a").await, GuardOutcome::Cancel);

        reg.remove();
        pipeline.before_each(|_, _| panic!("boom"));
        assert_eq!(pipeline.run_guards("/", "/a").await, GuardOutcome::Cancel);
    }

    #[test]
    fn test_hooks_run_in_order_despite_failures() {
        let pipeline = GuardPipeline::new();
        let calls = log();

        let seen = calls.clone();
        pipeline.after_each(move |from, to| seen.lock().push(format!("a {from}->{to}")));
        pipeline.register_after_hook(fallible_hook("fails", |_, _| {
            Err(anyhow::anyhow!("analytics offline"))
        }));
        pipeline.after_each(|_, _| panic!("hook panic"));
        let seen = calls.clone();
        pipeline.after_each(move |_, to| seen.lock().push(format!("b {to}")));

        pipeline.run_after_hooks("/", "/done");
        assert_eq!(*calls.lock(), vec!["a /->/done", "b /done"]);
    }

    #[test]
    fn test_registration_removes_only_its_entry() {
        let pipeline = GuardPipeline::new();
        let first = pipeline.before_each(|_, _| GuardOutcome::Allow);
        let _second = pipeline.before_each(|_, _| GuardOutcome::Allow);
        let hook = pipeline.after_each(|_, _| {});

        assert_eq!(first.kind(), RegistrationKind::BeforeGuard);
        assert!(first.remove());
        assert!(!first.remove());
        assert_eq!(pipeline.guard_count(), 1);

        assert!(hook.remove());
        assert_eq!(pipeline.hook_count(), 0);
    }

    #[test]
    fn test_clear_is_idempotent() {
        let pipeline = GuardPipeline::new();
        let reg = pipeline.before_each(|_, _| GuardOutcome::Cancel);
        pipeline.after_each(|_, _| {});
        pipeline.clear();
        pipeline.clear();
        assert_eq!(pipeline.guard_count(), 0);
        assert_eq!(pipeline.hook_count(), 0);
        assert!(!reg.remove());
    }

    #[test]
    fn test_outcome_from_bool() {
        assert_eq!(GuardOutcome::from(true), GuardOutcome::Allow);
        assert_eq!(GuardOutcome::from(false), GuardOutcome::Cancel);
        assert!(GuardOutcome::Allow.is_allow());
    }
}
