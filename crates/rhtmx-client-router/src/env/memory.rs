//! In-memory environment

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use super::{EnvEvent, EnvListener, Environment, ListenerId, Location};

#[derive(Default)]
struct History {
    entries: Vec<String>,
    index: usize,
}

/// Session history kept in memory
///
/// Behaves like a browser tab: pushing truncates forward history, `go`
/// fires `PopState` (and `HashChange` when the fragment differs), and
/// programmatic pushes fire nothing.
///
/// # Examples
///
/// ```
/// use rhtmx_client_router::env::{Environment, MemoryEnvironment};
///
/// let env = MemoryEnvironment::new("http://localhost/");
/// env.push_state("http://localhost/about");
/// env.go(-1);
/// assert_eq!(env.href(), "http://localhost/");
/// env.go(1);
/// assert_eq!(env.href(), "http://localhost/about");
/// ```
pub struct MemoryEnvironment {
    history: Mutex<History>,
    listeners: Mutex<Vec<(ListenerId, EnvEvent, EnvListener)>>,
    next_id: AtomicU64,
}

impl MemoryEnvironment {
    pub fn new(initial_url: impl Into<String>) -> Self {
        Self {
            history: Mutex::new(History {
                entries: vec![initial_url.into()],
                index: 0,
            }),
            listeners: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Every history entry, oldest first
    pub fn entries(&self) -> Vec<String> {
        self.history.lock().entries.clone()
    }

    pub fn index(&self) -> usize {
        self.history.lock().index
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }

    /// Simulates the user editing the fragment (`location.hash = ...`)
    ///
    /// Pushes a new entry and fires `PopState` then `HashChange`.
    pub fn set_hash(&self, fragment: &str) {
        let href = {
            let mut history = self.history.lock();
            let current = history.entries[history.index].clone();
            let base = current.split('#').next().unwrap_or(&current);
            let href = format!("{}#{}", base, fragment.trim_start_matches('#'));
            push_entry(&mut history, href.clone());
            href
        };

        self.emit(EnvEvent::PopState, &href);
        self.emit(EnvEvent::HashChange, &href);
    }

    fn emit(&self, event: EnvEvent, href: &str) {
        // Listeners may navigate or unsubscribe, so never call them under the lock
        let listeners: Vec<EnvListener> = self
            .listeners
            .lock()
            .iter()
            .filter(|(_, e, _)| *e == event)
            .map(|(_, _, listener)| listener.clone())
            .collect();

        for listener in listeners {
            listener(href);
        }
    }
}

impl Default for MemoryEnvironment {
    fn default() -> Self {
        Self::new("http://localhost/")
    }
}

fn push_entry(history: &mut History, href: String) {
    let keep = history.index + 1;
    history.entries.truncate(keep);
    history.entries.push(href);
    history.index = history.entries.len() - 1;
}

fn fragment_of(href: &str) -> Option<String> {
    Location::parse(href).ok().map(|loc| loc.hash)
}

impl Environment for MemoryEnvironment {
    fn href(&self) -> String {
        let history = self.history.lock();
        history.entries[history.index].clone()
    }

    fn push_state(&self, url: &str) {
        push_entry(&mut self.history.lock(), url.to_string());
    }

    fn replace_state(&self, url: &str) {
        let mut history = self.history.lock();
        let index = history.index;
        history.entries[index] = url.to_string();
    }

    fn go(&self, delta: isize) {
        let (before, after) = {
            let mut history = self.history.lock();
            let last = history.entries.len() as isize - 1;
            let target = (history.index as isize + delta).clamp(0, last) as usize;
            if target == history.index {
                return;
            }
            let before = history.entries[history.index].clone();
            history.index = target;
            (before, history.entries[target].clone())
        };

        self.emit(EnvEvent::PopState, &after);
        if fragment_of(&before) != fragment_of(&after) {
            self.emit(EnvEvent::HashChange, &after);
        }
    }

    fn add_listener(&self, event: EnvEvent, listener: EnvListener) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.lock().push((id, event, listener));
        id
    }

    fn remove_listener(&self, id: ListenerId) {
        self.listeners.lock().retain(|(existing, _, _)| *existing != id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn recorder(env: &MemoryEnvironment, event: EnvEvent) -> Arc<Mutex<Vec<String>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        env.add_listener(
            event,
            Arc::new(move |href: &str| sink.lock().push(href.to_string())),
        );
        seen
    }

    #[test]
    fn test_push_truncates_forward_history() {
        let env = MemoryEnvironment::new("http://localhost/");
        env.push_state("http://localhost/a");
        env.push_state("http://localhost/b");
        env.go(-2);
        env.push_state("http://localhost/c");
        assert_eq!(
            env.entries(),
            vec!["http://localhost/", "http://localhost/c"]
        );
        assert_eq!(env.index(), 1);
    }

    #[test]
    fn test_replace_keeps_length() {
        let env = MemoryEnvironment::default();
        env.replace_state("http://localhost/x");
        assert_eq!(env.entries(), vec!["http://localhost/x"]);
    }

    #[test]
    fn test_programmatic_changes_are_silent() {
        let env = MemoryEnvironment::default();
        let pops = recorder(&env, EnvEvent::PopState);
        env.push_state("http://localhost/a");
        env.replace_state("http://localhost/b");
        assert!(pops.lock().is_empty());
    }

    #[test]
    fn test_go_fires_popstate_and_clamps() {
        let env = MemoryEnvironment::default();
        let pops = recorder(&env, EnvEvent::PopState);
        env.push_state("http://localhost/a");

        env.go(-5);
        assert_eq!(env.href(), "http://localhost/");
        env.go(-1);
        env.go(10);
        assert_eq!(env.href(), "http://localhost/a");
        assert_eq!(
            *pops.lock(),
            vec!["http://localhost/", "http://localhost/a"]
        );
    }

    #[test]
    fn test_hash_change_only_when_fragment_differs() {
        let env = MemoryEnvironment::new("http://localhost/#/a");
        let hashes = recorder(&env, EnvEvent::HashChange);
        env.set_hash("/b");
        env.push_state("http://localhost/other#/b");
        env.go(-1);
        env.go(-1);

        assert_eq!(
            *hashes.lock(),
            vec!["http://localhost/#/b", "http://localhost/#/a"]
        );
    }

    #[test]
    fn test_remove_listener() {
        let env = MemoryEnvironment::default();
        let id = env.add_listener(EnvEvent::PopState, Arc::new(|_: &str| {}));
        env.add_listener(EnvEvent::PopState, Arc::new(|_: &str| {}));
        env.remove_listener(id);
        assert_eq!(env.listener_count(), 1);
    }
}
