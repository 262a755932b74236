//! Change notification registry.
//!
//! # Responsibility
//! - Keep the set of observers interested in station locators.
//! - Publish "data under this locator changed" after mutations.
//!
//! # Invariants
//! - Publishing never fails and never reports delivery outcome.
//! - An observer at `O` hears a change at `U` when `O == U`, when `U` is an
//!   ancestor of `O`, or when `O` is an ancestor of `U` and the observer
//!   registered for descendants.
//! - Subscriptions whose receiver was dropped are pruned on the next publish.

use crate::uri::uri_segments;
use log::debug;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

/// Identifier returned by every registration.
pub type ObserverId = u64;

/// Callback side of the registry.
///
/// Invoked on the publishing thread; implementations must not block.
pub trait ChangeObserver: Send + Sync {
    fn on_change(&self, uri: &str);
}

impl<F> ChangeObserver for F
where
    F: Fn(&str) + Send + Sync,
{
    fn on_change(&self, uri: &str) {
        self(uri)
    }
}

enum Sink {
    Callback(Arc<dyn ChangeObserver>),
    Channel(Sender<String>),
}

struct Registration {
    segments: Vec<String>,
    descendants: bool,
    sink: Sink,
}

impl Registration {
    fn wants(&self, changed: &[&str]) -> bool {
        let shared = self
            .segments
            .iter()
            .zip(changed)
            .take_while(|(registered, changed)| registered.as_str() == **changed)
            .count();
        let registered_is_prefix = shared == self.segments.len();
        let changed_is_prefix = shared == changed.len();

        changed_is_prefix || (registered_is_prefix && self.descendants)
    }
}

/// Registry of change observers keyed by locator.
#[derive(Default)]
pub struct ChangeNotifier {
    next_id: AtomicU64,
    observers: Mutex<BTreeMap<ObserverId, Registration>>,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a callback observer for `uri`.
    pub fn register(
        &self,
        uri: &str,
        descendants: bool,
        observer: Arc<dyn ChangeObserver>,
    ) -> ObserverId {
        self.insert(uri, descendants, Sink::Callback(observer))
    }

    /// Registers a channel observer for `uri`; changes arrive on the
    /// returned subscription.
    pub fn subscribe(self: &Arc<Self>, uri: &str, descendants: bool) -> Subscription {
        let (sender, receiver) = mpsc::channel();
        let id = self.insert(uri, descendants, Sink::Channel(sender));
        Subscription {
            id,
            uri: uri.to_string(),
            receiver,
            notifier: Arc::downgrade(self),
        }
    }

    /// Removes one registration. Returns whether it existed.
    pub fn unregister(&self, id: ObserverId) -> bool {
        self.lock().remove(&id).is_some()
    }

    pub fn observer_count(&self) -> usize {
        self.lock().len()
    }

    /// Publishes a change under `uri` to every interested observer.
    pub fn notify_change(&self, uri: &str) {
        let Some(changed) = uri_segments(uri) else {
            debug!("event=change_notify module=notify status=skipped reason=unparsable_uri");
            return;
        };

        let mut callbacks = Vec::new();
        let mut delivered = 0usize;
        {
            let mut observers = self.lock();
            observers.retain(|_, registration| {
                if !registration.wants(&changed) {
                    return true;
                }
                match &registration.sink {
                    Sink::Callback(observer) => {
                        callbacks.push(Arc::clone(observer));
                        true
                    }
                    Sink::Channel(sender) => {
                        let alive = sender.send(uri.to_string()).is_ok();
                        if alive {
                            delivered += 1;
                        }
                        alive
                    }
                }
            });
        }

        // Callbacks run outside the lock so they may register or publish.
        for observer in &callbacks {
            observer.on_change(uri);
        }
        debug!(
            "event=change_notify module=notify status=ok uri={uri} observers={}",
            delivered + callbacks.len()
        );
    }

    fn insert(&self, uri: &str, descendants: bool, sink: Sink) -> ObserverId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let segments = uri_segments(uri)
            .unwrap_or_else(|| vec![uri])
            .into_iter()
            .map(str::to_string)
            .collect();
        self.lock().insert(
            id,
            Registration {
                segments,
                descendants,
                sink,
            },
        );
        id
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<ObserverId, Registration>> {
        self.observers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Channel-backed registration; unregisters itself on drop.
pub struct Subscription {
    id: ObserverId,
    uri: String,
    receiver: Receiver<String>,
    notifier: Weak<ChangeNotifier>,
}

impl Subscription {
    pub fn id(&self) -> ObserverId {
        self.id
    }

    /// Locator this subscription watches.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Returns the next pending change without blocking.
    pub fn try_next(&self) -> Option<String> {
        self.receiver.try_recv().ok()
    }

    /// Drains pending changes and returns how many there were.
    pub fn drain(&self) -> usize {
        self.receiver.try_iter().count()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(notifier) = self.notifier.upgrade() {
            notifier.unregister(self.id);
        }
    }
}
