//! Highlight lifecycle events
//!
//! Out-of-scope UI layers react to highlight changes through subscribed
//! listeners rather than direct method calls. Each event carries the full
//! highlight payload.

use std::sync::Arc;

use parking_lot::RwLock;
use uuid::Uuid;

use crate::highlight::Highlight;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HighlightEventKind {
    Created,
    Clicked,
    ContextMenu,
    Removed,
    Updated,
}

#[derive(Debug, Clone)]
pub struct HighlightEvent {
    pub kind: HighlightEventKind,
    pub highlight: Highlight,
}

pub type ListenerId = Uuid;

type Listener = Box<dyn Fn(&HighlightEvent) + Send + Sync>;

/// Fan-out registry for highlight events. Cheap to clone; clones share
/// the listener list. Dispatch order is subscription order.
#[derive(Clone, Default)]
pub struct EventDispatcher {
    listeners: Arc<RwLock<Vec<(ListenerId, Listener)>>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&HighlightEvent) + Send + Sync + 'static,
    {
        let id = Uuid::new_v4();
        self.listeners.write().push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|(listener_id, _)| *listener_id != id);
        listeners.len() != before
    }

    pub fn emit(&self, event: &HighlightEvent) {
        for (_, listener) in self.listeners.read().iter() {
            listener(event);
        }
    }

    /// Detach every listener. Part of viewer teardown.
    pub fn clear(&self) {
        self.listeners.write().clear();
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::NormalizedRect;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn sample_highlight() -> Highlight {
        Highlight {
            id: "hl-1".into(),
            text: "text".into(),
            color: "#ffff00".into(),
            position: NormalizedRect::default(),
            page_number: 1,
            timestamp: 0,
            serialized_range: None,
        }
    }

    #[test]
    fn test_emit_reaches_all_listeners() {
        let dispatcher = EventDispatcher::new();
        let count = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let count = Arc::clone(&count);
            dispatcher.subscribe(move |_| {
                count.fetch_add(1, Ordering::SeqCst);
            });
        }

        dispatcher.emit(&HighlightEvent {
            kind: HighlightEventKind::Created,
            highlight: sample_highlight(),
        });
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_unsubscribe() {
        let dispatcher = EventDispatcher::new();
        let count = Arc::new(AtomicUsize::new(0));
        let count_inner = Arc::clone(&count);
        let id = dispatcher.subscribe(move |_| {
            count_inner.fetch_add(1, Ordering::SeqCst);
        });

        assert!(dispatcher.unsubscribe(id));
        assert!(!dispatcher.unsubscribe(id));
        dispatcher.emit(&HighlightEvent {
            kind: HighlightEventKind::Removed,
            highlight: sample_highlight(),
        });
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_clear_detaches_everything() {
        let dispatcher = EventDispatcher::new();
        dispatcher.subscribe(|_| {});
        dispatcher.subscribe(|_| {});
        assert_eq!(dispatcher.listener_count(), 2);
        dispatcher.clear();
        assert_eq!(dispatcher.listener_count(), 0);
    }
}
