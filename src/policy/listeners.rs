//! Snapshot listeners. Thin registry; listeners run synchronously on the
//! thread that published the snapshot.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use super::model::PolicySnapshot;

pub trait SnapshotListener: Send + Sync {
    fn on_snapshot(&self, snapshot: &PolicySnapshot);
}

impl<F> SnapshotListener for F
where
    F: Fn(&PolicySnapshot) + Send + Sync,
{
    fn on_snapshot(&self, snapshot: &PolicySnapshot) { self(snapshot) }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Default)]
pub struct ListenerRegistry {
    next_id: AtomicU64,
    entries: RwLock<Vec<(SubscriptionId, Arc<dyn SnapshotListener>)>>,
}

impl ListenerRegistry {
    pub fn subscribe(&self, listener: Arc<dyn SnapshotListener>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.entries.write().push((id, listener));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|(eid, _)| *eid != id);
        entries.len() != before
    }

    pub fn len(&self) -> usize { self.entries.read().len() }

    pub fn is_empty(&self) -> bool { self.entries.read().is_empty() }

    pub fn clear(&self) { self.entries.write().clear(); }

    /// Listeners are called without the registry lock held, so one may
    /// subscribe or unsubscribe from inside its own callback.
    pub fn publish(&self, snapshot: &PolicySnapshot) {
        let targets: Vec<Arc<dyn SnapshotListener>> = self.entries.read().iter().map(|(_, l)| l.clone()).collect();
        for l in targets {
            l.on_snapshot(snapshot);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn unsubscribed_listener_is_not_called() {
        let reg = ListenerRegistry::default();
        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        let id = reg.subscribe(Arc::new(move |_: &PolicySnapshot| { h.fetch_add(1, Ordering::SeqCst); }));
        reg.publish(&PolicySnapshot::empty());
        assert!(reg.unsubscribe(id));
        assert!(!reg.unsubscribe(id));
        reg.publish(&PolicySnapshot::empty());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(reg.is_empty());
    }
}
