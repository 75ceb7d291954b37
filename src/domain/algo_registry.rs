//! Registry of running algo orders (§3: "Algo-order entry", §4.3
//! `cancelOrders`). Keyed by UUID; cancellation is cooperative — marking an
//! entry cancelled only sets a flag the owning background loop observes on
//! its next wake (§4.2, §5).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;

use dashmap::DashMap;

use crate::domain::types::Side;

/// One running algo order (§3). `side` is `None` for commands that don't
/// carry a meaningful side at the registry level.
pub struct AlgoOrderEntry {
    pub id: Uuid,
    pub side: Option<Side>,
    pub session: Uuid,
    pub tag: Option<String>,
    cancelled: AtomicBool,
}

impl AlgoOrderEntry {
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Which algo orders a `cancelOrders(who=...)` call should mark cancelled
/// (§4.3). Argument name is `who` per the parser's action grammar.
#[derive(Debug, Clone)]
pub enum CancelWho {
    /// Every algo order currently registered on this exchange.
    All,
    /// Every algo order belonging to the calling session.
    Session,
    /// Algo orders in the calling session carrying a given tag.
    Tagged(String),
    /// A single algo order by id.
    Id(Uuid),
}

/// Registry of running algo orders for one exchange (§3, §4.3).
#[derive(Default)]
pub struct AlgoOrderRegistry {
    entries: DashMap<Uuid, Arc<AlgoOrderEntry>>,
}

impl AlgoOrderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, side: Option<Side>, session: Uuid, tag: Option<String>) -> Uuid {
        let id = Uuid::new_v4();
        self.entries.insert(
            id,
            Arc::new(AlgoOrderEntry {
                id,
                side,
                session,
                tag,
                cancelled: AtomicBool::new(false),
            }),
        );
        id
    }

    pub fn remove(&self, id: Uuid) {
        self.entries.remove(&id);
    }

    pub fn is_cancelled(&self, id: Uuid) -> bool {
        self.entries.get(&id).map_or(true, |e| e.is_cancelled())
    }

    /// Mark every entry matching `who` cancelled; returns the number marked.
    pub fn cancel(&self, who: &CancelWho, calling_session: Uuid) -> usize {
        let mut count = 0;
        for entry in self.entries.iter() {
            let matches = match who {
                CancelWho::All => true,
                CancelWho::Session => entry.session == calling_session,
                CancelWho::Tagged(tag) => {
                    entry.session == calling_session && entry.tag.as_deref() == Some(tag.as_str())
                }
                CancelWho::Id(id) => entry.id == *id,
            };
            if matches {
                entry.cancelled.store(true, Ordering::Release);
                count += 1;
            }
        }
        count
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_session_only_matches_that_session() {
        let registry = AlgoOrderRegistry::new();
        let s1 = Uuid::new_v4();
        let s2 = Uuid::new_v4();
        let a = registry.register(None, s1, None);
        let b = registry.register(None, s2, None);

        registry.cancel(&CancelWho::Session, s1);
        assert!(registry.is_cancelled(a));
        assert!(!registry.is_cancelled(b));
    }

    #[test]
    fn cancel_tagged_requires_same_session_and_tag() {
        let registry = AlgoOrderRegistry::new();
        let session = Uuid::new_v4();
        let tagged = registry.register(None, session, Some("trail".into()));
        let other = registry.register(None, session, Some("other".into()));

        let n = registry.cancel(&CancelWho::Tagged("trail".into()), session);
        assert_eq!(n, 1);
        assert!(registry.is_cancelled(tagged));
        assert!(!registry.is_cancelled(other));
    }

    #[test]
    fn cancel_all_ignores_session() {
        let registry = AlgoOrderRegistry::new();
        let a = registry.register(None, Uuid::new_v4(), None);
        let b = registry.register(None, Uuid::new_v4(), None);
        registry.cancel(&CancelWho::All, Uuid::new_v4());
        assert!(registry.is_cancelled(a));
        assert!(registry.is_cancelled(b));
    }

    #[test]
    fn remove_then_is_cancelled_is_true() {
        let registry = AlgoOrderRegistry::new();
        let id = registry.register(None, Uuid::new_v4(), None);
        registry.remove(id);
        assert!(registry.is_cancelled(id));
    }
}
