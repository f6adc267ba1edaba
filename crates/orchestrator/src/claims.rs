//! Single-writer claims on migration records
//!
//! Planning and execution hold a claim for as long as they write to a
//! migration. A claim carries the cancellation token of its unit of work.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

#[derive(Clone, Default)]
pub struct ExecutionClaims {
    active: Arc<DashMap<Uuid, CancellationToken>>,
}

impl ExecutionClaims {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim a migration, `None` when another unit already holds it
    pub fn try_claim(&self, id: Uuid) -> Option<ClaimGuard> {
        match self.active.entry(id) {
            Entry::Occupied(_) => None,
            Entry::Vacant(slot) => {
                let token = CancellationToken::new();
                slot.insert(token.clone());
                Some(ClaimGuard {
                    id,
                    token,
                    active: Arc::clone(&self.active),
                })
            }
        }
    }

    pub fn is_claimed(&self, id: Uuid) -> bool {
        self.active.contains_key(&id)
    }

    /// Signal the holder of a claim to stop. False when nobody holds it.
    pub fn signal_cancel(&self, id: Uuid) -> bool {
        match self.active.get(&id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }
}

/// Releases the claim on drop
pub struct ClaimGuard {
    id: Uuid,
    token: CancellationToken,
    active: Arc<DashMap<Uuid, CancellationToken>>,
}

impl ClaimGuard {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }
}

impl Drop for ClaimGuard {
    fn drop(&mut self) {
        self.active.remove(&self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_claim_is_rejected_until_release() {
        let claims = ExecutionClaims::new();
        let id = Uuid::new_v4();

        let guard = claims.try_claim(id).unwrap();
        assert!(claims.try_claim(id).is_none());
        assert!(claims.is_claimed(id));
        assert!(claims.try_claim(Uuid::new_v4()).is_some());

        drop(guard);
        assert!(!claims.is_claimed(id));
        assert!(claims.try_claim(id).is_some());
    }

    #[test]
    fn test_cancel_signal_reaches_holder() {
        let claims = ExecutionClaims::new();
        let id = Uuid::new_v4();
        assert!(!claims.signal_cancel(id));

        let guard = claims.try_claim(id).unwrap();
        let token = guard.token();
        assert!(claims.signal_cancel(id));
        assert!(token.is_cancelled());
        assert!(claims.is_claimed(id));
    }

    #[test]
    fn test_concurrent_claims_grant_exactly_one() {
        let claims = ExecutionClaims::new();
        let id = Uuid::new_v4();

        let guards: Vec<Option<ClaimGuard>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| claims.try_claim(id)))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(guards.iter().filter(|g| g.is_some()).count(), 1);
    }
}
