use std::collections::{HashMap, VecDeque};

use instant::Instant;

use crate::session::ClientId;


#[derive(Clone, Copy, Debug)]
pub struct PendingChallenge {
    pub challenger: ClientId,
    pub created_at: Instant,
}

// FIFO quick-match queue plus direct challenges, keyed by the challenged
// session. A new challenge to the same target replaces the pending one.
#[derive(Default)]
pub struct Matchmaking {
    queue: VecDeque<ClientId>,
    pending_challenges: HashMap<ClientId, PendingChallenge>,
}

impl Matchmaking {
    pub fn new() -> Self {
        Matchmaking::default()
    }

    // Returns false if the client was already queued.
    pub fn enqueue(&mut self, id: ClientId) -> bool {
        if self.queue.contains(&id) {
            return false;
        }
        self.queue.push_back(id);
        true
    }

    pub fn is_queued(&self, id: ClientId) -> bool {
        self.queue.contains(&id)
    }

    pub fn cancel(&mut self, id: ClientId) {
        self.queue.retain(|queued| *queued != id);
    }

    pub fn take_pair(&mut self) -> Option<(ClientId, ClientId)> {
        if self.queue.len() < 2 {
            return None;
        }
        let first = self.queue.pop_front().unwrap();
        let second = self.queue.pop_front().unwrap();
        Some((first, second))
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    // Returns the challenge this one displaced, if any.
    pub fn add_challenge(
        &mut self,
        target: ClientId,
        challenger: ClientId,
        now: Instant,
    ) -> Option<PendingChallenge> {
        self.pending_challenges.insert(target, PendingChallenge { challenger, created_at: now })
    }

    pub fn take_challenge(&mut self, target: ClientId) -> Option<PendingChallenge> {
        self.pending_challenges.remove(&target)
    }

    pub fn remove_client(&mut self, id: ClientId) {
        self.cancel(id);
        self.pending_challenges.remove(&id);
        self.pending_challenges.retain(|_, challenge| challenge.challenger != id);
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn queue_is_fifo_and_dedups() {
        let mut mm = Matchmaking::new();
        assert!(mm.enqueue(ClientId(1)));
        assert!(!mm.enqueue(ClientId(1)));
        assert!(mm.enqueue(ClientId(2)));
        assert!(mm.enqueue(ClientId(3)));
        assert_eq!(mm.take_pair(), Some((ClientId(1), ClientId(2))));
        assert_eq!(mm.take_pair(), None);
        assert_eq!(mm.queue_len(), 1);
    }

    #[test]
    fn new_challenge_replaces_pending_one() {
        let mut mm = Matchmaking::new();
        let now = Instant::now();
        assert!(mm.add_challenge(ClientId(9), ClientId(1), now).is_none());
        let displaced = mm.add_challenge(ClientId(9), ClientId(2), now).unwrap();
        assert_eq!(displaced.challenger, ClientId(1));
        assert_eq!(mm.take_challenge(ClientId(9)).unwrap().challenger, ClientId(2));
        assert!(mm.take_challenge(ClientId(9)).is_none());
    }

    #[test]
    fn remove_client_clears_both_challenge_sides() {
        let mut mm = Matchmaking::new();
        let now = Instant::now();
        mm.enqueue(ClientId(1));
        mm.add_challenge(ClientId(1), ClientId(2), now);
        mm.add_challenge(ClientId(3), ClientId(1), now);
        mm.remove_client(ClientId(1));
        assert!(!mm.is_queued(ClientId(1)));
        assert!(mm.take_challenge(ClientId(1)).is_none());
        assert!(mm.take_challenge(ClientId(3)).is_none());
    }
}
