//! Bounded dedup and cooldown state owned by the watcher.

use std::collections::{HashMap, HashSet, VecDeque};
use std::time::{Duration, Instant};

use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;

/// Insertion-ordered signature set guarding against redelivery.
///
/// Capacity is a soft bound: once exceeded, the oldest half is evicted in
/// one sweep so the set never grows without limit.
#[derive(Debug)]
pub struct SignatureWindow {
    capacity: usize,
    seen: HashSet<Signature>,
    order: VecDeque<Signature>,
}

impl SignatureWindow {
    /// Creates a window evicting once `capacity` is exceeded.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            seen: HashSet::new(),
            order: VecDeque::new(),
        }
    }

    /// Check-and-insert in one step: `false` when the signature was already
    /// seen. Callers serialize access with a lock, which closes the race
    /// between duplicate deliveries of one signature.
    pub fn insert(&mut self, signature: Signature) -> bool {
        if !self.seen.insert(signature) {
            return false;
        }
        self.order.push_back(signature);
        if self.order.len() > self.capacity {
            let evict = self.order.len() / 2;
            for old in self.order.drain(..evict) {
                self.seen.remove(&old);
            }
        }
        true
    }

    /// Number of signatures currently tracked.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether the window is empty.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Last-accepted timestamps per requester, swept periodically.
#[derive(Debug)]
pub struct CooldownMap {
    window: Duration,
    entries: HashMap<Pubkey, Instant>,
    last_sweep: Instant,
}

impl CooldownMap {
    /// Creates a map enforcing `window` between accepted requests.
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            entries: HashMap::new(),
            last_sweep: Instant::now(),
        }
    }

    /// `true` when the requester is clear of the cooldown; records `now`
    /// against the requester on acceptance.
    pub fn check_and_record(&mut self, requester: Pubkey, now: Instant) -> bool {
        self.maybe_sweep(now);
        if let Some(last) = self.entries.get(&requester) {
            if now.duration_since(*last) < self.window {
                return false;
            }
        }
        self.entries.insert(requester, now);
        true
    }

    /// Once per window, drop entries older than twice the window. Entries
    /// that old can no longer affect any cooldown decision.
    fn maybe_sweep(&mut self, now: Instant) {
        if now.duration_since(self.last_sweep) < self.window {
            return;
        }
        let horizon = self.window * 2;
        self.entries
            .retain(|_, last| now.duration_since(*last) < horizon);
        self.last_sweep = now;
    }

    /// Number of requesters currently tracked.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no requesters are tracked.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_a_redelivered_signature() {
        let mut window = SignatureWindow::new(8);
        let signature = Signature::new_unique();

        assert!(window.insert(signature));
        assert!(!window.insert(signature));
    }

    #[test]
    fn evicts_the_oldest_half_over_capacity() {
        let mut window = SignatureWindow::new(4);
        let signatures: Vec<Signature> = (0..5).map(|_| Signature::new_unique()).collect();
        for signature in &signatures {
            assert!(window.insert(*signature));
        }

        // Five tracked exceeded capacity four: the oldest two were dropped
        // and may be inserted again.
        assert_eq!(window.len(), 3);
        assert!(window.insert(signatures[0]));
        assert!(!window.insert(signatures[4]));
    }

    #[test]
    fn cooldown_blocks_within_the_window() {
        let mut cooldowns = CooldownMap::new(Duration::from_secs(60));
        let requester = Pubkey::new_unique();
        let start = Instant::now();

        assert!(cooldowns.check_and_record(requester, start));
        assert!(!cooldowns.check_and_record(requester, start + Duration::from_secs(30)));
        assert!(cooldowns.check_and_record(requester, start + Duration::from_secs(61)));
    }

    #[test]
    fn cooldown_tracks_requesters_independently() {
        let mut cooldowns = CooldownMap::new(Duration::from_secs(60));
        let start = Instant::now();

        assert!(cooldowns.check_and_record(Pubkey::new_unique(), start));
        assert!(cooldowns.check_and_record(Pubkey::new_unique(), start));
    }

    #[test]
    fn sweep_drops_entries_older_than_twice_the_window() {
        let window = Duration::from_secs(60);
        let mut cooldowns = CooldownMap::new(window);
        let stale = Pubkey::new_unique();
        let fresh = Pubkey::new_unique();
        let start = Instant::now();

        cooldowns.check_and_record(stale, start);
        cooldowns.check_and_record(fresh, start + Duration::from_secs(100));
        // The next check lands past 2x the window for the stale entry and
        // triggers a sweep.
        cooldowns.check_and_record(Pubkey::new_unique(), start + Duration::from_secs(170));

        assert_eq!(cooldowns.len(), 2);
        assert!(cooldowns.check_and_record(stale, start + Duration::from_secs(171)));
    }
}
