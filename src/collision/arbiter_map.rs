use std::collections::BTreeMap;

use log::debug;

use super::arbiter::Arbiter;
use crate::utils::allocator::BodyHandle;

/// Unordered body pair; `(a, b)` and `(b, a)` produce the same key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArbiterKey {
    low: BodyHandle,
    high: BodyHandle,
}

impl ArbiterKey {
    pub fn new(a: BodyHandle, b: BodyHandle) -> Self {
        if a <= b {
            Self { low: a, high: b }
        } else {
            Self { low: b, high: a }
        }
    }

    pub fn bodies(&self) -> (BodyHandle, BodyHandle) {
        (self.low, self.high)
    }

    pub fn contains(&self, body: BodyHandle) -> bool {
        self.low == body || self.high == body
    }
}

/// Registry holding at most one arbiter per unordered body pair.
///
/// Arbiters are visited in key order so identical worlds solve their pairs
/// in the same sequence. Released arbiters go to a free list and are reset
/// before reuse so no manifold state leaks into the next pair.
#[derive(Debug, Default)]
pub struct ArbiterMap {
    arbiters: BTreeMap<ArbiterKey, Arbiter>,
    pool: Vec<Arbiter>,
}

impl ArbiterMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.arbiters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arbiters.is_empty()
    }

    /// Number of released arbiters waiting for reuse.
    pub fn pooled(&self) -> usize {
        self.pool.len()
    }

    pub fn look_up(&self, a: BodyHandle, b: BodyHandle) -> Option<&Arbiter> {
        self.arbiters.get(&ArbiterKey::new(a, b))
    }

    pub fn look_up_mut(&mut self, a: BodyHandle, b: BodyHandle) -> Option<&mut Arbiter> {
        self.arbiters.get_mut(&ArbiterKey::new(a, b))
    }

    pub fn contains(&self, a: BodyHandle, b: BodyHandle) -> bool {
        self.arbiters.contains_key(&ArbiterKey::new(a, b))
    }

    /// Returns the pair's arbiter, creating one in `(a, b)` order if needed.
    /// The flag is true when the arbiter was created by this call.
    pub fn get_or_create(&mut self, a: BodyHandle, b: BodyHandle) -> (&mut Arbiter, bool) {
        let key = ArbiterKey::new(a, b);
        let mut created = false;
        let pool = &mut self.pool;
        let arbiter = self.arbiters.entry(key).or_insert_with(|| {
            created = true;
            debug!("arbiter created for {a}-{b}");
            match pool.pop() {
                Some(mut arbiter) => {
                    arbiter.reset(a, b);
                    arbiter
                }
                None => Arbiter::new(a, b),
            }
        });
        (arbiter, created)
    }

    /// Registers an externally built arbiter. A pair that already has one is
    /// rejected and the argument handed back.
    pub fn add(&mut self, arbiter: Arbiter) -> Result<(), Arbiter> {
        let key = ArbiterKey::new(arbiter.body1(), arbiter.body2());
        if self.arbiters.contains_key(&key) {
            return Err(arbiter);
        }
        self.arbiters.insert(key, arbiter);
        Ok(())
    }

    /// Drops the pair's arbiter, returning it to the pool.
    pub fn remove(&mut self, a: BodyHandle, b: BodyHandle) -> bool {
        match self.arbiters.remove(&ArbiterKey::new(a, b)) {
            Some(arbiter) => {
                debug!("arbiter removed for {a}-{b}");
                self.release(arbiter);
                true
            }
            None => false,
        }
    }

    /// Drops every arbiter touching `body`.
    pub fn remove_body(&mut self, body: BodyHandle) -> usize {
        let keys: Vec<ArbiterKey> = self
            .arbiters
            .keys()
            .filter(|key| key.contains(body))
            .copied()
            .collect();
        for key in &keys {
            if let Some(arbiter) = self.arbiters.remove(key) {
                self.release(arbiter);
            }
        }
        keys.len()
    }

    /// Removes arbiters whose manifold is empty and returns their pairs.
    pub fn collect_garbage(&mut self) -> Vec<(BodyHandle, BodyHandle)> {
        let empty: Vec<ArbiterKey> = self
            .arbiters
            .iter()
            .filter(|(_, arbiter)| arbiter.contact_count() == 0)
            .map(|(key, _)| *key)
            .collect();

        let mut removed = Vec::with_capacity(empty.len());
        for key in empty {
            if let Some(arbiter) = self.arbiters.remove(&key) {
                debug!("arbiter removed for {}-{}", arbiter.body1(), arbiter.body2());
                removed.push((arbiter.body1(), arbiter.body2()));
                self.release(arbiter);
            }
        }
        removed
    }

    pub fn clear(&mut self) {
        for arbiter in std::mem::take(&mut self.arbiters).into_values() {
            self.release(arbiter);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arbiter> + '_ {
        self.arbiters.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Arbiter> + '_ {
        self.arbiters.values_mut()
    }

    /// Total number of cached contact points across all arbiters.
    pub fn contact_count(&mut self) -> usize {
        self.iter_mut().map(|arbiter| arbiter.contacts_mut().len()).sum()
    }

    fn release(&mut self, mut arbiter: Arbiter) {
        arbiter.contacts_mut().clear();
        self.pool.push(arbiter);
    }
}
