use std::ops::{Index, IndexMut};

use glam::Vec3;
use log::trace;
use parking_lot::{Mutex, MutexGuard};

use crate::{
    config::ContactSettings,
    core::{constraints::BodySet, rigidbody::RigidBody},
    dynamics::contact::Contact,
    utils::allocator::BodyHandle,
};

/// Manifold budget per body pair.
pub const MAX_CONTACTS: usize = 4;

/// Fixed-capacity, ordered contact manifold.
#[derive(Debug, Clone, Default)]
pub struct ContactList {
    slots: [Contact; MAX_CONTACTS],
    len: usize,
}

impl ContactList {
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == MAX_CONTACTS
    }

    pub fn as_slice(&self) -> &[Contact] {
        &self.slots[..self.len]
    }

    pub fn as_mut_slice(&mut self) -> &mut [Contact] {
        &mut self.slots[..self.len]
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Contact> {
        self.as_slice().iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Contact> {
        self.as_mut_slice().iter_mut()
    }

    /// Appends a point, returning `false` when the manifold is already full.
    pub fn push(&mut self, contact: Contact) -> bool {
        if self.is_full() {
            return false;
        }
        self.slots[self.len] = contact;
        self.len += 1;
        true
    }

    /// Removes the point at `index`, keeping the order of the others.
    pub fn remove(&mut self, index: usize) -> Option<Contact> {
        if index >= self.len {
            return None;
        }
        let removed = std::mem::take(&mut self.slots[index]);
        self.slots[index..self.len].rotate_left(1);
        self.len -= 1;
        Some(removed)
    }

    /// Keeps the points for which `keep` returns true, preserving order.
    pub fn retain_mut(&mut self, mut keep: impl FnMut(&mut Contact) -> bool) {
        let mut write = 0;
        for read in 0..self.len {
            if keep(&mut self.slots[read]) {
                self.slots.swap(write, read);
                write += 1;
            }
        }
        for slot in &mut self.slots[write..self.len] {
            *slot = Contact::default();
        }
        self.len = write;
    }

    pub fn clear(&mut self) {
        for slot in &mut self.slots[..self.len] {
            *slot = Contact::default();
        }
        self.len = 0;
    }
}

impl Index<usize> for ContactList {
    type Output = Contact;

    fn index(&self, index: usize) -> &Contact {
        &self.as_slice()[index]
    }
}

impl IndexMut<usize> for ContactList {
    fn index_mut(&mut self, index: usize) -> &mut Contact {
        &mut self.as_mut_slice()[index]
    }
}

/// Persistent record for one unordered body pair owning its contact manifold.
///
/// `add_contact` takes `&self` and locks the manifold, so several collision
/// threads may feed the same arbiter. Solving goes through `&mut self` and
/// needs no lock.
#[derive(Debug)]
pub struct Arbiter {
    body1: BodyHandle,
    body2: BodyHandle,
    contacts: Mutex<ContactList>,
}

impl Arbiter {
    pub fn new(body1: BodyHandle, body2: BodyHandle) -> Self {
        Self {
            body1,
            body2,
            contacts: Mutex::new(ContactList::default()),
        }
    }

    /// Reinitialises a pooled arbiter for a new pair.
    pub(crate) fn reset(&mut self, body1: BodyHandle, body2: BodyHandle) {
        self.body1 = body1;
        self.body2 = body2;
        self.contacts.get_mut().clear();
    }

    pub fn body1(&self) -> BodyHandle {
        self.body1
    }

    pub fn body2(&self) -> BodyHandle {
        self.body2
    }

    pub fn involves(&self, body: BodyHandle) -> bool {
        self.body1 == body || self.body2 == body
    }

    /// Locks the manifold for inspection.
    pub fn contacts(&self) -> MutexGuard<'_, ContactList> {
        self.contacts.lock()
    }

    pub fn contacts_mut(&mut self) -> &mut ContactList {
        self.contacts.get_mut()
    }

    pub fn contact_count(&self) -> usize {
        self.contacts.lock().len()
    }

    /// Empties the manifold; the world drops empty arbiters on the next step.
    pub fn invalidate(&self) {
        self.contacts.lock().clear();
    }

    /// Folds one reported point into the manifold and returns the slot it landed in.
    ///
    /// The bodies may be passed in either order; a reversed pair has its
    /// points swapped and its normal flipped so the stored normal always
    /// points from `body1` to `body2`.
    #[allow(clippy::too_many_arguments)]
    pub fn add_contact(
        &self,
        body1: &RigidBody,
        body2: &RigidBody,
        point1: Vec3,
        point2: Vec3,
        normal: Vec3,
        penetration: f32,
        settings: &ContactSettings,
    ) -> usize {
        if body1.handle() != self.body1 && body2.handle() == self.body1 {
            return self.add_contact(body2, body1, point2, point1, -normal, penetration, settings);
        }
        debug_assert!(
            body1.handle() == self.body1 && body2.handle() == self.body2,
            "contact for {}-{} fed to arbiter {}-{}",
            body1.handle(),
            body2.handle(),
            self.body1,
            self.body2
        );

        let relative = point1 - body1.position();
        let mut list = self.contacts.lock();

        let break_squared = settings.break_threshold * settings.break_threshold;
        if let Some(index) = closest_cached_point(&list, relative, break_squared) {
            list[index].refresh(body1, body2, point1, point2, normal, penetration, settings);
            return index;
        }

        let contact = Contact::new(body1, body2, point1, point2, normal, penetration, settings);
        if !list.is_full() {
            list.push(contact);
            return list.len() - 1;
        }

        let index = replacement_index(&list, relative, penetration);
        trace!(
            "manifold {}-{} full, replacing point {index}",
            self.body1,
            self.body2
        );
        list[index] = contact;
        index
    }

    /// Moves every point with its bodies and drops those that separated or
    /// slid apart. Returns the number of points removed.
    pub fn update_contacts(&mut self, bodies: &BodySet, settings: &ContactSettings) -> usize {
        let list = self.contacts.get_mut();
        let before = list.len();
        let (Some(body1), Some(body2)) = (bodies.get(self.body1), bodies.get(self.body2)) else {
            list.clear();
            return before;
        };

        let threshold = settings.break_threshold;
        let drift_limit = threshold * threshold * 100.0;
        list.retain_mut(|contact| {
            contact.update_position(body1, body2);
            contact.penetration() >= -threshold && contact.tangential_drift_squared() <= drift_limit
        });
        before - list.len()
    }
}

fn closest_cached_point(list: &ContactList, relative: Vec3, limit_squared: f32) -> Option<usize> {
    let mut best = None;
    let mut best_distance = limit_squared;
    for (index, contact) in list.iter().enumerate() {
        let distance = (contact.relative_position1() - relative).length_squared();
        if distance < best_distance {
            best_distance = distance;
            best = Some(index);
        }
    }
    best
}

/// Picks the point to evict from a full manifold.
///
/// The deepest existing point, if strictly deeper than the candidate, is never
/// evicted. Among the rest, the removal that leaves the largest spread
/// (squared cross product of the manifold diagonals) wins; ties go to the
/// lowest index.
fn replacement_index(list: &ContactList, candidate: Vec3, penetration: f32) -> usize {
    let mut protected = None;
    let mut deepest = penetration;
    for (index, contact) in list.iter().enumerate() {
        if contact.penetration() > deepest {
            deepest = contact.penetration();
            protected = Some(index);
        }
    }

    let p = [
        list[0].relative_position1(),
        list[1].relative_position1(),
        list[2].relative_position1(),
        list[3].relative_position1(),
    ];
    let spread = |index: usize| -> f32 {
        let (a, b) = match index {
            0 => (candidate - p[1], p[3] - p[2]),
            1 => (candidate - p[0], p[3] - p[2]),
            2 => (candidate - p[0], p[3] - p[1]),
            _ => (candidate - p[0], p[2] - p[1]),
        };
        a.cross(b).length_squared()
    };

    let mut best: Option<(usize, f32)> = None;
    for index in 0..MAX_CONTACTS {
        if protected == Some(index) {
            continue;
        }
        let area = spread(index);
        if best.map_or(true, |(_, best_area)| area > best_area) {
            best = Some((index, area));
        }
    }
    best.map_or(0, |(index, _)| index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::collider::ColliderShape;

    fn insert(bodies: &mut BodySet, mut body: RigidBody) -> BodyHandle {
        bodies.insert_with(|handle| {
            body.handle = handle;
            body
        })
    }

    fn pair() -> (BodySet, BodyHandle, BodyHandle) {
        let mut bodies = BodySet::new();
        let ground = insert(&mut bodies, RigidBody::fixed(ColliderShape::half_space(Vec3::Y)));
        let block = insert(
            &mut bodies,
            RigidBody::new(ColliderShape::cuboid(Vec3::new(1.0, 0.5, 1.0)))
                .with_position(Vec3::new(0.0, 0.5, 0.0)),
        );
        (bodies, ground, block)
    }

    fn feed(arbiter: &Arbiter, bodies: &BodySet, point: Vec3, penetration: f32) -> usize {
        let settings = ContactSettings::default();
        arbiter.add_contact(
            bodies.get(arbiter.body1()).unwrap(),
            bodies.get(arbiter.body2()).unwrap(),
            point,
            point - Vec3::Y * penetration,
            Vec3::Y,
            penetration,
            &settings,
        )
    }

    #[test]
    fn close_points_refresh_instead_of_growing() {
        let (bodies, ground, block) = pair();
        let arbiter = Arbiter::new(ground, block);
        assert_eq!(feed(&arbiter, &bodies, Vec3::new(1.0, 0.0, 1.0), 0.0), 0);
        assert_eq!(feed(&arbiter, &bodies, Vec3::new(1.004, 0.0, 1.0), 0.002), 0);

        let contacts = arbiter.contacts();
        assert_eq!(contacts.len(), 1);
        assert!(!contacts[0].is_new());
        assert!((contacts[0].penetration() - 0.002).abs() < 1e-6);
    }

    #[test]
    fn manifold_never_exceeds_four_points() {
        let (bodies, ground, block) = pair();
        let arbiter = Arbiter::new(ground, block);
        for i in 0..20 {
            let angle = i as f32 * 0.7;
            feed(&arbiter, &bodies, Vec3::new(angle.cos(), 0.0, angle.sin()), 0.001 * i as f32);
            assert!(arbiter.contact_count() <= MAX_CONTACTS);
        }
        assert_eq!(arbiter.contact_count(), MAX_CONTACTS);
    }

    #[test]
    fn fifth_point_evicts_the_one_that_maximises_spread() {
        let (bodies, ground, block) = pair();
        let arbiter = Arbiter::new(ground, block);
        for point in [
            Vec3::new(1.0, 0.0, 1.0),
            Vec3::new(1.0, 0.0, -1.0),
            Vec3::new(-1.0, 0.0, 1.0),
            Vec3::new(0.1, 0.0, 0.1),
        ] {
            feed(&arbiter, &bodies, point, 0.01);
        }

        let slot = feed(&arbiter, &bodies, Vec3::new(-1.0, 0.0, -1.0), 0.01);
        assert_eq!(slot, 3);
        let contacts = arbiter.contacts();
        assert_eq!(contacts.len(), 4);
        assert!(contacts[3].position1().abs_diff_eq(Vec3::new(-1.0, 0.0, -1.0), 1e-6));
        assert!(contacts[3].is_new());
        assert!(contacts[0].position1().abs_diff_eq(Vec3::new(1.0, 0.0, 1.0), 1e-6));
    }

    #[test]
    fn deepest_point_is_protected_from_eviction() {
        let (bodies, ground, block) = pair();
        let arbiter = Arbiter::new(ground, block);
        feed(&arbiter, &bodies, Vec3::new(1.0, 0.0, 1.0), 0.01);
        feed(&arbiter, &bodies, Vec3::new(1.0, 0.0, -1.0), 0.01);
        feed(&arbiter, &bodies, Vec3::new(-1.0, 0.0, 1.0), 0.01);
        feed(&arbiter, &bodies, Vec3::new(0.1, 0.0, 0.1), 0.05);

        // Removing 1 or 2 ties; the first index wins.
        let slot = feed(&arbiter, &bodies, Vec3::new(-1.0, 0.0, -1.0), 0.01);
        assert_eq!(slot, 1);
        let contacts = arbiter.contacts();
        assert!(contacts[3].position1().abs_diff_eq(Vec3::new(0.1, 0.0, 0.1), 1e-6));
        assert!(contacts[1].position1().abs_diff_eq(Vec3::new(-1.0, 0.0, -1.0), 1e-6));
    }

    #[test]
    fn reversed_pair_flips_normal() {
        let (bodies, ground, block) = pair();
        let arbiter = Arbiter::new(ground, block);
        let settings = ContactSettings::default();
        arbiter.add_contact(
            bodies.get(block).unwrap(),
            bodies.get(ground).unwrap(),
            Vec3::new(0.5, -0.01, 0.5),
            Vec3::new(0.5, 0.0, 0.5),
            -Vec3::Y,
            0.01,
            &settings,
        );
        let contacts = arbiter.contacts();
        assert_eq!(contacts[0].body1(), ground);
        assert!(contacts[0].normal().abs_diff_eq(Vec3::Y, 1e-6));
        assert!(contacts[0].position1().abs_diff_eq(Vec3::new(0.5, 0.0, 0.5), 1e-6));
    }

    #[test]
    fn separated_points_are_pruned() {
        let (mut bodies, ground, block) = pair();
        let mut arbiter = Arbiter::new(ground, block);
        feed(&arbiter, &bodies, Vec3::new(1.0, 0.0, 1.0), 0.0);
        feed(&arbiter, &bodies, Vec3::new(-1.0, 0.0, -1.0), 0.0);

        bodies.get_mut(block).unwrap().set_position(Vec3::new(0.0, 0.505, 0.0));
        assert_eq!(arbiter.update_contacts(&bodies, &ContactSettings::default()), 0);
        assert!((arbiter.contacts()[0].penetration() + 0.005).abs() < 1e-5);

        bodies.get_mut(block).unwrap().set_position(Vec3::new(0.0, 0.6, 0.0));
        assert_eq!(arbiter.update_contacts(&bodies, &ContactSettings::default()), 2);
        assert_eq!(arbiter.contact_count(), 0);
    }

    #[test]
    fn sliding_points_are_pruned() {
        let (mut bodies, ground, block) = pair();
        let mut arbiter = Arbiter::new(ground, block);
        feed(&arbiter, &bodies, Vec3::new(1.0, 0.0, 1.0), 0.0);
        bodies.get_mut(block).unwrap().set_position(Vec3::new(0.2, 0.5, 0.0));
        assert_eq!(arbiter.update_contacts(&bodies, &ContactSettings::default()), 1);
    }

    #[test]
    fn list_remove_keeps_order() {
        let (bodies, ground, block) = pair();
        let arbiter = Arbiter::new(ground, block);
        for x in [1.0, 2.0, 3.0] {
            feed(&arbiter, &bodies, Vec3::new(x, 0.0, 0.0), 0.0);
        }
        let mut list = arbiter.contacts().clone();
        assert!(list.remove(0).is_some());
        assert_eq!(list.len(), 2);
        assert!((list[0].position1().x - 2.0).abs() < 1e-6);
        assert!((list[1].position1().x - 3.0).abs() < 1e-6);
        assert!(list.remove(5).is_none());

        arbiter.invalidate();
        assert_eq!(arbiter.contact_count(), 0);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "fed to arbiter")]
    fn foreign_pair_is_rejected() {
        let (mut bodies, ground, block) = pair();
        let other = insert(&mut bodies, RigidBody::new(ColliderShape::sphere(0.5)));
        let arbiter = Arbiter::new(ground, other);
        let settings = ContactSettings::default();
        arbiter.add_contact(
            bodies.get(ground).unwrap(),
            bodies.get(block).unwrap(),
            Vec3::ZERO,
            Vec3::ZERO,
            Vec3::Y,
            0.0,
            &settings,
        );
    }
}
