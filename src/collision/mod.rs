//! Persistent contact bookkeeping per body pair, plus a reference narrow phase.

pub mod arbiter;
pub mod arbiter_map;
pub mod narrowphase;

pub use arbiter::{Arbiter, ContactList, MAX_CONTACTS};
pub use arbiter_map::{ArbiterKey, ArbiterMap};
pub use narrowphase::{CollisionDetector, ContactReport, NarrowPhase};
