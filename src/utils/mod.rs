//! Utility helpers: generational storage, math extensions and step logging.

pub mod allocator;
pub mod logging;
pub mod math;

pub use allocator::{Arena, BodyHandle, GenerationalId};
pub use math::*;
