#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! A registry of object pools that picks a reuse strategy for each type from the
//! capabilities the type exposes.
//!
//! Callers obtain instances from a [`Registry`] and return them when done. The registry
//! creates one [`Pool`] per type on first use, and one [`KeyedPool`] per type and key type
//! for callers that want independent sub-pools per key value, such as one sub-pool per
//! prototype.
//!
//! # Strategies
//!
//! A type opts into pooling by implementing [`Poolable`], which returns a [`Capabilities`]
//! table. The table decides which [`StrategyKind`] the pool uses:
//!
//! * Types that implement [`Reusable`] manage their own lifecycle. New instances are created
//!   from a prototype and the pool calls the instance's hooks at every transition.
//! * Types that implement [`HostObject`] belong to the object model of a host runtime. They
//!   are duplicated from a prototype or attached fresh, activated when acquired and
//!   deactivated when released.
//! * Everything else is default-constructed and, if it implements [`Dispose`], disposed
//!   when the pool discards it.
//!
//! Callers that need different behavior supply their own [`PoolStrategy`].
//!
//! # Observers
//!
//! Every pool accepts observers for each [`PoolEvent`]. Observers of a [`KeyedPool`] receive
//! the key alongside the instance and fire after the observers of the sub-pool itself.
//!
//! # Example
//!
//! ```rust
//! use pool_registry::{Capabilities, Poolable, Registry, Reusable};
//!
//! #[derive(Default)]
//! struct Particle {
//!     age: u32,
//! }
//!
//! impl Reusable for Particle {
//!     fn create(&self) -> Self {
//!         Self::default()
//!     }
//!
//!     fn on_release(&mut self) {
//!         self.age = 0;
//!     }
//! }
//!
//! impl Poolable for Particle {
//!     fn capabilities() -> Capabilities<Self> {
//!         Capabilities::new().constructible().reusable()
//!     }
//! }
//!
//! let registry = Registry::new();
//!
//! let mut particle = registry.get::<Particle>().unwrap();
//! particle.age = 10;
//! registry.release(particle);
//!
//! // The released particle is reused, reset by its own release hook.
//! let particle = registry.get::<Particle>().unwrap();
//! assert_eq!(particle.age, 0);
//! assert_eq!(registry.get_pool::<Particle>().count_all(), 1);
//! ```
//!
//! For code that does not want to own a registry, the [`global`] module offers the same
//! operations on a lazily created shared instance.
//!
//! # Thread safety
//!
//! Pools and registries are single-threaded. None of the pool types are [`Send`] or [`Sync`].

mod capabilities;
mod config;
mod creator;
mod error;
pub mod global;
mod keyed_pool;
mod object_pool;
mod observers;
mod pool;
mod pool_builder;
mod pooled;
mod registry;
mod registry_builder;
mod strategy;

pub use capabilities::*;
pub use config::*;
pub use creator::*;
pub use error::*;
pub use keyed_pool::*;
pub use object_pool::*;
pub use observers::PoolEvent;
pub use pool::*;
pub use pool_builder::*;
pub use pooled::*;
pub use registry::*;
pub use registry_builder::*;
pub use strategy::*;
