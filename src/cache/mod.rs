//! Shared cache plumbing for detected anomalies and resolved conflicts.
//!
//! Slots are last-write-wins per key. [`KeyedLocks`] makes the
//! compute, cache and publish sequence for one key a single writer, and the
//! version on each slot lets readers detect that it changed.

mod keyed_lock;
mod versioned;

pub use keyed_lock::KeyedLocks;
pub use versioned::{Versioned, VersionedCache};
