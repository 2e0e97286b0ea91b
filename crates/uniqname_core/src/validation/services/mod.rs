//! Core services of the validation stack.
//!
//! - **Registry**: per-subject coordination state, created and removed atomically
//! - **Barrier**: rendezvous between the last-name and first-name calls of one subject
//! - **Uniqueness**: pairing check against the directory

pub mod barrier;
pub mod registry;
pub mod uniqueness;
