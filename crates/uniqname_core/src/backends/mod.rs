//! In-memory implementations of the external collaborators: the subject directory and the
//! localization message catalog.

pub mod catalog;
pub mod memory;
