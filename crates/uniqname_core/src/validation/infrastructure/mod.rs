//! Infrastructure primitives shared by the validation services: subject naming and
//! validator configuration.

pub mod config;
pub mod subject;
