//! Session controller modules.

#![allow(missing_docs)]

mod core;
mod cycle;
pub(crate) mod types;

pub use self::core::Session;
pub use self::types::SessionSnapshot;
