// src/lib.rs

pub mod config;
pub mod controller;
pub mod core;
pub mod error;
pub mod persistence;
pub mod session;

pub use crate::core::matcher::{decide, Verdict};
pub use crate::core::store::EquivalenceStore;
pub use crate::error::{CheckerError, Result};
pub use crate::session::Session;
