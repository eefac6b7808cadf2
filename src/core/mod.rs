// src/core/mod.rs

pub mod builder;
pub mod hook;
pub mod matcher;
pub mod provider;
pub mod script;
pub mod store;
pub mod types;
