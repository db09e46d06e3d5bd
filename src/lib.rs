pub mod asset;
pub mod cleanup;
pub mod commands;
pub mod config;
pub mod error;
pub mod package;
pub mod reconcile;
pub mod registry;
pub mod resolver;
pub mod runtime;
