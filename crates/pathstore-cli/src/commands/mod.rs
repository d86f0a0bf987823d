//! Command handlers

pub mod config;
pub mod export;
pub mod record;
pub mod status;
pub mod tree;
