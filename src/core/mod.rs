//! Core infrastructure shared by every pipeline stage

pub mod config;
pub mod error;
pub mod lock;
pub mod output;
pub mod workspace;
