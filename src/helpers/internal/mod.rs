//! Internal utilities shared by the pipeline stages

pub mod fs_utils;
pub mod hash;
pub mod http;
pub mod process;
pub mod progress;
