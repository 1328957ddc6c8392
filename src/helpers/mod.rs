//! Helper functions used by the pipeline stages
//!
//! Everything here is internal plumbing: HTTP, hashing, subprocesses,
//! progress bars and small filesystem utilities.

pub mod internal;
