//! Extension declaration contracts.
//!
//! This module defines the raw per-extension declarations, the discovery
//! collaborator boundary, and normalization into resolution records. Finding
//! extensions on disk is the host's job; only declared data flows in here.

pub mod discovery;
pub mod manifest;
pub mod normalize;
