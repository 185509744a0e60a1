#![doc = "blogsync-core: core logic library for blogsync."]

//! This crate contains the incremental publish engine: walking the rendered
//! output tree, resolving remote directories, joining local and remote file
//! listings, deciding what is stale and uploading it.
//!
//! Transport and terminal concerns live behind the traits in [`contract`];
//! the `blogsync` binary crate provides the FTP and terminal implementations.

pub mod contract;
pub mod differ;
pub mod error;
pub mod policy;
pub mod publish;
pub mod remote;
pub mod state;
pub mod walker;
