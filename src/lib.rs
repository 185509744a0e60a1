//! `blogsync`: build a small markdown blog and publish the output tree to an
//! FTP host, uploading only files that are new or newer than the remote copy.
//!
//! The publish engine itself lives in `blogsync-core`; this crate supplies the
//! CLI, the site index loader, the build stage, the terminal prompt and the
//! FTP session.

pub mod cli;
pub mod ftp;
pub mod load_config;
pub mod prompt;
pub mod render;
