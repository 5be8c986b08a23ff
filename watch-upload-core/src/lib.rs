#![doc = "watch-upload-core: core logic library for watch-upload."]

//! This crate contains the domain logic of watch-upload: the storage contract,
//! bucket initialization, the per-file event handler, the directory watcher
//! and the service loop tying them together.
//!
//! Concrete storage clients live in the binary crate; everything here talks to
//! storage through [`contract::ObjectStore`].

pub mod bucket;
pub mod config;
pub mod contract;
pub mod handler;
pub mod service;
pub mod watcher;
