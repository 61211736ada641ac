//! mindgraph — an editable mind-map tree whose nodes are produced
//! incrementally: a root is generated once, leaves are expanded on demand by
//! an external generator.
//!
//! The crate is the synchronization and interaction engine; rendering, the
//! expansion backend, and the document store are collaborators behind the
//! traits in [`render`] and [`remote`]. See [`engine::Engine`] for the
//! top-level surface.

pub mod cache;
pub mod coordinator;
pub mod engine;
pub mod error;
pub mod export;
pub mod interact;
pub mod models;
pub mod remote;
pub mod render;
pub mod sanitize;
pub mod session;
