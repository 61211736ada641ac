//! Remote collaborators, specified at their interface boundary.
//!
//! The engine only ever sees these traits; the HTTP implementations live in
//! [`http`], and [`memory`] provides the in-process store the tests and the
//! offline mode run against.

mod http;
mod memory;

use serde_json::Value;

use crate::cache::{LocalCache, TOKEN_KEY};
use crate::error::MapResult;
use crate::models::Node;

pub use http::HttpClient;
pub use memory::MemoryStore;

/// Supplies the bearer credential for remote calls. Implementations cache
/// and refresh lazily; `None` means the session is unauthenticated.
pub trait TokenProvider {
    fn token(&self) -> Option<String>;
}

/// Fixed credential, from the environment or a test.
pub struct StaticToken(pub Option<String>);

impl TokenProvider for StaticToken {
    fn token(&self) -> Option<String> {
        self.0.clone()
    }
}

/// Credential cached in the local cache, re-read on every use so an external
/// refresh is picked up without restarting.
pub struct CachedToken {
    cache: LocalCache,
}

impl CachedToken {
    pub fn new(cache: LocalCache) -> Self {
        Self { cache }
    }
}

impl TokenProvider for CachedToken {
    fn token(&self) -> Option<String> {
        self.cache.get(TOKEN_KEY).ok().flatten()
    }
}

/// Keyed get/put/delete/list of opaque JSON documents, one namespace per
/// user. Documents are opaque beyond the legacy shape rules handled by
/// [`crate::models::map::normalize_document`].
#[allow(async_fn_in_trait)]
pub trait DocumentStore {
    /// Store a new document; the returned key identifies it from now on.
    async fn create(&self, doc: &Value) -> MapResult<String>;
    /// Idempotent overwrite of an existing document.
    async fn update(&self, id: &str, doc: &Value) -> MapResult<()>;
    /// Best-effort incremental content write; callers treat failures as
    /// non-fatal because a full [`DocumentStore::update`] follows.
    async fn update_content(&self, id: &str, doc: &Value) -> MapResult<()>;
    /// Update only the display-name field.
    async fn rename(&self, id: &str, name: &str) -> MapResult<()>;
    async fn get(&self, id: &str) -> MapResult<Value>;
    async fn delete(&self, id: &str) -> MapResult<()>;
    async fn list(&self) -> MapResult<Vec<Value>>;
}

/// The node generator: a root for a fresh topic, children for a leaf
/// addressed by its full path. An empty child list means the generator has
/// no further detail for that path.
#[allow(async_fn_in_trait)]
pub trait Expander {
    async fn generate(&self, topic: &str, emojis: bool) -> MapResult<Node>;
    async fn expand(&self, path: &[String], emojis: bool) -> MapResult<Vec<Node>>;
}
