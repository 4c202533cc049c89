//! An in-memory cache of rendered pages.
//!
//! Pages are cached per path and per variant (e.g. the signed in user). Write paths call
//! [PageCache::revalidate] so that the next request renders the page again.
//!
//! Each path also has a generation that [PageCache::revalidate] advances. A handler reads the
//! generation before it queries the database and passes it back to [PageCache::insert], which
//! drops the page if the path was revalidated in between.

use std::{collections::HashMap, sync::Arc};

use tokio::sync::RwLock;

type Variants = HashMap<String, String>;

/// How many times a path has been revalidated.
pub type Generation = u64;

#[derive(Debug, Default)]
struct Pages {
    html: HashMap<String, Variants>,
    generations: HashMap<String, Generation>,
}

/// Rendered HTML keyed by request path, then by variant.
#[derive(Debug, Clone, Default)]
pub struct PageCache {
    pages: Arc<RwLock<Pages>>,
}

impl PageCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The current generation of `path`. Take it before reading the data a page is built from.
    pub async fn generation(&self, path: &str) -> Generation {
        let pages = self.pages.read().await;

        pages.generations.get(path).copied().unwrap_or_default()
    }

    /// Get the cached HTML for `path` rendered for `variant`.
    pub async fn get(&self, path: &str, variant: &str) -> Option<String> {
        let pages = self.pages.read().await;

        pages
            .html
            .get(path)
            .and_then(|variants| variants.get(variant))
            .cloned()
    }

    /// Cache `html` as the rendering of `path` for `variant`, unless `path` has been
    /// revalidated since `generation` was read.
    ///
    /// Returns whether the page was cached.
    pub async fn insert(
        &self,
        path: &str,
        variant: &str,
        generation: Generation,
        html: String,
    ) -> bool {
        let mut pages = self.pages.write().await;

        let current = pages.generations.get(path).copied().unwrap_or_default();
        if current != generation {
            tracing::debug!("Not caching {path}, it was revalidated while rendering");
            return false;
        }

        pages
            .html
            .entry(path.to_owned())
            .or_default()
            .insert(variant.to_owned(), html);

        true
    }

    /// Mark every variant of `path` as stale.
    pub async fn revalidate(&self, path: &str) {
        let mut pages = self.pages.write().await;

        *pages.generations.entry(path.to_owned()).or_default() += 1;

        if pages.html.remove(path).is_some() {
            tracing::debug!("Revalidated cached page {path}");
        }
    }
}
