//! URL-keyed resource cache.
//!
//! Concurrent requests for the same URL share one [`Resource`] and one
//! fetch. The cache only holds weak references: once every requester drops
//! its handle, the next request fetches again and the result of the
//! abandoned fetch is discarded.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use url::Url;

use crate::assets::fetch::Fetcher;
use crate::assets::resource::Resource;
use crate::errors::Result;

/// Decodes fetched bytes into a resource payload.
pub trait ResourceLoader: Send + Sync + 'static {
    type Output: Send + Sync + 'static;

    /// Short name used in log messages.
    const KIND: &'static str;

    fn load(&self, url: &Url, bytes: Vec<u8>) -> Result<Self::Output>;
}

pub struct ResourceCache<L: ResourceLoader> {
    loader: Arc<L>,
    fetcher: Arc<dyn Fetcher>,
    resources: Mutex<FxHashMap<Url, Weak<Resource<L::Output>>>>,
}

impl<L: ResourceLoader> ResourceCache<L> {
    pub fn new(loader: L, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            loader: Arc::new(loader),
            fetcher,
            resources: Mutex::new(FxHashMap::default()),
        }
    }

    #[inline]
    pub fn loader(&self) -> &L {
        &self.loader
    }

    /// Returns the shared resource for `url`, starting a fetch if no live
    /// resource exists.
    pub fn get_resource(&self, url: &Url) -> Arc<Resource<L::Output>> {
        let resource = {
            let mut resources = self.resources.lock();
            if let Some(existing) = resources.get(url).and_then(Weak::upgrade) {
                return existing;
            }
            resources.retain(|_, weak| weak.strong_count() > 0);

            let resource = Arc::new(Resource::new(url.clone()));
            resources.insert(url.clone(), Arc::downgrade(&resource));
            resource
        };

        log::debug!("Fetching {} '{}'", L::KIND, url);
        let loader = self.loader.clone();
        let target = Arc::downgrade(&resource);
        self.fetcher.fetch(
            url,
            Box::new(move |bytes| {
                // Nobody is waiting anymore.
                let Some(target) = target.upgrade() else {
                    return;
                };
                let decoded = bytes.and_then(|bytes| loader.load(target.url(), bytes));
                match decoded {
                    Ok(data) => {
                        target.finish(Some(data));
                    }
                    Err(err) => {
                        log::warn!("Failed to load {} '{}': {}", L::KIND, target.url(), err);
                        target.finish(None);
                    }
                }
            }),
        );
        resource
    }

    /// Number of live resources tracked by the cache.
    pub fn len(&self) -> usize {
        self.resources
            .lock()
            .values()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of live resources still waiting for their fetch.
    pub fn pending_fetches(&self) -> usize {
        self.resources
            .lock()
            .values()
            .filter_map(Weak::upgrade)
            .filter(|resource| !resource.is_finished())
            .count()
    }
}
