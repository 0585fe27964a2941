//! Byte fetching by URL.
//!
//! [`Fetcher`] is the seam between resource caches and the outside world.
//! [`ThreadedFetcher`] reads local files on a tokio runtime, embedded
//! resources from the binary and network URLs through `ehttp` (with the
//! `http` feature). [`ManualFetcher`] queues requests until a test completes
//! them by hand.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::runtime::Runtime;
use url::Url;

use crate::assets::embedded::EmbeddedAssets;
use crate::assets::uri::embedded_path;
use crate::errors::{ProcMatError, Result};

/// Receives the fetched bytes, on whichever thread the fetch completed.
pub type FetchCallback = Box<dyn FnOnce(Result<Vec<u8>>) + Send>;

/// Asynchronous byte source.
pub trait Fetcher: Send + Sync {
    /// Starts fetching `url`. The callback must be invoked exactly once.
    fn fetch(&self, url: &Url, callback: FetchCallback);
}

/// Production fetcher backed by a dedicated tokio runtime.
pub struct ThreadedFetcher {
    runtime: Arc<Runtime>,
}

impl ThreadedFetcher {
    pub fn new() -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .thread_name("procmat-fetch")
            .enable_all()
            .build()?;
        Ok(Self {
            runtime: Arc::new(runtime),
        })
    }

    /// Reuses an existing runtime.
    #[must_use]
    pub fn with_runtime(runtime: Arc<Runtime>) -> Self {
        Self { runtime }
    }

    fn fetch_file(&self, url: &Url, callback: FetchCallback) {
        let Ok(path) = url.to_file_path() else {
            callback(Err(ProcMatError::UnsupportedScheme(url.to_string())));
            return;
        };
        self.runtime.spawn(async move {
            let result = tokio::fs::read(&path).await.map_err(ProcMatError::from);
            callback(result);
        });
    }

    fn fetch_embedded(&self, path: &str, callback: FetchCallback) {
        let path = path.to_owned();
        self.runtime.spawn(async move {
            let result = EmbeddedAssets::read(&path)
                .ok_or_else(|| ProcMatError::EmbeddedNotFound(path.clone()));
            callback(result);
        });
    }

    #[cfg(feature = "http")]
    #[allow(clippy::unused_self)]
    fn fetch_http(&self, url: &Url, callback: FetchCallback) {
        let request = ehttp::Request::get(url.as_str());
        ehttp::fetch(request, move |response| {
            let result = match response {
                Ok(response) if response.ok => Ok(response.bytes),
                Ok(response) => Err(ProcMatError::HttpResponse {
                    status: response.status,
                }),
                Err(err) => Err(ProcMatError::Network(err)),
            };
            callback(result);
        });
    }

    #[cfg(not(feature = "http"))]
    #[allow(clippy::unused_self)]
    fn fetch_http(&self, _url: &Url, callback: FetchCallback) {
        callback(Err(ProcMatError::FeatureNotEnabled(
            "HTTP feature is not enabled. Enable it with `features = [\"http\"]`".to_string(),
        )));
    }
}

impl Fetcher for ThreadedFetcher {
    fn fetch(&self, url: &Url, callback: FetchCallback) {
        if let Some(path) = embedded_path(url) {
            self.fetch_embedded(path, callback);
            return;
        }
        match url.scheme() {
            "file" => self.fetch_file(url, callback),
            "http" | "https" => self.fetch_http(url, callback),
            other => callback(Err(ProcMatError::UnsupportedScheme(other.to_string()))),
        }
    }
}

/// Fetcher whose requests stay pending until completed explicitly.
#[derive(Default)]
pub struct ManualFetcher {
    pending: Mutex<Vec<(Url, FetchCallback)>>,
    history: Mutex<Vec<Url>>,
}

impl ManualFetcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every URL requested so far, in request order.
    pub fn requests(&self) -> Vec<Url> {
        self.history.lock().clone()
    }

    pub fn request_count(&self, url: &Url) -> usize {
        self.history.lock().iter().filter(|u| *u == url).count()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    /// Delivers `bytes` to the oldest pending request for `url`.
    pub fn complete(&self, url: &Url, bytes: impl Into<Vec<u8>>) -> bool {
        self.resolve(url, Ok(bytes.into()))
    }

    /// Fails the oldest pending request for `url`.
    pub fn fail(&self, url: &Url) -> bool {
        self.resolve(url, Err(ProcMatError::Network(format!("fetch of {url} failed"))))
    }

    fn resolve(&self, url: &Url, result: Result<Vec<u8>>) -> bool {
        let callback = {
            let mut pending = self.pending.lock();
            let Some(index) = pending.iter().position(|(u, _)| u == url) else {
                return false;
            };
            pending.remove(index).1
        };
        callback(result);
        true
    }
}

impl Fetcher for ManualFetcher {
    fn fetch(&self, url: &Url, callback: FetchCallback) {
        self.history.lock().push(url.clone());
        self.pending.lock().push((url.clone(), callback));
    }
}
