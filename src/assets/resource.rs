//! Shared, asynchronously populated resource.
//!
//! A [`Resource`] starts `Pending` and transitions exactly once to `Loaded`
//! or `Failed`. Listeners registered with [`Resource::on_finished`] fire once
//! with the outcome; a listener registered after completion fires immediately
//! on the calling thread.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use url::Url;

/// Completion callback. The argument is `true` on success.
pub type FinishedCallback = Box<dyn FnOnce(bool) + Send>;

/// Load state of a [`Resource`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceState {
    Pending,
    Loaded,
    Failed,
}

struct Inner<T> {
    state: ResourceState,
    data: Option<Arc<T>>,
    listeners: Vec<FinishedCallback>,
}

/// A resource fetched by URL and shared between all its requesters.
pub struct Resource<T> {
    url: Url,
    inner: Mutex<Inner<T>>,
}

impl<T> fmt::Debug for Resource<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("url", &self.url.as_str())
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl<T> Resource<T> {
    #[must_use]
    pub fn new(url: Url) -> Self {
        Self {
            url,
            inner: Mutex::new(Inner {
                state: ResourceState::Pending,
                data: None,
                listeners: Vec::new(),
            }),
        }
    }

    #[inline]
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    #[inline]
    pub fn state(&self) -> ResourceState {
        self.inner.lock().state
    }

    #[inline]
    pub fn is_loaded(&self) -> bool {
        self.state() == ResourceState::Loaded
    }

    #[inline]
    pub fn is_failed(&self) -> bool {
        self.state() == ResourceState::Failed
    }

    #[inline]
    pub fn is_finished(&self) -> bool {
        self.state() != ResourceState::Pending
    }

    /// The decoded payload, once loaded.
    pub fn data(&self) -> Option<Arc<T>> {
        self.inner.lock().data.clone()
    }

    /// Registers a completion listener.
    ///
    /// Fires immediately if the resource has already finished.
    pub fn on_finished(&self, callback: FinishedCallback) {
        let mut inner = self.inner.lock();
        match inner.state {
            ResourceState::Pending => inner.listeners.push(callback),
            state => {
                drop(inner);
                callback(state == ResourceState::Loaded);
            }
        }
    }

    /// Completes the resource. Returns `false` if it had already finished,
    /// in which case the new outcome is discarded.
    pub(crate) fn finish(&self, data: Option<T>) -> bool {
        let (listeners, success) = {
            let mut inner = self.inner.lock();
            if inner.state != ResourceState::Pending {
                log::debug!("Ignoring duplicate completion for '{}'", self.url);
                return false;
            }
            let success = data.is_some();
            inner.state = if success {
                ResourceState::Loaded
            } else {
                ResourceState::Failed
            };
            inner.data = data.map(Arc::new);
            (std::mem::take(&mut inner.listeners), success)
        };

        // Listeners may call back into this resource.
        for listener in listeners {
            listener(success);
        }
        true
    }
}
