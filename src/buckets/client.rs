use futures::future::{BoxFuture, FutureExt, Shared};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tracing::{debug, instrument, warn};

use crate::{
    buckets::model::*,
    error::Result,
    http,
};

type Fetch = Shared<BoxFuture<'static, Vec<MetricFindValue>>>;

enum State {
    /// Nothing cached, nothing in flight.
    Idle,
    /// A request is in flight; callers await a clone of it.
    Fetching(Fetch),
    /// The listing succeeded and is kept until the client is dropped.
    Cached(Vec<MetricFindValue>),
}

/// Provides the cached bucket listing.
#[derive(Clone)]
pub struct Client {
    http_client: http::Client,
    tenant_id: String,
    state: Arc<Mutex<State>>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("tenant_id", &self.tenant_id)
            .finish()
    }
}

impl Client {
    pub(crate) fn new(http_client: http::Client, tenant_id: String) -> Self {
        Self {
            http_client,
            tenant_id,
            state: Arc::new(Mutex::new(State::Idle)),
        }
    }

    /// List all buckets.
    ///
    /// The first call fetches the listing, later calls are answered from the
    /// cache. Calls made while the fetch is in flight wait for it instead of
    /// issuing their own. A failed fetch yields an empty list for everyone
    /// waiting on it and is not cached, so the next call tries again.
    #[instrument(skip(self))]
    pub async fn list(&self) -> Vec<MetricFindValue> {
        let fetch = {
            let mut state = lock(&self.state);
            let fetch = match &*state {
                State::Cached(buckets) => return buckets.clone(),
                State::Fetching(fetch) => {
                    debug!("bucket listing in flight, waiting for it");
                    fetch.clone()
                }
                State::Idle => self.fetch().boxed().shared(),
            };
            if let State::Idle = *state {
                *state = State::Fetching(fetch.clone());
            }
            fetch
        };
        fetch.await
    }

    /// Fetch the listing without touching the cache.
    #[instrument(skip(self))]
    pub async fn list_uncached(&self) -> Result<Vec<Bucket>> {
        list_buckets(&self.http_client, self.path()).await
    }

    pub(crate) fn path(&self) -> String {
        format!("/1/{}/buckets/object", self.tenant_id)
    }

    // The shared future lives in `state`, so it only holds a weak reference
    // back to it.
    fn fetch(&self) -> impl std::future::Future<Output = Vec<MetricFindValue>> + Send + 'static {
        let http_client = self.http_client.clone();
        let path = self.path();
        let state = Arc::downgrade(&self.state);
        async move {
            let res = list_buckets(&http_client, path).await;
            let (buckets, next) = match res {
                Ok(buckets) => {
                    let buckets: Vec<MetricFindValue> =
                        buckets.into_iter().map(MetricFindValue::from).collect();
                    (buckets.clone(), State::Cached(buckets))
                }
                Err(e) => {
                    warn!(error = %e, "failed to list buckets");
                    (Vec::new(), State::Idle)
                }
            };
            store(&state, next);
            buckets
        }
    }
}

async fn list_buckets(http_client: &http::Client, path: String) -> Result<Vec<Bucket>> {
    let list: BucketList = http_client.get(path).await?.json().await?;
    Ok(list.results)
}

fn store(state: &Weak<Mutex<State>>, next: State) {
    if let Some(state) = state.upgrade() {
        *lock(&state) = next;
    }
}

// All state transitions are plain assignments, so a poisoned lock still holds
// a consistent state.
fn lock(state: &Mutex<State>) -> MutexGuard<'_, State> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}
