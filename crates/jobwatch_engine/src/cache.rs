use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::future::{BoxFuture, FutureExt, Shared};
use jobwatch_core::{Page, PageRequest, ResourceKey};
use jobwatch_logging::{watch_debug, watch_info};

use crate::source::PageSource;
use crate::{FailureKind, FetchError};

pub type FetchResult<T> = Result<Arc<Page<T>>, FetchError>;

/// A fetch registered with the cache. Every clone resolves to the same
/// result; the network call runs once however many callers await it.
pub type PendingFetch<T> = Shared<BoxFuture<'static, FetchResult<T>>>;

/// What the cache currently knows about one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheState<T> {
    /// Never requested.
    Empty,
    /// First fetch in flight, nothing to show yet.
    Loading,
    Ready(Arc<Page<T>>),
    /// Previous page kept on display while a newer one is fetched.
    Refetching(Arc<Page<T>>),
    Failed {
        error: FetchError,
        stale: Option<Arc<Page<T>>>,
    },
}

struct Entry<T> {
    data: Option<Arc<Page<T>>>,
    error: Option<FetchError>,
    stale: bool,
    /// Bumped on invalidation so a fetch started earlier cannot clear the
    /// stale mark.
    generation: u64,
    /// Sequence number of the last fetch started and of the newest one
    /// recorded, so an older fetch landing late cannot replace newer data.
    started: u64,
    recorded: u64,
    in_flight: Option<InFlight<T>>,
}

struct InFlight<T> {
    seq: u64,
    generation: u64,
    pending: PendingFetch<T>,
}

impl<T> Default for Entry<T> {
    fn default() -> Self {
        Self {
            data: None,
            error: None,
            stale: false,
            generation: 0,
            started: 0,
            recorded: 0,
            in_flight: None,
        }
    }
}

impl<T> Entry<T> {
    fn invalidate(&mut self) {
        self.stale = true;
        self.generation += 1;
    }
}

/// Process-wide cache of resolved pages, keyed by request.
pub struct QueryCache<T> {
    source: Arc<dyn PageSource<T>>,
    entries: Arc<Mutex<HashMap<PageRequest, Entry<T>>>>,
}

impl<T> Clone for QueryCache<T> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            entries: Arc::clone(&self.entries),
        }
    }
}

impl<T> QueryCache<T>
where
    T: Send + Sync + 'static,
{
    pub fn new(source: Arc<dyn PageSource<T>>) -> Self {
        Self {
            source,
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Fetches `request` from the source, joining an identical fetch that is
    /// already in flight unless the entry was invalidated after that fetch
    /// started. A 404 resolves to an empty page.
    ///
    /// The network call runs on its own task and completes even when every
    /// caller drops its future. The fetch is registered before this returns,
    /// so `state` reports it straight away. Must be called from within a
    /// tokio runtime.
    pub fn fetch(&self, request: &PageRequest) -> PendingFetch<T> {
        let mut entries = lock(&self.entries);
        let entry = entries.entry(request.clone()).or_default();
        if let Some(in_flight) = &entry.in_flight {
            if in_flight.generation == entry.generation {
                watch_debug!("Joining in-flight fetch for {}", request);
                return in_flight.pending.clone();
            }
            watch_debug!("In-flight fetch for {} predates invalidation", request);
        }

        entry.started += 1;
        let seq = entry.started;
        let generation = entry.generation;
        let source = Arc::clone(&self.source);
        let shared_entries = Arc::clone(&self.entries);
        let request = request.clone();
        let task = tokio::spawn(async move {
            let result = match source.fetch_page(&request).await {
                Ok(page) => Ok(Arc::new(page)),
                Err(err) if err.is_not_found() => {
                    watch_info!("{} not found, treating as empty", request);
                    Ok(Arc::new(Page::empty(request.page, request.page_size)))
                }
                Err(err) => Err(err),
            };
            record(&shared_entries, &request, seq, generation, &result);
            result
        });
        let pending = async move {
            task.await.unwrap_or_else(|err| {
                Err(FetchError::new(
                    FailureKind::Network,
                    format!("fetch task ended early: {err}"),
                ))
            })
        }
        .boxed()
        .shared();

        entry.in_flight = Some(InFlight {
            seq,
            generation,
            pending: pending.clone(),
        });
        pending
    }

    /// Serves the cached page unless it is missing, stale or failed, in
    /// which case it fetches.
    pub async fn ensure(&self, request: &PageRequest) -> FetchResult<T> {
        if let Some(page) = self.fresh(request) {
            return Ok(page);
        }
        self.fetch(request).await
    }

    fn fresh(&self, request: &PageRequest) -> Option<Arc<Page<T>>> {
        let entries = lock(&self.entries);
        let entry = entries.get(request)?;
        if entry.stale || entry.error.is_some() {
            return None;
        }
        entry.data.clone()
    }

    pub fn state(&self, request: &PageRequest) -> CacheState<T> {
        let entries = lock(&self.entries);
        let Some(entry) = entries.get(request) else {
            return CacheState::Empty;
        };
        match (&entry.in_flight, &entry.data, &entry.error) {
            (Some(_), None, _) => CacheState::Loading,
            (Some(_), Some(page), _) => CacheState::Refetching(Arc::clone(page)),
            (None, stale, Some(error)) => CacheState::Failed {
                error: error.clone(),
                stale: stale.clone(),
            },
            (None, Some(page), None) => CacheState::Ready(Arc::clone(page)),
            (None, None, None) => CacheState::Empty,
        }
    }

    /// Last successfully resolved page, stale or not.
    pub fn cached(&self, request: &PageRequest) -> Option<Arc<Page<T>>> {
        lock(&self.entries)
            .get(request)
            .and_then(|entry| entry.data.clone())
    }

    pub fn is_stale(&self, request: &PageRequest) -> bool {
        lock(&self.entries)
            .get(request)
            .is_some_and(|entry| entry.stale)
    }

    /// Marks every entry of the resource stale. Returns how many entries
    /// were marked.
    pub fn invalidate(&self, resource_key: &ResourceKey) -> usize {
        let mut entries = lock(&self.entries);
        let mut count = 0;
        for (request, entry) in entries.iter_mut() {
            if &request.resource_key == resource_key {
                entry.invalidate();
                count += 1;
            }
        }
        watch_debug!("Invalidated {} entries of {}", count, resource_key);
        count
    }

    pub fn invalidate_all(&self) -> usize {
        let mut entries = lock(&self.entries);
        entries.values_mut().for_each(Entry::invalidate);
        watch_debug!("Invalidated all {} cache entries", entries.len());
        entries.len()
    }
}

fn record<T>(
    entries: &Mutex<HashMap<PageRequest, Entry<T>>>,
    request: &PageRequest,
    seq: u64,
    generation: u64,
    result: &FetchResult<T>,
) {
    let mut entries = lock(entries);
    let entry = entries.entry(request.clone()).or_default();
    if entry.in_flight.as_ref().is_some_and(|in_flight| in_flight.seq == seq) {
        entry.in_flight = None;
    }
    if seq < entry.recorded {
        watch_debug!("Dropping late result #{} for {}", seq, request);
        return;
    }
    entry.recorded = seq;
    match result {
        Ok(page) => {
            entry.data = Some(Arc::clone(page));
            entry.error = None;
            if entry.generation == generation {
                entry.stale = false;
            }
        }
        Err(err) => {
            watch_debug!("Fetch for {} failed: {}", request, err);
            entry.error = Some(err.clone());
        }
    }
}

fn lock<T>(entries: &Mutex<T>) -> MutexGuard<'_, T> {
    entries.lock().unwrap_or_else(PoisonError::into_inner)
}
