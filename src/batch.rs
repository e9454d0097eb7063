//! Concurrent resolution of every occurrence in a document.
//!
//! One task per occurrence. Identical lookups share a cache slot, so a
//! workflow that uses `actions/checkout@v4` ten times costs one round of API
//! calls. Results and progress lines come back in input order no matter
//! which task finishes first.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use futures::future::join_all;
use tracing::{debug, warn};

use crate::error::Error;
use crate::hosting::HostingApi;
use crate::resolver::Resolver;
use crate::types::{Occurrence, Policy, Resolution, ResolveOptions};
use crate::version::is_full_sha;

/// Identity of a lookup: two occurrences with equal keys resolve identically.
/// The trailing comment only counts for refs that are already commits,
/// where it carries the version label.
type CacheKey = (String, String, Policy, String, Option<String>);

/// A cache entry. `None` until a lookup for the key succeeds.
type Slot = Arc<tokio::sync::Mutex<Option<Resolution>>>;

/// Resolutions aligned index-for-index with the input occurrences.
#[derive(Debug)]
pub struct Batch {
    /// One progress line per pinned occurrence, `None` for failures.
    pub progress: Vec<Option<String>>,
    /// Outcome per occurrence.
    pub resolutions: Vec<Resolution>,
}

/// Run-scoped cache of successful resolutions.
///
/// The outer lock only guards finding or reserving a key's slot. The
/// per-slot async lock is held during the network lookup, which makes
/// identical lookups wait for the first one without blocking unrelated keys.
#[derive(Default)]
struct ResolutionCache {
    /// Slots by key.
    slots: Mutex<HashMap<CacheKey, Slot>>,
}

impl ResolutionCache {
    /// Find or reserve the slot for `key`.
    fn slot(&self, key: CacheKey) -> Slot {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        return Arc::clone(slots.entry(key).or_default());
    }
}

/// Resolve every occurrence concurrently and wait for all of them.
/// A failed or panicked task only affects its own slot.
pub async fn resolve_all(
    api: Arc<dyn HostingApi>,
    occurrences: &[Occurrence],
    options: ResolveOptions,
) -> Batch {
    let cache = Arc::new(ResolutionCache::default());

    let handles: Vec<_> = occurrences
        .iter()
        .cloned()
        .map(|occurrence| {
            let api = Arc::clone(&api);
            let cache = Arc::clone(&cache);
            return tokio::spawn(async move {
                let resolution = resolve_one(api.as_ref(), &cache, &occurrence, options).await;
                let line = progress_line(&occurrence, &resolution);
                return (resolution, line);
            });
        })
        .collect();

    let mut progress = Vec::with_capacity(handles.len());
    let mut resolutions = Vec::with_capacity(handles.len());
    for (occurrence, joined) in occurrences.iter().zip(join_all(handles).await) {
        let (resolution, line) = joined.unwrap_or_else(|e| {
            warn!("{}@{}: resolution task died: {e}", occurrence.action, occurrence.requested_ref);
            return (Resolution::failed(format!("resolution task died: {e}")), None);
        });
        progress.push(line);
        resolutions.push(resolution);
    }

    return Batch { progress, resolutions };
}

/// `  owner/repo: version -> commit` for pinned occurrences.
fn progress_line(occurrence: &Occurrence, resolution: &Resolution) -> Option<String> {
    return match resolution {
        Resolution::Failed { .. } => None,
        Resolution::Pinned { commit_id, version } => {
            Some(format!("  {}: {version} -> {commit_id}", occurrence.action))
        },
    };
}

/// Resolve one occurrence through the cache.
async fn resolve_one(
    api: &dyn HostingApi,
    cache: &ResolutionCache,
    occurrence: &Occurrence,
    options: ResolveOptions,
) -> Resolution {
    if !occurrence.is_well_formed() {
        return Resolution::failed(Error::MalformedAction { action: occurrence.action.clone() });
    }

    let key = (
        occurrence.owner.clone(),
        occurrence.repo.clone(),
        options.policy,
        occurrence.requested_ref.clone(),
        occurrence.comment.clone().filter(|_| return is_full_sha(&occurrence.requested_ref)),
    );
    let slot = cache.slot(key);
    let mut cached = slot.lock().await;
    if let Some(hit) = cached.as_ref() {
        debug!("{}@{}: cache hit", occurrence.repository(), occurrence.requested_ref);
        return hit.clone();
    }

    let resolution = Resolver::new(api, options)
        .resolve(&occurrence.owner, &occurrence.repo, &occurrence.requested_ref, occurrence.comment.as_deref())
        .await;
    // Failures stay uncached so the next occurrence with this key retries.
    if matches!(resolution, Resolution::Pinned { .. }) {
        *cached = Some(resolution.clone());
    }
    return resolution;
}
