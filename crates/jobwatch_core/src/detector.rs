use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::hash::Hash;

use chrono::{DateTime, Utc};
use jobwatch_logging::{watch_debug, watch_trace};
use serde::{Deserialize, Serialize};

use crate::{CompletionEvent, JobId, JobItem, ResourceKey, StatusPhases};

/// What the retained comparison baseline covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotScope {
    /// The last observed page of the resource, replaced after every diff.
    /// Paging away and back re-baselines the items on the new page.
    #[default]
    Resource,
    /// Every item seen on any page of the resource, merged on each
    /// observation. Items that scrolled off-page keep their last status.
    AcrossPages,
}

/// Detects in-progress -> terminal status edges between successive
/// observations of a resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionDetector<S> {
    phases: StatusPhases<S>,
    scope: SnapshotScope,
    snapshots: HashMap<ResourceKey, HashMap<JobId, Option<S>>>,
}

impl<S> TransitionDetector<S>
where
    S: Clone + PartialEq + Eq + Hash,
{
    pub fn new(phases: StatusPhases<S>, scope: SnapshotScope) -> Self {
        Self {
            phases,
            scope,
            snapshots: HashMap::new(),
        }
    }

    pub fn scope(&self) -> SnapshotScope {
        self.scope
    }

    pub fn has_baseline(&self, resource_key: &ResourceKey) -> bool {
        self.snapshots.contains_key(resource_key)
    }

    /// Drops the baseline; the next observation of the resource is treated
    /// as the first one.
    pub fn forget(&mut self, resource_key: &ResourceKey) {
        self.snapshots.remove(resource_key);
    }

    /// Diffs `items` against the retained snapshot and returns one event per
    /// completed job, in page order. The first observation of a resource only
    /// records a baseline.
    pub fn observe(
        &mut self,
        resource_key: &ResourceKey,
        items: &[JobItem<S>],
        observed_at: DateTime<Utc>,
    ) -> Vec<CompletionEvent<S>> {
        let phases = &self.phases;
        let previous = match self.snapshots.entry(resource_key.clone()) {
            Entry::Vacant(slot) => {
                watch_debug!(
                    "Baseline for {} recorded with {} items",
                    resource_key,
                    items.len()
                );
                slot.insert(snapshot_of(items));
                return Vec::new();
            }
            Entry::Occupied(slot) => slot.into_mut(),
        };

        let events: Vec<CompletionEvent<S>> = items
            .iter()
            .filter(|item| {
                let Some(Some(before)) = previous.get(&item.id) else {
                    return false;
                };
                match &item.status {
                    Some(now) => phases.is_completion(before, now),
                    None => false,
                }
            })
            .map(|item| CompletionEvent {
                item: item.clone(),
                observed_at,
            })
            .collect();

        match self.scope {
            SnapshotScope::Resource => *previous = snapshot_of(items),
            SnapshotScope::AcrossPages => {
                for item in items {
                    previous.insert(item.id.clone(), item.status.clone());
                }
            }
        }

        if !events.is_empty() {
            watch_debug!(
                "{} job(s) completed on {}",
                events.len(),
                resource_key
            );
        } else {
            watch_trace!("No transitions on {}", resource_key);
        }
        events
    }
}

fn snapshot_of<S: Clone>(items: &[JobItem<S>]) -> HashMap<JobId, Option<S>> {
    items
        .iter()
        .map(|item| (item.id.clone(), item.status.clone()))
        .collect()
}
