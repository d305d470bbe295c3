//! FIFO processing queue with per-asset deduplication.

use std::collections::VecDeque;
use std::sync::Arc;

use dashmap::DashSet;
use rustc_hash::FxHashSet;

use crate::pipeline::Flavor;

/// One asset to (re)process for one flavor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessingRequest {
    pub resource_name: String,
    pub flavor: Flavor,
}

impl ProcessingRequest {
    pub fn new(resource_name: impl Into<String>, flavor: Flavor) -> Self {
        Self {
            resource_name: resource_name.into(),
            flavor,
        }
    }
}

/// Pending requests in arrival order.
///
/// A resource name is accepted once while it is queued or in flight.
#[derive(Debug, Default)]
pub struct RequestQueue {
    pending: VecDeque<ProcessingRequest>,
    queued: FxHashSet<String>,
    in_flight: Arc<DashSet<String>>,
}

impl RequestQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if a request for the same asset is already queued
    /// or being processed.
    pub fn push(&mut self, request: ProcessingRequest) -> bool {
        if self.queued.contains(&request.resource_name)
            || self.in_flight.contains(&request.resource_name)
        {
            return false;
        }
        self.queued.insert(request.resource_name.clone());
        self.pending.push_back(request);
        true
    }

    /// Take every pending request, oldest first, and mark them in flight.
    pub fn take_batch(&mut self) -> Vec<ProcessingRequest> {
        self.queued.clear();
        let batch: Vec<_> = self.pending.drain(..).collect();
        for request in &batch {
            self.in_flight.insert(request.resource_name.clone());
        }
        batch
    }

    /// Shared handle that workers use to release their key.
    pub fn in_flight(&self) -> Arc<DashSet<String>> {
        Arc::clone(&self.in_flight)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    #[cfg(test)]
    pub fn is_busy(&self, resource_name: &str) -> bool {
        self.queued.contains(resource_name) || self.in_flight.contains(resource_name)
    }
}
