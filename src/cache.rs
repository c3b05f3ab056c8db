//! Per-graph memoization of derived structural properties.
//!
//! A [`PropertyCache`] is owned by the [`SimpleGraph`](crate::graph::SimpleGraph)
//! whose properties it stores, so the graph's identity is implicit in every
//! key. Each mutation entry point of the graph calls
//! [`PropertyCache::invalidate`] before returning; nothing is invalidated
//! lazily. The cache uses interior mutability and is not meant to be shared
//! across threads while the owning graph is being mutated.

use std::{
    cell::{Cell, RefCell},
    collections::{BTreeSet, HashMap},
};

use clap::ValueEnum;
use tracing::trace;

use crate::{
    error::Result,
    graph::{EdgeId, NodeId},
};

/// Whether derived properties are memoized.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, ValueEnum)]
pub enum MemoizeMode {
    /// Recompute on every request.
    None,
    /// Keep results until the next mutation of the graph.
    Properties,
}

/// The operation a cached value was computed by.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    ConnectedComponents,
    CutVertices,
    Bridges,
    BiconnectedComponents,
    TwoEdgeConnectedComponents,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum CachedValue {
    Partition(Vec<BTreeSet<NodeId>>),
    Nodes(BTreeSet<NodeId>),
    Edges(BTreeSet<EdgeId>),
}

#[derive(Debug, Clone)]
pub struct PropertyCache {
    mode: MemoizeMode,
    entries: RefCell<HashMap<CacheKey, CachedValue>>,
    generation: u64,
    hits: Cell<usize>,
    misses: Cell<usize>,
}

impl PropertyCache {
    pub fn new(mode: MemoizeMode) -> Self {
        Self {
            mode,
            entries: RefCell::new(HashMap::new()),
            generation: 0,
            hits: Cell::new(0),
            misses: Cell::new(0),
        }
    }

    pub fn mode(&self) -> MemoizeMode {
        self.mode
    }

    /// Drop every entry. Called synchronously by each mutation of the owning
    /// graph.
    pub fn invalidate(&mut self) {
        let entries = self.entries.get_mut();
        if !entries.is_empty() {
            trace!(
                generation = self.generation,
                dropped = entries.len(),
                "invalidating property cache"
            );
        }
        entries.clear();
        self.generation += 1;
    }

    /// Number of invalidations so far, i.e., the number of mutations the
    /// owning graph has undergone.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn hits(&self) -> usize {
        self.hits.get()
    }

    pub fn misses(&self) -> usize {
        self.misses.get()
    }

    pub fn contains(&self, key: CacheKey) -> bool {
        self.entries.borrow().contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    pub(crate) fn node_partition(
        &self,
        key: CacheKey,
        compute: impl FnOnce() -> Result<Vec<BTreeSet<NodeId>>>,
    ) -> Result<Vec<BTreeSet<NodeId>>> {
        if let Some(CachedValue::Partition(v)) = self.lookup(key) {
            return Ok(v);
        }
        let value = compute()?;
        self.store(key, CachedValue::Partition(value.clone()));
        Ok(value)
    }

    pub(crate) fn node_set(
        &self,
        key: CacheKey,
        compute: impl FnOnce() -> Result<BTreeSet<NodeId>>,
    ) -> Result<BTreeSet<NodeId>> {
        if let Some(CachedValue::Nodes(v)) = self.lookup(key) {
            return Ok(v);
        }
        let value = compute()?;
        self.store(key, CachedValue::Nodes(value.clone()));
        Ok(value)
    }

    pub(crate) fn edge_set(
        &self,
        key: CacheKey,
        compute: impl FnOnce() -> Result<BTreeSet<EdgeId>>,
    ) -> Result<BTreeSet<EdgeId>> {
        if let Some(CachedValue::Edges(v)) = self.lookup(key) {
            return Ok(v);
        }
        let value = compute()?;
        self.store(key, CachedValue::Edges(value.clone()));
        Ok(value)
    }

    fn lookup(&self, key: CacheKey) -> Option<CachedValue> {
        if self.mode == MemoizeMode::None {
            return None;
        }
        let found = self.entries.borrow().get(&key).cloned();
        if found.is_some() {
            self.hits.set(self.hits.get() + 1);
            trace!(?key, "property cache hit");
        } else {
            self.misses.set(self.misses.get() + 1);
        }
        found
    }

    fn store(&self, key: CacheKey, value: CachedValue) {
        if self.mode == MemoizeMode::Properties {
            self.entries.borrow_mut().insert(key, value);
        }
    }
}
