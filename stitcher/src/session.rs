// Stitcher: Dependency-Ordered VLAN Stitching for Federated Testbeds
// Copyright (C) 2021  Tibor Schneider
//
// This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation; either version 2 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along
// with this program; if not, write to the Free Software Foundation, Inc.,
// 51 Franklin Street, Fifth Floor, Boston, MA 02110-1301 USA.

//! # Stitching Session
//!
//! The [`Session`] owns every [`AggregateNode`] of the request, the topology facts, and the
//! dependency graph between the aggregates. An edge `a -> b` in the graph means that `a` depends
//! on `b`, i.e., `b` must complete its reservation before `a` can be submitted. Since the edges
//! live in the graph of the session, every dependency refers to a node owned by the session.
//!
//! Aggregates are identified by an [`AggregateId`], which is handed out in insertion order. All
//! iterations over the aggregates (and over the dependencies of a single aggregate) follow this
//! order, which makes every algorithm operating on the session deterministic.

use crate::aggregate::{AggregateNode, RspecFormat, VlanMap};
use crate::topology::{AdjacencyMap, PresetRoutes};
use crate::Error;

use log::*;
use petgraph::algo::has_path_connecting;
use petgraph::prelude::*;
use petgraph::stable_graph::StableGraph;
use std::collections::{BTreeMap, HashMap, VecDeque};

type IndexType = u32;
/// Aggregate Identification (and index into the dependency graph)
pub type AggregateId = NodeIndex<IndexType>;
/// Dependency graph. An edge `a -> b` means that `a` depends on `b`.
pub type DependencyGraph = StableGraph<(), (), Directed, IndexType>;

/// # Stitching Session
#[derive(Debug, Clone)]
pub struct Session {
    graph: DependencyGraph,
    aggregates: HashMap<AggregateId, AggregateNode>,
    urls: BTreeMap<String, AggregateId>,
    preset_routes: PresetRoutes,
    adjacency: AdjacencyMap,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// Create an empty session without any topology information
    pub fn new() -> Self {
        Self {
            graph: DependencyGraph::new(),
            aggregates: HashMap::new(),
            urls: BTreeMap::new(),
            preset_routes: PresetRoutes::new(),
            adjacency: AdjacencyMap::new(),
        }
    }

    /// Create an empty session, and derive the adjacency map from the preset routes.
    pub fn with_routes(preset_routes: PresetRoutes) -> Self {
        let mut s = Self::new();
        s.set_preset_routes(preset_routes);
        s
    }

    /// Replace the preset routes, and recompute the adjacency map.
    pub fn set_preset_routes(&mut self, preset_routes: PresetRoutes) {
        self.adjacency = preset_routes.adjacency();
        self.preset_routes = preset_routes;
        debug!("{} aggregates have an adjacent aggregate", self.adjacency.len());
    }

    /// Get the preset routes
    pub fn preset_routes(&self) -> &PresetRoutes {
        &self.preset_routes
    }

    /// Get the adjacency map
    pub fn adjacency(&self) -> &AdjacencyMap {
        &self.adjacency
    }

    /// Overwrite the adjacency map, leaving the preset routes untouched.
    pub fn set_adjacency(&mut self, adjacency: AdjacencyMap) {
        self.adjacency = adjacency;
    }

    /// Add a new aggregate node to the session, and return its ID.
    pub fn add_aggregate(&mut self, node: AggregateNode) -> Result<AggregateId, Error> {
        if self.urls.contains_key(node.url()) {
            return Err(Error::DuplicateAggregate(node.url().to_string()));
        }
        let id = self.graph.add_node(());
        self.urls.insert(node.url().to_string(), id);
        self.aggregates.insert(id, node);
        Ok(id)
    }

    /// Get the ID of the aggregate with the given URL, or create a new (empty) node for it.
    pub fn get_or_add_aggregate(
        &mut self,
        url: impl AsRef<str>,
        format: RspecFormat,
    ) -> AggregateId {
        match self.urls.get(url.as_ref()) {
            Some(id) => *id,
            None => {
                let id = self.graph.add_node(());
                self.urls.insert(url.as_ref().to_string(), id);
                self.aggregates.insert(id, AggregateNode::new(url.as_ref(), format));
                id
            }
        }
    }

    /// Get the ID of the aggregate with the given URL
    pub fn aggregate_id(&self, url: impl AsRef<str>) -> Result<AggregateId, Error> {
        self.urls
            .get(url.as_ref())
            .copied()
            .ok_or_else(|| Error::UnknownAggregate(url.as_ref().to_string()))
    }

    /// Returns the aggregate node, if it exists (and is not currently being executed).
    pub fn get(&self, id: AggregateId) -> Option<&AggregateNode> {
        self.aggregates.get(&id)
    }

    /// Returns the aggregate node, or an error if it does not exist.
    pub fn aggregate(&self, id: AggregateId) -> Result<&AggregateNode, Error> {
        self.aggregates.get(&id).ok_or_else(|| Error::UnknownAggregate(format!("{:?}", id)))
    }

    /// Returns the mutable aggregate node, or an error if it does not exist.
    pub fn aggregate_mut(&mut self, id: AggregateId) -> Result<&mut AggregateNode, Error> {
        self.aggregates.get_mut(&id).ok_or_else(|| Error::UnknownAggregate(format!("{:?}", id)))
    }

    /// Returns the URL of the aggregate. If the ID is unknown, its debug representation is used.
    pub fn url(&self, id: AggregateId) -> String {
        match self.aggregates.get(&id) {
            Some(n) => n.url().to_string(),
            None => self
                .urls
                .iter()
                .find(|(_, i)| **i == id)
                .map(|(u, _)| u.clone())
                .unwrap_or_else(|| format!("{:?}", id)),
        }
    }

    /// Move the node out of the session, such that a single task can own it during execution.
    pub(crate) fn take_aggregate(&mut self, id: AggregateId) -> Option<AggregateNode> {
        self.aggregates.remove(&id)
    }

    /// Return a node which was taken out with `take_aggregate`.
    pub(crate) fn return_aggregate(&mut self, id: AggregateId, node: AggregateNode) {
        self.aggregates.insert(id, node);
    }

    /// Returns all aggregate IDs in insertion order.
    pub fn aggregate_ids(&self) -> Vec<AggregateId> {
        let mut ids: Vec<AggregateId> = self.graph.node_indices().collect();
        ids.sort();
        ids
    }

    /// Iterate over all aggregate nodes in insertion order.
    pub fn aggregates(&self) -> impl Iterator<Item = (AggregateId, &AggregateNode)> {
        self.aggregate_ids()
            .into_iter()
            .filter_map(move |id| self.aggregates.get(&id).map(|n| (id, n)))
    }

    /// Number of aggregates in the session
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    /// Returns `true` if the session has no aggregate
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Get the dependency graph
    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    /// Record that `from` depends on `to`. Returns `false` if the dependency already existed, or
    /// if both are the same aggregate. This function does not check for loops, use
    /// [`Session::add_dependency_checked`] for that.
    pub fn add_dependency(&mut self, from: AggregateId, to: AggregateId) -> bool {
        if from == to || self.graph.find_edge(from, to).is_some() {
            return false;
        }
        self.graph.add_edge(from, to, ());
        true
    }

    /// Record that `from` depends on `to`, but only if `to` does not already (transitively) depend
    /// on `from`. Otherwise, [`Error::DependencyLoop`] is returned, and the graph is unchanged.
    pub fn add_dependency_checked(
        &mut self,
        from: AggregateId,
        to: AggregateId,
    ) -> Result<bool, Error> {
        if from == to {
            return Ok(false);
        }
        if let Some(path) = self.dependency_path(to, from) {
            let mut urls: Vec<String> = vec![self.url(from)];
            urls.extend(path.into_iter().map(|id| self.url(id)));
            error!("Adding the dependency would create a loop: {}", urls.join(" -> "));
            return Err(Error::DependencyLoop(urls));
        }
        Ok(self.add_dependency(from, to))
    }

    /// Returns `true` if `from` directly depends on `to`.
    pub fn has_dependency(&self, from: AggregateId, to: AggregateId) -> bool {
        self.graph.find_edge(from, to).is_some()
    }

    /// Returns `true` if `from` directly or transitively depends on `to`.
    pub fn depends_transitively(&self, from: AggregateId, to: AggregateId) -> bool {
        from != to && has_path_connecting(&self.graph, from, to, None)
    }

    /// Get all aggregates on which `id` depends, sorted by ID.
    pub fn depends_on(&self, id: AggregateId) -> Vec<AggregateId> {
        let mut deps: Vec<AggregateId> = self.graph.neighbors_directed(id, Outgoing).collect();
        deps.sort();
        deps.dedup();
        deps
    }

    /// Get all aggregates which depend on `id`, sorted by ID.
    pub fn dependents(&self, id: AggregateId) -> Vec<AggregateId> {
        let mut deps: Vec<AggregateId> = self.graph.neighbors_directed(id, Incoming).collect();
        deps.sort();
        deps.dedup();
        deps
    }

    /// Shortest chain of dependencies from `from` to `to` (both included), if one exists.
    pub fn dependency_path(&self, from: AggregateId, to: AggregateId) -> Option<Vec<AggregateId>> {
        let mut parent: HashMap<AggregateId, AggregateId> = HashMap::new();
        let mut queue: VecDeque<AggregateId> = VecDeque::new();
        queue.push_back(from);
        while let Some(current) = queue.pop_front() {
            if current == to {
                let mut path = vec![to];
                let mut cur = to;
                while let Some(p) = parent.get(&cur) {
                    path.push(*p);
                    cur = *p;
                }
                path.reverse();
                return Some(path);
            }
            for next in self.depends_on(current) {
                if next != from && !parent.contains_key(&next) {
                    parent.insert(next, current);
                    queue.push_back(next);
                }
            }
        }
        None
    }

    /// Collect the assigned VLAN tags of all completed aggregates, keyed by the aggregate URL.
    pub fn vlan_assignments(&self) -> BTreeMap<String, VlanMap> {
        self.aggregates()
            .filter(|(_, n)| n.is_completed())
            .map(|(_, n)| (n.url().to_string(), n.assigned_vlans().clone()))
            .collect()
    }
}
