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

//! # Topology Facts
//!
//! Facts extracted from the advertisements of all aggregates. The [`PresetRoutes`] store, for
//! every aggregate, which local interface is connected to which remote interface. From them, the
//! [`AdjacencyMap`] is derived. Two aggregates are adjacent if and only if there exists a route in
//! both directions, with matching interface URNs.

use log::*;
use std::collections::{BTreeMap, BTreeSet};

/// # Preset Routes
///
/// Mapping from aggregate URL to the map `local interface URN -> remote interface URN`. Built once
/// from the advertisements, and read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PresetRoutes {
    routes: BTreeMap<String, BTreeMap<String, String>>,
}

impl PresetRoutes {
    /// Create empty preset routes
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a route of `aggregate` from its `local` interface to the `remote` interface. If the
    /// local interface already has a route, the old remote interface is returned.
    pub fn add_route(
        &mut self,
        aggregate: impl Into<String>,
        local: impl Into<String>,
        remote: impl Into<String>,
    ) -> Option<String> {
        self.routes.entry(aggregate.into()).or_default().insert(local.into(), remote.into())
    }

    /// Get all routes of an aggregate
    pub fn routes_of(&self, aggregate: impl AsRef<str>) -> Option<&BTreeMap<String, String>> {
        self.routes.get(aggregate.as_ref())
    }

    /// Get the remote interface of a local interface on the given aggregate
    pub fn remote_of(&self, aggregate: impl AsRef<str>, local: impl AsRef<str>) -> Option<&str> {
        self.routes
            .get(aggregate.as_ref())
            .and_then(|r| r.get(local.as_ref()))
            .map(|s| s.as_str())
    }

    /// Iterate over all aggregates that advertised at least one route
    pub fn aggregates(&self) -> impl Iterator<Item = &str> {
        self.routes.keys().map(|s| s.as_str())
    }

    /// Returns `true` if no route is known
    pub fn is_empty(&self) -> bool {
        self.routes.values().all(|r| r.is_empty())
    }

    /// Derive the adjacency map. A route `A: la -> rb` makes `A` and `B` adjacent if `rb` is a
    /// local interface of `B`, and `B` has the route `rb -> la`. Asymmetric routes are logged as a
    /// warning, and ignored.
    pub fn adjacency(&self) -> AdjacencyMap {
        // build the reverse index: interface -> owning aggregate
        let mut owner: BTreeMap<&str, &str> = BTreeMap::new();
        for (aggregate, routes) in self.routes.iter() {
            for local in routes.keys() {
                if let Some(old) = owner.insert(local.as_str(), aggregate.as_str()) {
                    warn!(
                        "Interface {} is advertised by both {} and {}! Using {}",
                        local, old, aggregate, aggregate
                    );
                }
            }
        }

        let mut adjacency = AdjacencyMap::new();
        for (aggregate, routes) in self.routes.iter() {
            for (local, remote) in routes.iter() {
                let remote_aggregate = match owner.get(remote.as_str()) {
                    Some(a) => *a,
                    None => {
                        warn!(
                            "Remote interface {} (of {} at {}) is not advertised by any aggregate",
                            remote, local, aggregate
                        );
                        continue;
                    }
                };
                if remote_aggregate == aggregate {
                    debug!("Route {} -> {} stays within {}", local, remote, aggregate);
                    continue;
                }
                match self.remote_of(remote_aggregate, remote) {
                    Some(back) if back == local => {
                        adjacency.insert(aggregate.as_str(), remote_aggregate);
                    }
                    Some(back) => warn!(
                        "Asymmetric route: {} at {} points to {}, but {} at {} points to {}",
                        local, aggregate, remote, remote, remote_aggregate, back
                    ),
                    None => unreachable!("owner index is built from the same routes"),
                }
            }
        }
        adjacency
    }
}

/// # Adjacency Map
///
/// Symmetric relation between aggregates, which share an advertised route.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdjacencyMap {
    adj: BTreeMap<String, BTreeSet<String>>,
}

impl AdjacencyMap {
    /// Create an empty adjacency map
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark both aggregates adjacent to each other.
    pub fn insert(&mut self, a: impl Into<String>, b: impl Into<String>) {
        let a = a.into();
        let b = b.into();
        self.adj.entry(a.clone()).or_default().insert(b.clone());
        self.adj.entry(b).or_default().insert(a);
    }

    /// Returns `true` if both aggregates are adjacent
    pub fn is_adjacent(&self, a: impl AsRef<str>, b: impl AsRef<str>) -> bool {
        self.adj.get(a.as_ref()).map(|n| n.contains(b.as_ref())).unwrap_or(false)
    }

    /// Get all adjacent aggregates
    pub fn neighbors(&self, aggregate: impl AsRef<str>) -> impl Iterator<Item = &str> {
        self.adj.get(aggregate.as_ref()).into_iter().flat_map(|n| n.iter().map(|s| s.as_str()))
    }

    /// Number of aggregates with at least one neighbor
    pub fn len(&self) -> usize {
        self.adj.len()
    }

    /// Returns `true` if no aggregate has a neighbor
    pub fn is_empty(&self) -> bool {
        self.adj.is_empty()
    }
}
