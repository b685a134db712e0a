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

//! # Workflow Importer
//!
//! Instead of deriving the dependencies from the restrictions, a stitching computation service
//! (SCS) may already provide a workflow. The workflow contains, for every path, a tree of hops,
//! where every hop lists the hops it depends on. This module locates the hops of the workflow in
//! the local [`Path`]s, creates the aggregates of the hops in the [`Session`], and folds the
//! dependencies between hops into dependencies between aggregates.
//!
//! Every hop that imports VLAN tags gets exactly one source from which it imports them (see
//! [`resolve_import_sources`]).

use crate::aggregate::{HopRef, RspecFormat};
use crate::session::{AggregateId, Session};
use crate::Error;

use log::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path as FsPath;

/// Workflow data as returned by the SCS: path ID -> workflow of the path.
pub type WorkflowData = BTreeMap<String, PathWorkflow>;

/// Workflow of a single path
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathWorkflow {
    /// Top-level hop entries of the path
    #[serde(default)]
    pub dependencies: Vec<HopDependency>,
}

/// Entry of a hop in the workflow, along with all the hops it depends on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HopDependency {
    /// URN of the hop
    pub hop_urn: String,
    /// URL of the aggregate of the hop
    pub aggregate_url: String,
    /// Whether the hop imports VLAN tags from another hop
    #[serde(default)]
    pub import_vlans: bool,
    /// Hops on which this hop depends
    #[serde(default)]
    pub dependencies: Vec<HopDependency>,
}

/// Parse the workflow from a JSON string
pub fn parse_workflow(s: impl AsRef<str>) -> Result<WorkflowData, Error> {
    Ok(serde_json::from_str(s.as_ref())?)
}

/// Read and parse the workflow from a JSON file
pub fn read_workflow(path: impl AsRef<FsPath>) -> Result<WorkflowData, Error> {
    parse_workflow(fs::read_to_string(path)?)
}

/// Hop of a path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hop {
    /// URN of the hop
    pub urn: String,
    /// Index of the hop along the path
    pub index: usize,
    /// URL of the aggregate, once known from the workflow
    pub aggregate: Option<String>,
    /// Whether the hop imports VLAN tags
    pub import_vlans: bool,
    /// Positions (in the same path) of the hops this hop depends on
    pub dependencies: Vec<usize>,
    /// Hop from which the VLAN tags are imported, once resolved
    pub import_from: Option<HopRef>,
}

/// Path of the request, consisting of its hops in path order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Path {
    /// ID of the path (the link name of the request)
    pub id: String,
    /// Hops along the path
    pub hops: Vec<Hop>,
}

impl Path {
    /// Create a new path from the URNs of its hops, in path order.
    pub fn new<S: Into<String>>(id: impl Into<String>, hops: impl IntoIterator<Item = S>) -> Self {
        Self {
            id: id.into(),
            hops: hops
                .into_iter()
                .enumerate()
                .map(|(index, urn)| Hop {
                    urn: urn.into(),
                    index,
                    aggregate: None,
                    import_vlans: false,
                    dependencies: Vec::new(),
                    import_from: None,
                })
                .collect(),
        }
    }

    /// Position of the hop along the path
    pub fn position(&self, urn: impl AsRef<str>) -> Option<usize> {
        self.hops.iter().position(|h| h.urn == urn.as_ref())
    }

    /// Get the hop by its URN
    pub fn hop(&self, urn: impl AsRef<str>) -> Option<&Hop> {
        self.position(urn).map(|p| &self.hops[p])
    }
}

/// # Import the workflow
///
/// Locate all hops of the workflow in the paths, create the aggregates in the session (using the
/// given format for new aggregates), and add a dependency `A -> B` whenever a hop on `A` depends
/// on a hop on a different aggregate `B`. If `B` already (transitively) depends on `A`,
/// [`Error::DependencyLoop`] is returned. Finally, the import sources are resolved, and written
/// to the aggregate nodes.
///
/// Returns the aggregates mentioned by the workflow, in the order they were first seen.
pub fn import_workflow(
    session: &mut Session,
    paths: &mut [Path],
    workflow: &WorkflowData,
    format: RspecFormat,
) -> Result<Vec<AggregateId>, Error> {
    let mut seen: Vec<AggregateId> = Vec::new();

    for (path_id, path_workflow) in workflow.iter() {
        let path = match paths.iter_mut().find(|p| &p.id == path_id) {
            Some(p) => p,
            None => {
                error!("Workflow mentions path {}, which is not part of the request", path_id);
                return Err(Error::InvalidScenario(format!("Unknown path {}", path_id)));
            }
        };
        for entry in path_workflow.dependencies.iter() {
            import_hop(session, path, entry, format, &mut seen)?;
        }
    }

    info!("Imported the workflow with {} aggregates", seen.len());
    resolve_import_sources(session, paths)?;
    Ok(seen)
}

/// Import a single hop entry (and, recursively, all hops it depends on). Returns the position of
/// the hop along the path.
fn import_hop(
    session: &mut Session,
    path: &mut Path,
    entry: &HopDependency,
    format: RspecFormat,
    seen: &mut Vec<AggregateId>,
) -> Result<usize, Error> {
    let pos = match path.position(&entry.hop_urn) {
        Some(p) => p,
        None => {
            error!("Hop {} of the workflow is not part of path {}", entry.hop_urn, path.id);
            return Err(Error::UnknownHop(entry.hop_urn.clone()));
        }
    };

    let agg_id = session.get_or_add_aggregate(&entry.aggregate_url, format);
    if !seen.contains(&agg_id) {
        seen.push(agg_id);
    }
    {
        let hop = &mut path.hops[pos];
        hop.aggregate = Some(entry.aggregate_url.clone());
        hop.import_vlans |= entry.import_vlans;
    }

    for dep in entry.dependencies.iter() {
        let dep_pos = import_hop(session, path, dep, format, seen)?;
        if dep_pos == pos {
            warn!("Hop {} depends on itself", entry.hop_urn);
            continue;
        }
        if !path.hops[pos].dependencies.contains(&dep_pos) {
            path.hops[pos].dependencies.push(dep_pos);
        }
        if dep.aggregate_url != entry.aggregate_url {
            let dep_id = session.aggregate_id(&dep.aggregate_url)?;
            if session.add_dependency_checked(agg_id, dep_id)? {
                debug!(
                    "{} depends on {} (hop {} on {})",
                    entry.aggregate_url, dep.aggregate_url, entry.hop_urn, dep.hop_urn
                );
            }
        }
    }

    Ok(pos)
}

/// Find the import source of the hop at the given position, if possible.
fn find_import_source(path: &Path, pos: usize) -> Option<HopRef> {
    let hop = &path.hops[pos];
    let aggregate = hop.aggregate.as_ref()?;

    // closest dependency on a different aggregate (ties go to the lower index)
    let closest = hop
        .dependencies
        .iter()
        .map(|d| &path.hops[*d])
        .filter_map(|d| match &d.aggregate {
            Some(a) if a != aggregate => Some((d, a)),
            _ => None,
        })
        .min_by_key(|(d, _)| (d.index.abs_diff(hop.index), d.index));
    if let Some((d, a)) = closest {
        return Some(HopRef { aggregate: a.clone(), hop_urn: d.urn.clone() });
    }

    // peer on the same aggregate, right before or after, that is already resolved
    let before = pos.checked_sub(1);
    let after = Some(pos + 1).filter(|p| *p < path.hops.len());
    before
        .into_iter()
        .chain(after)
        .map(|p| &path.hops[p])
        .filter(|p| p.aggregate.as_ref() == Some(aggregate))
        .find_map(|p| p.import_from.clone())
}

/// Perform a single pass over all hops, and resolve the import source of every hop which imports
/// VLAN tags but has no source yet. Returns the number of newly resolved hops.
pub fn resolve_import_sources_once(paths: &mut [Path]) -> usize {
    let mut resolved = 0;
    for path in paths.iter_mut() {
        for pos in 0..path.hops.len() {
            if !path.hops[pos].import_vlans || path.hops[pos].import_from.is_some() {
                continue;
            }
            if let Some(source) = find_import_source(path, pos) {
                trace!("Hop {} imports from {}", path.hops[pos].urn, source.hop_urn);
                path.hops[pos].import_from = Some(source);
                resolved += 1;
            }
        }
    }
    resolved
}

/// # Resolve the import sources
///
/// Every hop that imports VLAN tags gets exactly one source hop. The source is the dependency on
/// a different aggregate with the closest hop index. If there is no such dependency, the source of
/// a hop right before or after on the same aggregate is taken, but only if that hop is already
/// resolved. Since the peer may come later in the path, the resolution is performed twice.
/// Hops that are still unresolved afterwards import nothing.
///
/// The result is stored on the aggregate nodes of the session.
pub fn resolve_import_sources(session: &mut Session, paths: &mut [Path]) -> Result<(), Error> {
    resolve_import_sources_once(paths);
    resolve_import_sources_once(paths);

    for path in paths.iter() {
        for hop in path.hops.iter().filter(|h| h.import_vlans) {
            let aggregate = match &hop.aggregate {
                Some(a) => a,
                None => continue,
            };
            if hop.import_from.is_none() {
                warn!("Cannot find the source of the imported VLAN tags of hop {}", hop.urn);
            }
            let id = session.aggregate_id(aggregate)?;
            session.aggregate_mut(id)?.set_hop_import(hop.urn.clone(), hop.import_from.clone());
        }
    }
    Ok(())
}
