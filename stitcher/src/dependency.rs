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

//! # Dependency Calculator
//!
//! Derives the dependencies between the aggregates of a session from the restrictions of their
//! requested interfaces. For every aggregate `L` (in the order of the session), and every requested
//! interface `i` of `L`, connected to the interface `ri` of aggregate `R`, the first matching rule
//! is applied:
//!
//! 1. `R` is not part of the session, `R` is not adjacent to `L`, or `ri` is not requested on `R`:
//!    The interface is skipped (and reported), but processing continues.
//! 2. `i` can translate VLAN tags, but `ri` cannot: `R` depends on `L`.
//! 3. Both can translate VLAN tags: No dependency.
//! 4. Neither can translate VLAN tags, and `R` does not yet depend on `L`: The VLAN ranges of `i`
//!    and `ri` are intersected, and the result is stored on both interfaces and as the global
//!    range of both aggregates. Then, `L` depends on `R`.
//! 5. `i` cannot translate VLAN tags, but `ri` can: No dependency. The dependency is added by rule
//!    2, when processing `ri` on `R`.
//!
//! Afterwards, the global `vlan_translation` flag of every aggregate is updated. An aggregate
//! performs VLAN translation if and only if all of its requested interfaces can translate.
//!
//! An empty intersection of VLAN ranges is only reported as a warning. The reservation at the
//! aggregate will fail later. The calculator must only be executed once per session, after all
//! requested interfaces are added.

use crate::aggregate::RequestedInterface;
use crate::restrictions::VlanRange;
use crate::session::Session;
use crate::Error;

use log::*;
use std::fmt;

/// Reason why a requested interface was skipped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The remote aggregate is not part of the session
    RemoteNotInSession,
    /// The remote aggregate is not adjacent
    NotAdjacent,
    /// The remote interface is not requested on the remote aggregate
    UnknownRemoteInterface,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RemoteNotInSession => write!(f, "remote aggregate is not part of the session"),
            Self::NotAdjacent => write!(f, "remote aggregate is not adjacent"),
            Self::UnknownRemoteInterface => write!(f, "remote interface is not requested"),
        }
    }
}

/// A requested interface that was ignored while computing the dependencies
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedInterface {
    /// URL of the aggregate
    pub aggregate: String,
    /// URN of the requested interface
    pub interface: String,
    /// URL of the remote aggregate
    pub remote_aggregate: String,
    /// URN of the remote interface
    pub remote_interface: String,
    /// Why the interface was skipped
    pub reason: SkipReason,
}

/// Two connected interfaces without any common VLAN tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VlanConflict {
    /// URL of the aggregate
    pub aggregate: String,
    /// URN of the requested interface
    pub interface: String,
    /// URL of the remote aggregate
    pub remote_aggregate: String,
    /// URN of the remote interface
    pub remote_interface: String,
}

/// Summary of the dependency calculation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyReport {
    /// All dependencies added, as `(dependent, dependency)` pairs of aggregate URLs.
    pub dependencies: Vec<(String, String)>,
    /// All interfaces which were skipped
    pub skipped: Vec<SkippedInterface>,
    /// All links with an empty VLAN range
    pub conflicts: Vec<VlanConflict>,
}

impl DependencyReport {
    /// Returns `true` if neither skipped interfaces nor VLAN conflicts were found.
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty() && self.conflicts.is_empty()
    }
}

/// # Calculate Dependencies
///
/// Compute all dependencies between the aggregates of the session, and update the VLAN
/// restrictions. See the [module documentation](self) for the rules.
///
/// ```
/// use stitcher::aggregate::{AggregateNode, RspecFormat};
/// use stitcher::dependency::calculate_dependencies;
/// use stitcher::restrictions::{RestrictionSet, VlanRange};
/// use stitcher::session::Session;
/// use stitcher::topology::PresetRoutes;
///
/// # fn main() -> Result<(), stitcher::Error> {
/// let mut routes = PresetRoutes::new();
/// routes.add_route("agg1", "agg1:if", "agg2:if");
/// routes.add_route("agg2", "agg2:if", "agg1:if");
///
/// let mut agg1 = AggregateNode::new("agg1", RspecFormat::GeniV3);
/// agg1.add_requested_interface("agg1:if", "agg2:if", "agg2");
/// agg1.restrictions_mut().set_restriction("agg1:if", RestrictionSet::translating(VlanRange::Any));
/// let mut agg2 = AggregateNode::new("agg2", RspecFormat::GeniV3);
/// agg2.add_requested_interface("agg2:if", "agg1:if", "agg1");
/// agg2.restrictions_mut().set_restriction("agg2:if", RestrictionSet::restricted(VlanRange::Any));
///
/// let mut session = Session::with_routes(routes);
/// let a1 = session.add_aggregate(agg1)?;
/// let a2 = session.add_aggregate(agg2)?;
///
/// calculate_dependencies(&mut session)?;
/// assert!(session.has_dependency(a2, a1));
/// # Ok(())
/// # }
/// ```
pub fn calculate_dependencies(session: &mut Session) -> Result<DependencyReport, Error> {
    let mut report = DependencyReport::default();
    let ids = session.aggregate_ids();

    for id in ids.iter().copied() {
        let node = session.aggregate(id)?;
        let url = node.url().to_string();
        let links: Vec<(String, RequestedInterface)> =
            node.requested_interfaces().map(|(i, r)| (i.to_string(), r.clone())).collect();

        for (iface, req) in links {
            let skip = |reason: SkipReason| SkippedInterface {
                aggregate: url.clone(),
                interface: iface.clone(),
                remote_aggregate: req.remote_aggregate.clone(),
                remote_interface: req.remote_interface.clone(),
                reason,
            };

            // Rule 1: unknown remote
            let remote_id = match session.aggregate_id(&req.remote_aggregate) {
                Ok(r) => r,
                Err(_) => {
                    error!(
                        "Interface {} at {} connects to {}, which is not part of the session",
                        iface, url, req.remote_aggregate
                    );
                    report.skipped.push(skip(SkipReason::RemoteNotInSession));
                    continue;
                }
            };
            if !session.adjacency().is_adjacent(&url, &req.remote_aggregate) {
                error!(
                    "Interface {} at {} connects to {}, which is not adjacent",
                    iface, url, req.remote_aggregate
                );
                report.skipped.push(skip(SkipReason::NotAdjacent));
                continue;
            }
            let remote = session.aggregate(remote_id)?;
            if !remote.has_requested_interface(&req.remote_interface) {
                error!(
                    "Interface {} at {} connects to {} at {}, which is not requested",
                    iface, url, req.remote_interface, req.remote_aggregate
                );
                report.skipped.push(skip(SkipReason::UnknownRemoteInterface));
                continue;
            }

            let local_r = session.aggregate(id)?.restriction(&iface);
            let remote_r = remote.restriction(&req.remote_interface);

            match (local_r.translates(), remote_r.translates()) {
                // Rule 2
                (true, false) => {
                    if session.add_dependency(remote_id, id) {
                        debug!("{} depends on {} (VLAN translation)", req.remote_aggregate, url);
                        report.dependencies.push((req.remote_aggregate.clone(), url.clone()));
                    }
                }
                // Rule 3
                (true, true) => {
                    trace!("{} and {} both translate on {}", url, req.remote_aggregate, iface)
                }
                // Rule 4
                (false, false) => {
                    if session.has_dependency(remote_id, id) {
                        trace!("{} already depends on {}", req.remote_aggregate, url);
                        continue;
                    }
                    let range = local_r.vlan_range.intersect(&remote_r.vlan_range);
                    if range.is_empty() {
                        warn!(
                            "No common VLAN tag between {} at {} ({}) and {} at {} ({})",
                            iface,
                            url,
                            local_r.vlan_range,
                            req.remote_interface,
                            req.remote_aggregate,
                            remote_r.vlan_range
                        );
                        report.conflicts.push(VlanConflict {
                            aggregate: url.clone(),
                            interface: iface.clone(),
                            remote_aggregate: req.remote_aggregate.clone(),
                            remote_interface: req.remote_interface.clone(),
                        });
                    }
                    store_range(session, id, &iface, &range)?;
                    store_range(session, remote_id, &req.remote_interface, &range)?;
                    if session.add_dependency(id, remote_id) {
                        debug!(
                            "{} depends on {} (VLAN range {})",
                            url, req.remote_aggregate, range
                        );
                        report.dependencies.push((url.clone(), req.remote_aggregate.clone()));
                    }
                }
                // Rule 5
                (false, true) => {
                    trace!("{} will depend on {} (seen from the remote)", url, req.remote_aggregate)
                }
            }
        }
    }

    // update the global translation restriction of every aggregate
    for id in ids {
        let node = session.aggregate_mut(id)?;
        let performs_translation =
            node.requested_interfaces().all(|(i, _)| node.restriction(i).translates());
        node.restrictions_mut().global_mut().vlan_translation = !performs_translation;
    }

    info!(
        "Found {} dependencies ({} interfaces skipped, {} VLAN conflicts)",
        report.dependencies.len(),
        report.skipped.len(),
        report.conflicts.len()
    );

    Ok(report)
}

fn store_range(
    session: &mut Session,
    id: crate::session::AggregateId,
    interface: &str,
    range: &VlanRange,
) -> Result<(), Error> {
    let restrictions = session.aggregate_mut(id)?.restrictions_mut();
    restrictions.global_mut().vlan_range = range.clone();
    restrictions.set_vlan_range(interface, range.clone());
    Ok(())
}
