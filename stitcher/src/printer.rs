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

//! # Helper (printer) functions
//! Module containing helper functions to get formatted strings of the session, the plan and the
//! results of the execution.

use crate::dependency::DependencyReport;
use crate::executor::{ExecutionFailure, VlanAssignments};
use crate::restrictions::RestrictionSet;
use crate::session::{AggregateId, Session};

use itertools::Itertools;

fn restriction_set(r: &RestrictionSet) -> String {
    format!(
        "vlans: {}, {}",
        r.vlan_range,
        if r.translates() { "translation" } else { "no translation" }
    )
}

/// Returns the execution plan as one line per aggregate, numbered in the order of execution, along
/// with the aggregates it depends on.
pub fn execution_plan(session: &Session, order: &[AggregateId]) -> Vec<String> {
    order
        .iter()
        .enumerate()
        .map(|(i, id)| {
            let deps = session.depends_on(*id);
            if deps.is_empty() {
                format!("{:>3}. {}", i + 1, session.url(*id))
            } else {
                format!(
                    "{:>3}. {} (after {})",
                    i + 1,
                    session.url(*id),
                    deps.iter().map(|d| session.url(*d)).join(", ")
                )
            }
        })
        .collect()
}

/// Returns the restrictions of all aggregates. For every aggregate, the global restriction is
/// printed first, followed by the restrictions of all its requested interfaces.
pub fn restrictions(session: &Session) -> Vec<String> {
    let mut result = Vec::new();
    for (_, node) in session.aggregates() {
        result.push(format!(
            "{} [{}]: {}",
            node.url(),
            node.format(),
            restriction_set(node.restrictions().global())
        ));
        for (iface, req) in node.requested_interfaces() {
            result.push(format!(
                "    {} -> {} at {}: {}",
                iface,
                req.remote_interface,
                req.remote_aggregate,
                restriction_set(&node.restriction(iface))
            ));
        }
    }
    result
}

/// Returns the dependency report, one line per dependency, skipped interface and VLAN conflict.
pub fn dependency_report(report: &DependencyReport) -> Vec<String> {
    report
        .dependencies
        .iter()
        .map(|(a, b)| format!("{} depends on {}", a, b))
        .chain(report.skipped.iter().map(|s| {
            format!(
                "skipped {} at {} (to {} at {}): {}",
                s.interface, s.aggregate, s.remote_interface, s.remote_aggregate, s.reason
            )
        }))
        .chain(report.conflicts.iter().map(|c| {
            format!(
                "no common VLAN tag: {} at {} and {} at {}",
                c.interface, c.aggregate, c.remote_interface, c.remote_aggregate
            )
        }))
        .collect()
}

/// Returns the VLAN tags assigned by every aggregate.
pub fn vlan_assignments(vlans: &VlanAssignments) -> Vec<String> {
    vlans
        .iter()
        .flat_map(|(url, map)| {
            std::iter::once(format!("{}:", url))
                .chain(map.iter().map(|(iface, tag)| format!("    {}: {}", iface, tag)))
        })
        .collect()
}

/// Returns the partial result of a failed execution.
pub fn execution_failure(failure: &ExecutionFailure) -> Vec<String> {
    let mut result = Vec::new();
    for (url, e) in failure.failed.iter() {
        result.push(format!("failed: {} ({})", url, e));
    }
    result.push(format!("completed: {}", failure.completed.iter().join(", ")));
    if !failure.incomplete.is_empty() {
        result.push(format!("incomplete: {}", failure.incomplete.iter().join(", ")));
    }
    result.push(format!("not attempted: {}", failure.not_attempted.iter().join(", ")));
    result
}

/// Returns the VLAN import sources of all hops, as resolved from an imported workflow.
pub fn import_sources(session: &Session) -> Vec<String> {
    session
        .aggregates()
        .flat_map(|(_, node)| {
            node.hop_imports()
                .map(|(hop, source)| match source {
                    Some(s) => format!(
                        "{} at {} imports from {} at {}",
                        hop,
                        node.url(),
                        s.hop_urn,
                        s.aggregate
                    ),
                    None => format!("{} at {} imports nothing (unresolved)", hop, node.url()),
                })
                .collect::<Vec<_>>()
        })
        .collect()
}
