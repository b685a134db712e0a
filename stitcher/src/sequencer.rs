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

//! # Sequencer
//!
//! Linearizes the dependency graph of a session, such that every aggregate appears after all
//! aggregates it depends on. The sequence is built by a memoized depth-first search, visiting the
//! aggregates (and their dependencies) in the order of the session. The aggregates on the active
//! search path are tracked explicitly, and reaching one of them again is reported as a
//! [`Error::DependencyLoop`].

use crate::session::{AggregateId, Session};
use crate::Error;

use log::*;
use std::collections::HashSet;

/// # Build the execution sequence
///
/// Returns all aggregates of the session, ordered such that the dependencies of every aggregate
/// appear strictly before it. Every aggregate appears exactly once. If the dependencies form a
/// loop, [`Error::DependencyLoop`] is returned.
///
/// ```
/// use stitcher::aggregate::{AggregateNode, RspecFormat};
/// use stitcher::sequencer::build_sequence;
/// use stitcher::session::Session;
///
/// # fn main() -> Result<(), stitcher::Error> {
/// let mut session = Session::new();
/// let a = session.add_aggregate(AggregateNode::new("a", RspecFormat::GeniV3))?;
/// let b = session.add_aggregate(AggregateNode::new("b", RspecFormat::GeniV3))?;
/// session.add_dependency(a, b);
/// assert_eq!(build_sequence(&session)?, vec![b, a]);
///
/// session.add_dependency(b, a);
/// assert!(build_sequence(&session).is_err());
/// # Ok(())
/// # }
/// ```
pub fn build_sequence(session: &Session) -> Result<Vec<AggregateId>, Error> {
    let mut seq: Vec<AggregateId> = Vec::with_capacity(session.len());
    let mut placed: HashSet<AggregateId> = HashSet::new();
    let mut visiting: Vec<AggregateId> = Vec::new();

    for id in session.aggregate_ids() {
        if !placed.contains(&id) {
            visit(session, id, &mut seq, &mut placed, &mut visiting)?;
        }
    }

    debug!(
        "Execution sequence: {}",
        seq.iter().map(|id| session.url(*id)).collect::<Vec<_>>().join(", ")
    );
    Ok(seq)
}

fn visit(
    session: &Session,
    id: AggregateId,
    seq: &mut Vec<AggregateId>,
    placed: &mut HashSet<AggregateId>,
    visiting: &mut Vec<AggregateId>,
) -> Result<(), Error> {
    if let Some(pos) = visiting.iter().position(|x| *x == id) {
        let mut cycle: Vec<String> = visiting[pos..].iter().map(|x| session.url(*x)).collect();
        cycle.push(session.url(id));
        error!("Dependency loop: {}", cycle.join(" -> "));
        return Err(Error::DependencyLoop(cycle));
    }

    visiting.push(id);
    for dep in session.depends_on(id) {
        if !placed.contains(&dep) {
            visit(session, dep, seq, placed, visiting)?;
        }
    }
    visiting.pop();

    placed.insert(id);
    seq.push(id);
    Ok(())
}

/// Build the execution sequence, and return the URLs of the aggregates instead of their IDs.
/// This is the plan that can be shown without executing anything.
pub fn execution_order(session: &Session) -> Result<Vec<String>, Error> {
    Ok(build_sequence(session)?.into_iter().map(|id| session.url(id)).collect())
}

/// Check that the sequence contains every aggregate of the session exactly once, and that every
/// aggregate appears after all of its dependencies.
pub fn is_valid_sequence(session: &Session, seq: &[AggregateId]) -> bool {
    if seq.len() != session.len() {
        return false;
    }
    let mut seen: HashSet<AggregateId> = HashSet::new();
    for id in seq {
        if !session.depends_on(*id).iter().all(|dep| seen.contains(dep)) {
            return false;
        }
        if !session.graph().contains_node(*id) || !seen.insert(*id) {
            return false;
        }
    }
    true
}
