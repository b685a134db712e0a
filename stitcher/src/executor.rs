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

//! # Executor
//!
//! Submits the reservation of every aggregate, such that no aggregate is submitted before all of
//! its dependencies have completed. Before an aggregate is submitted, the VLAN tags assigned by
//! all its dependencies are merged and pushed into its request (using
//! [`Reserver::insert_vlan_data`]). The actual reservation is performed by
//! [`Reserver::do_request`].
//!
//! There are two modes:
//!
//! - [`execute_in_sequence`]: Submit one aggregate after the other, following the sequence.
//! - [`execute_in_parallel`]: Keep a pool of worker threads busy. Every aggregate whose
//!   dependencies have all completed is dispatched (preferring aggregates earlier in the
//!   sequence), and as soon as any worker finishes, newly unblocked aggregates are dispatched.
//!
//! In both modes, aggregates that have already completed are skipped. Aggregates which were
//! started, but never completed (e.g., by an earlier, interrupted run) are not submitted again, and
//! all aggregates depending on them cannot be executed.
//!
//! If a reservation fails, no new reservation is submitted. Reservations in flight are awaited, and
//! completed reservations are not rolled back. The returned [`ExecutionFailure`] tells which
//! aggregates have completed, such that the caller can clean up. The [`Stopper`] can be used to
//! prevent any new submission from being started.

use crate::aggregate::{AggregateNode, VlanMap};
use crate::session::{AggregateId, Session};
use crate::{Error, Stopper};

use log::*;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc;
use std::thread;
use thiserror::Error;

/// Assigned VLAN tags of all aggregates: aggregate URL -> (interface URN -> VLAN tag)
pub type VlanAssignments = BTreeMap<String, VlanMap>;

/// Error of a single reservation
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReservationError {
    /// The aggregate refused the reservation
    #[error("Aggregate {0} refused the reservation: {1}")]
    Refused(String, String),
    /// The VLAN tags could not be inserted into the request
    #[error("Cannot insert the VLAN tags into the request for {0}: {1}")]
    VlanInsertion(String, String),
    /// The reservation succeeded, but no manifest was stored
    #[error("Aggregate {0} did not return a manifest")]
    NoManifest(String),
    /// A dependency claims to be completed, but has no manifest
    #[error("Dependency {1} of {0} is completed, but has no manifest")]
    MissingDependencyManifest(String, String),
    /// A dependency has not completed before the dependent is submitted
    #[error("Dependency {1} of {0} has not completed")]
    DependencyNotCompleted(String, String),
    /// The worker thread panicked while reserving
    #[error("Worker thread panicked while reserving {0}")]
    WorkerPanic(String),
}

/// # Reservation collaborator
///
/// Performs the actual reservation at the aggregate. Implementations may block for an arbitrary
/// amount of time (e.g., while polling the status of the sliver).
pub trait Reserver {
    /// Push the assigned VLAN tags of all dependencies into the request of the node. This function
    /// is called exactly once before `do_request`, and only if the node has dependencies.
    fn insert_vlan_data(
        &self,
        node: &mut AggregateNode,
        vlans: &VlanMap,
    ) -> Result<(), ReservationError>;

    /// Submit the reservation. On success, the manifest must be set with
    /// [`AggregateNode::set_manifest`], and the assigned VLAN tags recorded using
    /// [`AggregateNode::assign_vlan`].
    fn do_request(&self, node: &mut AggregateNode) -> Result<(), ReservationError>;
}

/// Partial result of a failed or aborted execution. Every aggregate of the order appears in
/// exactly one of the lists.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExecutionFailure {
    /// All aggregates that failed, with the reason, in the order the failures were observed. Empty
    /// if the execution was aborted before any reservation failed. In parallel mode, reservations
    /// in flight may fail after the first failure.
    pub failed: Vec<(String, ReservationError)>,
    /// All aggregates which have completed their reservation.
    pub completed: Vec<String>,
    /// Aggregates which were started by an earlier run, but never completed. They may still hold
    /// a partial reservation.
    pub incomplete: Vec<String>,
    /// All aggregates for which no reservation was attempted.
    pub not_attempted: Vec<String>,
}

impl ExecutionFailure {
    /// The failure that was observed first.
    pub fn first_failure(&self) -> Option<&(String, ReservationError)> {
        self.failed.first()
    }
}

impl fmt::Display for ExecutionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.failed.is_empty() {
            write!(f, "no reservation failed")?;
        } else {
            let failed: Vec<String> =
                self.failed.iter().map(|(url, e)| format!("{} failed ({})", url, e)).collect();
            write!(f, "{}", failed.join(", "))?;
        }
        write!(
            f,
            "; completed: [{}], incomplete: [{}], not attempted: [{}]",
            self.completed.join(", "),
            self.incomplete.join(", "),
            self.not_attempted.join(", ")
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Pending,
    Running,
    Done,
    Stale,
    Failed,
}

/// Merge the assigned VLAN tags of all dependencies. Every dependency must have completed, and must
/// have a manifest.
fn merge_dependency_vlans(
    session: &Session,
    id: AggregateId,
    deps: &[AggregateId],
) -> Result<VlanMap, ReservationError> {
    let mut merged = VlanMap::new();
    for dep in deps {
        let dep_node = match session.get(*dep) {
            Some(n) if n.is_completed() => n,
            _ => {
                return Err(ReservationError::DependencyNotCompleted(
                    session.url(id),
                    session.url(*dep),
                ))
            }
        };
        if dep_node.manifest().is_none() {
            error!("{} is marked as completed, but has no manifest!", dep_node.url());
            return Err(ReservationError::MissingDependencyManifest(
                session.url(id),
                dep_node.url().to_string(),
            ));
        }
        merged.extend(dep_node.assigned_vlans().iter().map(|(k, v)| (k.clone(), *v)));
    }
    Ok(merged)
}

/// Insert the VLAN tags (if necessary), and submit the reservation. On failure, the assigned VLAN
/// tags of the node are restored.
fn submit<R: Reserver + ?Sized>(
    reserver: &R,
    node: &mut AggregateNode,
    merged: &VlanMap,
    has_dependencies: bool,
) -> Result<(), ReservationError> {
    if has_dependencies {
        reserver.insert_vlan_data(node, merged)?;
    }
    node.mark_started();
    let previous = node.assigned_vlans().clone();
    let result = reserver.do_request(node).and_then(|_| match node.manifest() {
        Some(_) => Ok(()),
        None => Err(ReservationError::NoManifest(node.url().to_string())),
    });
    match result {
        Ok(()) => {
            node.mark_completed();
            Ok(())
        }
        Err(e) => {
            node.replace_assigned_vlans(previous);
            Err(e)
        }
    }
}

fn collect_assignments(session: &Session, order: &[AggregateId]) -> VlanAssignments {
    order
        .iter()
        .filter_map(|id| session.get(*id))
        .filter(|n| n.is_completed())
        .map(|n| (n.url().to_string(), n.assigned_vlans().clone()))
        .collect()
}

fn build_failure(
    session: &Session,
    order: &[AggregateId],
    state: &HashMap<AggregateId, State>,
    failed: Vec<(String, ReservationError)>,
) -> ExecutionFailure {
    let with_state = |s: State| {
        order
            .iter()
            .filter(|id| state.get(id) == Some(&s))
            .map(|id| session.url(*id))
            .collect::<Vec<_>>()
    };
    ExecutionFailure {
        failed,
        completed: with_state(State::Done),
        incomplete: with_state(State::Stale),
        not_attempted: with_state(State::Pending),
    }
}

/// A dependency is settled once it has completed. Dependencies outside of the order are settled if
/// their node in the session is completed.
fn is_settled(session: &Session, state: &HashMap<AggregateId, State>, dep: AggregateId) -> bool {
    match state.get(&dep) {
        Some(s) => *s == State::Done,
        None => session.get(dep).map_or(false, |n| n.is_completed()),
    }
}

/// Initial state of every aggregate in the order.
fn initial_state(
    session: &Session,
    order: &[AggregateId],
) -> Result<HashMap<AggregateId, State>, Error> {
    let mut state = HashMap::with_capacity(order.len());
    for id in order {
        let node = session.aggregate(*id)?;
        let s = if node.is_completed() {
            debug!("{} has already completed, skipping", node.url());
            State::Done
        } else if node.is_started() {
            warn!("{} was started, but never completed! Not submitting it again", node.url());
            State::Stale
        } else {
            State::Pending
        };
        state.insert(*id, s);
    }
    Ok(state)
}

/// # Execute the reservations in sequence
///
/// Submit every aggregate in the order given, one after the other. The order must contain the
/// dependencies of every aggregate before the aggregate itself, see
/// [`build_sequence`](crate::sequencer::build_sequence). On success, the VLAN tags assigned by all
/// completed aggregates are returned.
pub fn execute_in_sequence<R: Reserver + ?Sized>(
    session: &mut Session,
    order: &[AggregateId],
    reserver: &R,
    abort: Stopper,
) -> Result<VlanAssignments, Error> {
    let mut state = initial_state(session, order)?;

    for id in order.iter().copied() {
        if state.get(&id) != Some(&State::Pending) {
            continue;
        }
        if abort.is_stop() {
            warn!("Execution aborted before submitting {}", session.url(id));
            return Err(Error::Abort(build_failure(session, order, &state, Vec::new())));
        }

        let deps = session.depends_on(id);
        let merged = match merge_dependency_vlans(session, id, &deps) {
            Ok(m) => m,
            Err(e) => {
                error!("Cannot submit {}: {}", session.url(id), e);
                state.insert(id, State::Failed);
                let failed = vec![(session.url(id), e)];
                return Err(Error::ExecutionFailed(build_failure(session, order, &state, failed)));
            }
        };

        info!("Submitting the reservation at {}", session.url(id));
        state.insert(id, State::Running);
        let result = submit(reserver, session.aggregate_mut(id)?, &merged, !deps.is_empty());
        match result {
            Ok(()) => {
                info!("Reservation at {} completed", session.url(id));
                state.insert(id, State::Done);
            }
            Err(e) => {
                error!("Reservation at {} failed: {}", session.url(id), e);
                state.insert(id, State::Failed);
                let failed = vec![(session.url(id), e)];
                return Err(Error::ExecutionFailed(build_failure(session, order, &state, failed)));
            }
        }
    }

    Ok(collect_assignments(session, order))
}

/// # Execute the reservations in parallel
///
/// Execute the reservations on a pool of `n_threads` worker threads (by default, one per CPU).
/// Aggregates are dispatched as soon as all their dependencies have completed, and the VLAN tags
/// of the dependencies are merged on the dispatching thread before the aggregate is handed to a
/// worker. While a reservation is in flight, the worker exclusively owns the aggregate node.
pub fn execute_in_parallel<R: Reserver + Sync + ?Sized>(
    session: &mut Session,
    order: &[AggregateId],
    reserver: &R,
    abort: Stopper,
    n_threads: Option<usize>,
) -> Result<VlanAssignments, Error> {
    let n_threads = n_threads.unwrap_or_else(num_cpus::get).max(1);
    let mut state = initial_state(session, order)?;
    let mut failed: Vec<(String, ReservationError)> = Vec::new();
    let mut aborted = false;

    info!("Executing {} reservations using {} threads", order.len(), n_threads);

    let (tx, rx) = mpsc::channel::<(AggregateId, AggregateNode, Result<(), ReservationError>)>();

    thread::scope(|scope| {
        let mut running: usize = 0;
        loop {
            // dispatch all aggregates that are ready
            if failed.is_empty() && !aborted {
                for id in order.iter().copied() {
                    if running >= n_threads {
                        break;
                    }
                    if state.get(&id) != Some(&State::Pending) {
                        continue;
                    }
                    let deps = session.depends_on(id);
                    if !deps.iter().all(|d| is_settled(session, &state, *d)) {
                        continue;
                    }
                    if abort.is_stop() {
                        warn!("Execution aborted before submitting {}", session.url(id));
                        aborted = true;
                        break;
                    }
                    let merged = match merge_dependency_vlans(session, id, &deps) {
                        Ok(m) => m,
                        Err(e) => {
                            error!("Cannot submit {}: {}", session.url(id), e);
                            state.insert(id, State::Failed);
                            failed.push((session.url(id), e));
                            break;
                        }
                    };
                    let mut node = match session.take_aggregate(id) {
                        Some(n) => n,
                        None => continue,
                    };
                    info!("Submitting the reservation at {}", node.url());
                    state.insert(id, State::Running);
                    running += 1;
                    let tx = tx.clone();
                    let has_dependencies = !deps.is_empty();
                    scope.spawn(move || {
                        let result = panic::catch_unwind(AssertUnwindSafe(|| {
                            submit(reserver, &mut node, &merged, has_dependencies)
                        }))
                        .unwrap_or_else(|_| {
                            Err(ReservationError::WorkerPanic(node.url().to_string()))
                        });
                        // the receiver lives until all workers are done
                        let _ = tx.send((id, node, result));
                    });
                }
            }

            if running == 0 {
                break;
            }

            // wait for the next worker to finish
            let (id, node, result) = match rx.recv() {
                Ok(msg) => msg,
                Err(_) => break,
            };
            running -= 1;
            session.return_aggregate(id, node);
            match result {
                Ok(()) => {
                    info!("Reservation at {} completed", session.url(id));
                    state.insert(id, State::Done);
                }
                Err(e) => {
                    error!("Reservation at {} failed: {}", session.url(id), e);
                    state.insert(id, State::Failed);
                    failed.push((session.url(id), e));
                }
            }
        }
    });

    if !failed.is_empty() {
        return Err(Error::ExecutionFailed(build_failure(session, order, &state, failed)));
    }
    if aborted {
        return Err(Error::Abort(build_failure(session, order, &state, Vec::new())));
    }

    // aggregates blocked by a stale dependency
    if let Some(id) = order.iter().copied().find(|id| state.get(id) == Some(&State::Pending)) {
        let blocking = session
            .depends_on(id)
            .into_iter()
            .find(|d| !is_settled(session, &state, *d))
            .map(|d| session.url(d))
            .unwrap_or_default();
        error!("Cannot submit {}: {} has not completed", session.url(id), blocking);
        let e = ReservationError::DependencyNotCompleted(session.url(id), blocking);
        let failed = vec![(session.url(id), e)];
        return Err(Error::ExecutionFailed(build_failure(session, order, &state, failed)));
    }

    Ok(collect_assignments(session, order))
}
