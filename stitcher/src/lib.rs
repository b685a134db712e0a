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

#![deny(missing_docs)]

//! # Stitcher: Dependency-Ordered VLAN Stitching for Federated Testbeds
//! This is a library for reserving a cross-aggregate layer 2 circuit in a federated testbed. The
//! request spans multiple aggregates, which have to agree on the VLAN tags used on every link
//! between them. Some aggregates can translate VLAN tags, while others have to reuse the tag chosen
//! by their neighbor. This introduces dependencies between the reservations at the aggregates.
//!
//! ## Structure
//!
//! This library is structured in the following way:
//!
//! - **[`Restrictions`](restrictions)**: VLAN ranges and translation capability of every
//!   interface, and of every aggregate as a whole.
//!
//! - **[`Topology`](topology)**: Preset routes advertised by the aggregates, and the adjacency
//!   between aggregates derived from them.
//!
//! - **[`Aggregate`](aggregate)**: Request to a single aggregate, along with its request format
//!   and the state of its reservation.
//!
//! - **[`Session`](session)**: Owns all aggregates, the topology, and the dependency graph.
//!
//! - **[`Dependency`](dependency)**: Derives the dependencies between the aggregates from their
//!   restrictions.
//!
//! - **[`Sequencer`](sequencer)**: Linearizes the dependency graph, rejecting dependency loops.
//!
//! - **[`Executor`](executor)**: Submits the reservations, either in sequence or on a pool of
//!   worker threads, and propagates the assigned VLAN tags from dependencies to dependents.
//!
//! - **[`Workflow`](workflow)**: Imports the dependencies precomputed by a stitching computation
//!   service, instead of deriving them.
//!
//! - **[`Scenario`](scenario)**: Loads the request and the topology from a JSON document.
//!
//! - **[`ExampleSessions`](example_sessions)**: Collection of prepared sessions.
//!
//! ## Usage
//!
//! Build the [session](session::Session) with all aggregates and the preset routes (e.g., from a
//! [scenario](scenario::Scenario)), compute the dependencies, build the sequence, and execute the
//! reservations using your implementation of [`Reserver`](executor::Reserver).
//!
//! ```
//! use stitcher::aggregate::AggregateNode;
//! use stitcher::dependency::calculate_dependencies;
//! use stitcher::executor::{execute_in_sequence, Reserver, ReservationError};
//! use stitcher::sequencer::build_sequence;
//! use stitcher::{Error, Stopper};
//! # use stitcher::example_sessions::*;
//!
//! struct Reserve;
//!
//! impl Reserver for Reserve {
//!     fn insert_vlan_data(
//!         &self,
//!         _node: &mut AggregateNode,
//!         _vlans: &stitcher::aggregate::VlanMap,
//!     ) -> Result<(), ReservationError> {
//!         Ok(())
//!     }
//!
//!     fn do_request(&self, node: &mut AggregateNode) -> Result<(), ReservationError> {
//!         node.set_manifest("<rspec/>");
//!         Ok(())
//!     }
//! }
//!
//! fn main() -> Result<(), Error> {
//!     // prepare the session
//!     // let mut session = ...
//! # let mut session = TranslationPair::session();
//!
//!     // compute the dependencies and the sequence
//!     let report = calculate_dependencies(&mut session)?;
//!     assert!(report.is_clean());
//!     let sequence = build_sequence(&session)?;
//!
//!     // reserve
//!     let vlans = execute_in_sequence(&mut session, &sequence, &Reserve, Stopper::new())?;
//!
//!     // Do something with the result
//!     println!("{:#?}", vlans);
//!
//!     Ok(())
//! }
//! ```

// test modules
pub mod example_sessions;
mod test;

pub mod aggregate;
pub mod dependency;
mod error;
pub mod executor;
pub mod printer;
pub mod restrictions;
pub mod scenario;
pub mod sequencer;
pub mod session;
pub mod topology;
pub mod workflow;

pub use error::Error;

use std::sync::{Arc, RwLock};

/// Stopper, to check when to stop, or to send the stop command
#[derive(Clone, Debug)]
pub struct Stopper {
    b: Arc<RwLock<bool>>,
}

impl Default for Stopper {
    fn default() -> Self {
        Self::new()
    }
}

impl Stopper {
    /// Create a new stopper
    pub fn new() -> Self {
        Self { b: Arc::new(RwLock::new(false)) }
    }

    /// Send the stop command. This function will block until the write lock can be acquired.
    pub fn send_stop(&self) {
        *self.b.write().unwrap_or_else(|e| e.into_inner()) = true;
    }

    /// Checks if the stop flag is set. This function will block until the read lock can be
    /// acquired.
    pub fn is_stop(&self) -> bool {
        *self.b.read().unwrap_or_else(|e| e.into_inner())
    }
}
