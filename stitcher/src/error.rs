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

//! Module containing all error types

use crate::executor::ExecutionFailure;
use crate::restrictions::VlanRangeError;
use thiserror::Error;

/// Main error type
#[derive(Debug, Error)]
pub enum Error {
    /// The aggregate is not part of the session
    #[error("Aggregate {0} is not part of the session")]
    UnknownAggregate(String),
    /// An aggregate with the same URL was already added
    #[error("Aggregate {0} is already part of the session")]
    DuplicateAggregate(String),
    /// The hop is not part of any known path
    #[error("Hop {0} is not part of any known path")]
    UnknownHop(String),
    /// The request uses a namespace that is not supported
    #[error("Unsupported request format: {0}")]
    UnknownFormat(String),
    /// Invalid VLAN range
    #[error("Invalid VLAN range: {0}")]
    InvalidVlanRange(#[from] VlanRangeError),
    /// Malformed or incomplete scenario (topology or request)
    #[error("Invalid scenario: {0}")]
    InvalidScenario(String),
    /// Cannot parse a JSON document
    #[error("Cannot parse JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// Cannot read a file
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
    /// The dependencies between aggregates form a loop. The vector contains the URLs of all
    /// aggregates along the loop, starting and ending with the same aggregate.
    #[error("Dependency loop found: {}", .0.join(" -> "))]
    DependencyLoop(Vec<String>),
    /// A reservation failed. Reservations which have completed are not rolled back.
    #[error("Execution failed: {0}")]
    ExecutionFailed(ExecutionFailure),
    /// On an operation abort
    #[error("The operation was aborted: {0}")]
    Abort(ExecutionFailure),
}
