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

//! # Import Chain

use super::ExampleSession;
use crate::session::Session;
use crate::workflow::{HopDependency, Path, PathWorkflow, WorkflowData};

/// # Import Chain
///
/// A single path with three hops, as returned by a stitching computation service. Hops `h3` and
/// `h1` are both on aggregate `x`, and both import VLAN tags. Hop `h1` depends on hop `h0`
/// on aggregate `y`, while `h3` only depends on `h1` on the same aggregate.
///
/// ```text
/// path order:   h3 (x) -- h1 (x) -- h0 (y)
/// dependencies: h3 -> h1 -> h0
/// ```
///
/// Since `h3` comes before `h1` in the path, it can only import from the source of `h1` after
/// the source of `h1` has been resolved.
pub struct ImportChain {}

impl ImportChain {
    /// URL of the aggregate of `h3` and `h1`
    pub const X: &'static str = "x";
    /// URL of the aggregate of `h0`
    pub const Y: &'static str = "y";
    /// ID of the path
    pub const PATH: &'static str = "link0";
    /// URN of hop `h3`
    pub const H3: &'static str = "x:h3";
    /// URN of hop `h1`
    pub const H1: &'static str = "x:h1";
    /// URN of hop `h0`
    pub const H0: &'static str = "y:h0";

    /// Local representation of the path
    pub fn paths() -> Vec<Path> {
        vec![Path::new(Self::PATH, vec![Self::H3, Self::H1, Self::H0])]
    }

    /// Workflow as computed by the SCS
    pub fn workflow() -> WorkflowData {
        let h0 = HopDependency {
            hop_urn: Self::H0.to_string(),
            aggregate_url: Self::Y.to_string(),
            import_vlans: false,
            dependencies: vec![],
        };
        let h1 = HopDependency {
            hop_urn: Self::H1.to_string(),
            aggregate_url: Self::X.to_string(),
            import_vlans: true,
            dependencies: vec![h0],
        };
        let h3 = HopDependency {
            hop_urn: Self::H3.to_string(),
            aggregate_url: Self::X.to_string(),
            import_vlans: true,
            dependencies: vec![h1],
        };
        let mut workflow = WorkflowData::new();
        workflow.insert(Self::PATH.to_string(), PathWorkflow { dependencies: vec![h3] });
        workflow
    }
}

impl ExampleSession for ImportChain {
    /// The aggregates are created while importing the workflow.
    fn session() -> Session {
        Session::new()
    }
}
