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

//! # Scenario
//!
//! A scenario describes a complete stitching request as a JSON document: the preset routes of all
//! aggregates, the requested links of every aggregate (with the stitching information found in the
//! request), and optionally the paths with their hops (used when importing a workflow).
//!
//! ```json
//! {
//!   "routes": { "agg1": { "agg1:if0": "agg2:if0" }, "agg2": { "agg2:if0": "agg1:if0" } },
//!   "aggregates": [
//!     {
//!       "url": "agg1",
//!       "format": "geni-v3",
//!       "links": [
//!         {
//!           "interface": "agg1:if0",
//!           "remote_interface": "agg2:if0",
//!           "remote_aggregate": "agg2",
//!           "vlan_range": "100-200",
//!           "vlan_translation_capable": true
//!         }
//!       ]
//!     }
//!   ],
//!   "paths": { "link0": ["agg1:if0", "agg2:if0"] }
//! }
//! ```
//!
//! Instead of `format`, an aggregate may specify the `namespace` of its request, from which the
//! format is detected.

use crate::aggregate::{AggregateNode, RequestLink, RspecFormat};
use crate::session::Session;
use crate::topology::PresetRoutes;
use crate::workflow::Path;
use crate::Error;

use log::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path as FsPath;

/// Request to a single aggregate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioAggregate {
    /// URL of the aggregate
    pub url: String,
    /// Format of the request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<RspecFormat>,
    /// Namespace of the request, used to detect the format if `format` is not given
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    /// Requested links
    #[serde(default)]
    pub links: Vec<RequestLink>,
}

impl ScenarioAggregate {
    /// Get the request format. If neither the format nor the namespace is given, GENI v3 is
    /// assumed.
    pub fn request_format(&self) -> Result<RspecFormat, Error> {
        match (self.format, self.namespace.as_ref()) {
            (Some(f), _) => Ok(f),
            (None, Some(ns)) => {
                RspecFormat::detect(ns).ok_or_else(|| Error::UnknownFormat(ns.clone()))
            }
            (None, None) => Ok(RspecFormat::GeniV3),
        }
    }
}

/// # Scenario
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    /// Preset routes: aggregate URL -> (local interface URN -> remote interface URN)
    #[serde(default)]
    pub routes: BTreeMap<String, BTreeMap<String, String>>,
    /// Requests to all aggregates, in the order they are added to the session
    #[serde(default)]
    pub aggregates: Vec<ScenarioAggregate>,
    /// Paths of the request: path ID -> hop URNs in path order
    #[serde(default)]
    pub paths: BTreeMap<String, Vec<String>>,
}

impl Scenario {
    /// Parse the scenario from a JSON string
    pub fn parse(s: impl AsRef<str>) -> Result<Self, Error> {
        Ok(serde_json::from_str(s.as_ref())?)
    }

    /// Read and parse the scenario from a JSON file
    pub fn read(path: impl AsRef<FsPath>) -> Result<Self, Error> {
        Self::parse(fs::read_to_string(path)?)
    }

    /// Get the preset routes of the scenario
    pub fn preset_routes(&self) -> PresetRoutes {
        let mut routes = PresetRoutes::new();
        for (aggregate, interfaces) in self.routes.iter() {
            for (local, remote) in interfaces.iter() {
                routes.add_route(aggregate.as_str(), local.as_str(), remote.as_str());
            }
        }
        routes
    }

    /// Get the paths of the scenario, ordered by their ID.
    pub fn paths(&self) -> Vec<Path> {
        self.paths.iter().map(|(id, hops)| Path::new(id.as_str(), hops.iter().cloned())).collect()
    }

    /// # Build the session
    ///
    /// Create a session containing all aggregates, with the restrictions of their requested
    /// interfaces extracted according to their request format. Dependencies are not yet computed.
    ///
    /// A link to an aggregate that is neither requested nor part of the preset routes is a
    /// configuration error.
    pub fn build_session(&self) -> Result<Session, Error> {
        let known: BTreeSet<&str> = self
            .aggregates
            .iter()
            .map(|a| a.url.as_str())
            .chain(self.routes.keys().map(|k| k.as_str()))
            .collect();

        let mut session = Session::with_routes(self.preset_routes());
        for aggregate in self.aggregates.iter() {
            if aggregate.url.is_empty() {
                return Err(Error::InvalidScenario("Aggregate without URL".to_string()));
            }
            let mut node = AggregateNode::new(aggregate.url.as_str(), aggregate.request_format()?);
            for link in aggregate.links.iter() {
                if link.interface.is_empty() || link.remote_interface.is_empty() {
                    return Err(Error::InvalidScenario(format!(
                        "Link of {} without interface",
                        aggregate.url
                    )));
                }
                if !known.contains(link.remote_aggregate.as_str()) {
                    error!(
                        "Interface {} at {} connects to the unknown aggregate {}",
                        link.interface, aggregate.url, link.remote_aggregate
                    );
                    return Err(Error::UnknownAggregate(link.remote_aggregate.clone()));
                }
                node.add_request_link(link);
            }
            session.add_aggregate(node)?;
        }

        info!("Loaded scenario with {} aggregates", session.len());
        Ok(session)
    }
}
