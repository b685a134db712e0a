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

//! # Aggregate Node
//!
//! An [`AggregateNode`] represents the request to a single aggregate. It stores the requested
//! interfaces (and where they are connected to), the restrictions of the aggregate, and the state
//! of the reservation. The dependencies between aggregates are not stored in the node itself, but
//! in the [`Session`](crate::session::Session), which owns all nodes.
//!
//! Requests come in different formats. The format is detected once from the namespace of the
//! request (see [`RspecFormat::detect`]), and the restrictions of every requested link are then
//! extracted by the [`RestrictionExtractor`] of that format.

use crate::restrictions::{RestrictionSet, RestrictionStore, VlanRange, VlanTag};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Mapping from interface URN to the assigned VLAN tag.
pub type VlanMap = BTreeMap<String, VlanTag>;

/// # Request Format
///
/// Supported request dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RspecFormat {
    /// GENI v3 request with the stitching extension
    #[serde(rename = "geni-v3")]
    GeniV3,
    /// ProtoGENI v2 request
    #[serde(rename = "protogeni-v2")]
    ProtoGeniV2,
}

const GENI_V3_NAMESPACE: &str = "http://www.geni.net/resources/rspec/3";
const PROTOGENI_V2_NAMESPACE: &str = "http://www.protogeni.net/resources/rspec/2";

impl RspecFormat {
    /// Detect the request format from the namespace of the document. Trailing slashes are ignored.
    ///
    /// ```
    /// use stitcher::aggregate::RspecFormat;
    /// assert_eq!(
    ///     RspecFormat::detect("http://www.geni.net/resources/rspec/3/"),
    ///     Some(RspecFormat::GeniV3)
    /// );
    /// assert_eq!(RspecFormat::detect("http://example.com/unknown"), None);
    /// ```
    pub fn detect(namespace: impl AsRef<str>) -> Option<Self> {
        match namespace.as_ref().trim().trim_end_matches('/') {
            GENI_V3_NAMESPACE => Some(Self::GeniV3),
            PROTOGENI_V2_NAMESPACE => Some(Self::ProtoGeniV2),
            _ => None,
        }
    }

    /// Namespace of the format
    pub fn namespace(&self) -> &'static str {
        match self {
            Self::GeniV3 => GENI_V3_NAMESPACE,
            Self::ProtoGeniV2 => PROTOGENI_V2_NAMESPACE,
        }
    }

    /// Get the restriction extractor of the format
    pub fn extractor(&self) -> &'static dyn RestrictionExtractor {
        match self {
            Self::GeniV3 => &GeniV3Extractor,
            Self::ProtoGeniV2 => &ProtoGeniV2Extractor,
        }
    }
}

impl fmt::Display for RspecFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GeniV3 => write!(f, "GENI v3"),
            Self::ProtoGeniV2 => write!(f, "ProtoGENI v2"),
        }
    }
}

/// # Requested Link
///
/// One link of the request, as produced by the request parser: the local interface, where it
/// connects to, and the stitching information found on the local interface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestLink {
    /// URN of the local interface
    pub interface: String,
    /// URN of the remote interface
    pub remote_interface: String,
    /// URL of the remote aggregate
    pub remote_aggregate: String,
    /// Available VLAN range of the local interface
    #[serde(default)]
    pub vlan_range: VlanRange,
    /// Translation capability, as advertised. `Some(true)` means that the interface is able to
    /// translate VLAN tags.
    #[serde(default)]
    pub vlan_translation_capable: Option<bool>,
}

/// Extract the restrictions of a single requested link.
pub trait RestrictionExtractor {
    /// Compute the restriction set of the local interface of the link.
    fn extract(&self, link: &RequestLink) -> RestrictionSet;
}

/// GENI v3 honors the advertised translation capability. If nothing is advertised, the interface
/// is treated as restricted.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeniV3Extractor;

impl RestrictionExtractor for GeniV3Extractor {
    fn extract(&self, link: &RequestLink) -> RestrictionSet {
        RestrictionSet::new(
            link.vlan_range.clone(),
            !link.vlan_translation_capable.unwrap_or(false),
        )
    }
}

/// ProtoGENI v2 has no notion of VLAN translation. Every interface is restricted.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProtoGeniV2Extractor;

impl RestrictionExtractor for ProtoGeniV2Extractor {
    fn extract(&self, link: &RequestLink) -> RestrictionSet {
        RestrictionSet::restricted(link.vlan_range.clone())
    }
}

/// Where a requested interface is connected to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestedInterface {
    /// URN of the remote interface
    pub remote_interface: String,
    /// URL of the remote aggregate
    pub remote_aggregate: String,
}

/// Reference to a hop on a specific aggregate
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HopRef {
    /// URL of the aggregate of the hop
    pub aggregate: String,
    /// URN of the hop
    pub hop_urn: String,
}

/// # Aggregate Node
///
/// Request to a single aggregate, along with its restrictions and the state of the reservation.
/// The flags `started` and `completed` only ever change from `false` to `true`, and `completed`
/// implies `started`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateNode {
    url: String,
    format: RspecFormat,
    requested_interfaces: BTreeMap<String, RequestedInterface>,
    restrictions: RestrictionStore,
    started: bool,
    completed: bool,
    manifest: Option<String>,
    assigned_vlans: VlanMap,
    hop_imports: BTreeMap<String, Option<HopRef>>,
}

impl AggregateNode {
    /// Create a new node for the given aggregate
    pub fn new(url: impl Into<String>, format: RspecFormat) -> Self {
        Self {
            url: url.into(),
            format,
            requested_interfaces: BTreeMap::new(),
            restrictions: RestrictionStore::new(),
            started: false,
            completed: false,
            manifest: None,
            assigned_vlans: VlanMap::new(),
            hop_imports: BTreeMap::new(),
        }
    }

    /// URL of the aggregate
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Format of the request
    pub fn format(&self) -> RspecFormat {
        self.format
    }

    /// Add a requested interface, without changing any restrictions.
    pub fn add_requested_interface(
        &mut self,
        interface: impl Into<String>,
        remote_interface: impl Into<String>,
        remote_aggregate: impl Into<String>,
    ) {
        self.requested_interfaces.insert(
            interface.into(),
            RequestedInterface {
                remote_interface: remote_interface.into(),
                remote_aggregate: remote_aggregate.into(),
            },
        );
    }

    /// Add a requested link. The restrictions of the local interface are extracted using the
    /// extractor of the request format.
    pub fn add_request_link(&mut self, link: &RequestLink) {
        let restriction = self.format.extractor().extract(link);
        self.add_requested_interface(
            link.interface.clone(),
            link.remote_interface.clone(),
            link.remote_aggregate.clone(),
        );
        self.restrictions.set_restriction(link.interface.clone(), restriction);
    }

    /// Iterate over all requested interfaces, ordered by the interface URN.
    pub fn requested_interfaces(&self) -> impl Iterator<Item = (&str, &RequestedInterface)> {
        self.requested_interfaces.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Get a single requested interface
    pub fn requested_interface(&self, interface: impl AsRef<str>) -> Option<&RequestedInterface> {
        self.requested_interfaces.get(interface.as_ref())
    }

    /// Returns `true` if the interface is requested on this aggregate
    pub fn has_requested_interface(&self, interface: impl AsRef<str>) -> bool {
        self.requested_interfaces.contains_key(interface.as_ref())
    }

    /// Get the restriction store
    pub fn restrictions(&self) -> &RestrictionStore {
        &self.restrictions
    }

    /// Get the mutable restriction store
    pub fn restrictions_mut(&mut self) -> &mut RestrictionStore {
        &mut self.restrictions
    }

    /// Get the restriction of a single interface (default if not yet known).
    pub fn restriction(&self, interface: impl AsRef<str>) -> RestrictionSet {
        self.restrictions.restriction(interface)
    }

    /// Returns `true` if the aggregate as a whole is able to translate VLAN tags.
    pub fn performs_translation(&self) -> bool {
        self.restrictions.global().translates()
    }

    /// Returns `true` if the reservation was submitted
    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Returns `true` if the reservation has completed
    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub(crate) fn mark_started(&mut self) {
        self.started = true;
    }

    pub(crate) fn mark_completed(&mut self) {
        self.started = true;
        self.completed = true;
    }

    /// Get the manifest of the reservation (opaque)
    pub fn manifest(&self) -> Option<&str> {
        self.manifest.as_deref()
    }

    /// Store the manifest of the reservation. Used by the reservation collaborator.
    pub fn set_manifest(&mut self, manifest: impl Into<String>) {
        self.manifest = Some(manifest.into());
    }

    /// Get the VLAN tags assigned by the aggregate, keyed by the remote interface URN.
    pub fn assigned_vlans(&self) -> &VlanMap {
        &self.assigned_vlans
    }

    /// Record an assigned VLAN tag. Used by the reservation collaborator.
    pub fn assign_vlan(&mut self, remote_interface: impl Into<String>, tag: VlanTag) {
        self.assigned_vlans.insert(remote_interface.into(), tag);
    }

    pub(crate) fn replace_assigned_vlans(&mut self, vlans: VlanMap) -> VlanMap {
        std::mem::replace(&mut self.assigned_vlans, vlans)
    }

    /// VLAN import sources of the hops on this aggregate (only set for nodes created from an
    /// external workflow). `None` means that the source could not be resolved.
    pub fn hop_imports(&self) -> impl Iterator<Item = (&str, Option<&HopRef>)> {
        self.hop_imports.iter().map(|(k, v)| (k.as_str(), v.as_ref()))
    }

    pub(crate) fn set_hop_import(&mut self, hop_urn: impl Into<String>, source: Option<HopRef>) {
        self.hop_imports.insert(hop_urn.into(), source);
    }

    /// Compute the VLAN tags this aggregate needs to import, based on the merged VLAN map of all
    /// its dependencies. The result maps the local hop URN to the tag assigned to its import
    /// source. Hops without resolved source, or whose source has no tag yet, import nothing.
    pub fn imported_vlans(&self, merged: &VlanMap) -> VlanMap {
        self.hop_imports
            .iter()
            .filter_map(|(hop, source)| {
                source
                    .as_ref()
                    .and_then(|s| merged.get(&s.hop_urn))
                    .map(|tag| (hop.clone(), *tag))
            })
            .collect()
    }
}
