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

//! # Translating Star

use super::{add_link, request_link, ExampleSession};
use crate::aggregate::{AggregateNode, RspecFormat};
use crate::restrictions::{VlanRange, VlanTag};
use crate::session::Session;
use crate::topology::PresetRoutes;

/// # Translating Star
///
/// A hub aggregate which can translate VLAN tags on all its interfaces, connected to a number of
/// leaf aggregates which cannot translate. Every leaf depends on the hub, but the leaves are
/// independent of each other, and can be reserved in parallel once the hub has completed.
///
/// ```text
///        leaf1
///          |
/// leaf4 - hub - leaf2
///          |
///        leaf3
/// ```
pub struct TranslatingStar {}

impl TranslatingStar {
    /// URL of the hub
    pub const HUB: &'static str = "hub";

    /// URL of the leaf with the given index (starting at 1)
    pub fn leaf(i: usize) -> String {
        format!("leaf{}", i)
    }

    /// Create the star with the given number of leaves. Leaf `i` uses the VLAN tags
    /// `100 * i` to `100 * i + 9`. After 40 leaves, the ranges repeat.
    pub fn with_leaves(n: usize) -> Session {
        let mut routes = PresetRoutes::new();
        let mut hub = AggregateNode::new(Self::HUB, RspecFormat::GeniV3);
        let mut leaves: Vec<AggregateNode> = Vec::with_capacity(n);

        for i in 1..=n {
            let leaf_url = Self::leaf(i);
            let hub_iface = format!("hub:if{}", i);
            let leaf_iface = format!("{}:if0", leaf_url);
            let low = 100 * ((i - 1) % 40 + 1);
            add_link(&mut routes, Self::HUB, &hub_iface, &leaf_url, &leaf_iface);

            hub.add_request_link(&request_link(
                &hub_iface,
                &leaf_iface,
                &leaf_url,
                VlanRange::Any,
                true,
            ));
            let mut leaf = AggregateNode::new(leaf_url.as_str(), RspecFormat::ProtoGeniV2);
            leaf.add_request_link(&request_link(
                &leaf_iface,
                &hub_iface,
                Self::HUB,
                VlanRange::inclusive(low as VlanTag, (low + 9) as VlanTag),
                false,
            ));
            leaves.push(leaf);
        }

        let mut session = Session::with_routes(routes);
        session.add_aggregate(hub).unwrap();
        for leaf in leaves {
            session.add_aggregate(leaf).unwrap();
        }
        session
    }
}

impl ExampleSession for TranslatingStar {
    /// Star with four leaves
    fn session() -> Session {
        Self::with_leaves(4)
    }
}
