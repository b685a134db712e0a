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

//! # Restricted Chain

use super::{add_link, request_link, ExampleSession};
use crate::aggregate::{AggregateNode, RspecFormat};
use crate::restrictions::VlanRange;
use crate::session::Session;
use crate::topology::PresetRoutes;

/// # Restricted Chain
///
/// Three aggregates in a chain, none of which can translate VLAN tags. The interfaces of `agg1`
/// allow VLANs 1 to 10, both interfaces of `agg2` allow 5 to 15, and `agg3` allows 1 to 20.
///
/// ```text
/// agg1 ---- agg2 ---- agg3
/// ```
pub struct RestrictedChain {}

impl RestrictedChain {
    /// URL of the first aggregate
    pub const AGG1: &'static str = "agg1";
    /// URL of the second aggregate
    pub const AGG2: &'static str = "agg2";
    /// URL of the third aggregate
    pub const AGG3: &'static str = "agg3";
    /// Interface of `agg1` towards `agg2`
    pub const AGG1_IF: &'static str = "agg1:if0";
    /// Interface of `agg2` towards `agg1`
    pub const AGG2_IF1: &'static str = "agg2:if1";
    /// Interface of `agg2` towards `agg3`
    pub const AGG2_IF3: &'static str = "agg2:if3";
    /// Interface of `agg3` towards `agg2`
    pub const AGG3_IF: &'static str = "agg3:if0";
}

impl ExampleSession for RestrictedChain {
    fn session() -> Session {
        let mut routes = PresetRoutes::new();
        add_link(&mut routes, Self::AGG1, Self::AGG1_IF, Self::AGG2, Self::AGG2_IF1);
        add_link(&mut routes, Self::AGG2, Self::AGG2_IF3, Self::AGG3, Self::AGG3_IF);

        let mut agg1 = AggregateNode::new(Self::AGG1, RspecFormat::GeniV3);
        agg1.add_request_link(&request_link(
            Self::AGG1_IF,
            Self::AGG2_IF1,
            Self::AGG2,
            VlanRange::inclusive(1, 10),
            false,
        ));

        let mut agg2 = AggregateNode::new(Self::AGG2, RspecFormat::ProtoGeniV2);
        agg2.add_request_link(&request_link(
            Self::AGG2_IF1,
            Self::AGG1_IF,
            Self::AGG1,
            VlanRange::inclusive(5, 15),
            false,
        ));
        agg2.add_request_link(&request_link(
            Self::AGG2_IF3,
            Self::AGG3_IF,
            Self::AGG3,
            VlanRange::inclusive(5, 15),
            false,
        ));

        let mut agg3 = AggregateNode::new(Self::AGG3, RspecFormat::GeniV3);
        agg3.add_request_link(&request_link(
            Self::AGG3_IF,
            Self::AGG2_IF3,
            Self::AGG2,
            VlanRange::inclusive(1, 20),
            false,
        ));

        let mut session = Session::with_routes(routes);
        session.add_aggregate(agg1).unwrap();
        session.add_aggregate(agg2).unwrap();
        session.add_aggregate(agg3).unwrap();
        session
    }
}
