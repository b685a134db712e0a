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

//! # Translation Pair

use super::{add_link, request_link, ExampleSession};
use crate::aggregate::{AggregateNode, RspecFormat};
use crate::restrictions::VlanRange;
use crate::session::Session;
use crate::topology::PresetRoutes;

/// # Translation Pair
///
/// Two aggregates sharing a single link. `agg1` can translate VLAN tags, while `agg2` cannot.
/// Hence, `agg2` depends on `agg1`.
///
/// ```text
/// agg1 (translation) ---- agg2 (no translation)
/// ```
pub struct TranslationPair {}

impl TranslationPair {
    /// URL of the translating aggregate
    pub const AGG1: &'static str = "urn:publicid:IDN+agg1+authority+am";
    /// URL of the restricted aggregate
    pub const AGG2: &'static str = "urn:publicid:IDN+agg2+authority+am";
}

impl ExampleSession for TranslationPair {
    fn session() -> Session {
        let (a1, a2) = (Self::AGG1, Self::AGG2);
        let i1 = "urn:publicid:IDN+agg1+interface+eth0";
        let i2 = "urn:publicid:IDN+agg2+interface+eth0";

        let mut routes = PresetRoutes::new();
        add_link(&mut routes, a1, i1, a2, i2);

        let mut agg1 = AggregateNode::new(a1, RspecFormat::GeniV3);
        agg1.add_request_link(&request_link(i1, i2, a2, VlanRange::inclusive(100, 200), true));
        let mut agg2 = AggregateNode::new(a2, RspecFormat::GeniV3);
        agg2.add_request_link(&request_link(i2, i1, a1, VlanRange::inclusive(150, 250), false));

        let mut session = Session::with_routes(routes);
        session.add_aggregate(agg1).unwrap();
        session.add_aggregate(agg2).unwrap();
        session
    }
}
