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

//! Sessions for testing

use crate::aggregate::RequestLink;
use crate::restrictions::VlanRange;
use crate::session::Session;
use crate::topology::PresetRoutes;

mod translation_pair;
pub use translation_pair::TranslationPair;

mod restricted_chain;
pub use restricted_chain::RestrictedChain;

mod translating_star;
pub use translating_star::TranslatingStar;

mod import_chain;
pub use import_chain::ImportChain;

/// Trait for easier access to example sessions.
pub trait ExampleSession {
    /// Get the session with all aggregates, requested interfaces and restrictions. The
    /// dependencies are not yet computed.
    fn session() -> Session;
}

/// Add the routes of a link between two aggregates in both directions.
fn add_link(routes: &mut PresetRoutes, a: &str, a_iface: &str, b: &str, b_iface: &str) {
    routes.add_route(a, a_iface, b_iface);
    routes.add_route(b, b_iface, a_iface);
}

/// Create the requested link of a single interface.
fn request_link(
    interface: &str,
    remote_interface: &str,
    remote_aggregate: &str,
    vlan_range: VlanRange,
    translates: bool,
) -> RequestLink {
    RequestLink {
        interface: interface.to_string(),
        remote_interface: remote_interface.to_string(),
        remote_aggregate: remote_aggregate.to_string(),
        vlan_range,
        vlan_translation_capable: Some(translates),
    }
}
