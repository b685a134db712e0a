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

//! Reserver which does not contact any aggregate, but picks the VLAN tags locally.

use stitcher::aggregate::{AggregateNode, VlanMap};
use stitcher::executor::{ReservationError, Reserver};
use stitcher::restrictions::VlanRange;
use stitcher::session::Session;

use log::*;
use std::collections::HashMap;
use std::sync::Mutex;

/// # Dry-Run Reserver
///
/// Every interface uses the VLAN tag imported from its dependencies, if there is one. Otherwise,
/// the lowest tag available both on the interface and on the remote interface is picked. An
/// interface without any such tag refuses the reservation, as does an interface that cannot
/// translate, but is asked to use a tag outside of its range.
#[derive(Debug)]
pub struct DryRunReserver {
    /// VLAN range of every requested interface, as computed by the dependency calculation
    ranges: HashMap<String, VlanRange>,
    imported: Mutex<HashMap<String, VlanMap>>,
}

impl DryRunReserver {
    /// Create the reserver, taking the VLAN ranges of all requested interfaces of the session.
    /// Call this after the dependencies are computed.
    pub fn new(session: &Session) -> Self {
        let ranges = session
            .aggregates()
            .flat_map(|(_, node)| {
                node.requested_interfaces()
                    .map(|(iface, _)| (iface.to_string(), node.restriction(iface).vlan_range))
                    .collect::<Vec<_>>()
            })
            .collect();
        Self { ranges, imported: Mutex::new(HashMap::new()) }
    }
}

impl Reserver for DryRunReserver {
    fn insert_vlan_data(
        &self,
        node: &mut AggregateNode,
        vlans: &VlanMap,
    ) -> Result<(), ReservationError> {
        // the dependencies key their tags by our local interfaces
        let mut imported = node.imported_vlans(vlans);
        for (iface, _) in node.requested_interfaces() {
            if let Some(tag) = vlans.get(iface) {
                imported.insert(iface.to_string(), *tag);
            }
        }
        debug!("{} imports {} VLAN tags", node.url(), imported.len());
        self.imported
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(node.url().to_string(), imported);
        Ok(())
    }

    fn do_request(&self, node: &mut AggregateNode) -> Result<(), ReservationError> {
        let url = node.url().to_string();
        let imported = self
            .imported
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&url)
            .unwrap_or_default();

        let mut assigned = VlanMap::new();
        for (iface, req) in node.requested_interfaces() {
            let restriction = node.restriction(iface);
            let tag = match imported.get(iface) {
                Some(tag) if restriction.translates() || restriction.vlan_range.contains(*tag) => {
                    *tag
                }
                Some(tag) => {
                    return Err(ReservationError::Refused(
                        url,
                        format!("VLAN {} is not available on {}", tag, iface),
                    ))
                }
                None => {
                    let available = match self.ranges.get(&req.remote_interface) {
                        Some(remote) => restriction.vlan_range.intersect(remote),
                        None => restriction.vlan_range,
                    };
                    match available.first() {
                        Some(tag) => tag,
                        None => {
                            return Err(ReservationError::Refused(
                                url,
                                format!("No VLAN available on {}", iface),
                            ))
                        }
                    }
                }
            };
            assigned.insert(req.remote_interface.clone(), tag);
        }
        for (hop, _) in node.hop_imports() {
            if let Some(tag) = imported.get(hop) {
                assigned.insert(hop.to_string(), *tag);
            }
        }

        for (iface, tag) in assigned {
            trace!("{} assigns VLAN {} towards {}", url, tag, iface);
            node.assign_vlan(iface, tag);
        }
        node.set_manifest(format!("<rspec type=\"manifest\" aggregate=\"{}\"/>", url));
        info!("Reserved {} (dry run)", url);
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use maplit::btreemap;
    use stitcher::aggregate::{RequestLink, RspecFormat};
    use stitcher::dependency::calculate_dependencies;
    use stitcher::executor::{execute_in_parallel, execute_in_sequence};
    use stitcher::scenario::Scenario;
    use stitcher::sequencer::build_sequence;
    use stitcher::{Error, Stopper};

    const CHAIN: &str = include_str!("../scenarios/chain.json");

    fn chain() -> Session {
        let mut session = Scenario::parse(CHAIN).unwrap().build_session().unwrap();
        calculate_dependencies(&mut session).unwrap();
        session
    }

    /// Single aggregate `b`, which cannot translate, connected to `a`.
    fn restricted(vlan_range: VlanRange) -> Session {
        let mut node = AggregateNode::new("b", RspecFormat::GeniV3);
        node.add_request_link(&RequestLink {
            interface: "b:if0".to_string(),
            remote_interface: "a:if0".to_string(),
            remote_aggregate: "a".to_string(),
            vlan_range,
            vlan_translation_capable: Some(false),
        });
        let mut session = Session::new();
        session.add_aggregate(node).unwrap();
        session
    }

    #[test]
    fn run_chain() -> Result<(), Error> {
        let expected = btreemap! {
            "agg1".to_string() => btreemap! {"agg2:if1".to_string() => 5},
            "agg2".to_string() => btreemap! {
                "agg1:if0".to_string() => 5,
                "agg3:if0".to_string() => 5
            },
            "agg3".to_string() => btreemap! {"agg2:if3".to_string() => 5},
        };

        let mut session = chain();
        let seq = build_sequence(&session)?;
        let reserver = DryRunReserver::new(&session);
        let vlans = execute_in_sequence(&mut session, &seq, &reserver, Stopper::new())?;
        assert_eq!(vlans, expected);

        let mut session = chain();
        let seq = build_sequence(&session)?;
        let reserver = DryRunReserver::new(&session);
        let vlans = execute_in_parallel(&mut session, &seq, &reserver, Stopper::new(), Some(2))?;
        assert_eq!(vlans, expected);
        Ok(())
    }

    #[test]
    fn refuse_tag_outside_of_range() -> Result<(), Error> {
        let mut session = restricted(VlanRange::inclusive(5, 15));
        let reserver = DryRunReserver::new(&session);
        let id = session.aggregate_id("b")?;
        let node = session.aggregate_mut(id)?;
        reserver.insert_vlan_data(node, &btreemap! {"b:if0".to_string() => 1}).unwrap();
        let expected = ReservationError::Refused(
            "b".to_string(),
            "VLAN 1 is not available on b:if0".to_string(),
        );
        assert_eq!(reserver.do_request(node), Err(expected));
        assert!(node.manifest().is_none());
        assert!(node.assigned_vlans().is_empty());
        Ok(())
    }

    #[test]
    fn refuse_empty_range() -> Result<(), Error> {
        let mut session = restricted(VlanRange::empty());
        let reserver = DryRunReserver::new(&session);
        let id = session.aggregate_id("b")?;
        let expected =
            ReservationError::Refused("b".to_string(), "No VLAN available on b:if0".to_string());
        assert_eq!(reserver.do_request(session.aggregate_mut(id)?), Err(expected));
        Ok(())
    }
}
