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

//! Test the dependency calculation

use crate::aggregate::{AggregateNode, RspecFormat};
use crate::dependency::*;
use crate::example_sessions::*;
use crate::restrictions::{RestrictionSet, VlanRange};
use crate::sequencer::{build_sequence, is_valid_sequence};
use crate::session::{AggregateId, Session};
use crate::topology::PresetRoutes;
use crate::Error;
use lazy_static::lazy_static;
use maplit::btreeset;

lazy_static! {
    static ref A1: AggregateId = 0.into();
    static ref A2: AggregateId = 1.into();
    static ref A3: AggregateId = 2.into();
}

/// Two aggregates connected by a single link, with the given restrictions.
///
/// ```text
/// a1 (a1:if) ---- (a2:if) a2
/// ```
fn get_pair(r1: RestrictionSet, r2: RestrictionSet) -> Session {
    let mut routes = PresetRoutes::new();
    routes.add_route("a1", "a1:if", "a2:if");
    routes.add_route("a2", "a2:if", "a1:if");
    let mut session = Session::with_routes(routes);

    let mut agg1 = AggregateNode::new("a1", RspecFormat::GeniV3);
    agg1.add_requested_interface("a1:if", "a2:if", "a2");
    agg1.restrictions_mut().set_restriction("a1:if", r1);
    let mut agg2 = AggregateNode::new("a2", RspecFormat::GeniV3);
    agg2.add_requested_interface("a2:if", "a1:if", "a1");
    agg2.restrictions_mut().set_restriction("a2:if", r2);

    assert_eq!(*A1, session.add_aggregate(agg1).unwrap());
    assert_eq!(*A2, session.add_aggregate(agg2).unwrap());
    session
}

#[test]
fn translation_pair() -> Result<(), Error> {
    let mut session = TranslationPair::session();
    let report = calculate_dependencies(&mut session)?;

    assert!(report.is_clean());
    assert_eq!(
        report.dependencies,
        vec![(TranslationPair::AGG2.to_string(), TranslationPair::AGG1.to_string())]
    );
    assert!(session.has_dependency(*A2, *A1));
    assert!(!session.has_dependency(*A1, *A2));
    assert_eq!(build_sequence(&session)?, vec![*A1, *A2]);

    // global translation flags
    assert!(session.aggregate(*A1)?.performs_translation());
    assert!(!session.aggregate(*A2)?.performs_translation());
    Ok(())
}

#[test]
fn translation_direction_flips() -> Result<(), Error> {
    let mut session = get_pair(
        RestrictionSet::restricted(VlanRange::Any),
        RestrictionSet::translating(VlanRange::Any),
    );
    calculate_dependencies(&mut session)?;
    assert!(session.has_dependency(*A1, *A2));
    assert!(!session.has_dependency(*A2, *A1));

    let mut session = get_pair(
        RestrictionSet::translating(VlanRange::Any),
        RestrictionSet::restricted(VlanRange::Any),
    );
    calculate_dependencies(&mut session)?;
    assert!(session.has_dependency(*A2, *A1));
    assert!(!session.has_dependency(*A1, *A2));
    Ok(())
}

#[test]
fn both_translate() -> Result<(), Error> {
    let mut session = get_pair(
        RestrictionSet::translating(VlanRange::inclusive(1, 5)),
        RestrictionSet::translating(VlanRange::inclusive(10, 15)),
    );
    let report = calculate_dependencies(&mut session)?;
    assert!(report.dependencies.is_empty());
    assert!(report.conflicts.is_empty());
    assert_eq!(session.graph().edge_count(), 0);

    // ranges are left untouched
    assert_eq!(session.aggregate(*A1)?.restriction("a1:if").vlan_range, VlanRange::inclusive(1, 5));
    assert!(session.aggregate(*A1)?.performs_translation());
    Ok(())
}

#[test]
fn both_restricted() -> Result<(), Error> {
    let mut session = get_pair(
        RestrictionSet::restricted(VlanRange::inclusive(1, 10)),
        RestrictionSet::restricted(VlanRange::inclusive(8, 20)),
    );
    let report = calculate_dependencies(&mut session)?;
    assert!(report.is_clean());
    assert_eq!(report.dependencies, vec![("a1".to_string(), "a2".to_string())]);
    assert!(session.has_dependency(*A1, *A2));
    assert!(!session.has_dependency(*A2, *A1));

    let expected = VlanRange::Tags(btreeset! {8, 9, 10});
    for (id, iface) in vec![(*A1, "a1:if"), (*A2, "a2:if")] {
        let node = session.aggregate(id)?;
        assert_eq!(node.restriction(iface).vlan_range, expected);
        assert_eq!(node.restrictions().global().vlan_range, expected);
        assert!(!node.performs_translation());
    }
    Ok(())
}

#[test]
fn empty_intersection() -> Result<(), Error> {
    let mut session = get_pair(
        RestrictionSet::restricted(VlanRange::inclusive(1, 10)),
        RestrictionSet::restricted(VlanRange::inclusive(20, 30)),
    );
    let report = calculate_dependencies(&mut session)?;
    assert_eq!(report.conflicts.len(), 1);
    assert_eq!(report.conflicts[0].aggregate, "a1");
    assert_eq!(report.conflicts[0].remote_interface, "a2:if");
    assert!(session.has_dependency(*A1, *A2));
    assert!(session.aggregate(*A1)?.restriction("a1:if").vlan_range.is_empty());
    assert!(session.aggregate(*A2)?.restriction("a2:if").vlan_range.is_empty());
    Ok(())
}

#[test]
fn restricted_chain() -> Result<(), Error> {
    let mut session = RestrictedChain::session();
    let report = calculate_dependencies(&mut session)?;
    assert!(report.is_clean());

    // exactly one direction per link
    assert!(session.has_dependency(*A1, *A2));
    assert!(!session.has_dependency(*A2, *A1));
    assert!(session.has_dependency(*A2, *A3));
    assert!(!session.has_dependency(*A3, *A2));
    assert_eq!(session.graph().edge_count(), 2);

    let agg1 = session.aggregate(*A1)?;
    let agg2 = session.aggregate(*A2)?;
    let agg3 = session.aggregate(*A3)?;
    let link12 = VlanRange::inclusive(5, 10);
    let link23 = VlanRange::inclusive(5, 15);
    assert_eq!(agg1.restriction(RestrictedChain::AGG1_IF).vlan_range, link12);
    assert_eq!(agg2.restriction(RestrictedChain::AGG2_IF1).vlan_range, link12);
    assert_eq!(agg2.restriction(RestrictedChain::AGG2_IF3).vlan_range, link23);
    assert_eq!(agg3.restriction(RestrictedChain::AGG3_IF).vlan_range, link23);

    let seq = build_sequence(&session)?;
    assert_eq!(seq, vec![*A3, *A2, *A1]);
    assert!(is_valid_sequence(&session, &seq));
    Ok(())
}

#[test]
fn translating_star() -> Result<(), Error> {
    let mut session = TranslatingStar::with_leaves(3);
    let report = calculate_dependencies(&mut session)?;
    assert!(report.is_clean());
    assert_eq!(report.dependencies.len(), 3);

    let hub = session.aggregate_id(TranslatingStar::HUB)?;
    for i in 1..=3 {
        let leaf = session.aggregate_id(TranslatingStar::leaf(i))?;
        assert!(session.has_dependency(leaf, hub));
        assert!(!session.has_dependency(hub, leaf));
    }
    assert_eq!(session.dependents(hub).len(), 3);
    assert_eq!(build_sequence(&session)?[0], hub);
    Ok(())
}

#[test]
fn large_translating_star() -> Result<(), Error> {
    let n = 700;
    let mut session = TranslatingStar::with_leaves(n);
    let range = |session: &Session, i: usize| -> Result<VlanRange, Error> {
        let leaf = TranslatingStar::leaf(i);
        let id = session.aggregate_id(&leaf)?;
        Ok(session.aggregate(id)?.restriction(format!("{}:if0", leaf)).vlan_range)
    };
    assert_eq!(range(&session, 1)?, VlanRange::inclusive(100, 109));
    assert_eq!(range(&session, 40)?, VlanRange::inclusive(4000, 4009));
    assert_eq!(range(&session, 41)?, range(&session, 1)?);
    for i in 1..=n {
        let r = range(&session, i)?;
        assert_eq!(r.first().map(|t| t % 100), Some(0));
        assert!(r.is_subset(&"1-4094".parse().unwrap()));
    }

    let report = calculate_dependencies(&mut session)?;
    assert!(report.is_clean());
    assert_eq!(report.dependencies.len(), n);
    Ok(())
}

#[test]
fn skip_remote_not_in_session() -> Result<(), Error> {
    let mut session = get_pair(RestrictionSet::default(), RestrictionSet::default());
    session.aggregate_mut(*A1)?.add_requested_interface("a1:if9", "a9:if", "a9");
    let report = calculate_dependencies(&mut session)?;
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].interface, "a1:if9");
    assert_eq!(report.skipped[0].reason, SkipReason::RemoteNotInSession);
    Ok(())
}

#[test]
fn skip_not_adjacent() -> Result<(), Error> {
    let mut session = get_pair(
        RestrictionSet::translating(VlanRange::Any),
        RestrictionSet::restricted(VlanRange::Any),
    );
    session.set_preset_routes(PresetRoutes::new());
    let report = calculate_dependencies(&mut session)?;
    assert_eq!(report.skipped.len(), 2);
    assert!(report.skipped.iter().all(|s| s.reason == SkipReason::NotAdjacent));
    assert_eq!(session.graph().edge_count(), 0);
    Ok(())
}

#[test]
fn skip_unknown_remote_interface() -> Result<(), Error> {
    let mut session = get_pair(
        RestrictionSet::translating(VlanRange::Any),
        RestrictionSet::restricted(VlanRange::Any),
    );
    session.aggregate_mut(*A1)?.add_requested_interface("a1:if1", "a2:if1", "a2");
    let report = calculate_dependencies(&mut session)?;
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].reason, SkipReason::UnknownRemoteInterface);
    // the valid link still produces its dependency
    assert!(session.has_dependency(*A2, *A1));
    Ok(())
}

#[test]
fn translation_requires_all_interfaces() -> Result<(), Error> {
    let mut session = get_pair(
        RestrictionSet::translating(VlanRange::Any),
        RestrictionSet::restricted(VlanRange::Any),
    );
    let node = session.aggregate_mut(*A1)?;
    node.add_requested_interface("a1:if1", "a2:if1", "a2");
    node.restrictions_mut().set_vlan_translation("a1:if1", true);
    calculate_dependencies(&mut session)?;
    assert!(!session.aggregate(*A1)?.performs_translation());
    Ok(())
}
