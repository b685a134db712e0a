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

//! Test importing the workflow of a stitching computation service

use crate::aggregate::{HopRef, RspecFormat};
use crate::example_sessions::*;
use crate::sequencer::build_sequence;
use crate::workflow::*;
use crate::Error;
use maplit::btreemap;

fn hop(urn: &str, aggregate: &str, import_vlans: bool, deps: Vec<HopDependency>) -> HopDependency {
    HopDependency {
        hop_urn: urn.to_string(),
        aggregate_url: aggregate.to_string(),
        import_vlans,
        dependencies: deps,
    }
}

fn source(aggregate: &str, hop_urn: &str) -> Option<HopRef> {
    Some(HopRef { aggregate: aggregate.to_string(), hop_urn: hop_urn.to_string() })
}

#[test]
fn import_chain() -> Result<(), Error> {
    let mut session = ImportChain::session();
    let mut paths = ImportChain::paths();
    let workflow = ImportChain::workflow();
    let seen = import_workflow(&mut session, &mut paths, &workflow, RspecFormat::GeniV3)?;

    let x = session.aggregate_id(ImportChain::X)?;
    let y = session.aggregate_id(ImportChain::Y)?;
    assert_eq!(seen, vec![x, y]);
    assert!(session.has_dependency(x, y));
    assert!(!session.has_dependency(y, x));
    assert_eq!(build_sequence(&session)?, vec![y, x]);

    // hop dependencies
    let path = &paths[0];
    assert_eq!(path.hop(ImportChain::H3).unwrap().dependencies, vec![1]);
    assert_eq!(path.hop(ImportChain::H1).unwrap().dependencies, vec![2]);
    assert!(path.hop(ImportChain::H0).unwrap().dependencies.is_empty());
    assert_eq!(path.hop(ImportChain::H0).unwrap().aggregate.as_deref(), Some(ImportChain::Y));

    // import sources on the aggregate node
    let node = session.aggregate(x)?;
    let expected =
        HopRef { aggregate: ImportChain::Y.to_string(), hop_urn: ImportChain::H0.to_string() };
    assert_eq!(
        node.hop_imports().collect::<Vec<_>>(),
        vec![(ImportChain::H1, Some(&expected)), (ImportChain::H3, Some(&expected))]
    );
    assert_eq!(
        node.imported_vlans(&btreemap! {ImportChain::H0.to_string() => 77}),
        btreemap! {ImportChain::H1.to_string() => 77, ImportChain::H3.to_string() => 77}
    );
    assert_eq!(session.aggregate(y)?.hop_imports().count(), 0);
    Ok(())
}

#[test]
fn second_pass_resolves_same_aggregate_peer() -> Result<(), Error> {
    let mut session = ImportChain::session();
    let mut paths = ImportChain::paths();
    import_workflow(&mut session, &mut paths, &ImportChain::workflow(), RspecFormat::GeniV3)?;

    // forget the resolution, and redo it pass by pass
    for hop in paths[0].hops.iter_mut() {
        hop.import_from = None;
    }

    assert_eq!(resolve_import_sources_once(&mut paths), 1);
    assert_eq!(paths[0].hop(ImportChain::H3).unwrap().import_from, None);
    assert_eq!(
        paths[0].hop(ImportChain::H1).unwrap().import_from,
        source(ImportChain::Y, ImportChain::H0)
    );

    assert_eq!(resolve_import_sources_once(&mut paths), 1);
    assert_eq!(
        paths[0].hop(ImportChain::H3).unwrap().import_from,
        source(ImportChain::Y, ImportChain::H0)
    );

    // nothing left to resolve
    assert_eq!(resolve_import_sources_once(&mut paths), 0);
    Ok(())
}

#[test]
fn closest_cross_aggregate_dependency() -> Result<(), Error> {
    let mut session = ImportChain::session();
    let mut paths = vec![Path::new("link", vec!["p0", "p1", "p2", "p3"])];
    let y = || hop("p0", "y", false, vec![]);
    let z = || hop("p2", "z", false, vec![]);
    let workflow = btreemap! {
        "link".to_string() => PathWorkflow {
            dependencies: vec![
                hop("p1", "x", true, vec![y(), z()]),
                hop("p3", "x", true, vec![y(), z()]),
            ],
        },
    };
    import_workflow(&mut session, &mut paths, &workflow, RspecFormat::GeniV3)?;

    // p1 has the same distance to p0 and p2, and takes the lower index
    assert_eq!(paths[0].hops[1].import_from, source("y", "p0"));
    // p3 is closer to p2
    assert_eq!(paths[0].hops[3].import_from, source("z", "p2"));

    let x = session.aggregate_id("x")?;
    let expected = vec![session.aggregate_id("y")?, session.aggregate_id("z")?];
    assert_eq!(session.depends_on(x), expected);
    Ok(())
}

#[test]
fn unresolved_import() -> Result<(), Error> {
    let mut session = ImportChain::session();
    let mut paths = vec![Path::new("link", vec!["h0"])];
    let workflow = btreemap! {
        "link".to_string() => PathWorkflow { dependencies: vec![hop("h0", "x", true, vec![])] },
    };
    import_workflow(&mut session, &mut paths, &workflow, RspecFormat::GeniV3)?;

    let node = session.aggregate(session.aggregate_id("x")?)?;
    assert_eq!(node.hop_imports().collect::<Vec<_>>(), vec![("h0", None)]);
    assert!(node.imported_vlans(&btreemap! {"h0".to_string() => 5}).is_empty());
    Ok(())
}

#[test]
fn unknown_hop() {
    let mut session = ImportChain::session();
    let mut paths = ImportChain::paths();
    let workflow = btreemap! {
        ImportChain::PATH.to_string() => PathWorkflow {
            dependencies: vec![hop(
                ImportChain::H3,
                "x",
                true,
                vec![hop("x:h9", "x", false, vec![])],
            )],
        },
    };
    match import_workflow(&mut session, &mut paths, &workflow, RspecFormat::GeniV3) {
        Err(Error::UnknownHop(urn)) => assert_eq!(urn, "x:h9"),
        r => panic!("Expected an unknown hop, got {:?}", r),
    }
}

#[test]
fn unknown_path() {
    let mut session = ImportChain::session();
    let mut paths = ImportChain::paths();
    let workflow = btreemap! { "link9".to_string() => PathWorkflow::default() };
    assert!(matches!(
        import_workflow(&mut session, &mut paths, &workflow, RspecFormat::GeniV3),
        Err(Error::InvalidScenario(_))
    ));
}

#[test]
fn dependency_loop() {
    let mut session = ImportChain::session();
    let mut paths = vec![Path::new("p1", vec!["a1", "b1"]), Path::new("p2", vec!["a2", "b2"])];
    let workflow = btreemap! {
        "p1".to_string() => PathWorkflow {
            dependencies: vec![hop("a1", "a", false, vec![hop("b1", "b", false, vec![])])],
        },
        "p2".to_string() => PathWorkflow {
            dependencies: vec![hop("b2", "b", false, vec![hop("a2", "a", false, vec![])])],
        },
    };
    match import_workflow(&mut session, &mut paths, &workflow, RspecFormat::GeniV3) {
        Err(Error::DependencyLoop(cycle)) => assert_eq!(cycle, vec!["b", "a", "b"]),
        r => panic!("Expected a dependency loop, got {:?}", r),
    }
}

#[test]
fn parse_scs_workflow() -> Result<(), Error> {
    let workflow = parse_workflow(
        r#"{
            "link0": {
                "dependencies": [{
                    "hop_urn": "x:h3",
                    "aggregate_url": "x",
                    "import_vlans": true,
                    "dependencies": [{
                        "hop_urn": "x:h1",
                        "aggregate_url": "x",
                        "import_vlans": true,
                        "dependencies": [{ "hop_urn": "y:h0", "aggregate_url": "y" }]
                    }]
                }]
            }
        }"#,
    )?;
    assert_eq!(workflow, ImportChain::workflow());
    assert!(parse_workflow("{ \"link0\": { \"dependencies\": [{}] } }").is_err());
    Ok(())
}
