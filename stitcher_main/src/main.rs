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

use stitcher::aggregate::RspecFormat;
use stitcher::dependency::calculate_dependencies;
use stitcher::executor::{execute_in_parallel, execute_in_sequence};
use stitcher::printer;
use stitcher::scenario::Scenario;
use stitcher::sequencer::build_sequence;
use stitcher::workflow::{import_workflow, read_workflow};
use stitcher::{Error as StitchError, Stopper};

use clap::{Parser, Subcommand};
use log::*;
use std::error::Error;
use std::path::PathBuf;

mod dry_run;
use dry_run::DryRunReserver;

fn main() -> Result<(), Box<dyn Error>> {
    // initialize the env logger
    pretty_env_logger::init();

    // run clap
    let args = CommandLineArguments::parse();

    // match on the action
    match args.cmd {
        MainCommand::Plan { scenario } => {
            let scenario = Scenario::read(scenario)?;
            let mut session = scenario.build_session()?;
            let report = calculate_dependencies(&mut session)?;
            let sequence = build_sequence(&session)?;

            print_section("Restrictions", printer::restrictions(&session));
            print_section("Dependencies", printer::dependency_report(&report));
            print_section("Execution order", printer::execution_plan(&session, &sequence));
        }
        MainCommand::Run { scenario, parallel, threads } => {
            let scenario = Scenario::read(scenario)?;
            let mut session = scenario.build_session()?;
            let report = calculate_dependencies(&mut session)?;
            if !report.conflicts.is_empty() {
                warn!("{} links have no common VLAN tag", report.conflicts.len());
            }
            let sequence = build_sequence(&session)?;
            print_section("Execution order", printer::execution_plan(&session, &sequence));

            let reserver = DryRunReserver::new(&session);
            let result = if parallel {
                let threads = threads.unwrap_or_else(num_cpus::get);
                info!("Executing the reservations on {} threads", threads);
                let threads = Some(threads);
                execute_in_parallel(&mut session, &sequence, &reserver, Stopper::new(), threads)
            } else {
                execute_in_sequence(&mut session, &sequence, &reserver, Stopper::new())
            };

            match result {
                Ok(vlans) => print_section("VLAN tags", printer::vlan_assignments(&vlans)),
                Err(e) => {
                    if let StitchError::ExecutionFailed(f) | StitchError::Abort(f) = &e {
                        print_section("Execution failed", printer::execution_failure(f));
                    }
                    return Err(Box::new(e));
                }
            }
        }
        MainCommand::Workflow { scenario, workflow } => {
            let scenario = Scenario::read(scenario)?;
            let workflow = read_workflow(workflow)?;
            let mut session = scenario.build_session()?;
            let mut paths = scenario.paths();
            import_workflow(&mut session, &mut paths, &workflow, RspecFormat::GeniV3)?;
            let sequence = build_sequence(&session)?;

            print_section("Execution order", printer::execution_plan(&session, &sequence));
            print_section("VLAN imports", printer::import_sources(&session));
        }
    }

    Ok(())
}

fn print_section(title: &str, lines: Vec<String>) {
    println!("{}:", title);
    for line in lines {
        println!("    {}", line);
    }
    println!();
}

#[derive(Parser, Debug)]
#[command(name = "Stitcher (Binary)", author = "Tibor Schneider")]
struct CommandLineArguments {
    /// Main Command
    #[command(subcommand)]
    cmd: MainCommand,
}

#[derive(Subcommand, Debug)]
enum MainCommand {
    /// Compute the restrictions, the dependencies and the execution order, without reserving
    #[command(name = "plan")]
    Plan {
        /// Scenario (JSON) containing the preset routes and the request
        scenario: PathBuf,
    },
    /// Reserve all aggregates of the scenario, picking the VLAN tags locally (dry run)
    #[command(name = "run")]
    Run {
        /// Scenario (JSON) containing the preset routes and the request
        scenario: PathBuf,
        /// Reserve independent aggregates in parallel
        #[arg(short = 'p', long)]
        parallel: bool,
        /// Number of worker threads (defaults to the number of CPUs)
        #[arg(short = 't', long)]
        threads: Option<usize>,
    },
    /// Import the workflow of a stitching computation service instead of computing the
    /// dependencies
    #[command(name = "workflow")]
    Workflow {
        /// Scenario (JSON) containing the preset routes, the request and the paths
        scenario: PathBuf,
        /// Workflow (JSON) as returned by the SCS
        workflow: PathBuf,
    },
}
