//! Wires `connection` + `tracer` + `scheduler` + `aggregator` into one
//! session: a baseline run to seed the graph, then BFS exploration runs
//! until the scheduler reports completion (§4.3, §4.4, §4.5).

use crate::config::{AggregatorKind, Config};
use crate::controller::{BaselineController, ExplorationController};
use aggregator::{Canonicalization, Graph};
use anyhow::{Context, Result};
use connection::WelcomeEndpoint;
use protocol::Message;
use scheduler::{Run, Scheduler};

pub fn run(config: &Config) -> Result<Graph> {
    let socket_path = config.socket_path.clone().unwrap_or_else(|| connection::DEFAULT_SOCKET_PATH.to_string());
    let endpoint = WelcomeEndpoint::bind(&socket_path).with_context(|| format!("binding welcome endpoint at {socket_path}"))?;

    let option = Message::Option { notify: config.notify.clone(), control: config.control.clone() };
    let baseline_option = Message::Option { notify: config.notify.union(&config.control), control: protocol::FunctionList::none() };

    log::info!("running baseline pass: {:?}", config.tested_program);
    let mut baseline_controller = BaselineController::new();
    let baseline = tracer::run_once(
        &endpoint,
        &config.tested_program,
        &config.shim_library_path,
        &socket_path,
        baseline_option,
        &mut baseline_controller,
    )
    .context("baseline run")?;

    let canonicalization = match config.aggregator {
        AggregatorKind::Name => Canonicalization::NameOnly,
        AggregatorKind::BaseParam => Canonicalization::BaseParameter,
    };
    let mut graph = Graph::new(canonicalization, config.subroutine_size);
    graph.absorb(&baseline);

    let mut runs: Vec<Run> = vec![baseline];
    let mut scheduler = Scheduler::new();

    let mut explored = 0usize;
    while !scheduler.is_completed() {
        let run = {
            let mut controller = ExplorationController::new(&mut scheduler, &runs, &config.variant_groups);
            tracer::run_once(
                &endpoint,
                &config.tested_program,
                &config.shim_library_path,
                &socket_path,
                option.clone(),
                &mut controller,
            )
            .with_context(|| format!("exploration run {}", runs.len()))?
        };
        explored += 1;
        graph.absorb(&run);
        runs.push(run);
        scheduler.next_run(&runs);
    }

    log::info!("runs={} nodes={} explored={}", runs.len(), graph.node_count(), explored);
    Ok(graph)
}
