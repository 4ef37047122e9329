// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::process::ExitCode;

use mds_journal::MdsState;
use mds_node::config::NodeConfig;
use mds_node::errors::NodeResult;
use mds_node::recovery::{recover_from_journal, write_back_and_trim};
use mds_node::telemetry::{get_metrics, init_telemetry};

fn run(cfg: &NodeConfig) -> NodeResult<()> {
    let mut mds = MdsState::new();
    let (mut log, report) = recover_from_journal(&cfg.journal_path, &mut mds)?;
    tracing::info!(
        inodes = mds.inode_count(),
        live_events = log.live_len(),
        "metadata state recovered ({} events replayed)",
        report.replayed
    );

    if cfg.trim_on_start {
        write_back_and_trim(&mut log, &mut mds)?;
    }
    Ok(())
}

fn main() -> ExitCode {
    if let Err(e) = init_telemetry() {
        eprintln!("{}", e);
        return ExitCode::FAILURE;
    }

    let cfg = NodeConfig::from_env();
    tracing::info!("Starting MDS node with config: {:?}", cfg);

    let code = match run(&cfg) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if e.is_corruption() => {
            tracing::error!("journal is corrupt, refusing to start: {}", e);
            ExitCode::from(2)
        }
        Err(e) => {
            tracing::error!("recovery failed: {}", e);
            ExitCode::FAILURE
        }
    };

    if cfg.dump_metrics {
        println!("{}", get_metrics());
    }
    code
}
