use clap::Parser;
use color_print::cformat;
use std::{process::ExitCode, time::Duration};
use token_ring::{
    codec::PipeChannel,
    config::{RingConfig, DEFAULT_NODES},
    coordinator::Coordinator,
    fabric::Endpoints,
    input::InputSource,
    log,
    output::Console,
    peer::Peer,
    sync::Handoff,
    topology::{self, RingNode, Role},
    RingError, MAX_NODES,
};
use tokio::{runtime, signal};

/// Pass a token around a ring of processes.
#[derive(Parser, Debug)]
#[command(name = "token-ring")]
#[command(version, about, long_about = None)]
struct Args {
    /// Number of nodes in the ring, coordinator included (at most 64)
    #[arg(short, long, default_value_t = DEFAULT_NODES, value_parser = clap::value_parser!(u32).range(2..))]
    nodes: u32,

    /// Pause before every hop, in milliseconds
    #[arg(long, default_value_t = 1000)]
    hop_delay_ms: u64,

    /// How long the coordinator idles between polls, in milliseconds
    #[arg(long, default_value_t = 10)]
    poll_interval_ms: u64,

    /// Log every hop and lap
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn config(&self) -> RingConfig {
        let nodes = if self.nodes > MAX_NODES {
            log::warn(&format!(
                "A ring holds at most {MAX_NODES} nodes, using {MAX_NODES}."
            ));
            MAX_NODES
        } else {
            self.nodes
        };

        RingConfig::new(nodes)
            .with_hop_delay(Duration::from_millis(self.hop_delay_ms))
            .with_poll_interval(Duration::from_millis(self.poll_interval_ms))
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    log::set_verbose(args.verbose);

    match run(args.config()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if e.is_construction() => {
            log::error(&format!("Couldn't build the ring: {e}"));
            ExitCode::FAILURE
        }
        Err(e) => {
            log::error(&format!("{e}"));
            ExitCode::FAILURE
        }
    }
}

fn run(config: RingConfig) -> Result<(), RingError> {
    config.validate()?;

    // No runtime may exist yet: building the ring forks.
    let RingNode {
        index,
        nodes,
        endpoints,
        role,
    } = topology::build(config.nodes)?;

    match role {
        Role::Peer => runtime::Builder::new_current_thread()
            .enable_all()
            .build()?
            .block_on(serve_peer(index, endpoints, &config)),
        Role::Coordinator(table) => {
            let runtime = runtime::Builder::new_multi_thread()
                .worker_threads(2)
                .enable_all()
                .build()?;
            let result = runtime.block_on(serve_coordinator(nodes, endpoints, &config));
            // Stdin is read on a blocking thread that may never return.
            runtime.shutdown_background();
            table.reap();
            result
        }
    }
}

async fn serve_peer(
    index: u32,
    endpoints: Endpoints,
    config: &RingConfig,
) -> Result<(), RingError> {
    let channel = PipeChannel::from_endpoints(endpoints, config.hop_delay)?;
    let mut peer = Peer::new(index, channel, Console);

    tokio::select! {
        result = peer.run() => result,
        interrupted = signal::ctrl_c() => {
            interrupted?;
            log::info("Interrupted, leaving the ring.");
            Ok(())
        }
    }
}

async fn serve_coordinator(
    nodes: u32,
    endpoints: Endpoints,
    config: &RingConfig,
) -> Result<(), RingError> {
    let channel = PipeChannel::from_endpoints(endpoints, config.hop_delay)?;
    let handoff = Handoff::new();

    let input_task = {
        let mut input = InputSource::new(
            nodes,
            tokio::io::stdin(),
            tokio::io::stdout(),
            handoff.clone(),
        );
        tokio::spawn(async move {
            if let Err(e) = input.run().await {
                log::error(&format!("Input failed: {e}"));
            }
        })
    };

    let mut coordinator = Coordinator::new(channel, handoff, Console, config.poll_interval);
    let result = tokio::select! {
        result = coordinator.run() => result,
        interrupted = signal::ctrl_c() => {
            interrupted?;
            log::info(&cformat!("Interrupted, <bold>stopping the ring</bold>."));
            Ok(())
        }
    };

    input_task.abort();
    log::debug(&format!("the token came back {} times", coordinator.laps()));
    result
}
