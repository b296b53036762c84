//! rclspin - Wait-Set Reactor Demo
//!
//! Exercises the reactor over the in-process loopback transport.

use anyhow::{bail, Context as _, Result};
use clap::{ArgAction, Parser, Subcommand};
use crossbeam_channel::{unbounded, Receiver};
use rclspin::interfaces::{AddTwoInts, AddTwoIntsRequest, StringMessage};
use rclspin::{Context, Node, ReactorConfig, SpinOutcome};
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Upper bound on cycles a demo runs before giving up.
const MAX_CYCLES: usize = 100;

#[derive(Parser)]
#[command(name = "rclspin")]
#[command(version)]
#[command(about = "Wait-set reactor for publish/subscribe client libraries", long_about = None)]
struct Cli {
    /// Config file (default: rclspin.toml in the current directory or a parent)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Publish messages and receive them on a subscription of the same node
    Talker {
        /// Topic to publish on
        #[arg(long, default_value = "chatter")]
        topic: String,

        /// Number of messages
        #[arg(short = 'n', long, default_value_t = 5)]
        count: usize,
    },

    /// Call an AddTwoInts service served by the same node
    AddTwoInts {
        a: i64,
        b: i64,

        /// Service name
        #[arg(long, default_value = "add_two_ints")]
        service: String,
    },

    /// Show the transport identifier and the effective configuration
    Info,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match &cli.config {
        Some(path) => ReactorConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => ReactorConfig::load_from_cwd().context("Failed to load config")?,
    };

    match cli.command {
        Commands::Talker { topic, count } => cmd_talker(config, &topic, count),
        Commands::AddTwoInts { a, b, service } => cmd_add_two_ints(config, &service, a, b),
        Commands::Info => cmd_info(config),
    }
}

fn init_logging(verbosity: u8) {
    let default_level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Spin until `expected` values arrive on `rx`, or the cycle budget runs out.
fn collect<T>(node: &mut Node, rx: &Receiver<T>, expected: usize, timeout_ms: i64) -> Result<Vec<T>> {
    let mut received = Vec::with_capacity(expected);
    for cycle in 0..MAX_CYCLES {
        let outcome = rclspin::spin_once(node, timeout_ms).context("Spin failed")?;
        debug!(cycle, ?outcome, "cycle finished");
        received.extend(rx.try_iter());
        if received.len() >= expected {
            return Ok(received);
        }
        if outcome == SpinOutcome::Idle {
            break;
        }
    }
    bail!(
        "received {} of {} expected values after {} cycles",
        received.len(),
        expected,
        MAX_CYCLES
    )
}

fn cmd_talker(config: ReactorConfig, topic: &str, count: usize) -> Result<()> {
    let timeout_ms = config.executor.spin_timeout_ms;
    let context = Context::loopback(config);
    let mut node = context
        .create_node("talker", "")
        .context("Failed to create node")?;

    let (tx, rx) = unbounded();
    node.create_subscription::<StringMessage, _>(topic, move |msg| {
        tx.send(msg.data)?;
        Ok(())
    })
    .context("Failed to create subscription")?;
    let publisher = node
        .create_publisher::<StringMessage>(topic)
        .context("Failed to create publisher")?;

    for i in 0..count {
        let msg = StringMessage {
            data: format!("Hello World: {}", i),
        };
        publisher.publish(&msg).context("Publish failed")?;
        info!(topic, data = %msg.data, "published");
    }

    let expected = count.min(depth_of(&node));
    let received = collect(&mut node, &rx, expected, timeout_ms)?;
    for data in &received {
        println!("I heard: [{}]", data);
    }

    context.shutdown().context("Shutdown failed")?;
    Ok(())
}

/// Messages beyond the queue depth are dropped before the first spin.
fn depth_of(node: &Node) -> usize {
    node.default_qos().queue_bound().unwrap_or(usize::MAX)
}

fn cmd_add_two_ints(config: ReactorConfig, service: &str, a: i64, b: i64) -> Result<()> {
    let timeout_ms = config.executor.spin_timeout_ms;
    let context = Context::loopback(config);
    let mut node = context
        .create_node("add_two_ints", "")
        .context("Failed to create node")?;

    node.create_service::<AddTwoInts, _>(service, |request, response| {
        response.sum = request.a + request.b;
        info!(a = request.a, b = request.b, "incoming request");
        Ok(())
    })
    .context("Failed to create service")?;

    let client = node
        .create_client::<AddTwoInts>(service)
        .context("Failed to create client")?;
    if !client.service_is_available()? {
        bail!("service {} is not available", service);
    }

    let (tx, rx) = unbounded();
    let sequence_number = client
        .send_request(&AddTwoIntsRequest { a, b }, move |response| {
            tx.send(response.sum)?;
            Ok(())
        })
        .context("Failed to send request")?;
    debug!(sequence_number, "request sent");

    let sums = collect(&mut node, &rx, 1, timeout_ms)?;
    println!("Result of add_two_ints: {} + {} = {}", a, b, sums[0]);

    context.shutdown().context("Shutdown failed")?;
    Ok(())
}

fn cmd_info(config: ReactorConfig) -> Result<()> {
    let context = Context::loopback(config);
    println!("Transport: {}", context.implementation_identifier());
    println!();
    let rendered =
        toml::to_string_pretty(context.config()).context("Failed to render config")?;
    print!("{}", rendered);
    Ok(())
}
