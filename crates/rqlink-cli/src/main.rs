//! # rqlink CLI Entry Point
//!
//! ## Usage
//!
//! ```bash
//! # Show leader, peers and leader health
//! rqlink status localhost:4001,localhost:4002
//!
//! # Run a write (outputs raw JSON)
//! rqlink exec 'localhost:4001?consistency=strong' 'INSERT INTO kv(k, v) VALUES(?, ?)' -a '["a", 1]'
//!
//! # Run a read (outputs raw JSON)
//! rqlink query localhost:4001 'SELECT * FROM kv' | jq .
//!
//! # Check that a node can be bound
//! rqlink ping user:pass@localhost:4001
//!
//! # Show how a connection string is interpreted
//! rqlink parse 'rqlite://user:pass@h1:4001,h2:4001?timeout=1m30s'
//! ```

use std::sync::Arc;

use anyhow::Result;
use argh::FromArgs;
use rqlink_client::Connection;
use rqlink_cli::output;
use rqlink_cluster::{ClusterTracker, TrackerConfig};
use rqlink_common::config::parse_duration;
use rqlink_common::{CallContext, Config};

#[derive(FromArgs)]
/// rqlink - leader-aware client for replicated SQL clusters
struct Cli {
    #[argh(subcommand)]
    command: Commands,
}

#[derive(FromArgs)]
#[argh(subcommand)]
enum Commands {
    Status(StatusArgs),
    Exec(ExecArgs),
    Query(QueryArgs),
    Ping(PingArgs),
    Parse(ParseArgs),
}

#[derive(FromArgs)]
#[argh(subcommand, name = "status")]
/// probe the cluster and print its topology
struct StatusArgs {
    /// connection string
    #[argh(positional)]
    dsn: String,

    /// overall deadline, e.g. 5s or 1m30s
    #[argh(option, short = 't')]
    timeout: Option<String>,
}

#[derive(FromArgs)]
#[argh(subcommand, name = "exec")]
/// run a write statement and print its effect as JSON
struct ExecArgs {
    /// connection string
    #[argh(positional)]
    dsn: String,

    /// SQL statement
    #[argh(positional)]
    sql: String,

    /// positional arguments as a JSON array
    #[argh(option, short = 'a', default = "\"[]\".into()")]
    args: String,

    /// overall deadline, e.g. 5s or 1m30s
    #[argh(option, short = 't')]
    timeout: Option<String>,
}

#[derive(FromArgs)]
#[argh(subcommand, name = "query")]
/// run a read statement and print the rows as JSON
struct QueryArgs {
    /// connection string
    #[argh(positional)]
    dsn: String,

    /// SQL statement
    #[argh(positional)]
    sql: String,

    /// positional arguments as a JSON array
    #[argh(option, short = 'a', default = "\"[]\".into()")]
    args: String,

    /// overall deadline, e.g. 5s or 1m30s
    #[argh(option, short = 't')]
    timeout: Option<String>,
}

#[derive(FromArgs)]
#[argh(subcommand, name = "ping")]
/// bind a node and check that it answers
struct PingArgs {
    /// connection string
    #[argh(positional)]
    dsn: String,

    /// overall deadline, e.g. 5s or 1m30s
    #[argh(option, short = 't')]
    timeout: Option<String>,
}

#[derive(FromArgs)]
#[argh(subcommand, name = "parse")]
/// print the settings a connection string resolves to
struct ParseArgs {
    /// connection string
    #[argh(positional)]
    dsn: String,
}

fn call_context(timeout: Option<&str>) -> Result<CallContext> {
    Ok(match timeout {
        Some(raw) => CallContext::with_timeout(parse_duration(raw)?),
        None => CallContext::background(),
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli: Cli = argh::from_env();

    // exec and query write JSON to stdout for piping
    if !matches!(cli.command, Commands::Exec(_) | Commands::Query(_)) {
        let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
    }

    match cli.command {
        Commands::Status(args) => run_status(args).await,
        Commands::Exec(args) => run_exec(args).await,
        Commands::Query(args) => run_query(args).await,
        Commands::Ping(args) => run_ping(args).await,
        Commands::Parse(args) => {
            let config = Config::parse(&args.dsn)?;
            println!("{}", serde_json::to_string_pretty(&output::config_to_json(&config))?);
            Ok(())
        }
    }
}

async fn run_status(args: StatusArgs) -> Result<()> {
    let ctx = call_context(args.timeout.as_deref())?;
    let config = Arc::new(Config::parse(&args.dsn)?);
    let tracker = Arc::new(ClusterTracker::with_http(&config, TrackerConfig::default()));

    tracker.refresh(true, &ctx).await?;
    tracing::info!("Leader: {}", tracker.current_leader().unwrap_or_default());

    let conn = Connection::with_tracker(config, tracker.clone(), &ctx).await?;
    let healthy = conn.is_leader_healthy(&ctx).await;
    conn.close().await;

    let rendered = output::topology_to_json(&tracker.snapshot(), healthy);
    println!("{}", serde_json::to_string_pretty(&rendered)?);
    Ok(())
}

async fn run_exec(args: ExecArgs) -> Result<()> {
    let ctx = call_context(args.timeout.as_deref())?;
    let params = output::args_from_json(&args.args)?;

    let conn = Connection::open_dsn(&args.dsn, &ctx).await?;
    let result = conn.execute(&args.sql, &params, &ctx).await;
    conn.close().await;

    println!("{}", serde_json::to_string(&output::exec_result_to_json(&result?))?);
    Ok(())
}

async fn run_query(args: QueryArgs) -> Result<()> {
    let ctx = call_context(args.timeout.as_deref())?;
    let params = output::args_from_json(&args.args)?;

    let conn = Connection::open_dsn(&args.dsn, &ctx).await?;
    let rows = conn.query(&args.sql, &params, &ctx).await;
    conn.close().await;

    println!("{}", serde_json::to_string(&output::rows_to_json(rows?))?);
    Ok(())
}

async fn run_ping(args: PingArgs) -> Result<()> {
    let ctx = call_context(args.timeout.as_deref())?;
    let conn = Connection::open_dsn(&args.dsn, &ctx).await?;
    let result = conn.ping(&ctx).await;
    let node = conn.bound_node().await.unwrap_or_default();
    conn.close().await;

    result?;
    tracing::info!("Node {} is alive", node);
    println!("ok");
    Ok(())
}
