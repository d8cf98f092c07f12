//! ocelint inspection service binary.

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use miette::{IntoDiagnostic, Result};
use tracing_subscriber::EnvFilter;

use ocelint_core::{Config, Session};

/// ocelint-server - inspect Python sources over HTTP
#[derive(Parser)]
#[command(name = "ocelint-server")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1:8000")]
    bind: SocketAddr,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::discover();

    let filter = if args.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.verbosity.clone()))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let mut session = Session::new(config);
    session.start().into_diagnostic()?;

    ocelint_server::serve(args.bind, Arc::new(session))
        .await
        .into_diagnostic()
}
