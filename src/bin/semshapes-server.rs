//! semshapes Server Binary
//!
//! Loads the embedding file once, then serves the HTTP API.

use clap::Parser;
use semshapes::args::ModelArgs;
use semshapes::{Config, QueryEngine, Server};
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

/// semshapes Server - word embedding arithmetic over HTTP
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Bind address
    #[arg(short, long, env = "SEMSHAPES_BIND", default_value = "0.0.0.0")]
    bind: String,

    /// Port number
    #[arg(short, long, env = "SEMSHAPES_PORT", default_value_t = 8000)]
    port: u16,

    /// Number of runtime worker threads (0 = auto-detect based on CPU cores)
    #[arg(long, default_value_t = 0)]
    workers: usize,

    #[command(flatten)]
    model: ModelArgs,
}

fn main() -> anyhow::Result<()> {
    // Initialize logging
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("semshapes=info".parse()?))
        .init();

    let args = Args::parse();

    let config = Config::default()
        .with_bind(&args.bind)
        .with_port(args.port)
        .with_workers(args.workers);

    // A bad model file is fatal: never serve a partial vocabulary
    let store = match args.model.load_store() {
        Ok(store) => store,
        Err(e) => {
            error!("Failed to load embeddings: {}", e);
            return Err(e.into());
        }
    };
    let engine = QueryEngine::new(store, args.model.engine_options());

    info!(
        "Starting semshapes server on {} with {} workers",
        config.addr(),
        config.worker_threads()
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.worker_threads())
        .enable_all()
        .build()?;

    runtime.block_on(Server::new(config, engine).run())?;
    Ok(())
}
