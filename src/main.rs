//! # Application Entry Point
//!
//! Parses the command line, initializes logging and the worker pool, and
//! runs the imputation pipeline. Exit codes: 0 success, 1 usage error,
//! 2 input-file error, 3 internal error.

use tracing::error;
use tracing_subscriber::EnvFilter;

use kinphase::config::Config;
use kinphase::pipelines::ImputationPipeline;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let config = match Config::parse_and_validate() {
        Ok(config) => config,
        Err(err) => {
            error!("{}", err);
            std::process::exit(err.exit_code());
        }
    };

    if let Err(err) = rayon::ThreadPoolBuilder::new()
        .num_threads(config.threads())
        .build_global()
    {
        error!("failed to build thread pool: {}", err);
        std::process::exit(3);
    }

    let pipeline = ImputationPipeline::new(config);
    if let Err(err) = pipeline.run() {
        error!("{}", err);
        std::process::exit(err.exit_code());
    }
}
