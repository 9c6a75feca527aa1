//! TandemDB Shell Binary
//!
//! Opens a data directory and runs the interactive shell on stdin/stdout.

use std::io;

use clap::Parser;
use tandemdb::shell::Shell;
use tandemdb::{Config, Database};
use tracing_subscriber::{fmt, EnvFilter};

/// TandemDB Shell
#[derive(Parser, Debug)]
#[command(name = "tandem-shell")]
#[command(about = "Interactive shell for the course/certificate record store")]
#[command(version)]
struct Args {
    /// Data directory
    #[arg(short, long, default_value = "./tandem_data")]
    data_dir: String,

    /// Free slots that trigger certificate compaction
    #[arg(short, long, default_value = "2")]
    threshold: usize,

    /// Argument that leaves a field unchanged in update commands
    #[arg(short, long, default_value = "*")]
    keep_token: String,

    /// Only flush index and free lists on exit
    #[arg(long)]
    no_flush_on_write: bool,
}

fn main() {
    // Logs go to stderr so they never interleave with shell output
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,tandemdb=info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    tracing::info!("TandemDB Shell v{}", tandemdb::VERSION);
    tracing::info!("Data directory: {}", args.data_dir);

    let config = Config::builder()
        .data_dir(&args.data_dir)
        .compaction_threshold(args.threshold)
        .keep_token(args.keep_token)
        .flush_on_write(!args.no_flush_on_write)
        .build();

    let db = match Database::open(config) {
        Ok(db) => db,
        Err(e) => {
            tracing::error!("Failed to open database: {}", e);
            std::process::exit(1);
        }
    };

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    if let Err(e) = Shell::new(&db).run(stdin.lock(), &mut stdout) {
        tracing::error!("Shell error: {}", e);
    }

    if let Err(e) = db.close() {
        tracing::error!("Failed to close database: {}", e);
        std::process::exit(1);
    }
}
