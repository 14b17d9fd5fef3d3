//! `logcap`: keep a file capped at the last N bytes or lines of a stream.
//!
//! # Examples
//!
//! ```sh
//! # Keep the last 1000 lines of a log, in place
//! logcap app.log -o app.log --lines 1000
//!
//! # Follow a live stream, keeping at most 10 MiB on disk
//! my-server 2>&1 | logcap -f -o /var/log/my-server.log --size 10M
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use clap::error::ErrorKind;
use clap::{ArgAction, ArgGroup, CommandFactory, Parser};
use logcap::config::DEFAULT_MAX_COMMIT_FAILURES;
use logcap::{
    AtomicFile, Error, FollowConfig, FollowDriver, GuardedSink, Limit, RunStats, SinkConfig,
    Source, cancel_on_shutdown, logging, parse_size, run_once,
};
use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Exit status of a one-shot run stopped by SIGINT or SIGTERM.
const INTERRUPTED: i32 = 130;

/// Keep a file capped at the last N bytes or N lines of its input.
#[derive(Parser)]
#[command(name = "logcap", version)]
#[command(group(ArgGroup::new("limit").required(true).args(["size", "lines"])))]
struct Cli {
    /// Input file. Reads stdin when absent or `-`.
    input: Option<PathBuf>,

    /// Output file, replaced atomically on every commit.
    #[arg(short, long)]
    output: PathBuf,

    /// Keep writing while stdin stays open.
    #[arg(short, long)]
    follow: bool,

    /// Keep the last SIZE bytes (K, M, G, T suffixes are powers of 1024).
    #[arg(short, long, value_name = "SIZE", value_parser = parse_size)]
    size: Option<u64>,

    /// Keep the last N lines.
    #[arg(short, long, value_name = "N")]
    lines: Option<u64>,

    /// Lines end with NUL instead of newline.
    #[arg(short = 'z', long)]
    zero_terminated: bool,

    /// Create missing parent directories of the output.
    #[arg(short, long)]
    parents: bool,

    /// In follow mode, commit at most once per MS milliseconds.
    #[arg(long, value_name = "MS", requires = "follow")]
    commit_interval: Option<u64>,

    /// In follow mode, consecutive failed commits tolerated before giving up.
    #[arg(
        long,
        value_name = "N",
        default_value_t = DEFAULT_MAX_COMMIT_FAILURES,
        requires = "follow"
    )]
    commit_retries: u32,

    /// Print run statistics as JSON on stdout.
    #[arg(long)]
    stats: bool,

    /// Increase log verbosity (-v info, -vv debug).
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init_tracing(cli.verbose);

    let source = Source::from_arg(cli.input.as_deref());
    if cli.follow && !source.is_stdin() {
        Cli::command()
            .error(
                ErrorKind::ArgumentConflict,
                "--follow can only be used with stdin",
            )
            .exit();
    }

    let stats = match run(&cli, &source) {
        Ok(stats) => stats,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    if cli.stats {
        match serde_json::to_string(&stats) {
            Ok(line) => println!("{line}"),
            Err(e) => {
                eprintln!("Error: failed to serialize stats: {e}");
                return ExitCode::FAILURE;
            }
        }
    }
    ExitCode::SUCCESS
}

fn run(cli: &Cli, source: &Source) -> Result<RunStats, String> {
    let limit = Limit::from_options(cli.size, cli.lines).map_err(|e| e.to_string())?;

    let mut config = SinkConfig::new(limit);
    if cli.zero_terminated {
        config = config.with_terminator(b'\0');
    }
    let output = AtomicFile::new(&cli.output).create_dirs(cli.parents);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("failed to start async runtime: {e}"))?;

    let result = if cli.follow {
        let follow = FollowConfig::default()
            .with_commit_interval(Duration::from_millis(cli.commit_interval.unwrap_or(0)))
            .with_max_commit_failures(cli.commit_retries);
        follow_stdin(&runtime, source, config, follow, output)
    } else {
        copy_once(&runtime, source, config, output)
    };

    // A blocked stdin read must not keep the process alive.
    runtime.shutdown_background();
    result
}

fn describe(e: Error, limit: Limit) -> String {
    format!("{e} (limit: {limit})")
}

/// Drive the follow loop until stdin closes or a termination signal arrives.
fn follow_stdin(
    runtime: &Runtime,
    source: &Source,
    config: SinkConfig,
    follow: FollowConfig,
    mut output: AtomicFile,
) -> Result<RunStats, String> {
    let limit = config.limit;
    let cancel = CancellationToken::new();
    runtime
        .block_on(async {
            tokio::spawn(cancel_on_shutdown(cancel.clone()));
            FollowDriver::new(&mut output, config, follow)
                .run(tokio::io::stdin(), &source.name(), cancel)
                .await
        })
        .map_err(|e| describe(e, limit))
}

/// Run the one-shot copy on a blocking thread.
///
/// A termination signal exits the process with [`INTERRUPTED`], but only once
/// no commit is in flight: an interrupted read leaves the output untouched,
/// and a started commit always completes its rename or removes its temporary
/// file first.
fn copy_once(
    runtime: &Runtime,
    source: &Source,
    config: SinkConfig,
    output: AtomicFile,
) -> Result<RunStats, String> {
    let limit = config.limit;
    let source = source.clone();
    let mut sink = GuardedSink::new(output);
    let commit_lock = sink.commit_lock();

    let joined = runtime.block_on(async move {
        let cancel = CancellationToken::new();
        tokio::spawn(cancel_on_shutdown(cancel.clone()));
        tokio::spawn(exit_when_cancelled(cancel, commit_lock));
        // Let both tasks register their signal handlers before any output
        // is written.
        tokio::task::yield_now().await;
        tokio::task::spawn_blocking(move || run_once(&source, &config, &mut sink)).await
    });

    match joined {
        Ok(result) => result.map_err(|e| describe(e, limit)),
        Err(e) => Err(format!("bounded copy did not complete: {e}")),
    }
}

async fn exit_when_cancelled(cancel: CancellationToken, commit_lock: Arc<Mutex<()>>) {
    cancel.cancelled().await;
    let _ = tokio::task::spawn_blocking(move || {
        let _held = commit_lock.lock();
        warn!("Interrupted, exiting once no commit is in flight");
        std::process::exit(INTERRUPTED);
    })
    .await;
}
