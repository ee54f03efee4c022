mod constants;
mod control;
mod util;

use std::path::PathBuf;
use std::process::ExitCode;
use itertools::Itertools;
use tracing_subscriber::EnvFilter;
use control::{variant, Outcome};
use util::{config, run_log::RunLog};

/// exit code if no watcher ran at all
const EXIT_USAGE: u8 = 2;

#[derive(Debug, Default, PartialEq, Eq)]
struct Args {
    /// replaces the platform config directory
    config_dir: Option<PathBuf>,
    /// everything else, matched against watcher names
    tokens: Vec<String>,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Args, String> {
    let mut parsed = Args::default();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config-dir" => {
                let dir = args.next().ok_or("--config-dir needs a path")?;
                parsed.config_dir = Some(PathBuf::from(dir));
            }
            _ => parsed.tokens.push(arg),
        }
    }

    Ok(parsed)
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args = match parse_args(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(message) => {
            eprintln!("{message}");
            eprintln!("usage: twilight [--config-dir <path>] [{}]...", variant::Variant::ALL.map(variant::Variant::token).join("|"));
            return ExitCode::from(EXIT_USAGE);
        }
    };

    let variants = variant::select(&args.tokens);
    if variants.is_empty() {
        println!("Command does not match any watchers");
        return ExitCode::from(EXIT_USAGE);
    }

    let Some(config_dir) = config::config_dir(args.config_dir) else {
        eprintln!("path to config directory could not be determined, which means your operating system is not supported. use --config-dir.");
        return ExitCode::from(EXIT_USAGE);
    };

    if cfg!(feature = "hue_debug") {
        println!("HUE_DEBUG is enabled: not sending PUT requests to the bridge");
    }

    // one log for all watchers, lines are written whole
    let sink = RunLog::new(config_dir.join(constants::LOG_FILE_NAME));

    // every watcher waits on its own task
    let handles = variants.into_iter()
        .map(|variant| {
            let config_dir = config_dir.clone();
            let sink = sink.clone();
            tokio::spawn(async move { control::run_variant(variant, &config_dir, sink).await })
        })
        .collect_vec();

    let mut failed = false;
    for handle in handles {
        match handle.await {
            Ok(Outcome::Triggered) => {}
            Ok(Outcome::Failed) => failed = true,
            Err(err) => {
                tracing::error!("watcher task failed: {err}");
                failed = true;
            }
        }
    }

    if failed { ExitCode::FAILURE } else { ExitCode::SUCCESS }
}
