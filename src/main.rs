#![warn(clippy::all, rust_2018_idioms)]

use std::io::Write;
use std::process::ExitCode;

use racklog::app::cli::{parse_args, CliArgs, USAGE};
use racklog::app::config::TailConfig;
use racklog::app::log_tail::{AggregationSession, Backends};
use racklog::{trace_debug, trace_error};

fn init_logging() {
    // stdout carries the tailed lines, so diagnostics go to a file
    let Some(proj_dirs) = directories::ProjectDirs::from("com", "", "racklog") else {
        return;
    };

    let log_dir = proj_dirs.data_dir().join("logs");
    let _ = std::fs::create_dir_all(&log_dir);
    let log_path = log_dir.join("racklog.log");

    let file = match std::fs::OpenOptions::new()
        .append(true)
        .create(true)
        .open(&log_path)
    {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Failed to open log file {:?}: {}", log_path, e);
            return;
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(concat!(
            "racklog=info,aws_config=warn,aws_sigv4=warn,",
            "aws_smithy_runtime=warn,aws_smithy_runtime_api=warn,hyper=warn",
        ))
    });

    let result = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::sync::Mutex::new(file))
        .with_ansi(false)
        .try_init();

    if let Err(e) = result {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return;
    }

    tracing::info!("Logging initialized to: {:?}", log_path);
}

fn load_config(args: &CliArgs) -> anyhow::Result<TailConfig> {
    let mut config = match &args.config_path {
        Some(path) => TailConfig::load(path)?,
        None => TailConfig::default(),
    }
    .apply_env();

    if let Some(region) = &args.region {
        config.region = Some(region.clone());
    }
    Ok(config)
}

async fn tail(args: CliArgs) -> anyhow::Result<()> {
    let config = load_config(&args)?;
    let spec = args
        .source
        .clone()
        .or_else(|| config.source.clone())
        .ok_or_else(|| anyhow::anyhow!("no log source given\n{}", USAGE))?;

    let backends = Backends::from_sdk_config(&config.aws_config().await);
    let mut session = AggregationSession::open(spec, &backends, config).await?;

    let mut stdout = std::io::stdout().lock();
    loop {
        tokio::select! {
            line = session.next_line() => {
                let Some(line) = line else { break };
                // flush once per burst of buffered lines
                let mut written = stdout.write_all(&line);
                while written.is_ok() {
                    let Some(next) = session.try_next_line() else { break };
                    written = stdout.write_all(&next);
                }
                if written.and_then(|_| stdout.flush()).is_err() {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                trace_debug!("Interrupted, cancelling session");
                break;
            }
        }
    }

    session.cancel();
    Ok(())
}

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();

    let args = match parse_args(&args) {
        Ok(args) if args.help => {
            println!("{}", USAGE);
            return ExitCode::SUCCESS;
        }
        Ok(args) => args,
        Err(e) => {
            eprintln!("{}\n{}", e, USAGE);
            return ExitCode::from(2);
        }
    };

    init_logging();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Failed to create tokio runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(tail(args)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            trace_error!("racklog failed: {:#}", e);
            eprintln!("racklog: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
