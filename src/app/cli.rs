//! Command line arguments for the `racklog` binary.

#![warn(clippy::all, rust_2018_idioms)]

use anyhow::{anyhow, bail, Result};
use std::path::PathBuf;

use crate::app::log_tail::LogSourceSpec;

pub const USAGE: &str = "usage: racklog (--group NAME | --stream NAME | --db ID [--prefix LABEL]) \
[--config PATH] [--region REGION]";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliArgs {
    /// Source from the command line; falls back to the config file when absent
    pub source: Option<LogSourceSpec>,
    pub config_path: Option<PathBuf>,
    pub region: Option<String>,
    pub help: bool,
}

/// Parse arguments, excluding the program name
pub fn parse_args(args: &[String]) -> Result<CliArgs> {
    let mut parsed = CliArgs::default();
    let mut db: Option<String> = None;
    let mut prefix: Option<String> = None;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        let mut value = || {
            iter.next()
                .cloned()
                .ok_or_else(|| anyhow!("{} requires a value", arg))
        };

        match arg.as_str() {
            "--group" => set_source(&mut parsed.source, LogSourceSpec::log_group(value()?))?,
            "--stream" => set_source(&mut parsed.source, LogSourceSpec::event_stream(value()?))?,
            "--db" => db = Some(value()?),
            "--prefix" => prefix = Some(value()?),
            "--config" => parsed.config_path = Some(PathBuf::from(value()?)),
            "--region" => parsed.region = Some(value()?),
            "-h" | "--help" => parsed.help = true,
            other => bail!("unexpected argument: {}", other),
        }
    }

    match db {
        Some(instance_id) => {
            let prefix = prefix.unwrap_or_else(|| instance_id.clone());
            set_source(
                &mut parsed.source,
                LogSourceSpec::database_instance(instance_id, prefix),
            )?;
        }
        None if prefix.is_some() => bail!("--prefix only applies to --db"),
        None => {}
    }

    Ok(parsed)
}

fn set_source(slot: &mut Option<LogSourceSpec>, spec: LogSourceSpec) -> Result<()> {
    if slot.is_some() {
        bail!("only one of --group, --stream or --db may be given");
    }
    *slot = Some(spec);
    Ok(())
}
