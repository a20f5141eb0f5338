mod args;

use std::{
    io::{self, Write},
    process::ExitCode,
};

use anyhow::Context;
use clap::Parser;
use tether_core::{Config, Error, Invocation, Record};
use tether_session::{Dispatcher, Outcome};
use tether_ssh::Multiplexer;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::args::{Cli, Operands};

/// Exit code for bad invocations and configuration.
const USAGE_EXIT: u8 = 2;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(err) = init_logging() {
        eprintln!("tether: {err:#}");
        return ExitCode::from(USAGE_EXIT);
    }

    let config = match load_config(cli.json) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("tether: {err:#}");
            return ExitCode::from(USAGE_EXIT);
        }
    };

    let json = config.json_output;
    let operands = cli.verb.operands(&config);
    let result = match cli.verb.resolve(&config) {
        Ok(invocation) => execute(config, &invocation).await,
        Err(err) => Err(err),
    };

    let code = report(
        result,
        &operands,
        json,
        &mut io::stdout().lock(),
        &mut io::stderr().lock(),
    );
    ExitCode::from(code.unwrap_or(1))
}

async fn execute(config: Config, invocation: &Invocation) -> Result<Outcome, Error> {
    let transport = Multiplexer::new(config)?;
    let config = transport.config().clone();
    Dispatcher::new(transport, &config)
        .dispatch(invocation)
        .await
}

fn init_logging() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_env("TETHER_LOG").or_else(|_| EnvFilter::try_new("warn"))?;
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .context("failed to install logger")
}

fn load_config(json_flag: bool) -> anyhow::Result<Config> {
    let mut config = Config::from_env().context("failed to read TETHER_* overrides")?;
    if json_flag {
        config.json_output = true;
    }
    tracing::debug!(
        config = %serde_json::to_string(&config).unwrap_or_default(),
        "resolved configuration"
    );
    Ok(config)
}

/// Print the outcome of one invocation and return the process exit code.
///
/// Records go to `out`; in human mode diagnostics go to `err`. In JSON mode
/// a failure is one `ok: false` record on `out`.
fn report(
    result: Result<Outcome, Error>,
    operands: &Operands<'_>,
    json: bool,
    out: &mut impl Write,
    err: &mut impl Write,
) -> io::Result<u8> {
    match result {
        Ok(Outcome::Record(record)) => {
            write_record(&record, json, out)?;
            Ok(0)
        }
        Ok(Outcome::Exit(status)) => Ok(attach_exit_code(status)),
        Err(error) => {
            tracing::debug!(?error, "invocation failed");
            if json {
                let record = Record::failure(
                    operands.verb,
                    operands.alias,
                    operands.destination,
                    operands.port,
                    &error,
                );
                write_record(&record, true, out)?;
            } else {
                writeln!(err, "tether: {error}")?;
            }
            Ok(error.exit_code())
        }
    }
}

fn write_record(record: &Record, json: bool, out: &mut impl Write) -> io::Result<()> {
    if json {
        let line = record.to_json_line().map_err(io::Error::other)?;
        writeln!(out, "{line}")
    } else {
        writeln!(out, "{}", record.to_human())
    }
}

/// Remote attach status as a process exit code; out-of-range values become 1.
fn attach_exit_code(status: i32) -> u8 {
    u8::try_from(status).unwrap_or(1)
}
