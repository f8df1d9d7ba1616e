//! Protobuf decompiler.
//!
//! Reads a serialized message without its `.proto` definition and prints
//! either an indented dump of its fields or an inferred schema.
//!
//! ```text
//! protodec --print message.bin
//! protodec --schema message.bin > inferred.proto
//! ```

use clap::Parser;
use protowire::config::ProtowireConfig;
use protowire::error::{CodecError, Result};
use protowire::raw::{infer_schema, to_text, RawMessage};
use protowire::utils::logging::{app_span, init_logging};
use protowire::utils::metrics::{global_metrics, Timer};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, error, info};

/// Decodes protocol-buffers messages without a schema.
#[derive(Parser, Debug)]
#[command(name = "protodec")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Print the decoded fields (default)
    #[arg(long, conflicts_with = "schema")]
    print: bool,

    /// Print an inferred .proto schema instead of the fields
    #[arg(long)]
    schema: bool,

    /// Path to configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level filter (overrides config; RUST_LOG overrides both)
    #[arg(long)]
    log_level: Option<String>,

    /// File holding one serialized message
    file: PathBuf,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(&cli) {
        Ok(output) => {
            let mut stdout = io::stdout().lock();
            if let Err(e) = stdout.write_all(output.as_bytes()).and_then(|()| stdout.flush()) {
                eprintln!("protodec: {e}");
                return ExitCode::FAILURE;
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(file = %cli.file.display(), error = %e, "Decompilation failed");
            eprintln!("protodec: {}: {e}", cli.file.display());
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<String> {
    let config = load_config(cli)?;
    init_logging(&config.logging)?;
    let _span = app_span(&config.logging).entered();
    debug!(?config, "Configuration loaded");

    let result = decompile(cli, &config);
    global_metrics().log_metrics();
    result
}

fn decompile(cli: &Cli, config: &ProtowireConfig) -> Result<String> {
    let data = std::fs::read(&cli.file)?;
    if data.is_empty() {
        return Err(CodecError::Io(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "file is empty",
        )));
    }
    if data.len() > config.codec.max_message_size {
        return Err(CodecError::OversizedMessage(data.len()));
    }

    let _timer = Timer::start("protodec");
    let message = match RawMessage::parse_with_limit(&data, config.codec.recursion_limit) {
        Ok(message) => {
            global_metrics().message_decoded(data.len() as u64);
            message
        }
        Err(e) => {
            global_metrics().decode_error();
            return Err(e);
        }
    };
    info!(
        file = %cli.file.display(),
        bytes = data.len(),
        fields = message.len(),
        "Parsed message"
    );

    if cli.print || !cli.schema {
        Ok(to_text(&message))
    } else {
        Ok(infer_schema(&message)?.to_proto())
    }
}

fn load_config(cli: &Cli) -> Result<ProtowireConfig> {
    let mut config = match &cli.config {
        Some(path) => ProtowireConfig::from_file(path)?,
        None => ProtowireConfig::default(),
    };
    config.apply_env()?;

    if let Some(level) = &cli.log_level {
        config.logging.log_level = level
            .parse()
            .map_err(|_| CodecError::ConfigError(format!("Invalid log level: {level}")))?;
    }

    config.validate_strict()?;
    Ok(config)
}
