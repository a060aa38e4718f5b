//! Command-line entry point.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use crate::api::{serve, ApiContext, ServerError};
use crate::config::{Settings, APP_VERSION};
use crate::db::{AuditError, AuditLog};
use crate::models::ClinicalNoteRequest;
use crate::pipeline::{ClinicalPipeline, PipelineError};

#[derive(Parser, Debug)]
#[command(name = "clinical-ddx")]
#[command(about = "Differential diagnosis from unstructured clinical notes")]
#[command(version)]
pub struct Cli {
    /// Log level when RUST_LOG is unset
    #[arg(long, global = true, env = "LOG_LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Command {
    /// Run the HTTP API (default)
    Serve {
        /// Bind host, overrides API_HOST
        #[arg(long)]
        host: Option<String>,
        /// Bind port, overrides API_PORT
        #[arg(long)]
        port: Option<u16>,
    },

    /// Analyze one note and print the response as JSON
    Analyze {
        /// Note file, or `-` for stdin
        file: PathBuf,
        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error(transparent)]
    Audit(#[from] AuditError),
    #[error(transparent)]
    Server(#[from] ServerError),
    #[error("Invalid bind address: {0}")]
    Addr(#[from] std::net::AddrParseError),
    #[error("Failed to start async runtime: {0}")]
    Runtime(std::io::Error),
    #[error("Failed to encode response: {0}")]
    Json(#[from] serde_json::Error),
}

/// Parse arguments, run the chosen command, and map the outcome to an
/// exit code: 0 ok, 2 rejected note, 1 anything else.
pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let mut settings = Settings::from_env();
    if let Some(level) = &cli.log_level {
        settings.log_level = level.to_lowercase();
    }
    crate::init_tracing(&settings.log_level);

    let command = cli.command.unwrap_or(Command::Serve {
        host: None,
        port: None,
    });

    let result = match command {
        Command::Serve { host, port } => {
            if let Some(host) = host {
                settings.api_host = host;
            }
            if let Some(port) = port {
                settings.api_port = port;
            }
            run_server(&settings)
        }
        Command::Analyze { file, pretty } => run_analyze(&settings, &file, pretty),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(CliError::Pipeline(PipelineError::Validation(err))) => {
            eprintln!("Note rejected: {} ({})", err.message, err.suggestion);
            ExitCode::from(2)
        }
        Err(err) => {
            tracing::error!(error = %err, "Command failed");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

/// Build the pipeline before entering the runtime: the LLM and vector-store
/// clients are blocking and must not be created inside async context.
fn run_server(settings: &Settings) -> Result<(), CliError> {
    tracing::info!("clinical-ddx starting v{APP_VERSION}");

    let addr = settings.bind_addr()?;
    let pipeline = ClinicalPipeline::from_settings(settings)?;
    let audit = AuditLog::open(&settings.audit_db_path())?;
    let ctx = ApiContext::new(pipeline, audit).with_trusted_forwarding(settings.trust_forwarded_for);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;
    runtime.block_on(serve(ctx, &settings.cors_origins, addr))?;

    tracing::info!("clinical-ddx stopped");
    Ok(())
}

fn run_analyze(settings: &Settings, file: &Path, pretty: bool) -> Result<(), CliError> {
    let note = read_note(file)?;
    let pipeline = ClinicalPipeline::from_settings(settings)?;
    let response = pipeline.analyze(&ClinicalNoteRequest::text(&note))?;

    let json = if pretty {
        serde_json::to_string_pretty(&response)?
    } else {
        serde_json::to_string(&response)?
    };
    println!("{json}");
    Ok(())
}

fn read_note(file: &Path) -> Result<String, CliError> {
    let read_err = |source| CliError::Read {
        path: file.display().to_string(),
        source,
    };
    if file.as_os_str() == "-" {
        let mut note = String::new();
        std::io::stdin().read_to_string(&mut note).map_err(read_err)?;
        Ok(note)
    } else {
        std::fs::read_to_string(file).map_err(read_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn no_subcommand_defaults_to_serve() {
        let cli = Cli::try_parse_from(["clinical-ddx"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn serve_accepts_bind_overrides() {
        let cli = Cli::try_parse_from(["clinical-ddx", "serve", "--host", "127.0.0.1", "--port", "9000"]).unwrap();
        assert_eq!(
            cli.command,
            Some(Command::Serve {
                host: Some("127.0.0.1".into()),
                port: Some(9000),
            })
        );
    }

    #[test]
    fn analyze_takes_a_file() {
        let cli = Cli::try_parse_from(["clinical-ddx", "analyze", "note.txt", "--pretty"]).unwrap();
        assert_eq!(
            cli.command,
            Some(Command::Analyze {
                file: PathBuf::from("note.txt"),
                pretty: true,
            })
        );
    }

    #[test]
    fn read_note_from_file_and_missing_file() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        write!(tmp, "72F with sudden dyspnea").unwrap();
        assert_eq!(read_note(tmp.path()).unwrap(), "72F with sudden dyspnea");

        let err = read_note(Path::new("/nonexistent/note.txt")).unwrap_err();
        assert!(matches!(err, CliError::Read { .. }));
    }
}
