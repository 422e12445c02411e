use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::{self, ConfigError};
use crate::contract::ResultMetaDto;
use crate::core_service::{CoreService, ServiceError, SetupError};
use crate::settings::FileSettings;

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("setup error: {0}")]
    Setup(#[from] SetupError),
    #[error("service error: {0}")]
    Service(#[from] ServiceError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("encode error: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Search(Vec<String>),
    SubSearch {
        previous: Vec<String>,
        terms: Vec<String>,
    },
    Metas(Vec<String>),
    Activate(String),
    Serve,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliOptions {
    pub config_path: Option<PathBuf>,
    pub command: Command,
}

pub const USAGE: &str = "usage: pkgsearch-core [--config PATH] <search TERM...|subsearch [--previous ID...] -- TERM...|metas ID...|activate ID|serve>";

pub fn parse_cli_args(args: &[String]) -> Result<CliOptions, String> {
    let mut config_path = None;
    let mut rest = args;

    while let Some(first) = rest.first() {
        match first.as_str() {
            "--config" => {
                let path = rest
                    .get(1)
                    .ok_or_else(|| "--config requires a path".to_string())?;
                config_path = Some(PathBuf::from(path));
                rest = &rest[2..];
            }
            "-h" | "--help" => return Err(USAGE.to_string()),
            _ => break,
        }
    }

    let (name, operands) = rest
        .split_first()
        .ok_or_else(|| format!("missing command\n{USAGE}"))?;

    let command = match name.as_str() {
        "search" => Command::Search(operands.to_vec()),
        "subsearch" => parse_subsearch(operands)?,
        "metas" => Command::Metas(operands.to_vec()),
        "activate" => match operands {
            [id] => Command::Activate(id.clone()),
            _ => return Err("activate takes exactly one result id".to_string()),
        },
        "serve" if operands.is_empty() => Command::Serve,
        "serve" => return Err("serve takes no arguments".to_string()),
        other => return Err(format!("unknown command '{other}'\n{USAGE}")),
    };

    Ok(CliOptions {
        config_path,
        command,
    })
}

fn parse_subsearch(operands: &[String]) -> Result<Command, String> {
    let Some(split) = operands.iter().position(|arg| arg == "--") else {
        return Ok(Command::SubSearch {
            previous: Vec::new(),
            terms: operands.to_vec(),
        });
    };

    let (head, tail) = operands.split_at(split);
    let previous = match head.split_first() {
        None => Vec::new(),
        Some((flag, ids)) if flag == "--previous" => ids.to_vec(),
        Some((other, _)) => return Err(format!("unexpected subsearch argument '{other}'")),
    };

    Ok(Command::SubSearch {
        previous,
        terms: tail[1..].to_vec(),
    })
}

pub fn run_with_options(options: CliOptions) -> Result<(), RuntimeError> {
    let config = config::load(options.config_path.as_deref())?;
    if let Err(error) = crate::logging::init(&config.logs_dir(), config.level_filter()) {
        eprintln!("[pkgsearch-core] logging disabled: {error}");
    }
    log::info!(
        "startup command={:?} config_path={} cache_root={}",
        options.command,
        config.config_path.display(),
        config.cache_root.display(),
    );

    let settings_path = config.config_path.clone();
    let mut service = CoreService::new(config)?;
    if matches!(options.command, Command::Serve) {
        service = service.with_settings(Arc::new(FileSettings::new(settings_path)));
    }

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    execute(&service, options.command, &mut out)
}

/// Runs one command and prints its result: one id or one JSON meta per line.
pub fn execute<W: Write>(
    service: &CoreService,
    command: Command,
    out: &mut W,
) -> Result<(), RuntimeError> {
    match command {
        Command::Search(terms) => {
            for id in service.initial_search(&terms) {
                writeln!(out, "{id}")?;
            }
        }
        Command::SubSearch { previous, terms } => {
            for id in service.subsearch(&previous, &terms) {
                writeln!(out, "{id}")?;
            }
        }
        Command::Metas(ids) => {
            for meta in service.resolve_metas(&ids) {
                let dto = ResultMetaDto::from(meta);
                writeln!(out, "{}", serde_json::to_string(&dto)?)?;
            }
        }
        Command::Activate(id) => {
            service.activate(&id)?;
        }
        Command::Serve => {
            let stdin = std::io::stdin();
            serve(service, stdin.lock(), out)?;
        }
    }
    out.flush()?;
    Ok(())
}

/// Line-delimited JSON loop: one request per input line, one response per
/// output line, until the input closes.
pub fn serve<R: BufRead, W: Write>(
    service: &CoreService,
    input: R,
    out: &mut W,
) -> Result<usize, RuntimeError> {
    let mut handled = 0;
    for line in input.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let response = crate::transport::handle_json(service, &line);
        writeln!(out, "{response}")?;
        out.flush()?;
        handled += 1;
    }
    log::info!("input closed after {handled} requests");
    Ok(handled)
}
