use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgGroup, Parser};
use toolkit_bridge::{ToolkitClient, WasmHost};
use toolkit_config::{ConfigLoader, LogFormat, LoggingConfig, ToolkitConfig};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Decompile a transaction intent through a toolkit module", long_about = None)]
#[command(group(ArgGroup::new("intent_source").required(true).args(["intent", "intent_file"])))]
struct Args {
    /// Directory containing toolkit.toml
    #[arg(short, long, default_value = ".")]
    config_dir: PathBuf,

    /// Toolkit module path (overrides toolkit.module_path)
    #[arg(short, long)]
    module: Option<PathBuf>,

    /// Exported operation name (overrides toolkit.operation)
    #[arg(long)]
    operation: Option<String>,

    /// Compiled intent as hex
    #[arg(long)]
    intent: Option<String>,

    /// File holding the raw compiled intent bytes
    #[arg(long)]
    intent_file: Option<PathBuf>,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let config = match ConfigLoader::new(&args.config_dir).validate() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {:#}", e);
            return ExitCode::FAILURE;
        }
    };
    init_logging(&config.logging);

    let outcome = Outcome::from_result(run(&args, config));
    if let Some(manifest) = &outcome.stdout {
        println!("{}", manifest);
    }
    if let Some(message) = &outcome.stderr {
        eprintln!("{}", message);
    }
    ExitCode::from(outcome.code)
}

/// What the process prints and its exit code.
#[derive(Debug, PartialEq, Eq)]
struct Outcome {
    stdout: Option<String>,
    stderr: Option<String>,
    code: u8,
}

impl Outcome {
    // 失败只报告一次，写到 stderr
    fn from_result(result: Result<Option<String>>) -> Self {
        match result {
            Ok(Some(manifest)) => Self {
                stdout: Some(manifest),
                stderr: None,
                code: 0,
            },
            Ok(None) => Self {
                stdout: None,
                stderr: Some("Toolkit returned no manifest instructions".to_string()),
                code: 2,
            },
            Err(e) => Self {
                stdout: None,
                stderr: Some(format!("Error: {:#}", e)),
                code: 1,
            },
        }
    }
}

fn init_logging(logging: &LoggingConfig) {
    // RUST_LOG 优先于配置文件
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(logging.level.as_str()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

fn run(args: &Args, mut config: ToolkitConfig) -> Result<Option<String>> {
    if let Some(module) = &args.module {
        config.toolkit.module_path = module.clone();
    }
    if let Some(operation) = &args.operation {
        config.toolkit.operation = operation.clone();
    }

    let compiled_intent = load_intent(args)?;
    let module_bytes = read_module(&config.toolkit.module_path)?;
    tracing::info!(
        module = %config.toolkit.module_path.display(),
        operation = %config.toolkit.operation,
        intent_len = compiled_intent.len(),
        "Decompiling transaction intent"
    );

    let host = WasmHost::new(&config.host)?;
    let guest = host.instantiate(&module_bytes, &[config.toolkit.operation.as_str()])?;
    let mut client = ToolkitClient::new(guest)
        .with_operation(config.toolkit.operation.clone())
        .with_output_format(config.toolkit.output_format);

    Ok(client.decompile_unknown_intent(&compiled_intent)?)
}

fn read_module(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("Failed to read toolkit module from {:?}", path))
}

fn load_intent(args: &Args) -> Result<Vec<u8>> {
    match (&args.intent, &args.intent_file) {
        (Some(hex_text), _) => parse_intent_hex(hex_text),
        (None, Some(path)) => std::fs::read(path)
            .with_context(|| format!("Failed to read intent from {:?}", path)),
        (None, None) => anyhow::bail!("Either --intent or --intent-file is required"),
    }
}

fn parse_intent_hex(text: &str) -> Result<Vec<u8>> {
    let text = text.trim();
    let text = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text);
    hex::decode(text).context("Intent is not valid hex")
}
