use anyhow::{Context, Result};
use azdo_build_definition::azdo::client::{format_azdo_error, AzdoClient};
use azdo_build_definition::config::Config;
use azdo_build_definition::resource::{self, build_definition_schema, ResourceData, ResourceError};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::Value;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

/// Manage Azure DevOps build definitions from resource state documents
#[derive(Parser, Debug)]
#[command(name = "azdo-build-definition", version, about, long_about = None)]
struct Args {
    /// Organization URL, e.g. https://dev.azure.com/my-org
    #[arg(long, global = true)]
    org_url: Option<String>,

    /// Personal access token
    #[arg(long, global = true)]
    token: Option<String>,

    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off", global = true)]
    log_level: LogLevel,

    /// Format of the state document written to stdout
    #[arg(long, value_enum, default_value = "json", global = true)]
    output: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the resource schema
    Schema,
    /// Create the definition described by a state document
    Create {
        /// State document (JSON, or YAML for .yml/.yaml files); `-` reads stdin
        #[arg(short, long, default_value = "-")]
        state: PathBuf,
    },
    /// Refresh a state document from the service
    Read {
        #[arg(short, long, default_value = "-")]
        state: PathBuf,
    },
    /// Replace the remote definition with the state document
    Update {
        #[arg(short, long, default_value = "-")]
        state: PathBuf,
    },
    /// Delete the definition named by a state document
    Delete {
        #[arg(short, long, default_value = "-")]
        state: PathBuf,
    },
    /// Import an existing definition given as <project>/<definitionID>
    Import { id: String },
    /// Store --org-url in the config file
    Configure,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Json,
    Yaml,
}

fn setup_logging(level: LogLevel) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let tracing_level = level.to_tracing_level()?;

    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file = match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Warning: cannot open log file {:?}: {}", log_path, e);
            return None;
        }
    };

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    // AZDO_LOG narrows or widens per-target filtering, e.g. `azdo_build_definition=trace`
    let filter = EnvFilter::try_from_env("AZDO_LOG")
        .unwrap_or_else(|_| EnvFilter::new(tracing_level.as_str().to_lowercase()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(non_blocking.with_max_level(tracing_level))
        .with_ansi(false)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("azdo-build-definition started with log level: {:?}", level);
    tracing::info!("Log file: {:?}", log_path);

    Some(guard)
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir
            .join("azdo-build-definition")
            .join("azdo-build-definition.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".azdo-build-definition").join("azdo-build-definition.log");
    }
    PathBuf::from("azdo-build-definition.log")
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let _log_guard = setup_logging(args.log_level);

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{:#}", err);
            eprintln!("Error: {}", describe_error(&err));
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let mut config = Config::load();
    let output = args.output;

    let d = match args.command {
        Command::Schema => {
            let schema = serde_json::to_value(build_definition_schema())?;
            return emit(&schema, output);
        }
        Command::Configure => {
            let org_url = args.org_url.context("configure needs --org-url")?;
            url::Url::parse(&org_url)
                .with_context(|| format!("Invalid organization URL: {}", org_url))?;
            config.set_org_url(&org_url)?;
            eprintln!("Saved organization URL to {:?}", Config::config_path());
            return Ok(());
        }
        Command::Create { state } => {
            let client = connect(&config, &args.org_url, &args.token)?;
            let mut d = load_state(&state)?;
            resource::create(&mut d, &client).await?;
            d
        }
        Command::Read { state } => {
            let client = connect(&config, &args.org_url, &args.token)?;
            let mut d = load_state(&state)?;
            resource::read(&mut d, &client).await?;
            d
        }
        Command::Update { state } => {
            let client = connect(&config, &args.org_url, &args.token)?;
            let mut d = load_state(&state)?;
            resource::update(&mut d, &client).await?;
            d
        }
        Command::Delete { state } => {
            let client = connect(&config, &args.org_url, &args.token)?;
            let mut d = load_state(&state)?;
            resource::delete(&mut d, &client).await?;
            d
        }
        Command::Import { id } => {
            let client = connect(&config, &args.org_url, &args.token)?;
            let mut d = ResourceData::with_id(&id);
            resource::import(&mut d, &client).await?;
            resource::read(&mut d, &client).await?;
            d
        }
    };

    emit(&d.to_value(), output)
}

/// Build a client from the effective organization URL and token
fn connect(config: &Config, org_url: &Option<String>, token: &Option<String>) -> Result<AzdoClient> {
    let org_url = config
        .effective_org_url(org_url.as_deref())
        .context("No organization URL configured. Set AZDO_ORG_SERVICE_URL or use --org-url")?;
    let token = config.effective_token(token.as_deref()).context(
        "No personal access token configured. Set AZDO_PERSONAL_ACCESS_TOKEN or use --token",
    )?;
    let client = AzdoClient::new(&org_url, &token)?;

    tracing::info!("Using organization: {}", client.org_url());
    Ok(client)
}

/// Read a state document from `path` (`-` for stdin) and decode it
fn load_state(path: &Path) -> Result<ResourceData> {
    let content = if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read state from stdin")?;
        buf
    } else {
        std::fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?
    };

    let is_yaml = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("yml") || e.eq_ignore_ascii_case("yaml"));

    let value: Value = if is_yaml {
        serde_yaml::from_str(&content).context("Failed to parse state YAML")?
    } else {
        serde_json::from_str(&content).context("Failed to parse state JSON")?
    };

    Ok(ResourceData::from_value(value)?)
}

fn emit(value: &Value, format: OutputFormat) -> Result<()> {
    let rendered = match format {
        OutputFormat::Json => serde_json::to_string_pretty(value)?,
        OutputFormat::Yaml => serde_yaml::to_string(value)?,
    };
    println!("{}", rendered.trim_end());
    Ok(())
}

/// User-facing message; remote failures get a status-based summary
fn describe_error(err: &anyhow::Error) -> String {
    match err.downcast_ref::<ResourceError>() {
        Some(ResourceError::RemoteApi { context, cause }) => {
            format!("{}: {}", context, format_azdo_error(cause))
        }
        Some(other) => other.to_string(),
        None => format!("{:#}", err),
    }
}
