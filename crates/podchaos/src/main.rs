use clap::{Parser, Subcommand, ValueEnum};
use podchaos_controller::{
    parse_duration, resolve_interval, ApiClient, ControllerConfig, MonkeyController,
};
use podchaos_core::{Monkey, Resource};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "podchaos", about = "Chaos monkey controller for Kubernetes pods")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the Monkey controller against a cluster
    Run {
        /// Kubernetes API server URL
        #[arg(long, env = "PODCHAOS_API_URL", default_value = "https://kubernetes.default.svc")]
        api_url: String,
        /// File holding the bearer token
        #[arg(
            long,
            env = "PODCHAOS_TOKEN_FILE",
            default_value = "/var/run/secrets/kubernetes.io/serviceaccount/token"
        )]
        token_file: String,
        /// PEM bundle used to verify the API server certificate
        #[arg(long, env = "PODCHAOS_CA_FILE")]
        ca_file: Option<String>,
        /// Only watch Monkeys in this namespace
        #[arg(long, env = "PODCHAOS_NAMESPACE")]
        namespace: Option<String>,
        /// How often Monkeys are re-listed
        #[arg(long, default_value = "10s", value_parser = parse_duration_arg)]
        resync_interval: Duration,
        /// Delay before retrying a failed reconcile
        #[arg(long, default_value = "5s", value_parser = parse_duration_arg)]
        error_backoff: Duration,
        /// Log output format
        #[arg(long, value_enum, default_value_t = LogFormat::Text)]
        log_format: LogFormat,
    },
    /// Validate a Monkey manifest and print what it would do
    Check {
        /// Path to the Monkey YAML manifest
        file: String,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> miette::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            api_url,
            token_file,
            ca_file,
            namespace,
            resync_interval,
            error_backoff,
            log_format,
        } => {
            init_tracing(log_format);
            let config = ControllerConfig {
                namespace,
                resync_interval,
                error_backoff,
            };
            run_controller(&api_url, &token_file, ca_file.as_deref(), config).await
        }
        Commands::Check { file } => {
            init_tracing(LogFormat::Text);
            let summary = check_manifest(Path::new(&file))?;
            println!("{}", summary);
            Ok(())
        }
    }
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn parse_duration_arg(value: &str) -> Result<Duration, String> {
    match parse_duration(value) {
        Ok(d) if d.is_zero() => Err("duration must be greater than zero".to_string()),
        Ok(d) => Ok(d),
        Err(e) => Err(e.to_string()),
    }
}

/// Run the Monkey controller until ctrl-c
async fn run_controller(
    api_url: &str,
    token_file: &str,
    ca_file: Option<&str>,
    config: ControllerConfig,
) -> miette::Result<()> {
    info!("Starting podchaos controller against {}", api_url);

    // A missing token file means the API server is reached without credentials
    let token = match std::fs::read_to_string(token_file) {
        Ok(token) => Some(token),
        Err(e) => {
            info!("No token loaded from '{}': {}", token_file, e);
            None
        }
    };
    let ca_pem = ca_file
        .map(|path| {
            std::fs::read(path)
                .map_err(|e| miette::miette!("Failed to read CA bundle '{}': {}", path, e))
        })
        .transpose()?;

    let client = Arc::new(ApiClient::with_auth(api_url, token, ca_pem.as_deref())?);
    let controller = MonkeyController::new(client, config);

    let token = CancellationToken::new();
    let controller_token = token.clone();
    let controller_handle = tokio::spawn(async move {
        if let Err(e) = controller.run(controller_token).await {
            error!("Monkey controller error: {}", e);
        }
    });

    tokio::signal::ctrl_c()
        .await
        .map_err(|e| miette::miette!("Failed to listen for ctrl-c: {}", e))?;

    info!("Shutting down gracefully...");
    token.cancel();

    let shutdown_timeout = Duration::from_secs(5);
    if tokio::time::timeout(shutdown_timeout, controller_handle)
        .await
        .is_err()
    {
        error!("Controller did not stop within {:?}", shutdown_timeout);
    }

    info!("Shutdown complete");
    Ok(())
}

/// Load and validate a Monkey manifest, describing the experiment it defines
fn check_manifest(path: &Path) -> miette::Result<String> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| miette::miette!("Failed to read '{}': {}", path.display(), e))?;
    let monkey: Monkey = podchaos_core::from_yaml(&text)?;

    monkey
        .validate()
        .map_err(|e| miette::miette!("Invalid monkey '{}': {}", path.display(), e))?;
    let selector = monkey.selector()?;
    let interval = resolve_interval(&monkey.spec.interval)?;

    let mode = if monkey.spec.noop {
        "noop (log only)"
    } else {
        "terminate"
    };
    let interval = if interval.is_zero() {
        "none (runs once per change)".to_string()
    } else {
        format!("{:?}", interval)
    };
    let selector = if selector.is_empty() {
        "<all pods>".to_string()
    } else {
        selector.to_string()
    };

    Ok(format!(
        "monkey:    {}\nnamespace: {}\nselector:  {}\ninterval:  {}\nmode:      {}",
        monkey.metadata.name.as_deref().unwrap_or_default(),
        monkey.target_namespace(),
        selector,
        interval,
        mode
    ))
}
