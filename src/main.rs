use anyhow::Result;
use clap::Parser;
use serde::Serialize;
use skafos::error::is_auth_error;
use skafos::models::{DeploySpec, DeployVersion};
use skafos::runtime::RealRuntime;
use skafos::{Client, ClientConfig, ParamOverrides};
use std::path::PathBuf;
use std::time::Duration;

/// skafos - manage Skafos model versions
///
/// Upload, fetch, list and deploy versions of a model hosted on Skafos.
///
/// Connection values not given as options are read from SKAFOS_API_TOKEN,
/// SKAFOS_ORG_NAME, SKAFOS_APP_NAME and SKAFOS_MODEL_NAME.
///
/// Examples:
///   skafos upload model.mlmodel -d "first cut"
///   skafos fetch --version 3
///   skafos deploy --version latest --environment prod
#[derive(Parser, Debug)]
#[command(author, version = skafos::version(), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Skafos API token (also via SKAFOS_API_TOKEN)
    #[arg(long, value_name = "TOKEN", global = true)]
    pub token: Option<String>,

    /// Organization name (also via SKAFOS_ORG_NAME)
    #[arg(long, value_name = "ORG", global = true)]
    pub org: Option<String>,

    /// App name (also via SKAFOS_APP_NAME)
    #[arg(long, value_name = "APP", global = true)]
    pub app: Option<String>,

    /// Model name (also via SKAFOS_MODEL_NAME)
    #[arg(long, value_name = "MODEL", global = true)]
    pub model: Option<String>,

    /// Skafos API URL (defaults to https://api.skafos.ai/v2)
    #[arg(long = "api-url", env = "SKAFOS_API_URL", value_name = "URL", global = true)]
    pub api_url: Option<String>,

    /// Skafos download URL (defaults to https://download.skafos.ai/v2)
    #[arg(
        long = "download-url",
        env = "SKAFOS_DOWNLOAD_URL",
        value_name = "URL",
        global = true
    )]
    pub download_url: Option<String>,

    /// Timeout for each HTTP request, in seconds
    #[arg(long, value_name = "SECONDS", global = true)]
    pub timeout: Option<u64>,
}

impl Cli {
    fn overrides(&self) -> ParamOverrides {
        ParamOverrides {
            api_token: self.token.clone(),
            org_name: self.org.clone(),
            app_name: self.app.clone(),
            model_name: self.model.clone(),
        }
    }

    fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::default();
        if let Some(url) = &self.api_url {
            config = config.with_api_url(url.as_str());
        }
        if let Some(url) = &self.download_url {
            config = config.with_download_url(url.as_str());
        }
        if let Some(secs) = self.timeout {
            config = config.with_timeout(Duration::from_secs(secs));
        }
        config
    }
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Package files and upload them as a new model version
    Upload(UploadArgs),

    /// Download a model version into <model>.zip
    Fetch(FetchArgs),

    /// List the versions of a model
    Versions,

    /// List the environments a model can be deployed to
    Environments,

    /// Deploy a model version to an environment
    Deploy(DeployArgs),

    /// Show every organization, app and model the token can access
    Summary(SummaryArgs),

    /// Print the SDK version
    Version,
}

#[derive(clap::Args, Debug)]
pub struct UploadArgs {
    /// Files or directories to package
    #[arg(value_name = "PATH", required = true)]
    pub files: Vec<PathBuf>,

    /// Description of this version (at most 255 characters)
    #[arg(long, short)]
    pub description: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct FetchArgs {
    /// Version to download (defaults to the latest)
    #[arg(long)]
    pub version: Option<u64>,
}

#[derive(clap::Args, Debug)]
pub struct DeployArgs {
    /// Version number or "latest"
    #[arg(long, default_value = "latest")]
    pub version: DeployVersion,

    /// Target environment
    #[arg(long, short, default_value = "dev")]
    pub environment: String,
}

#[derive(clap::Args, Debug)]
pub struct SummaryArgs {
    /// Nest models under their app and organization
    #[arg(long)]
    pub compact: bool,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    if let Commands::Version = cli.command {
        println!("{}", skafos::version());
        return Ok(());
    }

    let client = Client::new(RealRuntime, cli.client_config())?;
    let overrides = cli.overrides();

    match cli.command {
        Commands::Upload(args) => {
            let params = client.connection(&overrides)?;
            let uploaded = client
                .upload_version(args.files, args.description.as_deref(), &params)
                .await?;
            print_json(&uploaded)
        }
        Commands::Fetch(args) => {
            let params = client.connection(&overrides)?;
            print_json(&client.fetch_version(args.version, &params).await?)
        }
        Commands::Versions => {
            let params = client.connection(&overrides)?;
            print_json(&client.list_versions(&params).await?)
        }
        Commands::Environments => {
            let params = client.connection(&overrides)?;
            print_json(&client.list_environments(&params).await?)
        }
        Commands::Deploy(args) => {
            let params = client.connection(&overrides)?;
            let spec = DeploySpec::new(args.version, args.environment);
            print_json(&client.deploy_version(&spec, &params).await?)
        }
        Commands::Summary(args) => {
            print_json(&client.summary(cli.token.as_deref(), args.compact).await?)
        }
        Commands::Version => Ok(()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    let result = run(cli).await;
    if let Err(err) = &result
        && is_auth_error(err)
    {
        log::warn!("Check your Skafos API token, or set SKAFOS_API_TOKEN.");
    }
    result
}
