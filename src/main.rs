use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::info;

use itembank_proxy::comms::local_api;
use itembank_proxy::config::Config;
use itembank_proxy::security::{Credentials, RequestSigner};
use itembank_proxy::utils::logging;
use itembank_proxy::workflows::signed_template_session;

#[derive(Parser)]
#[command(name = "itembank-proxy", version, about = "Signing proxy for the assessment Items and Data APIs")]
struct AppCli {
    /// Config file path (JSON); defaults apply when omitted
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP proxy (default)
    Serve {
        #[arg(long, default_value_t = 8000)]
        port: u16,
    },
    /// Print a signed Items API session init to stdout
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();

    let args = AppCli::parse();
    let config = Config::load(args.config.as_deref())?;
    let credentials = Credentials::from_env(&config).context("loading vendor credentials")?;

    match args.command.unwrap_or(Commands::Serve { port: 8000 }) {
        Commands::Serve { port } => {
            info!(
                port,
                domain = %config.domain,
                data_api = %config.data_api_url,
                "starting item bank proxy"
            );
            local_api::serve(config, credentials, port).await?;
        }
        Commands::Init => {
            let signer = RequestSigner::new(Arc::new(credentials));
            let envelope = signed_template_session(&signer, &config.session)?;
            println!("{}", serde_json::to_string_pretty(&envelope)?);
        }
    }

    Ok(())
}
