// command line interface

use crate::{Server, ServerConfig};
use clap::{Parser, Subcommand};
use miette::Result;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "allergyguard", about = "Allergy-aware meal companion backend")]
struct Cli {
    /// database connection url
    #[arg(
        long,
        short,
        env = "DATABASE_URL",
        default_value = "sqlite://allergyguard.db?mode=rwc",
        global = true
    )]
    db: String,

    /// api key for the gemini provider
    #[arg(long, short = 'k', env = "GEMINI_API_KEY", global = true)]
    api_key: Option<String>,

    /// chat model candidates, tried in order until one answers
    #[arg(
        long,
        env = "GEMINI_MODELS",
        value_delimiter = ',',
        default_value = "gemini-2.5-flash,gemini-flash-latest,gemini-pro,gemini-1.5-flash-8b",
        global = true
    )]
    models: Vec<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// start the http server
    Serve {
        /// port number
        #[arg(long, short, default_value = "5000")]
        port: u16,

        /// host to bind
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// signing secret for login tokens
        #[arg(long, env = "JWT_SECRET", default_value = "secret")]
        jwt_secret: String,

        /// admin username
        #[arg(long, env = "ADMIN_USER", default_value = "admin")]
        admin_user: String,

        /// admin password
        #[arg(long, env = "ADMIN_PASS", default_value = "admin")]
        admin_pass: String,

        /// shared key for admin api calls
        #[arg(long, env = "ADMIN_SECRET", default_value = "admin")]
        admin_key: String,
    },
}

pub async fn run() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            port,
            host,
            jwt_secret,
            admin_user,
            admin_pass,
            admin_key,
        } => {
            let config = ServerConfig {
                db_url: cli.db,
                host,
                port,
                api_key: cli.api_key,
                models: cli.models,
                jwt_secret,
                admin_user,
                admin_pass,
                admin_key,
            };

            Ok(Server::run(config).await?)
        }
    }
}
