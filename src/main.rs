use clap::{
    CommandFactory, Parser, Subcommand,
    builder::{
        Styles,
        styling::{AnsiColor, Effects},
    },
};
use clap_complete::{Shell, generate};
use tracing_subscriber::EnvFilter;

use sangeetam::{
    config::{self, Config, StoreBackend},
    error, info,
    server::{self, AppState},
    success, warning,
};

const DEFAULT_LOG_FILTER: &str = "sangeetam=info,tower_http=info";

fn styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::White.on_default() | Effects::BOLD)
        .usage(AnsiColor::White.on_default() | Effects::BOLD)
        .literal(AnsiColor::BrightBlue.on_default())
        .placeholder(AnsiColor::BrightGreen.on_default())
}

#[derive(Parser, Debug, Clone)]
#[clap(
  version = env!("CARGO_PKG_VERSION"),
  name=env!("CARGO_PKG_NAME"),
  bin_name=env!("CARGO_PKG_NAME"),
  about=env!("CARGO_PKG_DESCRIPTION"),
  styles=styles(),
)]
struct Cli {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the HTTP service
    Serve(ServeOptions),

    /// Get shell completions
    Completions(CompletionsOption),
}

#[derive(Parser, Debug, Clone)]
pub struct ServeOptions {
    /// Address to listen on, overrides SERVER_ADDRESS
    #[clap(long)]
    pub addr: Option<String>,

    /// Store backend (file or supabase), overrides STORE_BACKEND
    #[clap(long)]
    pub store: Option<StoreBackend>,
}

#[derive(Parser, Debug, Clone)]
pub struct CompletionsOption {
    shell: Shell,
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn serve(opt: ServeOptions) {
    let mut config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => error!("Invalid configuration. Err: {}", e),
    };
    if let Some(addr) = opt.addr {
        config.server_addr = addr;
    }
    if let Some(store) = opt.store {
        config.store = store;
    }

    if config.public_base_url.starts_with("http://")
        && !config.public_base_url.contains("localhost")
    {
        warning!(
            "PUBLIC_BASE_URL is not https, session cookies will not be marked Secure: {}",
            config.public_base_url
        );
    }

    info!("Store backend: {:?}", config.store);
    info!("Spotify redirect URI: {}", config.spotify.redirect_uri);
    success!("Starting service on http://{}", config.server_addr);

    let state = match AppState::new(config) {
        Ok(state) => state,
        Err(e) => error!("Cannot initialize service. Err: {}", e),
    };

    if let Err(e) = server::start_api_server(state).await {
        error!("Server stopped with an error. Err: {}", e);
    }
}

#[tokio::main]
async fn main() {
    if let Err(e) = config::load_env().await {
        error!("Cannot load environment. Err: {}", e);
    }

    let cli = Cli::parse();

    match cli.command {
        Command::Serve(opt) => {
            init_tracing();
            serve(opt).await
        }
        Command::Completions(opt) => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(opt.shell, &mut cmd, name, &mut std::io::stdout())
        }
    }
}
