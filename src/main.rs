use clap::{Parser, Subcommand};
use profile_auth::profile::ProfilePatch;
use profile_auth::session::SessionMonitor;
use profile_auth::{BackendConfig, StoreError, UserStore, connect};
use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("state encode failed: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "profile-auth", about = "Drive the app's auth store from the command line")]
struct Cli {
    /// Also print the raw backend session user.
    #[arg(long)]
    session: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Restore any existing session and print the state.
    Status,
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "AUTH_PASSWORD")]
        password: String,
    },
    Register {
        #[arg(long)]
        email: String,
        #[arg(long, env = "AUTH_PASSWORD")]
        password: String,
        #[arg(long)]
        name: String,
    },
    Logout,
    /// Sign in, then change display name or avatar.
    Profile {
        #[arg(long)]
        email: String,
        #[arg(long, env = "AUTH_PASSWORD")]
        password: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        avatar_url: Option<String>,
    },
}

/// Run one subcommand against the store. The caller prints the resulting
/// state before surfacing any error.
async fn run(store: &UserStore, command: Command) -> Result<(), StoreError> {
    match command {
        Command::Status => Ok(()),
        Command::Login { email, password } => store.login(&email, &password).await,
        Command::Register { email, password, name } => store.register(&email, &password, &name).await,
        Command::Logout => store.logout().await,
        Command::Profile { email, password, name, avatar_url } => {
            store.login(&email, &password).await?;
            store.update_profile(ProfilePatch { name, avatar_url }).await
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = BackendConfig::from_env();
    let backend = connect(&config);
    let store = UserStore::new(backend.clone(), &config);

    store.initialize().await;

    let result = run(&store, cli.command).await;

    println!("{}", serde_json::to_string_pretty(&store.state())?);

    if cli.session {
        let monitor = SessionMonitor::start(backend, config.is_configured).await;
        let snapshot = monitor.snapshot();
        println!("{}", serde_json::to_string_pretty(&snapshot.user)?);
    }

    result.map_err(CliError::from)
}

#[cfg(test)]
#[path = "main_test.rs"]
mod tests;
