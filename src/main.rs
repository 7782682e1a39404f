//! Amity CLI entry point

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use amity::adapters::cli::ChatCli;
use amity::agent::build_agent;
use amity::auth::{AuthStore, GoogleAuthFlow};
use amity::chat::ChatOrchestrator;
use amity::config::Config;
use amity::memory::MemoryClient;
use amity::ui;

#[derive(Parser)]
#[command(name = "amity")]
#[command(about = "Amity - heart-centered AI companion for your terminal")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with Amity
    Chat {
        /// Single message instead of interactive mode
        #[arg(short, long)]
        message: Option<String>,
    },

    /// Sign in with Google
    Login,

    /// Sign out and forget the saved profile
    Logout,

    /// Show configuration and sign-in status
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    install_exit_guard();

    let cli = Cli::parse();

    // Configuration is validated before any command runs.
    let config = Config::from_env()?;

    match cli.command {
        Commands::Login => run_login(&config).await?,
        Commands::Logout => run_logout()?,
        Commands::Status => run_status(&config),
        Commands::Chat { message } => run_chat(&config, message).await?,
    }

    Ok(())
}

/// Require a second Ctrl+C within three seconds to exit.
fn install_exit_guard() {
    let exit_flag = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
    let flag = exit_flag.clone();

    ctrlc::set_handler(move || {
        if flag.load(std::sync::atomic::Ordering::SeqCst) {
            println!("\nTake care! 👋");
            std::process::exit(0);
        } else {
            println!("\nPress Ctrl+C again to exit");
            flag.store(true, std::sync::atomic::Ordering::SeqCst);

            let reset = flag.clone();
            std::thread::spawn(move || {
                std::thread::sleep(std::time::Duration::from_secs(3));
                reset.store(false, std::sync::atomic::Ordering::SeqCst);
            });
        }
    })
    .ok();
}

async fn run_login(config: &Config) -> Result<()> {
    let mut store = AuthStore::open();

    if let Some(profile) = store.resolve() {
        ui::print_step(&format!("Already signed in as {}", profile.email));
        ui::print_step("Run 'amity logout' first to switch accounts.");
        return Ok(());
    }

    let flow = GoogleAuthFlow::new(config);
    match flow.login().await {
        Ok(profile) => {
            let email = profile.email.clone();
            store.commit(profile);
            ui::print_success(&format!("Signed in as {email}"));
            ui::print_step("Chat: amity chat");
            Ok(())
        }
        Err(e) => {
            ui::print_error(&format!("Sign-in failed: {e}"));
            ui::print_step("Your sign-in state is unchanged. Try again with 'amity login'.");
            Err(e.into())
        }
    }
}

fn run_logout() -> Result<()> {
    let confirmed = inquire::Confirm::new("Sign out and forget the saved profile?")
        .with_default(true)
        .prompt()
        .unwrap_or(false);

    if confirmed {
        AuthStore::open().clear();
        ui::print_success("Signed out.");
    } else {
        ui::print_step("Logout cancelled.");
    }

    Ok(())
}

fn run_status(config: &Config) {
    let mut store = AuthStore::open();
    let profile = store.resolve();

    ui::print_header(
        &config.model,
        &config.provider.to_string(),
        profile.as_ref().map(|p| p.email.as_str()),
    );
    ui::print_step(&format!("Redirect URI: {}", config.oauth.redirect_uri));
    ui::print_step(&format!("Memory service: {}", config.memory.api_url));

    if profile.is_none() {
        ui::print_step("Sign in with 'amity login'.");
    }
}

async fn run_chat(config: &Config, message: Option<String>) -> Result<()> {
    let mut store = AuthStore::open();

    let Some(profile) = store.resolve() else {
        ui::print_warning("You're not signed in.");
        ui::print_step("Run 'amity login' to connect your Google account.");
        return Ok(());
    };

    ui::print_header(
        &config.model,
        &config.provider.to_string(),
        Some(&profile.email),
    );

    let agent = build_agent(config, Some(&profile))?;
    let memory = MemoryClient::new(config);
    let mut orchestrator = ChatOrchestrator::new(agent, store, Some(memory));
    orchestrator.prepare().await;

    let user_label = if profile.given_name.is_empty() {
        "You".to_string()
    } else {
        profile.given_name.clone()
    };
    let mut chat = ChatCli::new(orchestrator, user_label);

    match message {
        Some(message) => chat.run_turn(&message).await?,
        None => chat.run_interactive().await?,
    }

    Ok(())
}
