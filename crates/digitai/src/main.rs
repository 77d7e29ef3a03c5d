//! Command-line companion for the DigitAI demo.
//!
//! # Examples
//!
//! ```sh
//! # Print the persona generated for a business
//! digitai prompt --name "Clínica X" --services "Consultas" --category clinica_geral
//!
//! # Chat with the persona through a running relay (digitai-web)
//! digitai demo --name "Clínica X" --services "Consultas" --relay-url http://127.0.0.1:3001
//!
//! # Generate PWA icons, splash screens and the manifest
//! digitai assets --out public
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use digitai::Role;
use digitai::profile::{BusinessCategory, BusinessProfile};
use digitai::prompt::compose_system_prompt;
use digitai::relay::RelayClient;
use digitai::session::DemoSession;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(name = "digitai", about = "DigitAI WhatsApp agent demo tools")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the system prompt composed for a business profile
    Prompt(ProfileArgs),
    /// Chat with the generated agent through a relay server
    Demo {
        #[command(flatten)]
        profile: ProfileArgs,

        /// Base URL of the relay server
        #[arg(long, env = "RELAY_URL", default_value = "http://127.0.0.1:3001")]
        relay_url: String,
    },
    /// List the available business categories
    Categories,
    /// Render PNG icons and splash screens and write the web manifest
    Assets {
        /// Output directory (e.g. the frontend's `public/`)
        #[arg(long, default_value = "public")]
        out: PathBuf,
    },
}

#[derive(Args)]
struct ProfileArgs {
    /// Business name
    #[arg(long)]
    name: String,

    /// Business category key (see `digitai categories`)
    #[arg(long, default_value = "dermatologia")]
    category: BusinessCategory,

    /// Main services offered
    #[arg(long)]
    services: String,

    /// Opening hours
    #[arg(long, default_value = "")]
    hours: String,

    /// What sets the business apart
    #[arg(long, default_value = "")]
    differentials: String,

    /// City / region
    #[arg(long, default_value = "")]
    location: String,
}

impl From<ProfileArgs> for BusinessProfile {
    fn from(args: ProfileArgs) -> Self {
        Self {
            name: args.name,
            category: args.category,
            services: args.services,
            hours: args.hours,
            differentials: args.differentials,
            location: args.location,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), String> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Prompt(args) => {
            let profile = BusinessProfile::from(args);
            profile.validate().map_err(|e| e.to_string())?;
            println!("{}", compose_system_prompt(&profile));
        }
        Command::Categories => {
            for category in BusinessCategory::ALL {
                println!("{:<14} {}", category.key(), category.label());
            }
        }
        Command::Assets { out } => {
            let written = digitai::assets::write_assets(&out).map_err(|e| e.to_string())?;
            println!("Wrote {} files under {}", written.len(), out.display());
        }
        Command::Demo { profile, relay_url } => {
            run_demo(profile.into(), &relay_url).await?;
        }
    }

    Ok(())
}

/// Interactive terminal chat. `/voltar` restarts the conversation, `/sair` quits.
async fn run_demo(profile: BusinessProfile, relay_url: &str) -> Result<(), String> {
    let relay = RelayClient::new(relay_url).map_err(|e| e.to_string())?;
    let mut session = DemoSession::with_profile(profile);
    session.start_chat().map_err(|e| e.to_string())?;

    println!("{} · Agente de IA - Demo ({})\n", session.profile().name, relay.url());
    print_new_turns(&session, 0);
    print_suggestions(&session);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.map_err(|e| e.to_string())? {
        match line.trim() {
            "/sair" => break,
            "/voltar" => {
                session.back_to_setup();
                session.start_chat().map_err(|e| e.to_string())?;
                print_new_turns(&session, 0);
                print_suggestions(&session);
                continue;
            }
            _ => {}
        }

        let seen = session.transcript().len();
        if session.submit(&relay, &line).await {
            // The user's own turn is already on screen.
            print_new_turns(&session, seen + 1);
        }
    }

    Ok(())
}

fn print_new_turns(session: &DemoSession, from: usize) {
    for turn in session.transcript().iter().skip(from) {
        let who = match turn.role {
            Role::User => "Você",
            Role::Assistant => "Agente",
        };
        println!("{who}: {}\n", turn.content);
    }
}

fn print_suggestions(session: &DemoSession) {
    let suggestions = session.suggestions();
    if !suggestions.is_empty() {
        println!("Sugestões de perguntas:");
        for s in suggestions {
            println!("  - {s}");
        }
        println!();
    }
}
