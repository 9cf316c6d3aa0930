use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use pd_core::registration::RegistrationInput;
use propdesk_lib::bootstrap::{init_tracing_subscriber, load_app_config, Backend};
use propdesk_lib::commands::{run_register, RegisterRequest};

#[derive(Parser)]
#[command(name = "propdesk")]
#[command(about = "Register a propdesk account and wait for email verification", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file (defaults to $PROPDESK_CONFIG, then <data dir>/propdesk/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an account and poll until its email is verified
    Register(RegisterArgs),
}

#[derive(Args)]
struct RegisterArgs {
    #[arg(long)]
    first_name: String,

    #[arg(long)]
    last_name: String,

    #[arg(long)]
    email: String,

    #[arg(long)]
    password: String,

    #[arg(long)]
    confirm_password: String,

    /// Use in-memory adapters instead of the remote services
    #[arg(long)]
    offline: bool,

    /// Offline only: report the email as verified on the Nth poll
    #[arg(long, requires = "offline")]
    auto_verify_after: Option<u32>,

    /// Do not print snapshots on stdout
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let config = load_app_config(cli.config)?;
    init_tracing_subscriber(&config.log_dir)?;

    match cli.command {
        Commands::Register(args) => {
            let backend = if args.offline {
                Backend::InMemory {
                    auto_verify_after: args.auto_verify_after,
                }
            } else {
                Backend::Remote
            };
            let request = RegisterRequest {
                input: RegistrationInput::new(
                    args.first_name,
                    args.last_name,
                    args.email,
                    args.password,
                    args.confirm_password,
                ),
                backend,
                print_snapshots: !args.quiet,
            };
            run_register(&config, request).await
        }
    }
}
