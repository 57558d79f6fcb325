use crate::infra::{build_services, Services};
use crate::server;
use clap::{Args, Parser, Subcommand};
use movement::config::AppConfig;
use movement::error::AppError;
use movement::telemetry;
use movement::workflows::recovery::parse_entries;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "movement-api",
    about = "Run the movement membership API and its maintenance tasks",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Manage admin accounts
    Admin {
        #[command(subcommand)]
        command: AdminCommand,
    },
    /// Seed and dispatch member recovery invitations
    Recovery {
        #[command(subcommand)]
        command: RecoveryCommand,
    },
    /// Email delivery maintenance
    Email {
        #[command(subcommand)]
        command: EmailCommand,
    },
}

#[derive(Subcommand, Debug)]
enum AdminCommand {
    /// Create an admin account, or reset the password of an existing one
    Create(AdminCreateArgs),
}

#[derive(Subcommand, Debug)]
enum RecoveryCommand {
    /// Create pending recovery entries from a CSV with `email,type` columns
    Import(RecoveryImportArgs),
    /// Email a recovery link to every pending entry (or only the listed emails)
    SendInvites(SendInvitesArgs),
}

#[derive(Subcommand, Debug)]
enum EmailCommand {
    /// Pull the latest provider status for unsettled tracked emails
    Sync(EmailSyncArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

#[derive(Args, Debug)]
struct AdminCreateArgs {
    #[arg(long)]
    email: String,
    #[arg(long)]
    password: String,
    #[arg(long, default_value = "Administrator")]
    name: String,
    #[arg(long, default_value = "admin")]
    role: String,
}

#[derive(Args, Debug)]
struct RecoveryImportArgs {
    /// Path to the CSV file
    #[arg(long)]
    csv: PathBuf,
}

#[derive(Args, Debug, Default)]
struct SendInvitesArgs {
    /// Restrict dispatch to these addresses
    #[arg(long = "email")]
    emails: Vec<String>,
}

#[derive(Args, Debug)]
struct EmailSyncArgs {
    /// Maximum number of tracked emails to check
    #[arg(long, default_value_t = 100)]
    limit: usize,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Admin {
            command: AdminCommand::Create(args),
        } => {
            let services = bootstrap()?;
            services
                .auth
                .provision(&args.email, &args.password, &args.name, &args.role)?;
            println!("admin account {} is ready", args.email.trim().to_lowercase());
            Ok(())
        }
        Command::Recovery {
            command: RecoveryCommand::Import(args),
        } => {
            let services = bootstrap()?;
            let entries = parse_entries(BufReader::new(File::open(&args.csv)?))?;
            let outcome = services.recovery.bulk_create(entries);
            println!(
                "created {} recovery entries, {} failed",
                outcome.success.len(),
                outcome.failed.len()
            );
            for failed in &outcome.failed {
                println!("  {}: {}", failed.email, failed.error);
            }
            Ok(())
        }
        Command::Recovery {
            command: RecoveryCommand::SendInvites(args),
        } => {
            let services = bootstrap()?;
            let report = services.recovery.send_invites(&args.emails).await?;
            println!("{}", report.message);
            for failed in &report.failed {
                println!("  {}: {}", failed.email, failed.error);
            }
            Ok(())
        }
        Command::Email {
            command: EmailCommand::Sync(args),
        } => {
            let services = bootstrap()?;
            let report = services.email.sync_statuses(args.limit.max(1)).await?;
            println!(
                "checked {} emails, updated {}, {} failed",
                report.checked, report.updated, report.failed
            );
            Ok(())
        }
    }
}

fn bootstrap() -> Result<Services, AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;
    build_services(&config)
}
