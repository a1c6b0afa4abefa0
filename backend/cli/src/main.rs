mod check_digit_cmd;
mod doctor_cmd;
mod extract_cmd;
mod runtime;
mod serve_cmd;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};

use flexscan_core::IdentifierKind;

#[derive(Parser)]
#[command(name = "flexscan")]
#[command(about = "Flexscan: container load registration bot")]
#[command(version)]
struct Cli {
    /// Optional TOML config file; environment variables override it
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the Telegram bot
    Serve {
        /// Keep records in memory instead of the spreadsheet
        #[arg(long)]
        dry_run: bool,
    },
    /// Compute the check digit of a container code
    CheckDigit {
        /// Four letters and six digits, optionally followed by the check digit
        code: String,
    },
    /// Run identifier extraction on a local photo
    Extract {
        image: PathBuf,
        #[arg(long, value_enum, default_value_t = KindArg::Both)]
        kind: KindArg,
    },
    /// Print the effective configuration and its validation report
    Doctor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum KindArg {
    Container,
    Flex,
    Both,
}

impl KindArg {
    fn kinds(self) -> Vec<IdentifierKind> {
        match self {
            KindArg::Container => vec![IdentifierKind::Container],
            KindArg::Flex => vec![IdentifierKind::Flex],
            KindArg::Both => IdentifierKind::ALL.to_vec(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Serve { dry_run } => serve_cmd::run(config_path, dry_run).await,
        Commands::CheckDigit { code } => {
            println!("{}", check_digit_cmd::describe(&code)?);
            Ok(())
        }
        Commands::Extract { image, kind } => {
            extract_cmd::run(config_path, &image, &kind.kinds()).await
        }
        Commands::Doctor => doctor_cmd::run(config_path).await,
    }
}
