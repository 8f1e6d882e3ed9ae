use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use gsheet_log_sink::scaffold::write_templates;

/// gsheet-log-sink setup tool.
#[derive(Parser)]
#[command(name = "gsheet-init", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Copy the example `.env` and `service_account.json` into the current directory.
    Init,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Init => {
            let cwd = std::env::current_dir().context("failed to read current directory")?;
            for result in write_templates(&cwd)
                .with_context(|| format!("failed to write templates into {}", cwd.display()))?
            {
                println!("{}", result);
            }
            println!("\nNow open `.env` and `service_account.json` and fill in your own settings.");
        }
    }

    Ok(())
}
