use std::process::ExitCode;

use anyhow::Context as _;
use clap::Parser as _;

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(err) = try_main().await {
        eprintln!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

async fn try_main() -> anyhow::Result<()> {
    chapterlist::logging::init("info").context("init logging")?;

    let cli = chapterlist::cli::Cli::parse();
    tracing::debug!(?cli, "parsed cli");

    match cli.command {
        chapterlist::cli::Command::Render(args) => {
            chapterlist::list::render(args).await.context("render")?;
        }
        chapterlist::cli::Command::Inspect(args) => {
            chapterlist::list::inspect(args).context("inspect")?;
        }
    }

    Ok(())
}
