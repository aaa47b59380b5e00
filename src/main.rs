use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use subsift::app::AppContext;
use subsift::cli::{commands, Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("subsift=info")))
        .init();

    let cli = Cli::parse();
    let ctx = AppContext::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Crawl(args) => {
            commands::crawl(&ctx, args).await?;
        }
        Commands::Login {
            auth,
            session,
            headful,
        } => {
            commands::login(&ctx, &auth, session, headful).await?;
        }
        Commands::Fetch {
            url,
            session,
            comments,
        } => {
            commands::fetch(&ctx, &url, session, comments).await?;
        }
    }

    Ok(())
}
