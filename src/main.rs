pub mod config;
pub mod data;
pub mod fetch;
pub mod join;
pub mod projection;
pub mod render;
pub mod scale;
pub mod server;
pub mod tooltip;
pub mod topojson;
pub mod types;
pub mod view;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::error;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the regional data once and write the choropleth as SVG and HTML
    Render {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
    /// Serve the interactive map with the hover tooltip API
    Serve {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Render { config } => {
            println!("Rendering map with config: {:?}", config);
            let app_config = config::AppConfig::load_or_default(config)?;

            // 1. Load geometry
            let features = data::load_features(&app_config.geometry)?;
            let mut state = view::ViewState::new(
                features,
                app_config.palette.colors.clone(),
                app_config.palette.default_color.clone(),
            );

            // 2. Fetch both datasets; on failure the map keeps its default colors
            let fetcher = fetch::Fetcher::new(app_config.sources.clone());
            state = match fetcher.fetch().await {
                Ok(data) => state.apply(view::Event::DataLoaded(data)),
                Err(e) => {
                    error!(error = ?e, "failed to load regional data");
                    state.apply(view::Event::FetchFailed)
                }
            };

            // 3. Write SVG and HTML
            render::write_outputs(&app_config, &state)?;

            println!("Render complete!");
        }
        Commands::Serve { config } => {
            println!("Serving map with config: {:?}", config);
            let app_config = config::AppConfig::load_or_default(config)?;
            let features = data::load_features(&app_config.geometry)?;

            server::start_server(app_config, features).await?;
        }
    }

    Ok(())
}
