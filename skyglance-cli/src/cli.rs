use anyhow::{Context, Result, anyhow};
use clap::{Args, Parser, Subcommand};
use skyglance_core::{
    Config, Coordinates, Dashboard, FileStore, FixedPosition, IpLocator, LocationSource,
    NoLocation, SystemClock, Unit, WeatherService, provider_from_config, stored_unit,
};
use std::{sync::Arc, time::Duration};

use crate::render;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "skyglance", version, about = "Current weather with a one-hour cache")]
pub struct Cli {
    /// Log debug output to stderr (RUST_LOG takes precedence).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Set the API key, default cities and fallback city interactively.
    Configure,

    /// Show the current location and default cities.
    Home {
        #[command(flatten)]
        location: LocationArgs,
    },

    /// Show detailed weather for one city.
    Show {
        /// City name as understood by OpenWeather, e.g. "London" or "Paris,FR".
        city: String,
    },

    /// Print the selected unit, or switch it and refresh the home list.
    Unit {
        #[arg(value_parser = parse_unit)]
        unit: Option<Unit>,

        #[command(flatten)]
        location: LocationArgs,
    },

    /// Keep the home list on screen, refreshing on an interval until Ctrl-C.
    Watch {
        #[command(flatten)]
        location: LocationArgs,

        /// Refresh interval in seconds; defaults to the configured value (600).
        #[arg(long)]
        interval: Option<u64>,
    },
}

/// Where the current location comes from. Without flags there is none.
#[derive(Debug, Args)]
pub struct LocationArgs {
    /// Latitude of the current location.
    #[arg(long, requires = "lon", allow_negative_numbers = true)]
    lat: Option<f64>,

    /// Longitude of the current location.
    #[arg(long, requires = "lat", allow_negative_numbers = true)]
    lon: Option<f64>,

    /// Approximate the current location from the public IP address.
    #[arg(long, conflicts_with_all = ["lat", "lon"])]
    locate: bool,
}

impl LocationArgs {
    fn source(&self) -> Box<dyn LocationSource> {
        if let (Some(lat), Some(lon)) = (self.lat, self.lon) {
            return Box::new(FixedPosition(Coordinates::new(lat, lon)));
        }

        if self.locate {
            match IpLocator::new() {
                Ok(locator) => return Box::new(locator),
                Err(err) => tracing::warn!(error = %err, "IP locator unavailable"),
            }
        }

        Box::new(NoLocation)
    }
}

fn parse_unit(value: &str) -> Result<Unit, String> {
    Unit::try_from(value).map_err(|e| e.to_string())
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command {
            Command::Configure => configure(),
            Command::Home { location } => {
                let (config, service) = open_service()?;
                let dashboard = located_dashboard(&config, service, &location).await;
                println!("{}", render::render_dashboard(&dashboard.refresh().await));
                Ok(())
            }
            Command::Show { city } => show(&city).await,
            Command::Unit { unit, location } => match unit {
                None => {
                    println!("{}", stored_unit(&open_store()?));
                    Ok(())
                }
                Some(unit) => {
                    let (config, service) = open_service()?;
                    // Switch first so the location lookup already fetches in `unit`.
                    service.set_unit(unit).context("Failed to save unit")?;
                    let dashboard = located_dashboard(&config, service, &location).await;
                    println!("{}", render::render_dashboard(&dashboard.refresh_in(unit).await));
                    Ok(())
                }
            },
            Command::Watch { location, interval } => {
                let (config, service) = open_service()?;
                let period = interval
                    .filter(|secs| *secs > 0)
                    .map(Duration::from_secs)
                    .unwrap_or_else(|| config.refresh_interval());

                let dashboard = located_dashboard(&config, service, &location).await;
                let shutdown = async {
                    if let Err(err) = tokio::signal::ctrl_c().await {
                        tracing::warn!(error = %err, "failed to listen for Ctrl-C");
                        std::future::pending::<()>().await;
                    }
                };

                dashboard
                    .run(period, shutdown, |snapshot| {
                        println!("{}\n", render::render_dashboard(snapshot));
                    })
                    .await;
                Ok(())
            }
        }
    }
}

fn open_store() -> Result<FileStore> {
    let store_path = Config::store_file_path()?;
    FileStore::open(&store_path)
        .with_context(|| format!("Failed to open store: {}", store_path.display()))
}

fn open_service() -> Result<(Config, WeatherService)> {
    let config = Config::load()?;
    let provider = provider_from_config(&config)?;
    let store = open_store()?;

    let service = WeatherService::new(provider, Arc::new(store), Arc::new(SystemClock));
    Ok((config, service))
}

async fn located_dashboard(
    config: &Config,
    service: WeatherService,
    location: &LocationArgs,
) -> Dashboard {
    let mut dashboard = Dashboard::new(
        service,
        config.default_cities(),
        config.fallback_city(),
    );

    let source = location.source();
    dashboard.locate(source.as_ref()).await;
    dashboard
}

async fn show(city: &str) -> Result<()> {
    let city = city.trim();
    if city.is_empty() {
        return Err(anyhow!("City name must not be empty"));
    }

    let (_, service) = open_service()?;
    match service.get_weather(city).await {
        Ok(record) => {
            println!("{}", render::render_detail(&record));
            Ok(())
        }
        Err(err) => {
            tracing::debug!(city, error = %err, "lookup failed");
            Err(anyhow!(err.user_message()))
        }
    }
}

fn configure() -> Result<()> {
    let mut config = Config::load()?;

    let api_key = inquire::Password::new("OpenWeather API key:")
        .without_confirmation()
        .with_display_mode(inquire::PasswordDisplayMode::Masked)
        .prompt()
        .context("Failed to read API key")?;
    if !api_key.trim().is_empty() {
        config.set_api_key(api_key.trim().to_string());
    }

    let cities = inquire::Text::new("Default cities (comma separated):")
        .with_default(&config.default_cities().join(", "))
        .prompt()
        .context("Failed to read default cities")?;
    config.default_cities = Some(split_cities(&cities));

    let fallback = inquire::Text::new("Fallback city:")
        .with_default(config.fallback_city())
        .prompt()
        .context("Failed to read fallback city")?;
    config.fallback_city = Some(fallback.trim().to_string()).filter(|c| !c.is_empty());

    config.save()?;
    println!("Saved configuration to {}", Config::config_file_path()?.display());
    Ok(())
}

fn split_cities(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_owned)
        .collect()
}
