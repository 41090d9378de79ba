//! Command-line front end for the country lookup client
//!
//! Every subcommand runs against an initialized `CountryManager` and returns
//! the text to print; `main` owns stdout, stderr and the exit code.

use clap::{Parser, Subcommand};
use common::errors::AppError;
use common::models::Country;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::currency::CurrencyClient;
use crate::manager::CountryManager;
use crate::render::{render_country, render_country_list, render_weather};
use crate::storage::{FileStore, KeyValueStore, MemoryStore};
use crate::weather::{WeatherClient, WeatherSummary};

/// Country lookup - country facts, neighbors, weather and currency conversion
#[derive(Parser, Debug)]
#[command(name = "country-lookup")]
#[command(about = "Look up countries, their neighbors, weather and exchange rates")]
#[command(version)]
pub struct Cli {
    /// Proxy base URL (overrides COUNTRY_PROXY_URL)
    #[arg(long, value_name = "URL")]
    pub proxy_url: Option<String>,

    /// Directory for the persisted country cache
    #[arg(long, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Keep the country cache in memory for this run only
    #[arg(long)]
    pub no_cache: bool,

    /// Debug logging on stderr
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show a country card and the weather in its capital
    Search { name: String },
    /// List the countries bordering a country
    Neighbors { name: String },
    /// Current weather at a coordinate pair
    Weather {
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,
        #[arg(long, allow_negative_numbers = true)]
        lon: f64,
    },
    /// Convert an amount between two currencies
    Convert {
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        #[arg(long, allow_negative_numbers = true)]
        amount: Option<f64>,
    },
    /// List the countries of a region, e.g. Europe
    Region { region: String },
    /// Find the country at a coordinate pair
    Locate {
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,
        #[arg(long, allow_negative_numbers = true)]
        lng: f64,
    },
}

impl Cli {
    pub fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::from_env();
        if let Some(proxy_url) = &self.proxy_url {
            config.proxy_url = proxy_url.clone();
        }
        config
    }

    pub fn store(&self) -> Arc<dyn KeyValueStore> {
        if self.no_cache {
            return Arc::new(MemoryStore::new());
        }
        if let Some(dir) = &self.cache_dir {
            return Arc::new(FileStore::with_dir(dir.clone()));
        }
        match FileStore::new() {
            Some(store) => Arc::new(store),
            None => {
                warn!("No cache directory available, caching in memory");
                Arc::new(MemoryStore::new())
            }
        }
    }
}

/// Runs one subcommand and returns its rendered output
pub async fn run(cli: &Cli) -> Result<String, AppError> {
    let config = cli.client_config();
    let manager = CountryManager::new(config.clone(), cli.store())?;

    match &cli.command {
        Command::Search { name } => {
            initialize(&manager).await;
            let country = manager.get_country(name).await?;
            let mut out = render_country(&country);

            if let Some(block) = capital_weather(&config, &country).await {
                out.push('\n');
                out.push_str(&block);
            }
            Ok(out)
        }
        Command::Neighbors { name } => {
            initialize(&manager).await;
            let country = manager.get_country(name).await?;
            let borders = country.borders();
            let neighbors = manager.get_neighbor_countries(&borders).await;
            let title = format!(
                "Neighbors of {}",
                country.common_name().unwrap_or(name.as_str())
            );
            Ok(render_country_list(&title, &neighbors))
        }
        Command::Weather { lat, lon } => {
            let weather = WeatherClient::new(config)?.get_weather(*lat, *lon).await?;
            Ok(render_weather(&WeatherSummary::from_response(&weather)?))
        }
        Command::Convert { from, to, amount } => {
            let conversion = CurrencyClient::new(config)?
                .convert(*amount, from, to)
                .await?;
            Ok(format!("{}\n", conversion))
        }
        Command::Region { region } => {
            let countries = manager.countries_by_region(region).await?;
            Ok(render_country_list(region, &countries))
        }
        Command::Locate { lat, lng } => {
            initialize(&manager).await;
            let name = manager.locate(*lat, *lng).await?;
            let country = manager.get_country(&name).await?;
            Ok(render_country(&country))
        }
    }
}

async fn initialize(manager: &CountryManager) {
    if !manager.initialize().await {
        warn!("Country list unavailable, falling back to direct lookups");
    }
}

/// Weather for the capital, or the country centre when the capital has no coordinates.
/// Failures only suppress the block.
async fn capital_weather(config: &ClientConfig, country: &Country) -> Option<String> {
    let (lat, lon) = country.capital_latlng().or_else(|| country.latlng())?;

    let result = match WeatherClient::new(config.clone()) {
        Ok(client) => client.get_weather(lat, lon).await,
        Err(e) => Err(e),
    };

    match result.and_then(|body| WeatherSummary::from_response(&body)) {
        Ok(summary) => Some(render_weather(&summary)),
        Err(e) => {
            debug!(error = %e, "Capital weather unavailable");
            None
        }
    }
}
