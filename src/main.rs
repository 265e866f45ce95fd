// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.


mod backend;
mod config;
mod location;
mod shell;
mod sources;

use campus_map::{CampusMap, HeadlessMap};
use chrono::Local;
use clap::{Parser, Subcommand};
use log::warn;

use crate::config::AppConfig;
use crate::sources::{ConfiguredLocation, ConfiguredProvider};

#[derive(Parser, Debug)]
#[command(author, version, about = "Interactive campus map with room search")]
struct Args {
    /// Override the configured data source with a backend URL
    #[arg(long)]
    backend_url: Option<String>,

    /// Skip geolocation and keep the provider's order
    #[arg(long)]
    no_location: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List buildings and their rooms
    Buildings,

    /// List buildings with a room number containing QUERY
    Search {
        /// Case-insensitive room number fragment
        query: String,
    },

    /// Interactive map session
    Shell,

    /// Print the configuration file location
    ConfigPath,
}

fn load_config(args: &Args) -> AppConfig {
    let mut config = AppConfig::load().unwrap_or_else(|e| {
        warn!("Failed to load config, using defaults: {}", e);
        AppConfig::default()
    });
    apply_overrides(&mut config, args);
    config
}

fn apply_overrides(config: &mut AppConfig, args: &Args) {
    if let Some(url) = &args.backend_url {
        config.data_source = config::DataSource::Http;
        config.backend_url.clone_from(url);
    }
    if args.no_location {
        config.location_source = config::LocationSource::Disabled;
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    if let Command::ConfigPath = args.command {
        println!("{}", AppConfig::get_config_path()?.display());
        return Ok(());
    }

    let config = load_config(&args);
    let provider = ConfiguredProvider::from_config(&config)?;
    let location = ConfiguredLocation::from_config(&config);

    let mut session = CampusMap::<HeadlessMap>::mount(config.session_config());
    if !session.snapshot().map_available {
        warn!(
            "No map access token; set {} or access_token in {}",
            config::ACCESS_TOKEN_ENV,
            AppConfig::get_config_path()?.display()
        );
    }
    println!("{}", shell::render_list(&session.snapshot(), Local::now().time()));
    session.load(&provider, &location).await;

    match args.command {
        Command::Buildings => {
            println!("{}", shell::render_list(&session.snapshot(), Local::now().time()));
        }
        Command::Search { query } => {
            session.on_search_input(&query);
            println!("{}", shell::render_search(&session, Local::now().time()));
        }
        Command::Shell => shell::run(session).await?,
        Command::ConfigPath => {}
    }

    Ok(())
}
