// SPDX-License-Identifier: MIT
// Copyright (c) 2026 StarTuz

use anyhow::{bail, Context, Result};
use clap::Parser;
use film_map_core::geocode::{DEFAULT_MIN_DELAY, NOMINATIM_URL};
use film_map_core::render::{map_file_name, save_map};
use film_map_core::{find_nearby_films, Coordinate, NominatimGeocoder, SelectionPolicy, Throttled};
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the filming-locations dataset
    #[arg(default_value = "locations.list")]
    dataset: PathBuf,

    /// Release year to map (asked interactively when omitted)
    #[arg(short, long)]
    year: Option<u32>,

    /// Your position as "lat, long" (asked interactively when omitted)
    #[arg(short, long, allow_hyphen_values = true)]
    location: Option<String>,

    /// Directory that receives <year>_movies_map.html
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Base URL of the Nominatim service
    #[arg(long, default_value = NOMINATIM_URL)]
    geocoder_url: String,

    /// Minimum pause between geocoder requests, in milliseconds (at least 500)
    #[arg(long, default_value_t = 500)]
    min_delay_ms: u64,

    /// Geocoder attempts per location when the service is unavailable
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..=5))]
    attempts: u32,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    let mut input = io::stdin().lock();

    let year = match cli.year {
        Some(y) => validate_year(y)?,
        None => parse_year(&prompt(
            &mut input,
            "Please enter a year you would like to have a map for: ",
        )?)?,
    };
    let reference = match &cli.location {
        Some(loc) => parse_location(loc)?,
        None => parse_location(&prompt(
            &mut input,
            "Please enter your location (format: lat, long): ",
        )?)?,
    };

    println!("Map is generating...\nPlease wait...");

    let nominatim =
        NominatimGeocoder::new(&cli.geocoder_url).context("Failed to build geocoder client")?;
    let min_delay = Duration::from_millis(cli.min_delay_ms).max(DEFAULT_MIN_DELAY);
    let mut geocoder = Throttled::new(nominatim, min_delay);

    let policy = SelectionPolicy {
        attempts_per_region: cli.attempts,
        ..SelectionPolicy::default()
    };

    let candidates = find_nearby_films(&cli.dataset, year, reference, &mut geocoder, &policy)
        .with_context(|| format!("Could not process dataset {:?}", cli.dataset))?;

    save_map(&cli.output_dir, &candidates, reference, year)
        .with_context(|| format!("Could not save map to {:?}", cli.output_dir))?;

    println!(
        "Finished. Please have look at the map {}",
        map_file_name(year)
    );
    Ok(())
}

fn init_logging(verbose: u8) -> Result<()> {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    TermLogger::init(
        level,
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )
    .context("Failed to initialise logger")
}

fn prompt<R: BufRead>(input: &mut R, message: &str) -> Result<String> {
    print!("{}", message);
    io::stdout().flush()?;
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        bail!("Unexpected end of input");
    }
    Ok(line.trim().to_string())
}

fn validate_year(year: u32) -> Result<u32> {
    if year == 0 {
        bail!("Year must be a positive integer");
    }
    Ok(year)
}

fn parse_year(s: &str) -> Result<u32> {
    let year = s
        .trim()
        .parse::<u32>()
        .with_context(|| format!("'{}' is not a valid year", s.trim()))?;
    validate_year(year)
}

fn parse_location(s: &str) -> Result<Coordinate> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    if parts.len() != 2 {
        bail!("Expected location as 'lat, long', got '{}'", s);
    }
    let lat = parts[0]
        .parse::<f64>()
        .with_context(|| format!("'{}' is not a valid latitude", parts[0]))?;
    let lon = parts[1]
        .parse::<f64>()
        .with_context(|| format!("'{}' is not a valid longitude", parts[1]))?;

    let coord = Coordinate::new(lat, lon);
    if !coord.is_valid() {
        bail!("Location {}, {} is outside the valid range", lat, lon);
    }
    Ok(coord)
}
