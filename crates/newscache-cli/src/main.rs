//! newscache - local news and events in the terminal, readable offline.
//!
//! A thin front end over `newscache-core`: every command goes through the
//! same cache store, load guard and content service a graphical client
//! would use.

use std::io;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use newscache_core::utils::truncate_string;
use newscache_core::{
    CacheStore, Config, ContentItem, ContentService, Coordinates, HttpRemoteSource, LoadGuard,
};

/// Environment variable naming a directory for rolling log files
const LOG_DIR_ENV: &str = "NEWSCACHE_LOG_DIR";

/// Width of the title column in list output
const TITLE_WIDTH: usize = 60;

const USAGE: &str = "\
Usage:
  newscache get <collection> [--near LAT,LON] [--radius KM] [--json]
  newscache status <collection>
  newscache clear <collection>

Environment:
  NEWSCACHE_API_URL   base URL of the content API (overrides config)
  NEWSCACHE_LOG_DIR   also write daily log files to this directory
  RUST_LOG            log filter, e.g. RUST_LOG=debug";

#[derive(Debug, PartialEq)]
enum Command {
    Get {
        key: String,
        near: Option<Coordinates>,
        radius_km: Option<f64>,
        json: bool,
    },
    Status {
        key: String,
    },
    Clear {
        key: String,
    },
    Help,
}

/// Initialize the tracing subscriber for logging.
///
/// The returned guard flushes the file writer and must live until exit.
fn init_tracing() -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match std::env::var(LOG_DIR_ENV) {
        Ok(dir) if !dir.is_empty() => {
            let appender = tracing_appender::rolling::daily(dir, "newscache.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        _ => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let _log_guard = init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = match parse_args(&args) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("Error: {}\n\n{}", e, USAGE);
            std::process::exit(2);
        }
    };

    match command {
        Command::Help => println!("{}", USAGE),
        Command::Get {
            key,
            near,
            radius_km,
            json,
        } => {
            let config = Config::load()?;
            let store = open_store(&config)?;
            let guard = Arc::new(LoadGuard::new());
            let remote = HttpRemoteSource::new(config.api_base_url()?)?;
            let service = ContentService::new(store, guard, remote);
            let observer = near.or(config.default_location);

            let items = match (radius_km, observer) {
                (Some(radius), Some(observer)) => {
                    service.get_content_within(&key, observer, radius).await?
                }
                (Some(_), None) => bail!("--radius needs --near or a default_location in config"),
                (None, observer) => service.get_content(&key, observer).await?,
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&items)?);
            } else {
                print_items(&items);
                println!("\n{} items, updated {}", items.len(), service.age_display(&key));
            }
        }
        Command::Status { key } => {
            let stats = open_store(&Config::load()?)?.stats(&key);
            if !stats.available {
                println!("{}: nothing cached", key);
            } else {
                println!("{}:", key);
                println!("  items:     {}", stats.item_count);
                println!("  updated:   {}", stats.age_display());
                if let Some(freshness) = stats.freshness {
                    println!("  freshness: {}", freshness);
                }
                println!("  size:      {}", stats.size_display());
            }
        }
        Command::Clear { key } => {
            open_store(&Config::load()?)?.clear(&key)?;
            println!("Cleared cached {}", key);
        }
    }

    info!("newscache shutting down");
    Ok(())
}

fn open_store(config: &Config) -> Result<Arc<CacheStore>> {
    let cache_dir = config.cache_dir()?;
    info!(cache_dir = %cache_dir.display(), "Opening cache");

    let store = CacheStore::new(cache_dir)
        .context("Failed to open cache directory")?
        .with_policy(config.policy);
    Ok(Arc::new(store))
}

fn print_items(items: &[ContentItem]) {
    for item in items {
        let title = item.title().unwrap_or(item.id.as_str());
        let distance = item.distance_display().unwrap_or_default();
        println!(
            "{:<width$}  {:>8}",
            truncate_string(title, TITLE_WIDTH),
            distance,
            width = TITLE_WIDTH
        );
    }
}

fn parse_args(args: &[String]) -> Result<Command> {
    let Some(command) = args.first() else {
        return Ok(Command::Help);
    };
    let key = || -> Result<String> {
        args.get(1)
            .filter(|k| !k.starts_with("--"))
            .cloned()
            .context("Missing collection name")
    };

    match command.as_str() {
        "get" => {
            let key = key()?;
            let mut near = None;
            let mut radius_km = None;
            let mut json = false;
            let mut rest = args[2..].iter();
            while let Some(flag) = rest.next() {
                match flag.as_str() {
                    "--near" => {
                        let value = rest.next().context("--near needs LAT,LON")?;
                        near = Some(value.parse::<Coordinates>()?);
                    }
                    "--radius" => {
                        let value = rest.next().context("--radius needs a distance in km")?;
                        let radius: f64 = value
                            .parse()
                            .with_context(|| format!("Invalid radius: {}", value))?;
                        if !radius.is_finite() || radius < 0.0 {
                            bail!("Invalid radius: {}", value);
                        }
                        radius_km = Some(radius);
                    }
                    "--json" => json = true,
                    other => bail!("Unknown option: {}", other),
                }
            }
            Ok(Command::Get {
                key,
                near,
                radius_km,
                json,
            })
        }
        "status" => Ok(Command::Status { key: key()? }),
        "clear" => Ok(Command::Clear { key: key()? }),
        "help" | "--help" | "-h" => Ok(Command::Help),
        other => bail!("Unknown command: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_get_with_options() {
        let command =
            parse_args(&args(&["get", "news", "--near", "0.35,-78.12", "--radius", "5"])).unwrap();
        assert_eq!(
            command,
            Command::Get {
                key: "news".to_string(),
                near: Some(Coordinates {
                    latitude: 0.35,
                    longitude: -78.12
                }),
                radius_km: Some(5.0),
                json: false,
            }
        );
    }

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!(parse_args(&[]).unwrap(), Command::Help);
        assert_eq!(parse_args(&args(&["--help"])).unwrap(), Command::Help);
        assert_eq!(
            parse_args(&args(&["status", "events"])).unwrap(),
            Command::Status {
                key: "events".to_string()
            }
        );
        assert_eq!(
            parse_args(&args(&["clear", "news"])).unwrap(),
            Command::Clear {
                key: "news".to_string()
            }
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_args(&args(&["get"])).is_err());
        assert!(parse_args(&args(&["get", "--json"])).is_err());
        assert!(parse_args(&args(&["get", "news", "--near", "200,0"])).is_err());
        assert!(parse_args(&args(&["get", "news", "--radius", "-1"])).is_err());
        assert!(parse_args(&args(&["get", "news", "--bogus"])).is_err());
        assert!(parse_args(&args(&["fetch", "news"])).is_err());
    }
}
