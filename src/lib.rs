pub mod aggregate;
pub mod cli;
pub mod directory;
pub mod error;
pub mod extract;
pub mod report;
pub mod services;
pub mod snapshots;
pub mod source;
pub mod state;
pub mod types;
pub mod week;

use std::io;

use chrono::{NaiveDate, Utc};

use cli::{Cli, Commands};
use directory::Dashboard;
use error::FetchError;
use state::Session;
use types::Config;

/// Resolve the effective config: file (explicit or default path), then CLI overrides.
pub fn resolve_config(cli: &Cli) -> Result<Config, FetchError> {
    let mut config = match &cli.config {
        Some(path) => state::load_config_from(path).map_err(FetchError::Configuration)?,
        None => match state::load_config() {
            Ok(config) => config,
            Err(e) => {
                log::info!("{}. Using defaults.", e);
                Config::default()
            }
        },
    };

    if let Some(base_url) = &cli.base_url {
        config.base_url = base_url.clone();
        config.data_dir = None;
    }
    if let Some(dir) = &cli.data_dir {
        config.data_dir = Some(dir.display().to_string());
    }

    Ok(config)
}

/// Run one CLI command against a fresh session.
pub async fn run(cli: Cli) -> Result<(), FetchError> {
    let config = resolve_config(&cli)?;
    let today: NaiveDate = cli.as_of.unwrap_or_else(|| Utc::now().date_naive());
    let mut session = Session::from_config(config)?;
    let stdout = io::stdout();

    match cli.command {
        Commands::Countries => {
            let dashboard = Dashboard::load(&session).await?;
            if cli.json {
                report::write_json(stdout.lock(), &dashboard.directory)?;
            } else {
                report::write_countries(stdout.lock(), &dashboard.directory)?;
            }
        }
        Commands::Show { country } => {
            let dashboard = Dashboard::load(&session).await?;
            let code = dashboard
                .directory
                .resolve(&country)
                .unwrap_or(country.as_str())
                .to_string();
            let rows = dashboard.rows_for_country(&code);
            if cli.json {
                report::write_json(stdout.lock(), &rows)?;
            } else {
                let name = dashboard.directory.name(&code).unwrap_or(&code);
                report::write_rows(
                    stdout.lock(),
                    name,
                    &rows,
                    dashboard.current.last_updated(),
                )?;
            }
        }
        Commands::History {
            country,
            category,
            weeks,
            months,
        } => {
            let code = directory::resolve_country_code(&session, &country).await;
            let max_weeks = weeks.unwrap_or(session.config().max_weeks).max(1);
            let loaded = snapshots::load_weekly_data(&mut session, max_weeks, today).await;
            let series = if months {
                aggregate::build_month_series(loaded, &code, category.as_deref())
            } else {
                aggregate::build_series(loaded, &code, category.as_deref())
            };
            if cli.json {
                let summaries: Vec<_> = series.values().map(aggregate::summarize).collect();
                report::write_json(
                    stdout.lock(),
                    &serde_json::json!({ "series": series, "summaries": summaries }),
                )?;
            } else {
                let unit = if months { "months" } else { "value" };
                report::write_history(stdout.lock(), &series, unit)?;
            }
        }
        Commands::Weeks => {
            let files = snapshots::order_snapshot_files(
                snapshots::resolve_available_snapshot_files(&session, today).await,
            );
            if cli.json {
                report::write_json(stdout.lock(), &files)?;
            } else {
                report::write_weeks(stdout.lock(), &files)?;
            }
        }
        Commands::InCanada => {
            let services = snapshots::load_in_canada_services(&session, today).await?;
            if cli.json {
                report::write_json(stdout.lock(), &services)?;
            } else {
                report::write_services(stdout.lock(), &services)?;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_config_cli_overrides() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.json");
        std::fs::write(&path, r#"{ "maxWeeks": 5, "dataDir": "/srv/data" }"#).unwrap();

        let cli = Cli::try_parse_from([
            "proctime",
            "--config",
            path.to_str().unwrap(),
            "--base-url",
            "https://mirror.example.test/",
            "weeks",
        ])
        .unwrap();
        let config = resolve_config(&cli).unwrap();
        assert_eq!(config.max_weeks, 5);
        assert_eq!(config.base_url, "https://mirror.example.test/");
        assert!(config.data_dir.is_none());
    }

    #[test]
    fn test_resolve_config_explicit_missing_file_fails() {
        let cli = Cli::try_parse_from([
            "proctime",
            "--config",
            "/definitely/not/here.json",
            "weeks",
        ])
        .unwrap();
        assert!(matches!(
            resolve_config(&cli),
            Err(FetchError::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn test_run_history_against_data_dir() {
        let temp = TempDir::new().unwrap();
        let history = temp.path().join("history");
        std::fs::create_dir(&history).unwrap();
        std::fs::write(history.join("index.json"), r#"["2025-W01.json"]"#).unwrap();
        std::fs::write(
            history.join("2025-W01.json"),
            r#"{ "visitor": { "IN": "10 days" } }"#,
        )
        .unwrap();

        let cli = Cli::try_parse_from([
            "proctime",
            "--data-dir",
            temp.path().to_str().unwrap(),
            "--as-of",
            "2025-01-08",
            "history",
            "in",
        ])
        .unwrap();
        assert!(run(cli).await.is_ok());
    }
}
