
use anyhow::{Context, Result};
use console::style;
use dialoguer::{Confirm, Input, Select};
use std::path::Path;

use super::{Config, ExpenseTrackerConfig, ServerConfig};
use crate::repositories::{ExpenseApi, HttpExpenseApi, RepositoryError};

const LOG_LEVEL_CHOICES: &[&str] = &["trace", "debug", "info", "warn", "error"];

#[inline]
pub fn run_interactive_config(config_dir: &Path) -> Result<()> {
    eprintln!("{}", style("🔧 Toolbox MCP Configuration Setup").bold().cyan());
    eprintln!();

    let mut config = load_existing_config(config_dir)?;

    eprintln!("{}", style("Server Settings").bold().yellow());
    configure_server(&mut config.server)?;

    eprintln!();
    eprintln!("{}", style("Expense Tracker Backend").bold().yellow());
    eprintln!("Configure the REST backend used by the expense_tracker tool.");
    eprintln!();

    configure_expense_tracker(&mut config.expense_tracker)?;

    if config.expense_tracker.enabled && config.expense_tracker.base_url.is_some() {
        eprintln!();
        eprintln!("{}", style("Testing configuration...").yellow());

        if test_backend_connection(&config.expense_tracker) {
            eprintln!("{}", style("✓ Backend connection successful!").green());
        } else {
            eprintln!(
                "{}",
                style("⚠ Warning: Could not reach the expense tracker backend").yellow()
            );
            eprintln!("You can continue, but expense_tracker calls will fail until it is reachable.");
        }
    }

    eprintln!();
    if Confirm::new()
        .with_prompt("Save configuration?")
        .default(true)
        .interact()?
    {
        config.save().context("Failed to save configuration")?;
        eprintln!("{}", style("✓ Configuration saved successfully!").green());
        eprintln!(
            "Configuration saved to: {}",
            style(config.config_file_path().display()).cyan()
        );
    } else {
        eprintln!("Configuration not saved.");
    }

    Ok(())
}

#[inline]
pub fn show_config(config_dir: &Path) -> Result<()> {
    let config = Config::load(config_dir).context("Failed to load configuration")?;

    eprintln!("{}", style("📋 Current Configuration").bold().cyan());
    eprintln!();

    eprintln!("{}", style("Server Settings:").bold().yellow());
    eprintln!("  Name: {}", style(&config.server.name).cyan());
    eprintln!("  Log Level: {}", style(&config.server.log_level).cyan());
    eprintln!("  Debug: {}", style(config.server.debug).cyan());

    eprintln!();
    eprintln!("{}", style("Expense Tracker Settings:").bold().yellow());
    eprintln!("  Enabled: {}", style(config.expense_tracker.enabled).cyan());
    match config.expense_tracker.parsed_base_url() {
        Some(url) => eprintln!("  Base URL: {}", style(url).cyan()),
        None => eprintln!("  Base URL: {}", style("Not configured").red()),
    }
    eprintln!(
        "  Timeout: {}s",
        style(config.expense_tracker.timeout_seconds).cyan()
    );
    match &config.expense_tracker.ssm_parameter {
        Some(parameter) => eprintln!(
            "  SSM Parameter: {} ({})",
            style(parameter).cyan(),
            config.expense_tracker.ssm_region
        ),
        None => eprintln!("  SSM Parameter: {}", style("Disabled").dim()),
    }

    eprintln!();
    eprintln!(
        "Config file: {}",
        style(config.config_file_path().display()).dim()
    );

    Ok(())
}

fn load_existing_config(config_dir: &Path) -> Result<Config> {
    Config::load_file(config_dir).map_or_else(
        |_| {
            eprintln!(
                "{}",
                style("No existing configuration found. Using defaults.").yellow()
            );
            Ok(Config {
                base_dir: config_dir.to_path_buf(),
                ..Config::default()
            })
        },
        |config| {
            eprintln!("{}", style("Found existing configuration.").green());
            Ok(config)
        },
    )
}

fn configure_server(server: &mut ServerConfig) -> Result<()> {
    let name: String = Input::new()
        .with_prompt("Server name")
        .default(server.name.clone())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Server name cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let default_index = LOG_LEVEL_CHOICES
        .iter()
        .position(|&level| level == server.filter_directive())
        .unwrap_or(2);

    let level_index = Select::new()
        .with_prompt("Log level")
        .default(default_index)
        .items(LOG_LEVEL_CHOICES)
        .interact()?;

    let debug = Confirm::new()
        .with_prompt("Enable debug logging?")
        .default(server.debug)
        .interact()?;

    server.set_name(name)?;
    server.set_log_level(LOG_LEVEL_CHOICES[level_index].to_string())?;
    server.debug = debug;

    Ok(())
}

fn configure_expense_tracker(expense: &mut ExpenseTrackerConfig) -> Result<()> {
    expense.enabled = Confirm::new()
        .with_prompt("Enable the expense_tracker tool?")
        .default(expense.enabled)
        .interact()?;

    if !expense.enabled {
        return Ok(());
    }

    let base_url: String = Input::new()
        .with_prompt("Backend base URL (leave empty to rely on BASE_URL or SSM)")
        .default(expense.base_url.clone().unwrap_or_default())
        .allow_empty(true)
        .validate_with(|input: &String| -> Result<(), String> {
            let mut candidate = ExpenseTrackerConfig::default();
            candidate
                .set_base_url(Some(input.clone()))
                .map_err(|e| e.to_string())
        })
        .interact_text()?;

    let timeout_seconds: u64 = Input::new()
        .with_prompt("Request timeout (seconds)")
        .default(expense.timeout_seconds)
        .validate_with(|input: &u64| -> Result<(), &str> {
            if (1..=300).contains(input) {
                Ok(())
            } else {
                Err("Timeout must be between 1 and 300 seconds")
            }
        })
        .interact_text()?;

    expense.set_base_url(Some(base_url))?;
    expense.set_timeout_seconds(timeout_seconds)?;

    Ok(())
}

/// `GET /types` against the configured backend. Any HTTP answer counts as
/// reachable.
fn test_backend_connection(expense: &ExpenseTrackerConfig) -> bool {
    let api = HttpExpenseApi::from_config(expense);

    match api.list_types() {
        Ok(_) | Err(RepositoryError::Status { .. } | RepositoryError::Decode(_)) => true,
        Err(RepositoryError::NotConfigured | RepositoryError::Transport(_)) => false,
    }
}
