use clap::{Parser, Subcommand};
use std::path::PathBuf;
use toolbox_mcp::Result;
use toolbox_mcp::commands::{call_tool, list_tools, serve_mcp};
use toolbox_mcp::config::{Config, run_interactive_config, show_config};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "toolbox-mcp")]
#[command(about = "MCP server exposing calculator and expense tracker tools over stdio")]
#[command(version)]
struct Cli {
    /// Directory holding config.toml (defaults to ~/.toolbox-mcp)
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start MCP server on stdio (default)
    Serve,
    /// Print the tool definitions as JSON
    Tools,
    /// Invoke a tool once and print its output
    Call {
        /// Tool name, e.g. "calculate"
        tool: String,
        /// Tool arguments as a JSON object
        #[arg(long)]
        args: Option<String>,
    },
    /// Configure server and backend settings
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
}

fn init_tracing(config_dir: &std::path::Path) {
    // stdout carries the protocol, so logs go to stderr
    let fallback = Config::load(config_dir)
        .map(|config| config.server.filter_directive())
        .unwrap_or_else(|_| "info".to_string());

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_dir = match cli.config_dir {
        Some(dir) => dir,
        None => Config::default_dir()?,
    };
    let env_files = Config::load_env_files(&config_dir)?;
    init_tracing(&config_dir);
    for path in &env_files {
        debug!("Loaded environment from {}", path.display());
    }

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            serve_mcp(&config_dir).await?;
        }
        Commands::Tools => {
            list_tools(&config_dir).await?;
        }
        Commands::Call { tool, args } => {
            call_tool(&config_dir, &tool, args.as_deref()).await?;
        }
        Commands::Config { show } => {
            if show {
                show_config(&config_dir)?;
            } else {
                run_interactive_config(&config_dir)?;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn no_subcommand_defaults_to_serve() {
        let cli = Cli::try_parse_from(["toolbox-mcp"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            assert!(parsed.command.is_none());
            assert!(parsed.config_dir.is_none());
        }
    }

    #[test]
    fn serve_command() {
        let cli = Cli::try_parse_from(["toolbox-mcp", "serve"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            assert!(matches!(parsed.command, Some(Commands::Serve)));
        }
    }

    #[test]
    fn call_command_with_args() {
        let cli = Cli::try_parse_from([
            "toolbox-mcp",
            "call",
            "calculate",
            "--args",
            r#"{"operation":"add","a":1,"b":2}"#,
        ]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Some(Commands::Call { tool, args }) = parsed.command {
                assert_eq!(tool, "calculate");
                assert_eq!(args.as_deref(), Some(r#"{"operation":"add","a":1,"b":2}"#));
            } else {
                panic!("expected call command");
            }
        }
    }

    #[test]
    fn global_config_dir_after_subcommand() {
        let cli = Cli::try_parse_from(["toolbox-mcp", "tools", "--config-dir", "/tmp/toolbox"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            assert!(matches!(parsed.command, Some(Commands::Tools)));
            assert_eq!(parsed.config_dir, Some(PathBuf::from("/tmp/toolbox")));
        }
    }

    #[test]
    fn config_show_flag() {
        let cli = Cli::try_parse_from(["toolbox-mcp", "config", "--show"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Some(Commands::Config { show }) = parsed.command {
                assert!(show);
            }
        }
    }

    #[test]
    fn call_requires_tool_name() {
        let cli = Cli::try_parse_from(["toolbox-mcp", "call"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
        }
    }

    #[test]
    fn invalid_command() {
        let cli = Cli::try_parse_from(["toolbox-mcp", "invalid"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::InvalidSubcommand);
        }
    }

    #[test]
    fn help_message() {
        let cli = Cli::try_parse_from(["toolbox-mcp", "--help"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::DisplayHelp);
        }
    }
}
