use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use anyhow::Result;

use code_navigator::Engine;

#[derive(Parser)]
#[command(name = "code-navigator")]
#[command(about = "Static call-graph navigator for Python source files")]
#[command(version)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List function definitions with their line ranges and source
    Functions {
        /// Source file, or - for stdin
        input: PathBuf,

        /// Output format (text, json)
        #[arg(short, long)]
        format: Option<String>,

        /// Omit each function's source text
        #[arg(long)]
        no_source: bool,
    },

    /// List the same-file functions each function calls
    Calls {
        /// Source file, or - for stdin
        input: PathBuf,

        /// Output format (text, json)
        #[arg(short, long)]
        format: Option<String>,
    },

    /// Render the call graph
    Graph {
        /// Source file, or - for stdin
        input: PathBuf,

        /// Output format (dot, json)
        #[arg(short, long)]
        format: Option<String>,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Summarise the call graph: entry points, cycles, degrees
    Stats {
        /// Source file, or - for stdin
        input: PathBuf,

        /// Output format (text, json)
        #[arg(short, long)]
        format: Option<String>,
    },

    /// Render the class and function dependency graph
    Deps {
        /// Source file, or - for stdin
        input: PathBuf,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Write a default configuration file
    Init {
        /// Target directory (defaults to current directory)
        #[arg(short, long)]
        path: Option<PathBuf>,

        /// Overwrite an existing configuration
        #[arg(long)]
        force: bool,
    },
}

impl Cli {
    pub async fn execute(self, mut engine: Engine) -> Result<ExitCode> {
        let status = match self.command {
            Commands::Functions { input, format, no_source } => {
                engine.functions(&input, format.as_deref(), no_source).await
            }
            Commands::Calls { input, format } => {
                engine.calls(&input, format.as_deref()).await
            }
            Commands::Graph { input, format, output } => {
                engine.graph(&input, format.as_deref(), output.as_deref()).await
            }
            Commands::Stats { input, format } => {
                engine.stats(&input, format.as_deref()).await
            }
            Commands::Deps { input, output } => {
                engine.deps(&input, output.as_deref()).await
            }
            Commands::Init { path, force } => {
                engine.init(path, force).await
            }
        }?;

        Ok(status.exit_code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_graph_command() {
        let cli = Cli::try_parse_from(["code-navigator", "graph", "app.py", "-o", "calls.dot"]).unwrap();
        match cli.command {
            Commands::Graph { input, format, output } => {
                assert_eq!(input, PathBuf::from("app.py"));
                assert_eq!(format, None);
                assert_eq!(output, Some(PathBuf::from("calls.dot")));
            }
            _ => panic!("expected graph command"),
        }
    }

    #[test]
    fn global_flags_precede_command() {
        let cli = Cli::try_parse_from(["code-navigator", "-v", "--config", "nav.toml", "calls", "-"]).unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("nav.toml")));
        assert!(matches!(cli.command, Commands::Calls { .. }));
    }

    #[test]
    fn input_is_required() {
        assert!(Cli::try_parse_from(["code-navigator", "functions"]).is_err());
    }
}
