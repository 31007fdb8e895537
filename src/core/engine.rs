// src/core/engine.rs
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use tokio::io::AsyncReadExt;
use tracing::{debug, info, warn};

use crate::config::{Config, CONFIG_CANDIDATES};
use crate::error::{NavigatorError, SyntaxDiagnostic};
use super::report::{self, OutputFormat, NOTHING_FOUND};
use super::{
    CallGraph, DependencyGraph, DotExporter, Extraction, Extractor, PythonSyntax, SourceParser,
};

/// Exit status for input that is not valid source code
const EXIT_PARSE_FAILED: u8 = 2;

/// How a command finished, as reported to the shell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandStatus {
    Success,
    /// Valid input without anything to report
    NothingFound,
    ParseFailed,
    Failed,
}

impl CommandStatus {
    pub fn exit_code(self) -> ExitCode {
        match self {
            CommandStatus::Success | CommandStatus::NothingFound => ExitCode::SUCCESS,
            CommandStatus::ParseFailed => ExitCode::from(EXIT_PARSE_FAILED),
            CommandStatus::Failed => ExitCode::FAILURE,
        }
    }
}

/// Everything produced for a source that defines at least one function
#[derive(Debug, Clone)]
pub struct Navigation {
    pub extraction: Extraction,
    pub graph: CallGraph,
    pub dot: String,
}

/// The distinguishable results of analysing one source text
#[derive(Debug, Clone)]
pub enum NavigationOutcome {
    /// Functions were found; graph and DOT are ready
    Found(Navigation),
    /// The source is valid but defines no functions
    NothingFound,
    /// The source is not syntactically valid
    ParseFailed(SyntaxDiagnostic),
    /// Any other failure, including a panic inside the analysis
    Failed(String),
}

/// Main orchestration engine: parse, extract, build, serialize
pub struct Engine {
    config: Config,
    parser: SourceParser,
    exporter: DotExporter,
}

impl Engine {
    /// Create a new engine, loading configuration from `config_path` or the
    /// default locations
    pub fn new(config_path: Option<&Path>) -> Result<Self> {
        let config = Config::load_or_default(config_path)
            .context("Failed to load configuration")?;

        debug!("Loaded configuration: {:?}", config);

        Self::with_config(config)
    }

    pub fn with_config(config: Config) -> Result<Self> {
        let parser = SourceParser::new(&config.parsing)?;
        let exporter = DotExporter::new(&config.graph);

        Ok(Self {
            config,
            parser,
            exporter,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run the full pipeline on one source text and classify the result.
    ///
    /// Never panics: a panic inside the analysis is reported as `Failed`, and
    /// trees nested deeper than `parsing.max_depth` are refused before any
    /// recursive walk, so they cannot overflow the stack.
    pub fn navigate(&mut self, source: &str) -> NavigationOutcome {
        let result = panic::catch_unwind(AssertUnwindSafe(|| self.analyze(source)));

        match result {
            Ok(Ok(navigation)) if navigation.extraction.is_empty() => NavigationOutcome::NothingFound,
            Ok(Ok(navigation)) => NavigationOutcome::Found(navigation),
            Ok(Err(NavigatorError::Syntax(diagnostic))) => NavigationOutcome::ParseFailed(diagnostic),
            Ok(Err(e)) => NavigationOutcome::Failed(e.to_string()),
            Err(payload) => NavigationOutcome::Failed(panic_message(payload.as_ref())),
        }
    }

    /// Extract functions and calls from one source text
    pub fn extract(&mut self, source: &str) -> crate::error::Result<Extraction> {
        let tree = self.parser.parse(source)?;
        Extractor::new(self.config.parsing.duplicate_policy).extract(&tree)
    }

    /// Build the dependency graph of one source text
    pub fn dependencies(&mut self, source: &str) -> crate::error::Result<DependencyGraph> {
        let tree = self.parser.parse(source)?;
        Ok(DependencyGraph::from_tree(&tree))
    }

    fn analyze(&mut self, source: &str) -> crate::error::Result<Navigation> {
        let extraction = self.extract(source)?;
        let graph = CallGraph::from_call_set(&extraction.calls);
        let dot = self.exporter.to_dot(&graph);

        debug!(
            "Extracted {} functions, {} call edges",
            extraction.functions.len(),
            graph.edge_count()
        );

        Ok(Navigation {
            extraction,
            graph,
            dot,
        })
    }

    /// List function definitions
    pub async fn functions(&mut self, input: &Path, format: Option<&str>, no_source: bool) -> Result<CommandStatus> {
        let format = self.listing_format(format)?;
        let include_source = self.config.output.include_source && !no_source;

        self.run(input, None, |navigation| {
            report::render_functions(&navigation.extraction, include_source, format)
        })
        .await
    }

    /// List each function's callees
    pub async fn calls(&mut self, input: &Path, format: Option<&str>) -> Result<CommandStatus> {
        let format = self.listing_format(format)?;

        self.run(input, None, |navigation| report::render_calls(&navigation.extraction, format))
            .await
    }

    /// Emit the call graph as DOT (default) or JSON
    pub async fn graph(&mut self, input: &Path, format: Option<&str>, output: Option<&Path>) -> Result<CommandStatus> {
        let format = match format {
            Some(name) => name.parse::<OutputFormat>()?,
            None => OutputFormat::Dot,
        };

        self.run(input, output, |navigation| match format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(&navigation.graph)?),
            _ => Ok(navigation.dot.clone()),
        })
        .await
    }

    /// Summarise the call graph
    pub async fn stats(&mut self, input: &Path, format: Option<&str>) -> Result<CommandStatus> {
        let format = self.listing_format(format)?;

        self.run(input, None, |navigation| report::render_stats(&navigation.graph, format))
            .await
    }

    /// Emit the class/function dependency graph as DOT
    pub async fn deps(&mut self, input: &Path, output: Option<&Path>) -> Result<CommandStatus> {
        let source = read_input(input).await?;

        match self.dependencies(&source) {
            Ok(graph) if graph.node_count() == 0 => {
                eprintln!("No function or class definitions found.");
                Ok(CommandStatus::NothingFound)
            }
            Ok(graph) => {
                info!(
                    "Dependency graph: {} nodes, {} edges",
                    graph.node_count(),
                    graph.edge_count()
                );
                write_output(output, &self.exporter.dependencies_to_dot(&graph)).await?;
                Ok(CommandStatus::Success)
            }
            Err(NavigatorError::Syntax(diagnostic)) => {
                eprintln!("Syntax error: {}", diagnostic);
                Ok(CommandStatus::ParseFailed)
            }
            Err(e) => {
                eprintln!("Analysis failed: {}", e);
                Ok(CommandStatus::Failed)
            }
        }
    }

    /// Write a default configuration file into `path` (or the current directory)
    pub async fn init(&self, path: Option<PathBuf>, force: bool) -> Result<CommandStatus> {
        let dir = path.unwrap_or_else(|| PathBuf::from("."));
        let target = dir.join(CONFIG_CANDIDATES[0]);

        if target.exists() && !force {
            warn!("{} already exists; use --force to overwrite", target.display());
            return Ok(CommandStatus::Failed);
        }

        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create {}", dir.display()))?;
        Config::default().save(&target)?;

        info!("Wrote default configuration to {}", target.display());
        Ok(CommandStatus::Success)
    }

    /// Shared driver: read, navigate, then render on success
    async fn run<F>(&mut self, input: &Path, output: Option<&Path>, render: F) -> Result<CommandStatus>
    where
        F: FnOnce(&Navigation) -> crate::error::Result<String>,
    {
        if !is_python_input(input) {
            warn!("{} does not look like a {} file", input.display(), PythonSyntax::language_name());
        }

        let source = read_input(input).await?;
        info!("Analyzing {} ({} bytes)", input.display(), source.len());

        match self.navigate(&source) {
            NavigationOutcome::Found(navigation) => {
                info!(
                    "Found {} functions and {} calls",
                    navigation.graph.node_count(),
                    navigation.graph.edge_count()
                );
                let rendered = render(&navigation)?;
                write_output(output, &rendered).await?;
                Ok(CommandStatus::Success)
            }
            NavigationOutcome::NothingFound => {
                eprintln!("{}", NOTHING_FOUND);
                Ok(CommandStatus::NothingFound)
            }
            NavigationOutcome::ParseFailed(diagnostic) => {
                eprintln!("Syntax error: {}", diagnostic);
                Ok(CommandStatus::ParseFailed)
            }
            NavigationOutcome::Failed(message) => {
                eprintln!("Analysis failed: {}", message);
                Ok(CommandStatus::Failed)
            }
        }
    }

    fn listing_format(&self, requested: Option<&str>) -> Result<OutputFormat> {
        let name = requested.unwrap_or(&self.config.output.format);
        Ok(name.parse::<OutputFormat>()?)
    }
}

/// Read source text from a file, or from stdin when the path is `-`
pub async fn read_input(input: &Path) -> Result<String> {
    if input == Path::new("-") {
        let mut source = String::new();
        tokio::io::stdin()
            .read_to_string(&mut source)
            .await
            .context("Failed to read source from stdin")?;
        Ok(source)
    } else {
        tokio::fs::read_to_string(input)
            .await
            .with_context(|| format!("Failed to read {}", input.display()))
    }
}

/// Write to a file when given, stdout otherwise
pub async fn write_output(output: Option<&Path>, content: &str) -> Result<()> {
    match output {
        Some(path) => {
            tokio::fs::write(path, format!("{}\n", content))
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Output written to {}", path.display());
        }
        None => println!("{}", content),
    }
    Ok(())
}

fn is_python_input(input: &Path) -> bool {
    if input == Path::new("-") {
        return true;
    }
    input
        .extension()
        .and_then(|ext| ext.to_str())
        .map_or(false, |ext| PythonSyntax::file_extensions().contains(&ext))
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "analysis panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DuplicatePolicy;

    fn engine() -> Engine {
        Engine::with_config(Config::default()).unwrap()
    }

    #[test]
    fn outcomes_are_distinguishable() {
        let mut engine = engine();

        assert!(matches!(engine.navigate("def a():\n    pass\n"), NavigationOutcome::Found(_)));
        assert!(matches!(engine.navigate(""), NavigationOutcome::NothingFound));
        assert!(matches!(engine.navigate("x = 1\n"), NavigationOutcome::NothingFound));
        assert!(matches!(engine.navigate("def a(:\n"), NavigationOutcome::ParseFailed(_)));
    }

    #[test]
    fn non_syntax_errors_are_failures() {
        let mut config = Config::default();
        config.parsing.duplicate_policy = DuplicatePolicy::Reject;
        let mut engine = Engine::with_config(config).unwrap();

        match engine.navigate("def f():\n    pass\n\ndef f():\n    pass\n") {
            NavigationOutcome::Failed(message) => assert!(message.contains("`f`")),
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[test]
    fn deeply_nested_source_is_a_failure_not_an_abort() {
        let depth = 50_000;
        let source = format!("def f():\n    return {}1{}\n", "(".repeat(depth), ")".repeat(depth));

        match engine().navigate(&source) {
            NavigationOutcome::Failed(message) => assert!(message.contains("Nesting deeper than 1000")),
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[test]
    fn invalid_python3_is_a_parse_failure() {
        let mut engine = engine();
        assert!(matches!(engine.navigate("def f():\nreturn g()\n"), NavigationOutcome::ParseFailed(_)));
        assert!(matches!(engine.navigate("print 'hello'\n"), NavigationOutcome::ParseFailed(_)));
    }

    #[test]
    fn parser_is_reusable_after_failure() {
        let mut engine = engine();
        assert!(matches!(engine.navigate("def a(:\n"), NavigationOutcome::ParseFailed(_)));
        assert!(matches!(engine.navigate("def a():\n    pass\n"), NavigationOutcome::Found(_)));
    }

    #[test]
    fn panic_payloads_become_messages() {
        let payload = panic::catch_unwind(|| panic!("boom")).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "boom");
    }

    #[test]
    fn recognises_python_inputs() {
        assert!(is_python_input(Path::new("app.py")));
        assert!(is_python_input(Path::new("-")));
        assert!(!is_python_input(Path::new("main.rs")));
    }
}
