use crate::config::{load_config, GeneratorConfig, OpenApiVersion};
use crate::diagnostics::{CollectingSink, DiagnosticSink, FanoutSink, Severity, TracingSink};
use crate::generator::{SchemaDocument, SchemaGenerator};
use crate::types::file::{load_type_graph, LoadedGraph};
use crate::types::TypeHandle;
use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Command-line interface for schemaforge
#[derive(Parser, Debug)]
#[command(name = "schemaforge")]
#[command(about = "Compile type graphs into OpenAPI schema documents", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate a schema document and print it (or write it to --output)
    Generate {
        #[command(flatten)]
        source: SourceArgs,

        /// Output encoding
        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,

        /// Write the document to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print the SHA-256 fingerprint of the generated document
    Fingerprint {
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Print the assigned component identifiers, one `id<TAB>type` per line
    Ids {
        #[command(flatten)]
        source: SourceArgs,
    },
}

/// Inputs shared by every subcommand
#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// Type graph file (YAML, or JSON when the extension is `.json`)
    #[arg(short, long)]
    pub types: PathBuf,

    /// Root type to generate; repeatable. Defaults to every declared type.
    #[arg(short, long = "root")]
    pub roots: Vec<String>,

    /// TOML generator configuration. Without it, SCHEMAFORGE_* variables are read.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// OpenAPI version: 3.0 or 3.1
    #[arg(long)]
    pub spec_version: Option<String>,

    #[arg(long)]
    pub max_depth: Option<usize>,

    /// Skip example synthesis
    #[arg(long, default_value_t = false)]
    pub no_examples: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Yaml,
}

impl SourceArgs {
    /// File (or environment) configuration with command-line flags applied on top
    pub fn generator_config(&self) -> Result<GeneratorConfig> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => GeneratorConfig::from_env(),
        };
        if let Some(version) = &self.spec_version {
            let version = OpenApiVersion::parse(version)
                .ok_or_else(|| anyhow!("unsupported OpenAPI version '{version}'"))?;
            config = config.with_spec_version(version);
        }
        if let Some(depth) = self.max_depth {
            config = config.with_max_depth(depth);
        }
        if self.no_examples {
            config.synthesize_examples = false;
        }
        Ok(config)
    }

    fn roots(&self, loaded: &LoadedGraph) -> Result<Vec<TypeHandle>> {
        if self.roots.is_empty() {
            return Ok(loaded.declared.iter().map(|(_, handle)| *handle).collect());
        }
        self.roots
            .iter()
            .map(|name| {
                loaded
                    .find(name)
                    .ok_or_else(|| anyhow!("unknown root type '{name}'"))
            })
            .collect()
    }
}

/// Result of running the generator for one invocation
struct Run {
    generator: SchemaGenerator,
    document: SchemaDocument,
}

fn run_generation(source: &SourceArgs) -> Result<Run> {
    let config = source.generator_config()?;
    let loaded = load_type_graph(&source.types)?;
    let roots = source.roots(&loaded)?;

    let collected = Arc::new(CollectingSink::new());
    let sinks: Vec<Arc<dyn DiagnosticSink>> = vec![
        Arc::new(TracingSink),
        Arc::clone(&collected) as Arc<dyn DiagnosticSink>,
    ];
    let sink: Arc<dyn DiagnosticSink> = Arc::new(FanoutSink::new(sinks));
    let generator = SchemaGenerator::new(config, sink);
    let document = generator
        .generate_document(&loaded.graph, &roots)
        .with_context(|| format!("Failed to generate schemas from {}", source.types.display()))?;

    let events = collected.events();
    let errors = events
        .iter()
        .filter(|e| e.severity >= Severity::Error)
        .count();
    info!(
        types = %source.types.display(),
        roots = roots.len(),
        diagnostics = events.len(),
        errors,
        "generation finished"
    );
    Ok(Run {
        generator,
        document,
    })
}

/// Run a parsed command, writing its output to `out`
pub fn execute(cli: &Cli, out: &mut dyn Write) -> Result<()> {
    match &cli.command {
        Commands::Generate {
            source,
            format,
            output,
        } => {
            let run = run_generation(source)?;
            let json = run.document.to_json();
            let mut rendered = match format {
                OutputFormat::Json => serde_json::to_string_pretty(&json)?,
                OutputFormat::Yaml => serde_yaml::to_string(&json)?,
            };
            if !rendered.ends_with('\n') {
                rendered.push('\n');
            }
            match output {
                Some(path) => std::fs::write(path, rendered)
                    .with_context(|| format!("Failed to write document: {}", path.display()))?,
                None => out.write_all(rendered.as_bytes())?,
            }
            Ok(())
        }
        Commands::Fingerprint { source } => {
            let run = run_generation(source)?;
            writeln!(out, "{}", run.document.fingerprint())?;
            Ok(())
        }
        Commands::Ids { source } => {
            let run = run_generation(source)?;
            for (id, identity) in run.generator.registry().assigned() {
                writeln!(out, "{id}\t{identity}")?;
            }
            Ok(())
        }
    }
}

/// Parse arguments from the process and run against stdout
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    let stdout = std::io::stdout();
    let mut lock = stdout.lock();
    execute(&cli, &mut lock)
}
