use clap::{Parser, Subcommand};
use promptgen::{GenerationMode, GeneratorBuilder, GeneratorConfig, WildcardMap, WildcardProvider, parse};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Generate text prompts from a template of variants and wildcards
#[derive(Parser)]
#[command(author, version, about, long_about = None, args_conflicts_with_subcommands = true)]
struct Cli {
    /// The template to expand
    #[arg(help = "Template, e.g. \"A {red|green} __shape__\"")]
    template: Option<String>,

    /// Read the template from a file instead
    #[arg(short, long, conflicts_with = "template")]
    file: Option<PathBuf>,

    /// Number of prompts. In combinatorial mode this is a cap, and 0 means
    /// the configured maximum.
    #[arg(short = 'n', long)]
    count: Option<usize>,

    /// Enumerate every combination instead of sampling
    #[arg(short, long)]
    combinatorial: bool,

    /// Seed for random generation
    #[arg(short, long)]
    seed: Option<u64>,

    /// Ignore any seed and sample from entropy
    #[arg(long)]
    unlink_seed: bool,

    /// Number of combinatorial batches
    #[arg(long)]
    batches: Option<usize>,

    /// Generate one prompt and repeat it
    #[arg(long)]
    freeze: bool,

    /// JSON file mapping wildcard names to values
    #[arg(short, long)]
    wildcards: Option<PathBuf>,

    /// JSON generator configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Subcommands
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the parsed command tree of a template as JSON
    Parse {
        #[arg(help = "Template to parse")]
        template: String,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Prompts go to stdout, diagnostics to stderr
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Some(Commands::Parse { template }) = cli.command {
        let command = parse(&template)?;
        println!("{}", serde_json::to_string_pretty(&command)?);
        return Ok(());
    }

    let template = match (cli.template, cli.file) {
        (Some(template), _) => template,
        (None, Some(path)) => fs::read_to_string(&path)?,
        (None, None) => return Err("A template or --file is required".into()),
    };

    let mut config = match &cli.config {
        Some(path) => GeneratorConfig::from_json_file(path)?,
        None => GeneratorConfig::default(),
    };
    if cli.combinatorial {
        config.mode = GenerationMode::Combinatorial;
    }
    if cli.seed.is_some() {
        config.seed = cli.seed;
    }
    if cli.unlink_seed {
        config.unlink_seed_from_prompt = true;
    }
    if let Some(batches) = cli.batches {
        config.combinatorial_batches = batches;
    }
    if cli.freeze {
        config.freeze_prompt = true;
    }

    let wildcards = match &cli.wildcards {
        Some(path) => {
            let wildcards = WildcardMap::from_json_file(path)?;
            info!(path = %path.display(), wildcards = wildcards.len(), "loaded wildcards");
            wildcards
        }
        None => WildcardMap::new(),
    };
    let provider: Arc<dyn WildcardProvider> = Arc::new(wildcards);

    let count = cli.count.unwrap_or(match config.mode {
        GenerationMode::Combinatorial => 0,
        _ => 1,
    });

    let mut generator = GeneratorBuilder::new(provider).config(config).build();
    let prompts = generator.generate(&template, count)?;

    for (i, prompt) in prompts.iter().enumerate() {
        println!("{}. {}", i + 1, prompt);
    }

    Ok(())
}
