use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use lorerag_cli::Runtime;
use lorerag_core::config::Config;
use lorerag_pipeline::artifacts::write_story;

#[derive(Parser)]
#[command(name = "lorerag")]
#[command(about = "Lore-grounded image prompts and image-to-story generation", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Directory holding config.toml and config.<env>.toml
    #[arg(long, global = true, default_value = ".")]
    config_dir: PathBuf,

    /// Lore corpus directory (overrides lore.dir)
    #[arg(long, global = true)]
    lore_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the lore index and report its shape
    Index(OutputArgs),

    /// Show the lore chunks closest to a query
    Search(QueryArgs),

    /// Rewrite a short scene description into a lore-grounded image prompt
    Enrich(QueryArgs),

    /// Enrich a prompt and render it with Stable Diffusion
    Imagine(GenerateArgs),

    /// Caption an image and write a story grounded in the lore
    Story(GenerateArgs),
}

#[derive(Args)]
struct OutputArgs {
    /// Print machine-readable JSON instead of text
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct QueryArgs {
    text: String,

    /// Number of lore chunks to retrieve (overrides retrieval.top_k)
    #[arg(long)]
    top_k: Option<usize>,

    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Args)]
struct GenerateArgs {
    /// Scene description for `imagine`, image path for `story`
    input: String,

    #[arg(long)]
    top_k: Option<usize>,

    /// Where images or stories are written (overrides output.*_dir)
    #[arg(long)]
    output_dir: Option<PathBuf>,

    #[command(flatten)]
    output: OutputArgs,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load_from(&cli.config_dir).map_err(|e| {
        eprintln!("Error loading config: {}", e);
        e
    })?;
    tracing::debug!(
        env = config.env_name(),
        dir = %cli.config_dir.display(),
        "configuration loaded"
    );
    let runtime = Runtime::from_settings(config.settings()?)?;

    let lore_dir = runtime.lore_dir(cli.lore_dir.as_deref());
    let report = runtime
        .library()
        .build(&lore_dir)
        .with_context(|| format!("building lore index from {}", lore_dir.display()))?;

    match cli.command {
        Commands::Index(args) => {
            if args.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("📚 Lore directory: {}", lore_dir.display());
                println!(
                    "✅ Indexed {} documents into {} chunks",
                    report.documents, report.chunks
                );
                if let Some(dim) = report.dim {
                    println!("📐 Embedding dimension: {dim}");
                }
            }
        }
        Commands::Search(args) => {
            let top_k = runtime.top_k(args.top_k);
            let hits = runtime.library().retriever().retrieve(&args.text, top_k)?;
            if args.output.json {
                println!("{}", serde_json::to_string_pretty(&hits)?);
            } else {
                println!("🔍 Found {} lore chunks for: \"{}\"", hits.len(), args.text);
                for (i, hit) in hits.iter().enumerate() {
                    println!("\n  {}. distance={:.4}  id={}", i + 1, hit.distance, hit.id);
                    println!("     📝 {}", hit.text);
                }
            }
        }
        Commands::Enrich(args) => {
            let top_k = runtime.top_k(args.top_k);
            let enriched = runtime.enricher(top_k).enrich(&args.text)?;
            if args.output.json {
                let body = serde_json::json!({
                    "userPrompt": args.text,
                    "enrichedPrompt": enriched,
                });
                println!("{body}");
            } else {
                println!("📝 Original prompt: {}", args.text);
                println!("✨ Enriched prompt: {enriched}");
            }
        }
        Commands::Imagine(args) => {
            let out_dir = runtime.images_dir(args.output_dir.as_deref());
            let top_k = runtime.top_k(args.top_k);
            let image = runtime.imagine(top_k).run(&args.input, &out_dir)?;
            if args.output.json {
                println!("{}", serde_json::to_string_pretty(&image)?);
            } else {
                println!("✨ Enriched prompt: {}", image.enriched_prompt);
                println!("🖼️  Saved image to {}", image.image_path);
            }
        }
        Commands::Story(args) => {
            let image_path = PathBuf::from(&args.input);
            if !image_path.is_file() {
                anyhow::bail!("image not found: {}", image_path.display());
            }
            let top_k = runtime.top_k(args.top_k);
            let result = runtime.composer(top_k).compose(&image_path)?;
            let stories_dir = runtime.stories_dir(args.output_dir.as_deref());
            let story_path = write_story(&result, &stories_dir)?;
            if args.output.json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("🖼️  Caption: {}", result.caption);
                println!("📚 Lore used: {} chunks", result.lore_chunks.len());
                println!("\n{}\n", result.story);
                println!("💾 Saved story to {}", story_path.display());
            }
        }
    }
    Ok(())
}
