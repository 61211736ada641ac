use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mindgraph::cache::{self, LocalCache};
use mindgraph::coordinator::Coordinator;
use mindgraph::engine::Engine;
use mindgraph::export;
use mindgraph::remote::HttpClient;
use mindgraph::render::{LogNotifier, TextRenderer};

#[derive(Parser)]
#[command(name = "mindgraph")]
#[command(about = "Incrementally generated, editable mind maps")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a new map for a topic and persist it
    Generate { topic: String },
    /// Print the current map as a tree
    Show,
    /// Expand a leaf, addressed by its root-to-node path
    Expand {
        /// Path segments, root label first
        path: Vec<String>,
    },
    /// List saved maps
    List,
    /// Open a saved map by key
    Open { id: String },
    /// Delete a saved map by key
    Delete { id: String },
    /// Rename a saved map
    Rename { id: String, name: String },
    /// Export the current map as a markdown outline
    Export {
        /// Target file; derived from the root topic when omitted
        #[arg(short, long)]
        out: Option<std::path::PathBuf>,
    },
    /// Close the current map (and clear the local slot when signed out)
    Reset,
    /// Persist UI toggles
    Set {
        #[arg(long)]
        emojis: Option<bool>,
        #[arg(long)]
        focus: Option<bool>,
    },
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "mindgraph=info".into()),
    );
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

type CliEngine = Engine<HttpClient, HttpClient, TextRenderer, LogNotifier>;

fn build_engine(local_cache: &LocalCache) -> anyhow::Result<CliEngine> {
    let store = HttpClient::from_env();
    let expander = HttpClient::from_env();
    let remote = store.has_credential().then_some(store);
    let coordinator = Coordinator::new(local_cache.clone(), remote);

    let mut engine = Engine::new(coordinator, expander, TextRenderer::new(), LogNotifier);
    engine.session.emojis_enabled = local_cache.get_flag(cache::EMOJIS_KEY)?;
    engine.session.focus_mode = local_cache.get_flag(cache::FOCUS_KEY)?;
    Ok(engine)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let local_cache = LocalCache::open_default()?;
    let mut engine = build_engine(&local_cache)?;

    match cli.command {
        Commands::Generate { topic } => {
            engine.generate(&topic).await?;
            println!("{}", engine.renderer().render());
        }
        Commands::Show => {
            if engine.resume().await {
                println!("{}", engine.renderer().render());
            } else {
                println!("No map yet. Generate one with `mindgraph generate <topic>`.");
            }
        }
        Commands::Expand { path } => {
            if !engine.resume().await {
                anyhow::bail!("no map to expand");
            }
            let outcome = engine.expand_path(path).await?;
            tracing::debug!(?outcome, "expand finished");
            println!("{}", engine.renderer().render());
        }
        Commands::List => {
            let entries = engine.refresh_list().await?;
            if entries.is_empty() {
                println!("No saved maps.");
            }
            for entry in entries {
                println!("{}  {}", entry.id, entry.name);
            }
        }
        Commands::Open { id } => {
            engine.open_map(&id).await?;
            println!("{}", engine.renderer().render());
        }
        Commands::Delete { id } => {
            engine.delete_map(&id).await?;
        }
        Commands::Rename { id, name } => {
            engine.rename_map(&id, &name).await?;
        }
        Commands::Export { out } => {
            if !engine.resume().await {
                anyhow::bail!("no map to export");
            }
            let Some(root) = engine.session.root.as_ref() else {
                anyhow::bail!("no map to export");
            };
            let path = out.unwrap_or_else(|| {
                std::path::PathBuf::from(export::export_filename(&root.content, "md"))
            });
            std::fs::write(&path, export::to_markdown(root))?;
            println!("Exported to {}", path.display());
        }
        Commands::Reset => {
            engine.resume().await;
            engine.reset_view()?;
        }
        Commands::Set { emojis, focus } => {
            if let Some(on) = emojis {
                local_cache.set_flag(cache::EMOJIS_KEY, on)?;
            }
            if let Some(on) = focus {
                local_cache.set_flag(cache::FOCUS_KEY, on)?;
            }
        }
    }

    Ok(())
}
