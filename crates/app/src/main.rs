mod replay;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use garden_ar_core::{
    placement_scale, tips_prompt, ArConfig, ArPlanner, TipsClient, TipsRequest, Viewport,
};
use tracing_subscriber::EnvFilter;

use replay::{Replay, SessionScript};

fn main() -> garden_ar_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => ArConfig::load(path)?,
        None => ArConfig::default(),
    };

    match cli.command {
        Commands::Scale {
            width_cm,
            height_cm,
        } => {
            let scale = placement_scale(width_cm, height_cm, &config.placement);
            println!("{scale:.3}");
            Ok(())
        }
        Commands::Replay {
            script,
            out_dir,
            fetch_tips,
        } => run_replay(config, &script, &out_dir, fetch_tips),
        Commands::Tips { plant, base_url } => run_tips(config, &plant, base_url),
    }
}

fn run_replay(
    config: ArConfig,
    script_path: &Path,
    out_dir: &Path,
    fetch_tips: bool,
) -> garden_ar_core::Result<()> {
    tracing::info!(script = ?script_path, "replaying recorded session");

    let raw = std::fs::read_to_string(script_path)?;
    let script: SessionScript = serde_json::from_str(&raw)?;
    let [width, height] = script.viewport;
    let tips_config = config.tips.clone();

    let planner = ArPlanner::new(config, Viewport::new(width, height))?;
    let mut replay = Replay::new(planner, &script);
    replay.run(&script.events);

    let tickets = replay.take_tips_requests();
    if fetch_tips && !tickets.is_empty() {
        let client = TipsClient::new(&tips_config)?;
        let runtime = tokio::runtime::Runtime::new()?;
        for ticket in tickets {
            let text = runtime.block_on(client.fetch_or_empty(&ticket.request()));
            replay.complete_tips(&ticket, text);
        }
    }

    let mut saved = Vec::new();
    if !replay.snapshots().is_empty() {
        std::fs::create_dir_all(out_dir)?;
        for (index, snapshot) in replay.snapshots().iter().enumerate() {
            let path = if index == 0 {
                snapshot.save_in(out_dir)?
            } else {
                let path = out_dir.join(format!("{index}-{}", snapshot.file_name));
                std::fs::write(&path, &snapshot.png)?;
                path
            };
            tracing::info!(path = ?path, width = snapshot.width, height = snapshot.height, "snapshot written");
            saved.push(path.display().to_string());
        }
    }

    let report = replay.report(saved);
    for notice in &report.notices {
        tracing::warn!(level = ?notice.level, "{}", notice.message);
    }
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn run_tips(config: ArConfig, plant: &str, base_url: Option<String>) -> garden_ar_core::Result<()> {
    let mut tips = config.tips;
    if let Some(base_url) = base_url {
        tips.base_url = base_url;
    }
    let client = TipsClient::new(&tips)?;
    tracing::info!(url = client.url(), plant, "requesting AI tips");

    let request = TipsRequest {
        message: tips_prompt(plant),
    };
    let runtime = tokio::runtime::Runtime::new()?;
    let text = runtime.block_on(client.fetch_or_empty(&request));
    println!("{text}");
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "AR garden planner tools", long_about = None)]
struct Cli {
    /// Optional JSON configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the placement scale for a plant's growth dimensions.
    Scale {
        #[arg(long)]
        width_cm: Option<f32>,
        #[arg(long)]
        height_cm: Option<f32>,
    },
    /// Replay a recorded AR session headlessly and print the outcome.
    Replay {
        /// Session script (JSON).
        script: PathBuf,
        /// Directory snapshots are written to.
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
        /// Query the AI tips endpoint for every selection in the script.
        #[arg(long)]
        fetch_tips: bool,
    },
    /// Ask the AI tips endpoint for placement and care tips.
    Tips {
        plant: String,
        #[arg(long)]
        base_url: Option<String>,
    },
}
