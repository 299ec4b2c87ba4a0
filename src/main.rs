//! Dino Dash entry point
//!
//! Headless driver: plays runs with the autopilot on a virtual 60 Hz clock
//! and records finished runs on the local leaderboard.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use dino_dash::consts::{MAX_TOP_SCORES, TARGET_FRAME_MILLIS};
use dino_dash::platform::{Clock, FileBackend, SystemClock};
use dino_dash::sim::{GameEvent, Runner};
use dino_dash::{ScoreContext, ScoreService, Settings};

#[derive(Parser, Debug)]
#[command(name = "dino-dash")]
#[command(about = "Endless-runner simulation with a persistent top-5 leaderboard")]
struct Cli {
    /// Settings file (JSON). Missing file means defaults.
    #[arg(long, default_value = "dino-dash.json")]
    settings: PathBuf,
    /// Overrides the configured data directory
    #[arg(long)]
    data_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Play runs with the autopilot and submit each finished run
    Play {
        #[arg(long, default_value_t = 3)]
        runs: u32,
        /// Spawn seed. Defaults to the current time.
        #[arg(long)]
        seed: Option<u64>,
        /// Give up on a run after this many frames
        #[arg(long, default_value_t = 36_000)]
        max_frames: u32,
    },
    /// Print the leaderboard and stats
    Scores,
    /// Delete all saved scores
    Clear,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let mut settings = Settings::load(&cli.settings);
    settings.apply_env();
    if let Some(dir) = cli.data_dir {
        settings.storage.data_dir = dir;
    }
    log::info!("Dino Dash starting (data in {})", settings.storage.data_dir.display());

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    runtime.block_on(async move {
        let service = Arc::new(ScoreService::open(&settings.storage));
        let context = Arc::new(ScoreContext::new(service));
        context.load_initial().await;

        match cli.command {
            Commands::Play {
                runs,
                seed,
                max_frames,
            } => play(&context, &settings, runs, seed, max_frames).await?,
            Commands::Scores => {}
            Commands::Clear => {
                context.clear_scores().await;
                if let Some(error) = context.snapshot().error {
                    anyhow::bail!(error);
                }
                println!("Scores cleared");
            }
        }

        print_scores(&context).await;
        Ok(())
    })
}

async fn play(
    context: &Arc<ScoreContext<FileBackend>>,
    settings: &Settings,
    runs: u32,
    seed: Option<u64>,
    max_frames: u32,
) -> Result<()> {
    let clock = SystemClock;
    let seed = seed.unwrap_or_else(|| clock.now_millis());
    log::info!("Playing {} runs with seed {}", runs, seed);

    let mut runner = Runner::new(seed, clock.now_millis(), settings.physics.clone());
    runner.set_idle_mode(true);

    let frame_millis = f64::from(TARGET_FRAME_MILLIS);
    let mut submissions = Vec::new();

    for run in 1..=runs {
        if run > 1 {
            runner.reset(clock.now_millis());
        }

        let target = context.next_target_score(0);
        let mut ended = None;
        for frame in 0..max_frames {
            if let Some(event) = runner.frame(f64::from(frame) * frame_millis) {
                ended = Some(event);
                break;
            }
        }

        let Some(event) = ended else {
            log::warn!(
                "Run {} hit the {} frame cap at score {}; not recorded",
                run,
                max_frames,
                runner.state().score
            );
            continue;
        };

        let GameEvent::RunEnded { score } = event;
        println!("Run {}: score {} (first target {})", run, score, target);

        // Recording overlaps with the next run
        let context = context.clone();
        submissions.push(tokio::spawn(async move {
            (run, context.handle_event(event).await)
        }));
    }

    for handle in submissions {
        let (run, is_new_high_score) = handle.await.context("score submission panicked")?;
        if is_new_high_score {
            println!("Run {} set a new high score!", run);
        }
    }

    context.refresh_scores().await;
    if let Some(error) = context.snapshot().error {
        anyhow::bail!(error);
    }
    Ok(())
}

async fn print_scores(context: &ScoreContext<FileBackend>) {
    let state = context.snapshot();

    println!();
    println!("Top {}", MAX_TOP_SCORES);
    if state.top_scores.is_empty() {
        println!("  (no scores yet)");
    }
    for (rank, score) in state.top_scores.iter().enumerate() {
        println!("  {}. {:>6}  {}", rank + 1, score.value, score.id);
    }

    if let Some(stats) = state.score_stats {
        println!(
            "Best {} | Average {} | Games {} | Last played {}",
            stats.highest_score, stats.average_score, stats.total_games, stats.last_played
        );
    }

    let service = context.service();
    let metrics = service.performance_metrics();
    log::info!(
        "Last save {:?}, last load {:?}, cache hit rate {:.0}%, {} bytes stored",
        metrics.save_time,
        metrics.load_time,
        metrics.cache_hit_rate * 100.0,
        service.storage_size().await
    );
}
