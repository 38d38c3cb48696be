use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use engine::HeadlessRunner;
use engine::clock::FrameClock;

use tetris::api::{ApiError, LeaderboardService};
use tetris::config::{ConfigStore, GameConfig};
use tetris::credentials::TokenStore;
use tetris::http_client::HttpApiClient;
use tetris::playtest::{Autoplayer, PlayFrame, ReplayLog};
use tetris::reporting::{GameOverReporter, LeaderboardPanel, accept_update};
use tetris::scoring::{LevelPolicy, ProgressionRules};
use tetris::session::{FinalScore, SessionStatus};
use tetris::view::{FrameView, RenderSink, TextRenderer};

/// Frames kept for rewinding a headless run.
const REPLAY_HISTORY: usize = 600;

#[derive(Debug, Parser)]
#[command(name = "tetris")]
#[command(about = "Headless falling-block engine with leaderboard client")]
struct Cli {
    /// Config file; defaults to $TETRIS_CONFIG_PATH or ~/.config/tetris/config.json.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LevelMode {
    Time,
    Lines,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Let the built-in autoplayer run a game.
    Play {
        #[arg(long)]
        seed: Option<u64>,
        #[arg(long, default_value_t = 36_000)]
        frames: u64,
        #[arg(long, default_value_t = 16)]
        frame_ms: u64,
        /// Pace frames against the wall clock instead of simulating.
        #[arg(long, default_value_t = false)]
        realtime: bool,
        /// Redraw the well every N frames.
        #[arg(long)]
        render_every: Option<u64>,
        #[arg(long, value_enum)]
        level_mode: Option<LevelMode>,
        /// Submit the final score and show the leaderboard.
        #[arg(long, default_value_t = false)]
        submit: bool,
        /// Write the frame log so the run can be replayed.
        #[arg(long)]
        record: Option<PathBuf>,
    },
    /// Re-run a recorded frame log and print the final state.
    Replay {
        path: PathBuf,
        /// Show the state this many frames before the end.
        #[arg(long, default_value_t = 0)]
        rewind: usize,
    },
    Leaderboard {
        #[arg(long)]
        limit: Option<u32>,
    },
    Token {
        #[command(subcommand)]
        action: TokenAction,
    },
    /// Print the resolved config.
    Config {
        #[arg(long, default_value_t = false)]
        write_defaults: bool,
    },
}

#[derive(Debug, Subcommand)]
enum TokenAction {
    Set { token: String },
    Clear,
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let store = match cli.config {
        Some(path) => ConfigStore::new(path),
        None => ConfigStore::from_env(),
    };
    let config = store.load().with_env_overrides();

    match cli.command {
        Commands::Play {
            seed,
            frames,
            frame_ms,
            realtime,
            render_every,
            level_mode,
            submit,
            record,
        } => {
            let options = PlayOptions {
                seed: seed.unwrap_or_else(seed_from_clock),
                frames,
                frame: Duration::from_millis(frame_ms.max(1)),
                realtime,
                render_every: render_every.filter(|&n| n > 0),
                level_mode,
                submit,
                record,
            };
            cmd_play(&config, options).await
        }
        Commands::Replay { path, rewind } => cmd_replay(&path, rewind),
        Commands::Leaderboard { limit } => cmd_leaderboard(&config, limit).await,
        Commands::Token { action } => cmd_token(action),
        Commands::Config { write_defaults } => cmd_config(&store, &config, write_defaults),
    }
}

struct PlayOptions {
    seed: u64,
    frames: u64,
    frame: Duration,
    realtime: bool,
    render_every: Option<u64>,
    level_mode: Option<LevelMode>,
    submit: bool,
    record: Option<PathBuf>,
}

fn seed_from_clock() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

async fn cmd_play(config: &GameConfig, options: PlayOptions) -> Result<()> {
    let mut rules = config.session_rules();
    if let Some(mode) = options.level_mode {
        let level_policy = match mode {
            LevelMode::Time => LevelPolicy::ByTime {
                every: Duration::from_secs(30),
            },
            LevelMode::Lines => LevelPolicy::ByLines { per_level: 10 },
        };
        rules.progression = ProgressionRules {
            level_policy,
            drop_curve: None,
        };
    }

    let mut log = ReplayLog::new(options.seed, rules);
    let mut runner = HeadlessRunner::with_history_limit(log.logic(), REPLAY_HISTORY);
    let mut player = Autoplayer::new();
    let mut renderer = TextRenderer::new();
    let mut clock = FrameClock::default();
    clock.delta(Instant::now());

    for _ in 0..options.frames {
        let input = player.next_input(runner.state());
        let dt = if options.realtime {
            tokio::time::sleep(options.frame).await;
            clock.delta(Instant::now())
        } else {
            options.frame
        };
        let frame = PlayFrame { dt, input };
        log.push(frame);
        runner.step(frame);

        if let Some(every) = options.render_every {
            if runner.frame() as u64 % every == 0 {
                renderer.render(&FrameView::capture(runner.state()))?;
                print!("\x1b[H\x1b[2J{}", renderer.output());
            }
        }
        if runner.state().status() == SessionStatus::GameOver {
            break;
        }
    }

    let session = runner.state();
    let frame = FrameView::capture(session);
    renderer.render(&frame).context("render final frame")?;
    println!("{}", renderer.output());
    println!(
        "seed {}  frames {}  pieces {}  time {:.1}s",
        options.seed,
        runner.frame(),
        session.pieces_locked(),
        session.elapsed().as_secs_f64()
    );
    match session.game_over_cause() {
        Some(cause) => println!("game over: {cause:?}"),
        None => println!("stopped after frame limit"),
    }
    println!("fingerprint {}", frame.fingerprint()?);

    if let Some(path) = &options.record {
        log.save_json_file(path)
            .with_context(|| format!("write replay {}", path.display()))?;
        println!("replay written to {}", path.display());
    }

    if options.submit {
        if session.status() != SessionStatus::GameOver {
            bail!("--submit needs a finished game; raise --frames");
        }
        submit_and_show(config, session.session_id(), session.final_score()).await?;
    }
    Ok(())
}

fn cmd_replay(path: &Path, rewind: usize) -> Result<()> {
    let log = ReplayLog::load_json_file(path)
        .with_context(|| format!("read replay {}", path.display()))?;
    let history = rewind.saturating_add(1).max(REPLAY_HISTORY);
    let mut runner = log.replay(history);
    if rewind > 0 {
        runner.rewind(rewind);
    }

    let frame = FrameView::capture(runner.state());
    let mut renderer = TextRenderer::new();
    renderer.render(&frame).context("render replay frame")?;
    println!("{}", renderer.output());
    println!(
        "seed {}  frame {}/{}",
        log.seed,
        runner.frame(),
        log.frames.len()
    );
    println!("fingerprint {}", frame.fingerprint()?);
    Ok(())
}

async fn submit_and_show(config: &GameConfig, session_id: u64, score: FinalScore) -> Result<()> {
    let client = HttpApiClient::new(&config.api, TokenStore::from_env().resolve());
    if !client.has_token() {
        eprintln!("[play] no token stored; score not submitted (see `tetris token set`)");
    }
    let (reporter, mut updates) = GameOverReporter::new(Arc::new(client), config.api.leaderboard_limit);
    reporter
        .report(session_id, score)
        .await
        .context("report task panicked")?;

    let Some(update) = updates.recv().await.and_then(|u| accept_update(u, session_id)) else {
        bail!("no report received for session {session_id}");
    };
    if let Some(outcome) = &update.submitted {
        match (outcome.is_new_high_score, outcome.rank, outcome.current_high_score) {
            (true, Some(rank), _) => println!("new high score! rank #{rank}"),
            (true, None, _) => println!("new high score!"),
            (false, _, Some(best)) => println!("your best is still {best}"),
            (false, _, None) => println!("score recorded"),
        }
    }
    print_panel(&update.panel);
    Ok(())
}

async fn cmd_leaderboard(config: &GameConfig, limit: Option<u32>) -> Result<()> {
    let tokens = TokenStore::from_env();
    let client = HttpApiClient::new(&config.api, tokens.resolve());
    let limit = limit.unwrap_or(config.api.leaderboard_limit).max(1);

    let top = client
        .fetch_top(limit)
        .await
        .with_context(|| format!("fetch leaderboard from {}", client.base_url()))?;
    let own = match client.fetch_own_best().await {
        Ok(own) => own,
        Err(ApiError::Unauthorized) => {
            eprintln!("[leaderboard] stored token was rejected; clearing it");
            tokens.clear().context("clear rejected token")?;
            None
        }
        Err(err) => {
            eprintln!("[leaderboard] personal best unavailable: {err}");
            None
        }
    };
    print_panel(&LeaderboardPanel::Ready { top, own });
    Ok(())
}

fn print_panel(panel: &LeaderboardPanel) {
    let LeaderboardPanel::Ready { top, own } = panel else {
        println!("leaderboard unavailable");
        return;
    };
    if top.is_empty() {
        println!("no scores yet");
    }
    let mine = panel.own_row();
    for (index, entry) in top.iter().enumerate() {
        let marker = if mine == Some(index) { '*' } else { ' ' };
        println!(
            "{marker}{:>3}  {:<16} {:>8}",
            index + 1,
            entry.display_name(),
            entry.score
        );
    }
    match own {
        Some(best) if best.has_record => {
            println!("{}: best {} (rank #{})", best.nickname, best.high_score, best.rank)
        }
        Some(best) => println!("{}: no record yet", best.nickname),
        None => println!("sign in to see your best score"),
    }
}

fn cmd_token(action: TokenAction) -> Result<()> {
    let store = TokenStore::from_env();
    match action {
        TokenAction::Set { token } => {
            if token.trim().is_empty() {
                bail!("token must not be empty");
            }
            store
                .save(&token)
                .with_context(|| format!("write {}", store.path().display()))?;
            println!("token saved to {}", store.path().display());
        }
        TokenAction::Clear => {
            store
                .clear()
                .with_context(|| format!("remove {}", store.path().display()))?;
            println!("token cleared");
        }
        TokenAction::Status => match store.resolve() {
            Some(_) => println!("token available"),
            None => println!("no token ({})", store.path().display()),
        },
    }
    Ok(())
}

fn cmd_config(store: &ConfigStore, config: &GameConfig, write_defaults: bool) -> Result<()> {
    if write_defaults && !store.path().exists() {
        store
            .save(&GameConfig::default())
            .with_context(|| format!("write {}", store.path().display()))?;
        println!("wrote defaults to {}", store.path().display());
    }
    println!("# {}", store.path().display());
    println!(
        "{}",
        serde_json::to_string_pretty(config).context("serialize config")?
    );
    Ok(())
}
