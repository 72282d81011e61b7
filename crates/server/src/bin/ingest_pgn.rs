//! Load PGN files into the position search database.
//!
//! Replays every game, samples positions along the mainline and stores the
//! game with its sampled positions.
//!
//! Usage: cargo run --release --bin ingest-pgn -- <pgn_dir> [--min-ply 6] [--max-ply 80] [--every 5] [--max-games N]

use chess_core::game::{game_id_from_site, game_type_from_event};
use chess_core::pgn::format_movetext;
use chess_core::{Game, Position};
use pgn_reader::{RawTag, Reader, SanPlus, Visitor};
use server::config::Config;
use server::db;
use shakmaty::{Chess, EnPassantMode, Position as _};
use std::env;
use std::fs::File;
use std::io::BufReader;
use std::ops::ControlFlow;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

const DEFAULT_MIN_PLY: usize = 6;
const DEFAULT_MAX_PLY: usize = 80;
const DEFAULT_EVERY: usize = 5;

/// Which plies get a stored position.
#[derive(Debug, Clone, Copy)]
struct Sampling {
    min_ply: usize,
    max_ply: usize,
    every: usize,
}

impl Sampling {
    fn includes(&self, ply: usize) -> bool {
        ply >= self.min_ply && ply <= self.max_ply && (ply - self.min_ply) % self.every.max(1) == 0
    }
}

/// Tags collected during header parsing.
#[derive(Default)]
struct GameTags {
    white: Option<String>,
    black: Option<String>,
    white_elo: i32,
    black_elo: i32,
    result: Option<String>,
    utc_date: Option<String>,
    date: Option<String>,
    eco: Option<String>,
    opening: Option<String>,
    time_control: Option<String>,
    site: Option<String>,
    event: Option<String>,
    termination: Option<String>,
}

/// State during movetext parsing.
struct GameState {
    game: Game,
    board: Chess,
    ply: usize,
    sans: Vec<String>,
    positions: Vec<Position>,
    /// Set once a SAN fails to replay; later moves are ignored.
    broken: bool,
}

struct IngestedGame {
    game: Game,
    positions: Vec<Position>,
}

/// Visitor that turns PGN games into storable games and positions.
struct Ingester {
    sampling: Sampling,
    file_stem: String,
    index: usize,
    finished: Vec<IngestedGame>,
    skipped: u64,
}

impl Ingester {
    fn new(sampling: Sampling) -> Self {
        Self {
            sampling,
            file_stem: String::new(),
            index: 0,
            finished: Vec::new(),
            skipped: 0,
        }
    }

    fn start_file(&mut self, file_stem: &str) {
        self.file_stem = file_stem.to_string();
        self.index = 0;
    }

    fn game_from_tags(&self, tags: GameTags) -> Game {
        let id = tags
            .site
            .as_deref()
            .and_then(game_id_from_site)
            .unwrap_or_else(|| format!("{}-{}", self.file_stem, self.index));

        Game {
            id,
            result: tags.result,
            white_elo: Some(tags.white_elo),
            black_elo: Some(tags.black_elo),
            game_type: Some(game_type_from_event(tags.event.as_deref().unwrap_or("")).to_string()),
            date: tags.utc_date.or(tags.date),
            white_name: tags.white,
            black_name: tags.black,
            eco: tags.eco,
            time_control: tags.time_control,
            site: tags.site,
            opening: tags.opening,
            pgn: String::new(),
        }
    }
}

fn text(value: RawTag<'_>) -> Option<String> {
    let value = value.decode_utf8_lossy().trim().to_string();
    (!value.is_empty() && value != "?").then_some(value)
}

impl Visitor for Ingester {
    type Tags = GameTags;
    type Movetext = GameState;
    type Output = ();

    fn begin_tags(&mut self) -> ControlFlow<(), GameTags> {
        self.index += 1;
        ControlFlow::Continue(GameTags::default())
    }

    fn tag(&mut self, tags: &mut GameTags, name: &[u8], value: RawTag<'_>) -> ControlFlow<()> {
        match name {
            b"White" => tags.white = text(value),
            b"Black" => tags.black = text(value),
            b"WhiteElo" => tags.white_elo = value.decode_utf8_lossy().parse().unwrap_or(0),
            b"BlackElo" => tags.black_elo = value.decode_utf8_lossy().parse().unwrap_or(0),
            b"Result" => tags.result = text(value),
            b"UTCDate" => tags.utc_date = text(value),
            b"Date" => tags.date = text(value),
            b"ECO" => tags.eco = text(value),
            b"Opening" => tags.opening = text(value),
            b"TimeControl" => tags.time_control = text(value),
            b"Site" => tags.site = text(value),
            b"Event" => tags.event = text(value),
            b"Termination" => tags.termination = text(value),
            _ => {}
        }
        ControlFlow::Continue(())
    }

    fn begin_movetext(&mut self, tags: GameTags) -> ControlFlow<(), GameState> {
        if matches!(tags.termination.as_deref(), Some("Abandoned" | "Time forfeit")) {
            self.skipped += 1;
            return ControlFlow::Break(());
        }

        ControlFlow::Continue(GameState {
            game: self.game_from_tags(tags),
            board: Chess::default(),
            ply: 0,
            sans: Vec::new(),
            positions: Vec::new(),
            broken: false,
        })
    }

    fn san(&mut self, state: &mut GameState, san_plus: SanPlus) -> ControlFlow<()> {
        if state.broken {
            return ControlFlow::Continue(());
        }

        let Ok(mv) = san_plus.san.to_move(&state.board) else {
            state.broken = true;
            return ControlFlow::Continue(());
        };

        match state.board.clone().play(mv) {
            Ok(board) => {
                state.board = board;
                state.ply += 1;
                state.sans.push(san_plus.to_string());

                if self.sampling.includes(state.ply) {
                    let setup = state.board.to_setup(EnPassantMode::Legal);
                    let ply = i32::try_from(state.ply).unwrap_or(i32::MAX);
                    state
                        .positions
                        .push(Position::from_setup(&setup).in_game(state.game.id.clone(), ply));
                }
            }
            Err(_) => state.broken = true,
        }

        ControlFlow::Continue(())
    }

    fn end_game(&mut self, state: GameState) {
        if state.sans.is_empty() {
            self.skipped += 1;
            return;
        }

        let mut game = state.game;
        game.pgn = format_movetext(&state.sans, game.result.as_deref());

        self.finished.push(IngestedGame {
            game,
            positions: state.positions,
        });
    }
}

fn arg_value(args: &[String], i: usize, default: usize) -> usize {
    args.get(i + 1).and_then(|s| s.parse().ok()).unwrap_or(default)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!(
            "Usage: {} <pgn_dir> [--min-ply N] [--max-ply N] [--every N] [--max-games N]",
            args[0]
        );
        std::process::exit(1);
    }

    let pgn_dir = &args[1];

    let mut sampling = Sampling {
        min_ply: DEFAULT_MIN_PLY,
        max_ply: DEFAULT_MAX_PLY,
        every: DEFAULT_EVERY,
    };
    let mut max_games: Option<usize> = None;

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--min-ply" => {
                sampling.min_ply = arg_value(&args, i, DEFAULT_MIN_PLY);
                i += 2;
            }
            "--max-ply" => {
                sampling.max_ply = arg_value(&args, i, DEFAULT_MAX_PLY);
                i += 2;
            }
            "--every" => {
                sampling.every = arg_value(&args, i, DEFAULT_EVERY).max(1);
                i += 2;
            }
            "--max-games" => {
                max_games = args.get(i + 1).and_then(|s| s.parse().ok());
                i += 2;
            }
            _ => i += 1,
        }
    }

    let config = Config::from_env()?;
    let pool = db::pool::create_pool(&config.database_url, config.database_max_connections).await?;
    db::pool::run_migrations(&pool).await?;

    let pattern = format!("{}/*.pgn", pgn_dir);
    let pgn_files: Vec<_> = glob::glob(&pattern)?.filter_map(|p| p.ok()).collect();

    if pgn_files.is_empty() {
        anyhow::bail!("No PGN files found in {pgn_dir}");
    }

    tracing::info!(
        files = pgn_files.len(),
        min_ply = sampling.min_ply,
        max_ply = sampling.max_ply,
        every = sampling.every,
        "Ingesting PGN files"
    );

    let mut ingester = Ingester::new(sampling);
    let mut stored_games = 0usize;
    let mut stored_positions = 0usize;
    let start = Instant::now();

    'files: for pgn_path in &pgn_files {
        let stem = pgn_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "game".to_string());
        tracing::info!("Processing {}...", pgn_path.display());
        ingester.start_file(&stem);

        let file = File::open(pgn_path)?;
        let mut reader = Reader::new(BufReader::new(file));

        while reader.read_game(&mut ingester)?.is_some() {
            for ingested in ingester.finished.drain(..) {
                stored_positions +=
                    db::positions::save_game(&pool, &ingested.game, &ingested.positions).await?;
                stored_games += 1;

                if stored_games % 1_000 == 0 {
                    tracing::info!(
                        games = stored_games,
                        positions = stored_positions,
                        elapsed_secs = start.elapsed().as_secs(),
                        "Progress"
                    );
                }
                if max_games.is_some_and(|max| stored_games >= max) {
                    break 'files;
                }
            }
        }
    }

    tracing::info!(
        games = stored_games,
        positions = stored_positions,
        skipped = ingester.skipped,
        elapsed_secs = start.elapsed().as_secs(),
        "Ingestion complete"
    );

    Ok(())
}
