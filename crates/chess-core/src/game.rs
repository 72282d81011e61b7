use serde::{Deserialize, Serialize};

/// Metadata and full movetext for one recorded game.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Game {
    pub id: String,
    pub result: Option<String>, // "1-0", "0-1", "1/2-1/2"
    pub white_elo: Option<i32>,
    pub black_elo: Option<i32>,
    pub game_type: Option<String>,
    pub date: Option<String>,
    pub white_name: Option<String>,
    pub black_name: Option<String>,
    pub eco: Option<String>,
    pub time_control: Option<String>,
    pub site: Option<String>,
    pub opening: Option<String>,
    pub pgn: String,
}

const GAME_TYPES: &[&str] = &["rapid", "blitz", "bullet", "classical"];

/// Classify a game from its `Event` tag, e.g. "Rated Blitz game" -> "blitz".
pub fn game_type_from_event(event: &str) -> &'static str {
    event
        .split_whitespace()
        .find_map(|word| {
            let word = word.to_ascii_lowercase();
            GAME_TYPES.iter().copied().find(|t| *t == word)
        })
        .unwrap_or("unknown")
}

/// Game id from a `Site` tag such as `https://lichess.org/abcd1234`.
pub fn game_id_from_site(site: &str) -> Option<String> {
    site.trim()
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .map(str::trim)
        .filter(|id| !id.is_empty() && *id != "?")
        .map(str::to_string)
}
