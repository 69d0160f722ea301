//! Match data extraction
//!
//! Turns normalized OCR text into a [`MatchRecord`] by running an ordered list
//! of independent, named regex rules ([`EXTRACTION_RULES`]) over the text. Each
//! rule writes only its own slot of the intermediate [`Extracted`] fields; the
//! record is assembled afterwards. Parsing is total: missing fields stay empty,
//! garbage input yields an empty record.
//!
//! Token boundaries are ASCII-only (`(?-u:\b)`), so kanji, kana or accented
//! letters glued to a number do not hide it.
//!
//! Known limitation: scores and levels are paired with KDA triplets purely by
//! position (i-th score → i-th triplet). Nothing checks that the two token
//! streams actually line up on screen.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use tracing::debug;

/// Placeholder prefix for players whose name is not recoverable
pub const PLACEHOLDER_NAME: &str = "Jugador";

/// Raw findings of all rules, before the record is assembled
#[derive(Debug, Default)]
pub struct Extracted {
    date: Option<String>,
    duration: Option<String>,
    ranked: bool,
    normal: bool,
    kdas: Vec<[u32; 3]>,
    scores: Vec<f64>,
    levels: Vec<u32>,
}

/// A named regex rule over normalized text
pub struct ExtractionRule {
    /// Rule identifier
    pub name: &'static str,
    /// Exact regex pattern
    pub pattern: &'static str,
    /// What the capture groups hold
    pub captures: &'static str,
    apply: fn(&Regex, &str, &mut Extracted),
    compiled: OnceLock<Regex>,
}

impl ExtractionRule {
    const fn new(
        name: &'static str,
        pattern: &'static str,
        captures: &'static str,
        apply: fn(&Regex, &str, &mut Extracted),
    ) -> Self {
        Self {
            name,
            pattern,
            captures,
            apply,
            compiled: OnceLock::new(),
        }
    }

    /// Compiled pattern
    pub fn regex(&self) -> &Regex {
        self.compiled
            .get_or_init(|| Regex::new(self.pattern).expect("extraction rule pattern must compile"))
    }

    /// Run the rule, recording what it finds
    pub fn apply(&self, text: &str, found: &mut Extracted) {
        (self.apply)(self.regex(), text, found);
    }
}

pub static DATE_RULE: ExtractionRule = ExtractionRule::new(
    "date",
    r"(?-u:\b)([0-9]{2}[/.\-][0-9]{2}[/.\-][0-9]{2})(?-u:\b)",
    "1: first two-digit triple separated by '/', '-' or '.', kept verbatim",
    |re, text, found| found.date = first_capture(re, text),
);

pub static DURATION_RULE: ExtractionRule = ExtractionRule::new(
    "duration",
    r"(?-u:\b)([0-9]{1,2}:[0-9]{2})(?-u:\b)",
    "1: first minutes:seconds token, kept verbatim",
    |re, text, found| found.duration = first_capture(re, text),
);

pub static RANKED_RULE: ExtractionRule = ExtractionRule::new(
    "ranked",
    r"(?i)(ranked|rank|clasificatorias?)",
    "1: ranked-match keyword anywhere, case-insensitive, even glued to other text",
    |re, text, found| found.ranked = re.is_match(text),
);

pub static NORMAL_RULE: ExtractionRule = ExtractionRule::new(
    "normal",
    r"(?i)(normal|casual|classic|cl[aá]sica)",
    "1: normal-match keyword anywhere, case-insensitive",
    |re, text, found| found.normal = re.is_match(text),
);

pub static KDA_RULE: ExtractionRule = ExtractionRule::new(
    "kda",
    r"([0-9]+)\s*/\s*([0-9]+)\s*/\s*([0-9]+)",
    "1: kills, 2: deaths, 3: assists; every non-overlapping match is one player",
    |re, text, found| {
        found.kdas = re
            .captures_iter(text)
            .map(|caps| [parse_count(&caps[1]), parse_count(&caps[2]), parse_count(&caps[3])])
            .collect();
    },
);

pub static SCORE_RULE: ExtractionRule = ExtractionRule::new(
    "score",
    r"(?-u:\b)([0-9]+\.[0-9]+)(?-u:\b)",
    "1: decimal score; the i-th match belongs to the i-th player",
    |re, text, found| {
        found.scores = re.captures_iter(text).filter_map(|caps| caps[1].parse().ok()).collect();
    },
);

pub static LEVEL_RULE: ExtractionRule = ExtractionRule::new(
    "level",
    r"(?i)(?-u:\b)(?:level|lvl|lv)\.?\s*([0-9]{1,3})(?-u:\b)",
    "1: hero level; the i-th match belongs to the i-th player",
    |re, text, found| {
        found.levels = re.captures_iter(text).filter_map(|caps| caps[1].parse().ok()).collect();
    },
);

/// All rules, in evaluation order
pub static EXTRACTION_RULES: [&ExtractionRule; 7] = [
    &DATE_RULE,
    &DURATION_RULE,
    &RANKED_RULE,
    &NORMAL_RULE,
    &KDA_RULE,
    &SCORE_RULE,
    &LEVEL_RULE,
];

/// Queue type of the match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MatchType {
    #[default]
    Normal,
    Ranked,
}

/// One player's line on the result screen
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRecord {
    /// Player name, or "Jugador N" when unknown
    pub display_name: String,
    /// Champion/hero name if recognized
    pub champion: Option<String>,
    /// Hero level if recognized
    pub level: Option<u32>,
    pub kills: u32,
    pub deaths: u32,
    pub assists: u32,
    /// Per-player rating shown on screen (0.0 when missing)
    pub score: f64,
}

impl PlayerRecord {
    /// Canonical "K/D/A" string
    pub fn kda(&self) -> String {
        format!("{}/{}/{}", self.kills, self.deaths, self.assists)
    }

    /// MVP heuristic: kills + assists - deaths
    pub fn kda_score(&self) -> i64 {
        self.kills as i64 + self.assists as i64 - self.deaths as i64
    }
}

/// Structured result of one OCR run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    /// Raw date text as shown on screen
    pub date: Option<String>,
    /// Raw duration text (m:ss or mm:ss)
    pub duration: Option<String>,
    /// Normal unless a ranked keyword was found
    #[serde(rename = "type")]
    pub match_type: MatchType,
    /// Players in order of appearance
    pub players: Vec<PlayerRecord>,
    /// Index into `players` of the MVP
    pub mvp: Option<usize>,
}

impl MatchRecord {
    /// The MVP's record
    pub fn mvp_player(&self) -> Option<&PlayerRecord> {
        self.mvp.and_then(|i| self.players.get(i))
    }
}

/// Parse normalized text into a match record
pub fn parse(text: &str) -> MatchRecord {
    let mut found = Extracted::default();
    for rule in EXTRACTION_RULES {
        rule.apply(text, &mut found);
    }

    let match_type = match_type_of(&found);

    let players: Vec<PlayerRecord> = found
        .kdas
        .iter()
        .enumerate()
        .map(|(i, &[kills, deaths, assists])| PlayerRecord {
            display_name: format!("{} {}", PLACEHOLDER_NAME, i + 1),
            champion: None,
            level: found.levels.get(i).copied(),
            kills,
            deaths,
            assists,
            score: found.scores.get(i).copied().unwrap_or(0.0),
        })
        .collect();

    if found.scores.len() != players.len() && !players.is_empty() {
        debug!(
            "Score/KDA count mismatch: {} scores for {} players",
            found.scores.len(),
            players.len()
        );
    }

    let mvp = select_mvp(&players);

    debug!(
        "Parsed match: type={:?}, date={:?}, duration={:?}, {} players, mvp={:?}",
        match_type,
        found.date,
        found.duration,
        players.len(),
        mvp
    );

    MatchRecord {
        date: found.date,
        duration: found.duration,
        match_type,
        players,
        mvp,
    }
}

/// Ranked keywords win over normal ones; default is Normal
pub fn detect_match_type(text: &str) -> MatchType {
    let mut found = Extracted::default();
    RANKED_RULE.apply(text, &mut found);
    NORMAL_RULE.apply(text, &mut found);
    match_type_of(&found)
}

fn match_type_of(found: &Extracted) -> MatchType {
    if found.ranked {
        return MatchType::Ranked;
    }
    if !found.normal {
        debug!("No match type keyword found, assuming Normal");
    }
    MatchType::Normal
}

/// Index of the player with the best kills + assists - deaths.
///
/// Left-to-right with a strict comparison, so ties keep the earlier player.
pub fn select_mvp(players: &[PlayerRecord]) -> Option<usize> {
    players
        .iter()
        .enumerate()
        .reduce(|best, candidate| {
            if candidate.1.kda_score() > best.1.kda_score() {
                candidate
            } else {
                best
            }
        })
        .map(|(index, _)| index)
}

fn first_capture(re: &Regex, text: &str) -> Option<String> {
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Digits only; saturates instead of failing on overflow
fn parse_count(digits: &str) -> u32 {
    digits.parse().unwrap_or(u32::MAX)
}
