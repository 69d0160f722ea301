//! Analysis Layer
//!
//! Turns raw OCR text into structured match data:
//! - Text normalization (whitespace, glyph confusions, profile rules)
//! - Rule-based extraction of match metadata and player stats
//! - Per-team aggregation

pub mod match_data;
pub mod normalize;
pub mod teams;

pub use match_data::{parse, MatchRecord, MatchType, PlayerRecord};
pub use normalize::normalize;
pub use teams::{TeamSplit, TeamTotals, TEAM_SIZE};

use serde::Serialize;

use crate::vision::profile::GameProfile;

/// Normalized text together with the record parsed from it
#[derive(Debug, Clone, Serialize)]
pub struct TextAnalysis {
    pub normalized: String,
    pub record: MatchRecord,
}

/// Normalize then parse raw OCR text
pub fn analyze_text(raw: &str, profile: GameProfile) -> TextAnalysis {
    let normalized = normalize(raw, profile);
    let record = parse(&normalized);

    TextAnalysis { normalized, record }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analyze_raw_text() {
        let raw = "Clasificatoria 02/03/24 18:44\nAhri 5 / 2 / 8  3.4\nZed 1 / l0 / 2 9.1";
        let analysis = analyze_text(raw, GameProfile::WildRift);

        assert_eq!(analysis.record.match_type, MatchType::Ranked);
        assert_eq!(analysis.record.date.as_deref(), Some("02/03/24"));
        assert_eq!(analysis.record.duration.as_deref(), Some("18:44"));

        // Date, then the two players
        let kdas: Vec<String> = analysis.record.players.iter().map(|p| p.kda()).collect();
        assert_eq!(kdas, vec!["2/3/24", "5/2/8", "1/10/2"]);
    }

    #[test]
    fn test_auto_profile_keeps_glued_tokens() {
        let analysis = analyze_text("ModoRanked 5/2/8 対戦15/09/23 評価3.4", GameProfile::Auto);

        assert_eq!(analysis.record.match_type, MatchType::Ranked);
        assert_eq!(analysis.record.date.as_deref(), Some("15/09/23"));
        assert!((analysis.record.players[0].score - 3.4).abs() < 1e-9);
    }
}
