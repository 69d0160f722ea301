//! Team aggregation
//!
//! The result screen lists the first team before the second, so players are
//! split positionally: the first [`TEAM_SIZE`] rows form team 1, the rest team 2.

use serde::Serialize;

use super::match_data::{MatchRecord, PlayerRecord};

/// Players per team on every supported title
pub const TEAM_SIZE: usize = 5;

/// Summed stats of one team
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TeamTotals {
    pub players: usize,
    pub kills: u64,
    pub deaths: u64,
    pub assists: u64,
    /// kills / max(deaths, 1)
    pub kd_ratio: f64,
}

impl TeamTotals {
    /// Aggregate a slice of players
    pub fn from_players(players: &[PlayerRecord]) -> Self {
        let (kills, deaths, assists) = players.iter().fold((0u64, 0u64, 0u64), |(k, d, a), p| {
            (k + p.kills as u64, d + p.deaths as u64, a + p.assists as u64)
        });

        Self {
            players: players.len(),
            kills,
            deaths,
            assists,
            kd_ratio: kills as f64 / deaths.max(1) as f64,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TeamSplit {
    pub team1: TeamTotals,
    pub team2: TeamTotals,
}

impl TeamSplit {
    pub fn from_players(players: &[PlayerRecord]) -> Self {
        let cut = players.len().min(TEAM_SIZE);
        let (first, second) = players.split_at(cut);

        Self {
            team1: TeamTotals::from_players(first),
            team2: TeamTotals::from_players(second),
        }
    }
}

impl MatchRecord {
    /// Per-team totals for this match
    pub fn team_split(&self) -> TeamSplit {
        TeamSplit::from_players(&self.players)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::match_data::parse;

    #[test]
    fn test_empty_match() {
        let split = TeamSplit::from_players(&[]);
        assert_eq!(split.team1.players, 0);
        assert_eq!(split.team2.players, 0);
        assert_eq!(split.team1.kd_ratio, 0.0);
    }

    #[test]
    fn test_full_lobby_split() {
        let text = "1/0/1 2/1/2 3/2/3 4/3/4 5/4/5 0/1/0 0/2/0 1/3/0 1/4/0 2/0/0";
        let split = parse(text).team_split();

        assert_eq!(split.team1.players, 5);
        assert_eq!(split.team1.kills, 15);
        assert_eq!(split.team1.deaths, 10);
        assert_eq!(split.team1.assists, 15);
        assert!((split.team1.kd_ratio - 1.5).abs() < 1e-9);

        assert_eq!(split.team2.players, 5);
        assert_eq!(split.team2.kills, 4);
        assert_eq!(split.team2.deaths, 10);
        assert!((split.team2.kd_ratio - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_short_lobby_has_empty_second_team() {
        let split = parse("3/0/1 2/0/0").team_split();
        assert_eq!(split.team1.players, 2);
        // Zero deaths count as one
        assert!((split.team1.kd_ratio - 5.0).abs() < 1e-9);
        assert_eq!(split.team2, TeamTotals::default());
    }

    #[test]
    fn test_saturated_counts_do_not_overflow() {
        let split = parse("99999999999/0/0 99999999999/0/0").team_split();
        assert_eq!(split.team1.kills, 2 * u32::MAX as u64);
    }
}
