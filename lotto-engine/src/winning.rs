use std::collections::BTreeMap;

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;

use lotto_db::models::{HistoricalDraw, Rank, POOL_SIZE, PICK_COUNT, TICKET_PRICE};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TicketCheck {
    pub matched: Vec<u8>,
    pub unmatched: Vec<u8>,
    /// Bonus trouvé avec exactement 5 numéros.
    pub bonus_matched: bool,
    pub rank: Option<Rank>,
}

pub fn rank_for(matched: usize, has_bonus: bool) -> Option<Rank> {
    match matched {
        6 => Some(Rank::First),
        5 if has_bonus => Some(Rank::Second),
        5 => Some(Rank::Third),
        4 => Some(Rank::Fourth),
        3 => Some(Rank::Fifth),
        _ => None,
    }
}

/// Compare une grille au tirage. Les numéros sont supposés distincts.
pub fn rank_ticket(ticket: &[u8], draw: &HistoricalDraw) -> TicketCheck {
    let (mut matched, mut unmatched): (Vec<u8>, Vec<u8>) =
        ticket.iter().copied().partition(|&n| draw.contains(n));
    matched.sort();
    unmatched.sort();
    let has_bonus = ticket.contains(&draw.bonus);
    let rank = rank_for(matched.len(), has_bonus);

    TicketCheck {
        bonus_matched: has_bonus && matched.len() == 5,
        matched,
        unmatched,
        rank,
    }
}

/// Gain estimé par rang : les rangs 2 et 3 sont déduits du gain du 1er rang,
/// les rangs 4 et 5 sont fixes.
pub fn estimated_prize(rank: Rank, draw: &HistoricalDraw) -> u64 {
    match rank {
        Rank::First => draw.first_prize,
        Rank::Second => draw.first_prize / 6,
        Rank::Third => draw.first_prize / 100,
        Rank::Fourth => 50_000,
        Rank::Fifth => 5_000,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub games: u32,
    pub investment: u64,
    pub total_prize: u64,
    pub profit: i64,
    pub return_rate_pct: f64,
    pub winning_games: u32,
    pub rank_counts: BTreeMap<Rank, u32>,
    pub prize_by_rank: BTreeMap<Rank, u64>,
}

/// Joue `games` grilles uniformément aléatoires contre un tirage connu.
pub fn simulate(draw: &HistoricalDraw, games: u32, seed: u64) -> SimulationReport {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut rank_counts: BTreeMap<Rank, u32> = BTreeMap::new();
    let mut prize_by_rank: BTreeMap<Rank, u64> = BTreeMap::new();
    let mut total_prize = 0u64;
    let mut winning_games = 0u32;

    for _ in 0..games {
        let ticket: Vec<u8> = rand::seq::index::sample(&mut rng, POOL_SIZE, PICK_COUNT)
            .iter()
            .map(|i| (i + 1) as u8)
            .collect();
        if let Some(rank) = rank_ticket(&ticket, draw).rank {
            let prize = estimated_prize(rank, draw);
            *rank_counts.entry(rank).or_insert(0) += 1;
            *prize_by_rank.entry(rank).or_insert(0) += prize;
            total_prize += prize;
            winning_games += 1;
        }
    }

    let investment = games as u64 * TICKET_PRICE;
    let profit = total_prize as i64 - investment as i64;
    let return_rate_pct = if investment > 0 {
        profit as f64 / investment as f64 * 100.0
    } else {
        0.0
    };

    tracing::debug!(round = draw.round, games, winning_games, "simulation terminée");

    SimulationReport {
        games,
        investment,
        total_prize,
        profit,
        return_rate_pct,
        winning_games,
        rank_counts,
        prize_by_rank,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample_draw() -> HistoricalDraw {
        HistoricalDraw {
            round: 1100,
            draw_date: NaiveDate::from_ymd_opt(2024, 1, 6).unwrap(),
            numbers: [3, 11, 22, 33, 41, 45],
            bonus: 7,
            first_prize: 2_400_000_000,
            first_winners: 11,
            total_sales: 115_000_000_000,
        }
    }

    #[test]
    fn test_rank_ticket_all_ranks() {
        let draw = sample_draw();
        assert_eq!(rank_ticket(&[3, 11, 22, 33, 41, 45], &draw).rank, Some(Rank::First));
        assert_eq!(rank_ticket(&[3, 11, 22, 33, 41, 7], &draw).rank, Some(Rank::Second));
        assert_eq!(rank_ticket(&[3, 11, 22, 33, 41, 8], &draw).rank, Some(Rank::Third));
        assert_eq!(rank_ticket(&[3, 11, 22, 33, 7, 8], &draw).rank, Some(Rank::Fourth));
        assert_eq!(rank_ticket(&[3, 11, 22, 1, 2, 7], &draw).rank, Some(Rank::Fifth));
        assert_eq!(rank_ticket(&[3, 11, 1, 2, 4, 7], &draw).rank, None);
    }

    #[test]
    fn test_rank_ticket_details() {
        let draw = sample_draw();
        let check = rank_ticket(&[41, 3, 22, 33, 11, 7], &draw);
        assert_eq!(check.matched, vec![3, 11, 22, 33, 41]);
        assert_eq!(check.unmatched, vec![7]);
        assert!(check.bonus_matched);

        let check = rank_ticket(&[3, 11, 22, 1, 2, 7], &draw);
        assert!(!check.bonus_matched);
    }

    #[test]
    fn test_estimated_prize() {
        let draw = sample_draw();
        assert_eq!(estimated_prize(Rank::First, &draw), 2_400_000_000);
        assert_eq!(estimated_prize(Rank::Second, &draw), 400_000_000);
        assert_eq!(estimated_prize(Rank::Third, &draw), 24_000_000);
        assert_eq!(estimated_prize(Rank::Fourth, &draw), 50_000);
        assert_eq!(estimated_prize(Rank::Fifth, &draw), 5_000);
    }

    #[test]
    fn test_simulation_accounting() {
        let draw = sample_draw();
        let report = simulate(&draw, 2_000, 42);
        assert_eq!(report.games, 2_000);
        assert_eq!(report.investment, 2_000_000);
        assert_eq!(report.profit, report.total_prize as i64 - 2_000_000);
        assert_eq!(report.winning_games, report.rank_counts.values().sum::<u32>());
        assert_eq!(report.total_prize, report.prize_by_rank.values().sum::<u64>());
    }

    #[test]
    fn test_simulation_reproducible() {
        let draw = sample_draw();
        let a = simulate(&draw, 500, 7);
        let b = simulate(&draw, 500, 7);
        assert_eq!(a.total_prize, b.total_prize);
        assert_eq!(a.rank_counts, b.rank_counts);
    }

    #[test]
    fn test_simulation_zero_games() {
        let report = simulate(&sample_draw(), 0, 1);
        assert_eq!(report.investment, 0);
        assert_eq!(report.return_rate_pct, 0.0);
    }
}
