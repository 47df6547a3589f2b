use anyhow::{bail, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Taille de la grille (numéros 1 à 45).
pub const POOL_SIZE: usize = 45;
/// Nombre de numéros tirés (hors bonus).
pub const PICK_COUNT: usize = 6;
/// Prix d'un ticket, en wons.
pub const TICKET_PRICE: u64 = 1_000;

/// Tranches de valeurs utilisées pour juger de l'étalement d'une combinaison.
pub const BUCKETS: [(u8, u8); 5] = [(1, 10), (11, 20), (21, 30), (31, 40), (41, 45)];

pub fn bucket_of(number: u8) -> Option<usize> {
    BUCKETS
        .iter()
        .position(|&(lo, hi)| number >= lo && number <= hi)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalDraw {
    pub round: u32,
    pub draw_date: NaiveDate,
    pub numbers: [u8; 6],
    pub bonus: u8,
    /// Gain du 1er rang par gagnant.
    pub first_prize: u64,
    pub first_winners: u32,
    pub total_sales: u64,
}

impl HistoricalDraw {
    pub fn contains(&self, number: u8) -> bool {
        self.numbers.contains(&number)
    }

    pub fn sorted_numbers(&self) -> [u8; 6] {
        let mut numbers = self.numbers;
        numbers.sort();
        numbers
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Rank {
    First,
    Second,
    Third,
    Fourth,
    Fifth,
}

impl Rank {
    pub const ALL: [Rank; 5] = [Rank::First, Rank::Second, Rank::Third, Rank::Fourth, Rank::Fifth];

    pub fn index(&self) -> u8 {
        match self {
            Rank::First => 1,
            Rank::Second => 2,
            Rank::Third => 3,
            Rank::Fourth => 4,
            Rank::Fifth => 5,
        }
    }

    /// Nombre de numéros principaux à trouver pour ce rang.
    pub fn match_target(&self) -> usize {
        match self {
            Rank::First => 6,
            Rank::Second | Rank::Third => 5,
            Rank::Fourth => 4,
            Rank::Fifth => 3,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Rank::First => "6 numéros",
            Rank::Second => "5 numéros + bonus",
            Rank::Third => "5 numéros (sans bonus)",
            Rank::Fourth => "4 numéros",
            Rank::Fifth => "3 numéros",
        }
    }
}

impl std::fmt::Display for Rank {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rank::First => write!(f, "1er"),
            other => write!(f, "{}e", other.index()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Trend {
    Rising,
    Falling,
    Stable,
}

impl std::fmt::Display for Trend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Trend::Rising => write!(f, "HAUSSE"),
            Trend::Falling => write!(f, "BAISSE"),
            Trend::Stable => write!(f, "-"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumberTrend {
    pub number: u8,
    pub appearances: u32,
    pub frequency: f64,
    pub expected_frequency: f64,
    pub deviation_pct: f64,
    pub trend: Trend,
    /// Présence du numéro dans les derniers tirages, du plus ancien au plus récent.
    pub recent_window: Vec<bool>,
}

impl NumberTrend {
    pub fn recent_appearances(&self) -> usize {
        self.recent_window.iter().filter(|&&hit| hit).count()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumberPair {
    pub a: u8,
    pub b: u8,
    pub appearances: u32,
    pub frequency_pct: f64,
    pub rounds: Vec<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CombinationKind {
    Hot,
    Cold,
    Balanced,
    TrendRising,
    Statistical,
}

impl CombinationKind {
    pub const ALL: [CombinationKind; 5] = [
        CombinationKind::Hot,
        CombinationKind::Cold,
        CombinationKind::Balanced,
        CombinationKind::TrendRising,
        CombinationKind::Statistical,
    ];
}

impl std::fmt::Display for CombinationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CombinationKind::Hot => write!(f, "Chauds"),
            CombinationKind::Cold => write!(f, "Froids"),
            CombinationKind::Balanced => write!(f, "Équilibré"),
            CombinationKind::TrendRising => write!(f, "Tendance"),
            CombinationKind::Statistical => write!(f, "Statistique"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendedCombination {
    pub numbers: [u8; 6],
    pub kind: CombinationKind,
    pub score: f64,
    pub rationale: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionalProbabilityResult {
    pub rank: Rank,
    pub probability: f64,
    /// Cote « 1 chance sur N », 0 si le rang est impossible.
    pub odds_denominator: u64,
    pub favorable_cases: u64,
    pub total_cases: u64,
    pub description: String,
    pub delta_from_baseline_pct: f64,
}

pub fn validate_numbers(numbers: &[u8]) -> Result<()> {
    for &n in numbers {
        if n < 1 || n as usize > POOL_SIZE {
            bail!("Numéro {} hors limites (1-{})", n, POOL_SIZE);
        }
    }
    for i in 0..numbers.len() {
        for j in (i + 1)..numbers.len() {
            if numbers[i] == numbers[j] {
                bail!("Numéro en double : {}", numbers[i]);
            }
        }
    }
    Ok(())
}

pub fn validate_draw(numbers: &[u8; 6], bonus: u8) -> Result<()> {
    validate_numbers(numbers)?;
    if bonus < 1 || bonus as usize > POOL_SIZE {
        bail!("Bonus {} hors limites (1-{})", bonus, POOL_SIZE);
    }
    if numbers.contains(&bonus) {
        bail!("Le bonus {} figure déjà parmi les numéros", bonus);
    }
    Ok(())
}

/// Date du tirage n°1.
pub fn first_draw_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2002, 12, 7).unwrap_or_default()
}

/// Historique synthétique valide, tirages hebdomadaires à partir du n°1.
pub fn make_test_draws(n: usize) -> Vec<HistoricalDraw> {
    (0..n)
        .map(|i| {
            let base = (i * 7 % POOL_SIZE) as u8;
            let mut numbers = [0u8; 6];
            for (k, slot) in numbers.iter_mut().enumerate() {
                *slot = (base as usize + k * 7) as u8 % POOL_SIZE as u8 + 1;
            }
            HistoricalDraw {
                round: i as u32 + 1,
                draw_date: first_draw_date() + chrono::Days::new(7 * i as u64),
                numbers,
                bonus: (base as usize + 42) as u8 % POOL_SIZE as u8 + 1,
                first_prize: 2_000_000_000,
                first_winners: 10,
                total_sales: 100_000_000_000,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_draw_ok() {
        assert!(validate_draw(&[1, 2, 3, 4, 5, 6], 7).is_ok());
        assert!(validate_draw(&[45, 44, 43, 42, 41, 40], 1).is_ok());
    }

    #[test]
    fn test_validate_draw_out_of_range() {
        assert!(validate_draw(&[0, 2, 3, 4, 5, 6], 7).is_err());
        assert!(validate_draw(&[1, 2, 3, 4, 5, 46], 7).is_err());
        assert!(validate_draw(&[1, 2, 3, 4, 5, 6], 46).is_err());
    }

    #[test]
    fn test_validate_draw_duplicates() {
        assert!(validate_draw(&[1, 1, 3, 4, 5, 6], 7).is_err());
    }

    #[test]
    fn test_validate_draw_bonus_among_numbers() {
        assert!(validate_draw(&[1, 2, 3, 4, 5, 6], 6).is_err());
    }

    #[test]
    fn test_bucket_of() {
        assert_eq!(bucket_of(1), Some(0));
        assert_eq!(bucket_of(10), Some(0));
        assert_eq!(bucket_of(11), Some(1));
        assert_eq!(bucket_of(45), Some(4));
        assert_eq!(bucket_of(0), None);
        assert_eq!(bucket_of(46), None);
    }

    #[test]
    fn test_rank_targets() {
        let targets: Vec<usize> = Rank::ALL.iter().map(|r| r.match_target()).collect();
        assert_eq!(targets, vec![6, 5, 5, 4, 3]);
        assert_eq!(Rank::First.to_string(), "1er");
        assert_eq!(Rank::Fourth.to_string(), "4e");
    }

    #[test]
    fn test_make_test_draws_are_valid() {
        let draws = make_test_draws(60);
        assert_eq!(draws.len(), 60);
        for draw in &draws {
            assert!(validate_draw(&draw.numbers, draw.bonus).is_ok(), "{:?}", draw);
        }
        assert_eq!(draws[1].draw_date, NaiveDate::from_ymd_opt(2002, 12, 14).unwrap());
    }
}
