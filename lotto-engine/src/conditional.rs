use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use lotto_db::models::{ConditionalProbabilityResult, HistoricalDraw, Rank, POOL_SIZE, PICK_COUNT};

use crate::combinatorics::{choose_signed, total_combinations};
use crate::error::ConstraintError;
use crate::winning::rank_ticket;

/// Numéros imposés (présents sur la grille) et exclus (absents de la grille).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintSet {
    pub locked: BTreeSet<u8>,
    pub excluded: BTreeSet<u8>,
}

impl ConstraintSet {
    pub fn new(
        locked: impl IntoIterator<Item = u8>,
        excluded: impl IntoIterator<Item = u8>,
    ) -> Result<Self, ConstraintError> {
        let set = Self {
            locked: locked.into_iter().collect(),
            excluded: excluded.into_iter().collect(),
        };
        set.validate()?;
        Ok(set)
    }

    pub fn validate(&self) -> Result<(), ConstraintError> {
        if let Some(&n) = self
            .locked
            .iter()
            .chain(self.excluded.iter())
            .find(|&&n| n < 1 || n as usize > POOL_SIZE)
        {
            return Err(ConstraintError::OutOfRange(n));
        }
        if let Some(&n) = self.locked.intersection(&self.excluded).next() {
            return Err(ConstraintError::Overlap(n));
        }
        if self.locked.len() > PICK_COUNT {
            return Err(ConstraintError::TooManyLocked(self.locked.len()));
        }
        let constrained = self.locked.len() + self.excluded.len();
        if constrained > POOL_SIZE {
            return Err(ConstraintError::TooManyConstrained(constrained));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BonusState {
    Locked,
    Excluded,
    Free,
}

/// Effectifs de l'urne restante une fois les contraintes appliquées.
#[derive(Debug, Clone, Copy)]
struct RemainingPool {
    slots: i64,
    available: i64,
    already_matched: i64,
    remaining_winning: i64,
    bonus: BonusState,
}

impl RemainingPool {
    fn new(draw: &HistoricalDraw, constraints: &ConstraintSet) -> Self {
        let locked = constraints.locked.len() as i64;
        let excluded = constraints.excluded.len() as i64;
        let already_matched = draw
            .numbers
            .iter()
            .filter(|&&n| constraints.locked.contains(&n))
            .count() as i64;
        let remaining_winning = draw
            .numbers
            .iter()
            .filter(|&&n| !constraints.locked.contains(&n) && !constraints.excluded.contains(&n))
            .count() as i64;
        let bonus = if constraints.locked.contains(&draw.bonus) {
            BonusState::Locked
        } else if constraints.excluded.contains(&draw.bonus) {
            BonusState::Excluded
        } else {
            BonusState::Free
        };

        Self {
            slots: PICK_COUNT as i64 - locked,
            available: POOL_SIZE as i64 - locked - excluded,
            already_matched,
            remaining_winning,
            bonus,
        }
    }

    fn unconstrained() -> Self {
        Self {
            slots: PICK_COUNT as i64,
            available: POOL_SIZE as i64,
            already_matched: 0,
            remaining_winning: PICK_COUNT as i64,
            bonus: BonusState::Free,
        }
    }

    fn total_cases(&self) -> u64 {
        choose_signed(self.available, self.slots)
    }

    fn favorable_cases(&self, rank: Rank) -> u64 {
        let need = rank.match_target() as i64 - self.already_matched;
        if need < 0 || need > self.slots {
            return 0;
        }
        let winning = choose_signed(self.remaining_winning, need);
        // Le bonus libre fait partie de cette urne
        let non_winning = self.available - self.remaining_winning;
        let rest = self.slots - need;

        let others = match (rank, self.bonus) {
            (Rank::Second, BonusState::Excluded) | (Rank::Third, BonusState::Locked) => 0,
            // une case réservée au bonus
            (Rank::Second, BonusState::Free) => choose_signed(non_winning - 1, rest - 1),
            (Rank::Third, BonusState::Free) => choose_signed(non_winning - 1, rest),
            _ => choose_signed(non_winning, rest),
        };
        winning.saturating_mul(others)
    }
}

/// Nombre de grilles gagnantes pour un rang, sans aucune contrainte.
pub fn baseline_cases(rank: Rank) -> u64 {
    RemainingPool::unconstrained().favorable_cases(rank)
}

pub fn baseline_probability(rank: Rank) -> f64 {
    baseline_cases(rank) as f64 / total_combinations() as f64
}

/// Probabilités de chaque rang pour les cases restantes de la grille, sachant les
/// numéros imposés et exclus. Un rang impossible sort avec une probabilité nulle.
pub fn compute_conditional(
    draw: &HistoricalDraw,
    constraints: &ConstraintSet,
) -> Result<Vec<ConditionalProbabilityResult>, ConstraintError> {
    constraints.validate()?;

    if constraints.locked.len() == PICK_COUNT {
        return Ok(full_ticket_results(draw, constraints));
    }

    let pool = RemainingPool::new(draw, constraints);
    let total = pool.total_cases();
    tracing::debug!(
        round = draw.round,
        locked = constraints.locked.len(),
        excluded = constraints.excluded.len(),
        total,
        "calcul conditionnel"
    );

    let results = Rank::ALL
        .iter()
        .map(|&rank| {
            let favorable = if total == 0 { 0 } else { pool.favorable_cases(rank) };
            let description = format!(
                "{} ({} numéro(s) imposé(s) gagnant(s), {} case(s) libre(s))",
                rank.description(),
                pool.already_matched,
                pool.slots
            );
            build_result(rank, favorable, total, description)
        })
        .collect();
    Ok(results)
}

/// Grille entièrement imposée : comparaison directe avec le tirage.
fn full_ticket_results(
    draw: &HistoricalDraw,
    constraints: &ConstraintSet,
) -> Vec<ConditionalProbabilityResult> {
    let ticket: Vec<u8> = constraints.locked.iter().copied().collect();
    let check = rank_ticket(&ticket, draw);

    Rank::ALL
        .iter()
        .map(|&rank| {
            let favorable = u64::from(check.rank == Some(rank));
            let description = format!(
                "{} (grille complète, {} numéro(s) trouvé(s))",
                rank.description(),
                check.matched.len()
            );
            build_result(rank, favorable, 1, description)
        })
        .collect()
}

fn build_result(
    rank: Rank,
    favorable: u64,
    total: u64,
    description: String,
) -> ConditionalProbabilityResult {
    let probability = if total == 0 {
        0.0
    } else {
        favorable as f64 / total as f64
    };
    let odds_denominator = if favorable == 0 {
        0
    } else {
        (total as f64 / favorable as f64).round() as u64
    };
    let baseline = baseline_probability(rank);

    ConditionalProbabilityResult {
        rank,
        probability,
        odds_denominator,
        favorable_cases: favorable,
        total_cases: total,
        description,
        delta_from_baseline_pct: (probability - baseline) / baseline * 100.0,
    }
}
