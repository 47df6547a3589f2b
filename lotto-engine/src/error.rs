use thiserror::Error;

/// Jeu de contraintes incohérent fourni au calculateur conditionnel.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConstraintError {
    #[error("le numéro {0} est à la fois imposé et exclu")]
    Overlap(u8),

    #[error("{0} numéros imposés, 6 au maximum")]
    TooManyLocked(usize),

    #[error("le numéro {0} est hors limites (1-45)")]
    OutOfRange(u8),

    #[error("{0} numéros contraints, 45 au maximum")]
    TooManyConstrained(usize),

    #[error("{available} numéros disponibles pour {needed} cases à remplir")]
    NotEnoughNumbers { available: usize, needed: usize },
}

/// Échec d'une source de tirages.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("tirage {0} introuvable")]
    NotFound(u32),

    #[error("aucun tirage disponible")]
    Empty,

    #[error("tirage {round} invalide : {reason}")]
    Invalid { round: u32, reason: String },

    #[error("erreur de stockage : {0}")]
    Storage(String),
}
