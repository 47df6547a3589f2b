use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use chrono::NaiveDate;

use lotto_db::db;
use lotto_db::models::{first_draw_date, validate_draw, HistoricalDraw};
use lotto_db::rusqlite::Connection;

use crate::error::FetchError;

/// Fournisseur de tirages historiques.
pub trait DrawSource {
    fn fetch_round(&self, round: u32) -> Result<HistoricalDraw, FetchError>;
    fn latest_round(&self) -> Result<u32, FetchError>;
}

/// Source adossée à la base SQLite locale.
pub struct SqliteSource<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteSource<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

fn storage(e: anyhow::Error) -> FetchError {
    FetchError::Storage(format!("{e:#}"))
}

impl DrawSource for SqliteSource<'_> {
    fn fetch_round(&self, round: u32) -> Result<HistoricalDraw, FetchError> {
        let draw = db::fetch_draw(self.conn, round)
            .map_err(storage)?
            .ok_or(FetchError::NotFound(round))?;
        validate_draw(&draw.numbers, draw.bonus).map_err(|e| FetchError::Invalid {
            round,
            reason: e.to_string(),
        })?;
        Ok(draw)
    }

    fn latest_round(&self) -> Result<u32, FetchError> {
        db::latest_round(self.conn)
            .map_err(storage)?
            .ok_or(FetchError::Empty)
    }
}

/// Cache mémoire transparent devant une source : chaque tirage n'est demandé qu'une fois.
pub struct CachedSource<S> {
    inner: S,
    cache: Mutex<HashMap<u32, HistoricalDraw>>,
}

impl<S: DrawSource> CachedSource<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn cached_rounds(&self) -> usize {
        self.cache.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl<S: DrawSource> DrawSource for CachedSource<S> {
    fn fetch_round(&self, round: u32) -> Result<HistoricalDraw, FetchError> {
        if let Some(draw) = self
            .cache
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&round)
        {
            return Ok(draw.clone());
        }
        let draw = self.inner.fetch_round(round)?;
        self.cache
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(round, draw.clone());
        Ok(draw)
    }

    // Le dernier tirage change chaque semaine : jamais mis en cache
    fn latest_round(&self) -> Result<u32, FetchError> {
        self.inner.latest_round()
    }
}

/// Cadence des requêtes : une pause après chaque lot de `batch` requêtes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchPacing {
    pub batch: usize,
    pub pause: Duration,
}

impl FetchPacing {
    pub fn none() -> Self {
        Self {
            batch: 0,
            pause: Duration::ZERO,
        }
    }
}

/// Récupère les `window` derniers tirages (0 = tout l'historique), du plus ancien
/// au plus récent. Un tirage en échec est journalisé puis ignoré.
pub fn collect_window<S: DrawSource + ?Sized>(
    source: &S,
    window: u32,
    pacing: &FetchPacing,
) -> Result<Vec<HistoricalDraw>, FetchError> {
    let latest = source.latest_round()?;
    let start = if window == 0 {
        1
    } else {
        latest.saturating_sub(window - 1).max(1)
    };
    tracing::info!(start, latest, "collecte des tirages");

    let mut draws = Vec::with_capacity((latest - start) as usize + 1);
    for (i, round) in (start..=latest).enumerate() {
        if pacing.batch > 0 && i > 0 && i % pacing.batch == 0 && !pacing.pause.is_zero() {
            std::thread::sleep(pacing.pause);
        }
        match source.fetch_round(round) {
            Ok(draw) => draws.push(draw),
            Err(e) => tracing::warn!(round, error = %e, "tirage ignoré"),
        }
    }

    tracing::info!(fetched = draws.len(), "collecte terminée");
    Ok(draws)
}

/// Estimation du dernier tirage à partir de la date : un tirage par semaine depuis
/// le tirage n°1 du 2002-12-07. Renvoie 0 avant cette date.
pub fn estimate_latest_round(today: NaiveDate) -> u32 {
    let days = (today - first_draw_date()).num_days();
    if days < 0 {
        return 0;
    }
    (days / 7) as u32 + 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use lotto_db::models::make_test_draws;
    use std::cell::Cell;

    struct MockSource {
        draws: Vec<HistoricalDraw>,
        failing: Vec<u32>,
        calls: Cell<usize>,
    }

    impl MockSource {
        fn new(n: usize) -> Self {
            Self {
                draws: make_test_draws(n),
                failing: Vec::new(),
                calls: Cell::new(0),
            }
        }
    }

    impl DrawSource for MockSource {
        fn fetch_round(&self, round: u32) -> Result<HistoricalDraw, FetchError> {
            self.calls.set(self.calls.get() + 1);
            if self.failing.contains(&round) {
                return Err(FetchError::Storage("réseau indisponible".into()));
            }
            self.draws
                .iter()
                .find(|d| d.round == round)
                .cloned()
                .ok_or(FetchError::NotFound(round))
        }

        fn latest_round(&self) -> Result<u32, FetchError> {
            self.draws.last().map(|d| d.round).ok_or(FetchError::Empty)
        }
    }

    fn rounds(draws: &[HistoricalDraw]) -> Vec<u32> {
        draws.iter().map(|d| d.round).collect()
    }

    #[test]
    fn test_collect_window_last_rounds() {
        let source = MockSource::new(30);
        let draws = collect_window(&source, 5, &FetchPacing::none()).unwrap();
        assert_eq!(rounds(&draws), vec![26, 27, 28, 29, 30]);
    }

    #[test]
    fn test_collect_window_zero_means_all() {
        let source = MockSource::new(12);
        let draws = collect_window(&source, 0, &FetchPacing::none()).unwrap();
        assert_eq!(draws.len(), 12);
        assert_eq!(draws[0].round, 1);
    }

    #[test]
    fn test_collect_window_larger_than_history() {
        let source = MockSource::new(4);
        let draws = collect_window(&source, 50, &FetchPacing::none()).unwrap();
        assert_eq!(rounds(&draws), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_collect_window_skips_failures() {
        let mut source = MockSource::new(10);
        source.failing = vec![7, 9];
        let draws = collect_window(&source, 5, &FetchPacing::none()).unwrap();
        assert_eq!(rounds(&draws), vec![6, 8, 10]);
    }

    #[test]
    fn test_collect_window_empty_source() {
        let source = MockSource::new(0);
        let err = collect_window(&source, 5, &FetchPacing::none()).unwrap_err();
        assert!(matches!(err, FetchError::Empty));
    }

    #[test]
    fn test_collect_window_with_pacing() {
        let source = MockSource::new(6);
        let pacing = FetchPacing {
            batch: 2,
            pause: Duration::from_millis(1),
        };
        let draws = collect_window(&source, 0, &pacing).unwrap();
        assert_eq!(draws.len(), 6);
    }

    /// Source dont le dernier tirage est `u32::MAX`.
    struct HighRoundSource;

    impl DrawSource for HighRoundSource {
        fn fetch_round(&self, round: u32) -> Result<HistoricalDraw, FetchError> {
            let mut draw = make_test_draws(1).remove(0);
            draw.round = round;
            Ok(draw)
        }

        fn latest_round(&self) -> Result<u32, FetchError> {
            Ok(u32::MAX)
        }
    }

    #[test]
    fn test_collect_window_at_highest_round() {
        let draws = collect_window(&HighRoundSource, 2, &FetchPacing::none()).unwrap();
        assert_eq!(rounds(&draws), vec![u32::MAX - 1, u32::MAX]);
    }

    #[test]
    fn test_cached_source_fetches_once() {
        let cached = CachedSource::new(MockSource::new(10));
        let first = cached.fetch_round(3).unwrap();
        let second = cached.fetch_round(3).unwrap();
        assert_eq!(first, second);
        assert_eq!(cached.inner.calls.get(), 1);
        assert_eq!(cached.cached_rounds(), 1);
    }

    #[test]
    fn test_cached_source_does_not_cache_errors() {
        let cached = CachedSource::new(MockSource::new(2));
        assert!(matches!(cached.fetch_round(5), Err(FetchError::NotFound(5))));
        assert!(cached.fetch_round(5).is_err());
        assert_eq!(cached.inner.calls.get(), 2);
        assert_eq!(cached.cached_rounds(), 0);
    }

    #[test]
    fn test_sqlite_source() {
        let conn = Connection::open_in_memory().unwrap();
        db::migrate(&conn).unwrap();
        let source = SqliteSource::new(&conn);
        assert!(matches!(source.latest_round(), Err(FetchError::Empty)));

        for draw in make_test_draws(8) {
            db::insert_draw(&conn, &draw).unwrap();
        }
        assert_eq!(source.latest_round().unwrap(), 8);
        assert_eq!(source.fetch_round(4).unwrap().round, 4);
        assert!(matches!(source.fetch_round(99), Err(FetchError::NotFound(99))));

        let draws = collect_window(&CachedSource::new(source), 3, &FetchPacing::none()).unwrap();
        assert_eq!(rounds(&draws), vec![6, 7, 8]);
    }

    #[test]
    fn test_sqlite_source_rejects_invalid_row() {
        let conn = Connection::open_in_memory().unwrap();
        db::migrate(&conn).unwrap();
        let mut draw = make_test_draws(1).remove(0);
        draw.bonus = draw.numbers[0];
        db::insert_draw(&conn, &draw).unwrap();

        let err = SqliteSource::new(&conn).fetch_round(1).unwrap_err();
        assert!(matches!(err, FetchError::Invalid { round: 1, .. }));
    }

    #[test]
    fn test_estimate_latest_round() {
        let first = first_draw_date();
        assert_eq!(estimate_latest_round(first), 1);
        assert_eq!(estimate_latest_round(first + chrono::Duration::days(6)), 1);
        assert_eq!(estimate_latest_round(first + chrono::Duration::days(7)), 2);
        assert_eq!(estimate_latest_round(first - chrono::Duration::days(1)), 0);
        let later = NaiveDate::from_ymd_opt(2024, 1, 6).unwrap();
        assert_eq!(estimate_latest_round(later), 1101);
    }
}
