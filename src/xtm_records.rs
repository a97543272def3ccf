// Best completion time per difficulty, persisted as TOML
// A missing or corrupt file just means "no records yet"

use chrono::Local;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

use crate::xtm_error::StoreError;
use crate::xtm_game::Difficulty;

/// Record entry for best completion time
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub millis: u64,  // Completion time in milliseconds
    pub date: String, // Date in ISO format (YYYY-MM-DD)
}

impl Record {
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.millis)
    }
}

/// One table per difficulty name:
///
/// ```toml
/// [Easy]
/// millis = 90000
/// date = "2026-10-18"
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(transparent)]
pub struct BestTimes {
    records: BTreeMap<Difficulty, Record>,
}

impl BestTimes {
    /// Load records, treating a missing or malformed file as empty
    pub fn load(path: &Path) -> BestTimes {
        match BestTimes::try_load(path) {
            Ok(records) => records,
            Err(StoreError::Io(e)) if e.kind() == ErrorKind::NotFound => {
                info!("No best times at {}", path.display());
                BestTimes::default()
            }
            Err(e) => {
                warn!("Ignoring best times at {}: {}", path.display(), e);
                BestTimes::default()
            }
        }
    }

    pub fn try_load(path: &Path) -> Result<BestTimes, StoreError> {
        let s = fs::read_to_string(path)?;
        Ok(toml::from_str(&s)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        let s = toml::to_string(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, s)?;
        Ok(())
    }

    pub fn get(&self, d: Difficulty) -> Option<&Record> {
        self.records.get(&d)
    }

    pub fn best(&self, d: Difficulty) -> Option<Duration> {
        self.get(d).map(Record::duration)
    }

    /// Store `elapsed` if it beats the current best (or there is none)
    /// Returns true when the record changed
    pub fn record_if_best(&mut self, d: Difficulty, elapsed: Duration) -> bool {
        let millis = elapsed.as_millis().min(u64::MAX as u128) as u64;
        if self.records.get(&d).is_some_and(|r| r.millis <= millis) {
            return false;
        }
        let date = Local::now().format("%Y-%m-%d").to_string();
        self.records.insert(d, Record { millis, date });
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("xtmines-{}-{}", std::process::id(), name));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn best_time_is_a_monotonic_minimum() {
        let mut records = BestTimes::default();

        assert!(records.record_if_best(Difficulty::Easy, secs(120)));
        assert!(records.record_if_best(Difficulty::Easy, secs(90)));
        assert!(!records.record_if_best(Difficulty::Easy, secs(150)));
        assert!(!records.record_if_best(Difficulty::Easy, secs(90)));

        assert_eq!(records.best(Difficulty::Easy), Some(secs(90)));
        assert_eq!(records.best(Difficulty::Normal), None);
    }

    #[test]
    fn difficulties_are_tracked_separately() {
        let mut records = BestTimes::default();
        records.record_if_best(Difficulty::Easy, secs(30));
        records.record_if_best(Difficulty::Hard, secs(600));

        assert_eq!(records.best(Difficulty::Easy), Some(secs(30)));
        assert_eq!(records.best(Difficulty::Hard), Some(secs(600)));
        assert_eq!(records.get(Difficulty::Hard).unwrap().date.len(), 10);
    }

    #[test]
    fn save_then_load_keeps_records() {
        let dir = scratch("roundtrip");
        let path = dir.join("records.toml");
        let mut records = BestTimes::default();
        records.record_if_best(Difficulty::Normal, Duration::from_millis(75_250));

        records.save(&path).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("[Normal]"));
        assert!(text.contains("millis = 75250"));
        assert_eq!(BestTimes::load(&path), records);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_file_means_no_records() {
        let dir = scratch("missing");

        let records = BestTimes::load(&dir.join("records.toml"));

        assert_eq!(records, BestTimes::default());
    }

    #[test]
    fn malformed_file_means_no_records() {
        let dir = scratch("malformed");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("records.toml");
        fs::write(&path, "[Easy]\nmillis = \"fast\"\n").unwrap();

        assert!(matches!(BestTimes::try_load(&path), Err(StoreError::Parse(_))));
        assert_eq!(BestTimes::load(&path), BestTimes::default());

        fs::write(&path, "[Custom]\nmillis = 1\ndate = \"2026-01-01\"\n").unwrap();
        assert_eq!(BestTimes::load(&path), BestTimes::default());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn hand_written_file_is_read() {
        let dir = scratch("handwritten");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("records.toml");
        fs::write(&path, "[Hard]\nmillis = 200000\ndate = \"2026-10-01\"\n").unwrap();

        let records = BestTimes::load(&path);

        assert_eq!(records.best(Difficulty::Hard), Some(secs(200)));
        assert_eq!(records.get(Difficulty::Hard).unwrap().date, "2026-10-01");
        let _ = fs::remove_dir_all(&dir);
    }
}
