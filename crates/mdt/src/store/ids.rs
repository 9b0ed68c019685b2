//! Record id assignment.

use chrono::Utc;

use super::document::Document;
use crate::record::Record;

/// Issues millisecond-clock ids that never repeat.
///
/// Each id is the current Unix time in milliseconds, bumped to one past the
/// highest id issued or loaded when the clock has not moved on. Once that
/// high-water mark reaches `u64::MAX`, ids are the first values from the
/// clock onward that the target collection does not already hold.
#[derive(Debug, Clone, Default)]
pub struct IdGenerator {
    last: u64,
}

impl IdGenerator {
    /// Seed from the highest numeric id already present in `document`.
    #[must_use]
    pub fn seeded_from(document: &Document) -> Self {
        let last = document
            .all_records()
            .filter_map(|record| record.id.parse::<u64>().ok())
            .max()
            .unwrap_or(0);
        Self { last }
    }

    /// The highest id handed out or seen so far.
    #[must_use]
    pub fn last(&self) -> u64 {
        self.last
    }

    /// Issue the next id for a collection currently holding `taken`.
    pub fn next_id(&mut self, taken: &[Record]) -> String {
        let now = u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0);
        if let Some(next) = self.last.checked_add(1) {
            self.last = now.max(next);
            return self.last.to_string();
        }

        (now..=u64::MAX)
            .chain(0..now)
            .map(|candidate| candidate.to_string())
            .find(|candidate| taken.iter().all(|record| &record.id != candidate))
            .unwrap_or_else(|| now.to_string())
    }
}
