//! Two-phase article lookup against the sales table.
//!
//! The lookup is a small state machine:
//!
//! * `InWindow` issues one aggregated query for every requested identifier,
//!   restricted to the reporting window.
//! * `Fallback` re-queries only the identifiers that found nothing, looking
//!   at sales strictly before the window start.
//! * `Done` merges both result sets. In-window records always win.
//!
//! Stored keys come back from the source as-is and are re-associated with a
//! requested identifier by testing them against the request list in order.
//! The first identifier that matches wins.

use crate::domain::model::{
    ArticleRecord, DateWindow, HistoryRow, LookupResult, MatchStrategy, WindowRow,
};
use crate::domain::ports::{ArticleLookup, SalesSession, SalesSource};
use crate::utils::error::Result;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupPhase {
    InWindow,
    Fallback,
    Done,
}

pub struct LookupRepository<S: SalesSource> {
    source: S,
    window: DateWindow,
    strategy: MatchStrategy,
}

impl<S: SalesSource> LookupRepository<S> {
    pub fn new(source: S, window: DateWindow, strategy: MatchStrategy) -> Self {
        Self {
            source,
            window,
            strategy,
        }
    }
}

impl<S: SalesSource> ArticleLookup for LookupRepository<S> {
    fn resolve(&self, identifiers: &[String]) -> Result<LookupResult> {
        let requested = unique_identifiers(identifiers);
        if requested.is_empty() {
            tracing::debug!("No identifiers requested, skipping sales query");
            return Ok(HashMap::new());
        }

        // session 在函式結束時釋放連線（成功或失敗）
        let mut session = self.source.open_session()?;
        let mut state = LookupState::new(requested, self.strategy);

        while state.phase != LookupPhase::Done {
            match state.phase {
                LookupPhase::InWindow => {
                    let rows =
                        session.query_in_window(&state.requested, self.strategy, &self.window)?;
                    tracing::info!("🔎 In-window query returned {} rows", rows.len());
                    state.absorb_window(rows);
                }
                LookupPhase::Fallback => {
                    let pending = state.pending();
                    let rows = session.query_before(&pending, self.strategy, self.window.start)?;
                    tracing::info!(
                        "🕰️ Fallback query for {} identifiers returned {} rows",
                        pending.len(),
                        rows.len()
                    );
                    state.absorb_history(rows);
                }
                LookupPhase::Done => {}
            }
        }

        Ok(state.finish())
    }
}

/// Trimmed, non-empty identifiers in first-seen order.
pub fn unique_identifiers(identifiers: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    identifiers
        .iter()
        .map(|id| id.trim())
        .filter(|id| !id.is_empty())
        .filter(|id| seen.insert(id.to_string()))
        .map(str::to_string)
        .collect()
}

/// First requested identifier (in request order) matched by `stored_key`.
pub fn correlate<'a>(
    stored_key: &str,
    requested: &'a [String],
    strategy: MatchStrategy,
) -> Option<&'a String> {
    requested.iter().find(|id| strategy.matches(stored_key, id))
}

pub(crate) struct LookupState {
    pub(crate) phase: LookupPhase,
    pub(crate) requested: Vec<String>,
    strategy: MatchStrategy,
    in_window: LookupResult,
    fallback: LookupResult,
}

impl LookupState {
    pub(crate) fn new(requested: Vec<String>, strategy: MatchStrategy) -> Self {
        Self {
            phase: LookupPhase::InWindow,
            requested,
            strategy,
            in_window: HashMap::new(),
            fallback: HashMap::new(),
        }
    }

    pub(crate) fn pending(&self) -> Vec<String> {
        self.requested
            .iter()
            .filter(|id| !self.in_window.contains_key(*id))
            .cloned()
            .collect()
    }

    pub(crate) fn absorb_window(&mut self, mut rows: Vec<WindowRow>) {
        rows.sort_by(|a, b| a.key.cmp(&b.key));
        for row in rows {
            let Some(id) = correlate(&row.key, &self.requested, self.strategy).cloned() else {
                tracing::debug!("Stored key '{}' matches no requested identifier", row.key);
                continue;
            };
            insert_preferred(&mut self.in_window, id, ArticleRecord::from_window_row(row));
        }

        self.phase = if self.pending().is_empty() {
            LookupPhase::Done
        } else {
            LookupPhase::Fallback
        };
    }

    /// History rows are correlated against the full request list, like
    /// in-window rows. A key whose first match already has an in-window
    /// record is discarded rather than handed to a looser identifier.
    pub(crate) fn absorb_history(&mut self, mut rows: Vec<HistoryRow>) {
        rows.sort_by(|a, b| a.key.cmp(&b.key));
        for row in rows {
            let Some(id) = correlate(&row.key, &self.requested, self.strategy).cloned() else {
                continue;
            };
            if self.in_window.contains_key(&id) {
                tracing::debug!(
                    "History key '{}' belongs to '{}', already matched in window",
                    row.key,
                    id
                );
                continue;
            }
            insert_preferred(&mut self.fallback, id, ArticleRecord::from_history_row(row));
        }
        self.phase = LookupPhase::Done;
    }

    pub(crate) fn finish(self) -> LookupResult {
        let mut merged = self.fallback;
        // in-window 結果優先
        merged.extend(self.in_window);
        merged
    }
}

/// Several stored keys may correlate to one identifier. An exact key beats a
/// partial one; otherwise the first key in sorted order is kept.
fn insert_preferred(target: &mut LookupResult, id: String, record: ArticleRecord) {
    match target.get(&id) {
        None => {
            target.insert(id, record);
        }
        Some(existing) => {
            if record.key == id && existing.key != id {
                tracing::debug!(
                    "Identifier '{}': exact key replaces partial match '{}'",
                    id,
                    existing.key
                );
                target.insert(id, record);
            } else {
                tracing::debug!(
                    "Identifier '{}' also matches stored key '{}', keeping '{}'",
                    id,
                    record.key,
                    existing.key
                );
            }
        }
    }
}
