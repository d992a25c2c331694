// 📊 Import Reporting - Aggregate results for one import run
//
// The operator gets exactly one summary back: counts plus a bounded list
// of row-level messages. Everything is retained internally; only the
// rendering is capped.

use crate::normalize::RowError;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// Most error/warning lines shown in a rendered summary
pub const ERROR_DISPLAY_CAP: usize = 10;

// ============================================================================
// IMPORT SUMMARY
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportSummary {
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,

    /// Row-level error messages, in input order, uncapped
    pub errors: Vec<String>,

    /// Non-fatal incidents (e.g. an image that could not be resolved)
    pub warnings: Vec<String>,
}

impl ImportSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn record_error(&mut self, error: &RowError) {
        self.errors.push(error.to_string());
    }

    pub fn record_warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    /// One-line counts
    pub fn counts_line(&self) -> String {
        format!(
            "{} created, {} updated, {} skipped, {} error{}",
            self.created,
            self.updated,
            self.skipped,
            self.errors.len(),
            if self.errors.len() == 1 { "" } else { "s" }
        )
    }

    /// Full human-readable summary: counts plus capped message lists
    pub fn summary(&self) -> String {
        let mut out = format!("Import complete: {}", self.counts_line());

        if !self.errors.is_empty() {
            out.push_str("\nErrors:");
            append_capped(&mut out, &self.errors);
        }
        if !self.warnings.is_empty() {
            out.push_str("\nWarnings:");
            append_capped(&mut out, &self.warnings);
        }

        out
    }
}

impl std::fmt::Display for ImportSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.summary())
    }
}

/// Append up to the display cap, then a "+N more" indicator
fn append_capped(out: &mut String, lines: &[String]) {
    for line in lines.iter().take(ERROR_DISPLAY_CAP) {
        let _ = write!(out, "\n  {}", line);
    }
    if lines.len() > ERROR_DISPLAY_CAP {
        let _ = write!(out, "\n  ... and {} more", lines.len() - ERROR_DISPLAY_CAP);
    }
}

// ============================================================================
// SYNC SUMMARY
// ============================================================================

/// Result of a roster-sync cross-check. Sync never creates or deletes; it
/// only confirms members, marks absentees, and clears marks on reappearance.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncSummary {
    /// Distinct member numbers in the supplied HQ list
    pub roster_size: usize,

    /// Members found on the HQ list
    pub confirmed: usize,

    /// Members newly marked for the 90-day grace period
    pub newly_marked: usize,

    /// Members already marked and still absent (clock untouched)
    pub already_marked: usize,

    /// Previously-marked members that reappeared on the list
    pub cleared: usize,

    /// Numbers on the HQ list with no matching member in the store
    pub unknown_numbers: usize,

    /// Blank-number rows in the upload
    pub skipped: usize,

    pub errors: Vec<String>,
}

impl SyncSummary {
    pub fn summary(&self) -> String {
        let mut out = format!(
            "Roster sync: {} on HQ list | {} confirmed, {} newly marked, {} still in grace period, {} cleared, {} unknown number{}",
            self.roster_size,
            self.confirmed,
            self.newly_marked,
            self.already_marked,
            self.cleared,
            self.unknown_numbers,
            if self.unknown_numbers == 1 { "" } else { "s" }
        );

        if !self.errors.is_empty() {
            out.push_str("\nErrors:");
            append_capped(&mut out, &self.errors);
        }

        out
    }
}

impl std::fmt::Display for SyncSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.summary())
    }
}

// ============================================================================
// TESTS
// ============================================================================
