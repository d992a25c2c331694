// ⏳ Removal Sweep - Delete members whose grace period has elapsed
//
// The import pipeline only ever MARKS members (roster sync writes the
// timestamp); actually removing them is this separate, operator-invoked
// job. It never runs on an import path. Re-running after a sweep is a
// no-op: eligibility is derived purely from the stored mark.

use crate::entities::Member;
use crate::store;
use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

// ============================================================================
// SWEEP OUTCOME
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepOutcome {
    /// Members carrying a removal mark when the sweep started
    pub marked_total: usize,

    /// Marked members whose grace period has fully elapsed
    pub eligible: usize,

    /// Members actually deleted (always 0 on a dry run)
    pub removed: usize,

    /// One line per eligible member: name, number, days marked, reason
    pub entries: Vec<String>,

    pub dry_run: bool,
}

impl SweepOutcome {
    pub fn summary(&self) -> String {
        if self.marked_total == 0 {
            return "No members marked for removal".to_string();
        }
        if self.eligible == 0 {
            return format!(
                "Found {} member(s) in grace period, but none ready for removal yet",
                self.marked_total
            );
        }
        if self.dry_run {
            format!("[DRY RUN] Would remove {} member(s)", self.eligible)
        } else {
            format!("Removed {} member(s)", self.removed)
        }
    }
}

impl std::fmt::Display for SweepOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.summary())
    }
}

// ============================================================================
// REMOVAL SWEEP
// ============================================================================

pub struct RemovalSweep {
    pub dry_run: bool,
}

impl RemovalSweep {
    pub fn new(dry_run: bool) -> Self {
        RemovalSweep { dry_run }
    }

    pub fn run(&self, conn: &Connection, now: DateTime<Utc>) -> Result<SweepOutcome> {
        let marked = store::members_marked_for_removal(conn)?;

        let mut outcome = SweepOutcome {
            marked_total: marked.len(),
            eligible: 0,
            removed: 0,
            entries: Vec::new(),
            dry_run: self.dry_run,
        };

        for member in &marked {
            if !member.should_be_removed(now) {
                continue;
            }

            outcome.eligible += 1;
            outcome.entries.push(describe(member, now));

            if !self.dry_run {
                store::delete_member(conn, &member.id)?;
                outcome.removed += 1;
            }
        }

        Ok(outcome)
    }
}

fn describe(member: &Member, now: DateTime<Utc>) -> String {
    let days_marked = member
        .marked_for_removal_date
        .map(|marked| (now - marked).num_days())
        .unwrap_or(0);

    format!(
        "{} ({}) - marked {} days ago: {}",
        member.full_name(),
        member.member_number,
        days_marked,
        member.removal_reason
    )
}

// ============================================================================
// TESTS
// ============================================================================
