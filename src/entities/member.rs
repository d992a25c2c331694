// 🧑 Member Entity - Chapter roster member with dues standing
//
// Identity: member number (assigned by international HQ, unique per member).
// The UUID id is the stable database identity; the member number is the
// canonical identifier every import reconciles against.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Substring in a member number that marks a life member
/// (e.g. "LIFE-00412" or "00412-LIFE"). Matched case-insensitively.
pub const LIFE_MEMBER_MARKER: &str = "LIFE";

/// Days a member marked by roster sync has to settle dues before the
/// removal sweep may delete them.
pub const GRACE_PERIOD_DAYS: i64 = 90;

// ============================================================================
// MEMBER STATUS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemberStatus {
    Financial,
    NonFinancial,
    FinancialLifeMember,
    NonFinancialLifeMember,
    NewMember,
    Suspended,
}

impl MemberStatus {
    /// Stable code stored in the database
    pub fn code(&self) -> &'static str {
        match self {
            MemberStatus::Financial => "financial",
            MemberStatus::NonFinancial => "non_financial",
            MemberStatus::FinancialLifeMember => "financial_life_member",
            MemberStatus::NonFinancialLifeMember => "non_financial_life_member",
            MemberStatus::NewMember => "new_member",
            MemberStatus::Suspended => "suspended",
        }
    }

    /// Human-readable name for display
    pub fn display_name(&self) -> &'static str {
        match self {
            MemberStatus::Financial => "Financial",
            MemberStatus::NonFinancial => "Non Financial",
            MemberStatus::FinancialLifeMember => "Financial Life Member",
            MemberStatus::NonFinancialLifeMember => "Non Financial Life Member",
            MemberStatus::NewMember => "New Member",
            MemberStatus::Suspended => "Suspended",
        }
    }

    /// Parse a stored code or a loosely-written spreadsheet value.
    /// Returns None for anything unrecognized; callers fall back to the
    /// derived default rather than rejecting the row.
    pub fn parse(raw: &str) -> Option<MemberStatus> {
        let normalized = raw.trim().to_lowercase().replace([' ', '-'], "_");
        match normalized.as_str() {
            "financial" => Some(MemberStatus::Financial),
            "non_financial" | "nonfinancial" => Some(MemberStatus::NonFinancial),
            "financial_life_member" | "life_member" | "life" => {
                Some(MemberStatus::FinancialLifeMember)
            }
            "non_financial_life_member" => Some(MemberStatus::NonFinancialLifeMember),
            "new_member" | "new" => Some(MemberStatus::NewMember),
            "suspended" => Some(MemberStatus::Suspended),
            _ => None,
        }
    }

    /// Life members keep their status regardless of dues
    pub fn is_life_member(&self) -> bool {
        matches!(
            self,
            MemberStatus::FinancialLifeMember | MemberStatus::NonFinancialLifeMember
        )
    }

    /// Statuses exempt from dues-based derivation (life members, new members,
    /// suspended members keep whatever status they were given)
    pub fn is_derivation_exempt(&self) -> bool {
        matches!(
            self,
            MemberStatus::FinancialLifeMember
                | MemberStatus::NonFinancialLifeMember
                | MemberStatus::NewMember
                | MemberStatus::Suspended
        )
    }
}

/// Check whether a member number carries the life-member marker
pub fn number_implies_life(member_number: &str) -> bool {
    member_number.to_uppercase().contains(LIFE_MEMBER_MARKER)
}

// ============================================================================
// MEMBER
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    /// Stable identity (UUID) - never changes
    pub id: String,

    /// Canonical identifier from international HQ
    pub member_number: String,

    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub line_name: String,
    pub line_number: String,

    pub status: MemberStatus,
    pub dues_current: bool,
    pub is_officer: bool,
    pub initiation_date: Option<NaiveDate>,

    // 90-day removal tracking (set by roster sync, consumed by the sweep)
    pub marked_for_removal_date: Option<DateTime<Utc>>,
    pub removal_reason: String,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Member {
    /// Create a new member with identity and timestamps initialized
    pub fn new(member_number: String, first_name: String, last_name: String) -> Self {
        let now = Utc::now();
        Member {
            id: uuid::Uuid::new_v4().to_string(),
            member_number,
            first_name,
            last_name,
            email: String::new(),
            phone: String::new(),
            address: String::new(),
            line_name: String::new(),
            line_number: String::new(),
            status: MemberStatus::Financial,
            dues_current: true,
            is_officer: false,
            initiation_date: None,
            marked_for_removal_date: None,
            removal_reason: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    /// Re-derive status from dues standing.
    /// Life members, new members, and suspended members are exempt.
    pub fn derive_status(&mut self) {
        if !self.status.is_derivation_exempt() {
            self.status = if self.dues_current {
                MemberStatus::Financial
            } else {
                MemberStatus::NonFinancial
            };
        }
    }

    pub fn is_marked_for_removal(&self) -> bool {
        self.marked_for_removal_date.is_some()
    }

    /// Days remaining in the grace period, clamped at zero.
    /// None if the member is not marked.
    pub fn days_until_removal(&self, now: DateTime<Utc>) -> Option<i64> {
        let marked = self.marked_for_removal_date?;
        let deadline = marked + Duration::days(GRACE_PERIOD_DAYS);
        Some((deadline - now).num_days().max(0))
    }

    /// True once the full grace period has elapsed since marking
    pub fn should_be_removed(&self, now: DateTime<Utc>) -> bool {
        match self.marked_for_removal_date {
            Some(marked) => now >= marked + Duration::days(GRACE_PERIOD_DAYS),
            None => false,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes_round_trip() {
        let all = [
            MemberStatus::Financial,
            MemberStatus::NonFinancial,
            MemberStatus::FinancialLifeMember,
            MemberStatus::NonFinancialLifeMember,
            MemberStatus::NewMember,
            MemberStatus::Suspended,
        ];
        for status in all {
            assert_eq!(MemberStatus::parse(status.code()), Some(status));
        }
    }

    #[test]
    fn test_status_parse_lenient() {
        assert_eq!(
            MemberStatus::parse("  Non Financial "),
            Some(MemberStatus::NonFinancial)
        );
        assert_eq!(
            MemberStatus::parse("LIFE MEMBER"),
            Some(MemberStatus::FinancialLifeMember)
        );
        assert_eq!(MemberStatus::parse("whatever"), None);
        assert_eq!(MemberStatus::parse(""), None);
    }

    #[test]
    fn test_number_implies_life() {
        assert!(number_implies_life("LIFE-00412"));
        assert!(number_implies_life("00412-life"));
        assert!(!number_implies_life("A00412"));
    }

    #[test]
    fn test_derive_status_from_dues() {
        let mut member = Member::new("A001".to_string(), "Carl".to_string(), "Brown".to_string());

        member.dues_current = true;
        member.derive_status();
        assert_eq!(member.status, MemberStatus::Financial);

        member.dues_current = false;
        member.derive_status();
        assert_eq!(member.status, MemberStatus::NonFinancial);
    }

    #[test]
    fn test_derive_status_exempt() {
        let mut member = Member::new("LIFE-9".to_string(), "Al".to_string(), "Hill".to_string());
        member.status = MemberStatus::FinancialLifeMember;
        member.dues_current = false;
        member.derive_status();

        // Life members keep their status regardless of dues
        assert_eq!(member.status, MemberStatus::FinancialLifeMember);

        member.status = MemberStatus::Suspended;
        member.dues_current = true;
        member.derive_status();
        assert_eq!(member.status, MemberStatus::Suspended);
    }

    #[test]
    fn test_grace_period_window() {
        let mut member = Member::new("A002".to_string(), "Ed".to_string(), "Cole".to_string());
        let now = Utc::now();

        assert!(!member.is_marked_for_removal());
        assert_eq!(member.days_until_removal(now), None);
        assert!(!member.should_be_removed(now));

        member.marked_for_removal_date = Some(now - Duration::days(30));
        assert!(member.is_marked_for_removal());
        assert_eq!(member.days_until_removal(now), Some(60));
        assert!(!member.should_be_removed(now));

        member.marked_for_removal_date = Some(now - Duration::days(91));
        assert_eq!(member.days_until_removal(now), Some(0));
        assert!(member.should_be_removed(now));
    }

    #[test]
    fn test_full_name_trims_missing_parts() {
        let member = Member::new("A003".to_string(), "Dana".to_string(), String::new());
        assert_eq!(member.full_name(), "Dana");
    }
}
