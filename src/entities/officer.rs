// 🎖️ Officer Entity - Chapter leadership positions
//
// Identity: (full name, position) pair - one person may hold two offices,
// but never the same office twice. Unknown position titles are kept as
// Other with the raw text preserved, so externally produced lists never
// lose information.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// POSITION
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Position {
    President,
    FirstVicePresident,
    SecondVicePresident,
    Secretary,
    Treasurer,
    Parliamentarian,
    Chaplain,
    Historian,
    SergeantAtArms,
    BoardMember,
    Other,
}

impl Position {
    pub fn code(&self) -> &'static str {
        match self {
            Position::President => "president",
            Position::FirstVicePresident => "vice_president_1st",
            Position::SecondVicePresident => "vice_president_2nd",
            Position::Secretary => "secretary",
            Position::Treasurer => "treasurer",
            Position::Parliamentarian => "parliamentarian",
            Position::Chaplain => "chaplain",
            Position::Historian => "historian",
            Position::SergeantAtArms => "sergeant_at_arms",
            Position::BoardMember => "board_member",
            Position::Other => "other",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Position::President => "President",
            Position::FirstVicePresident => "1st Vice President",
            Position::SecondVicePresident => "2nd Vice President",
            Position::Secretary => "Secretary",
            Position::Treasurer => "Treasurer",
            Position::Parliamentarian => "Parliamentarian",
            Position::Chaplain => "Chaplain",
            Position::Historian => "Historian",
            Position::SergeantAtArms => "Sergeant at Arms",
            Position::BoardMember => "Board Member",
            Position::Other => "Other Position",
        }
    }

    /// Exact parse of a stored code
    pub fn parse(raw: &str) -> Option<Position> {
        let normalized = raw.trim().to_lowercase().replace([' ', '-'], "_");
        match normalized.as_str() {
            "president" => Some(Position::President),
            "vice_president_1st" | "1st_vice_president" | "first_vice_president" => {
                Some(Position::FirstVicePresident)
            }
            "vice_president_2nd" | "2nd_vice_president" | "second_vice_president" => {
                Some(Position::SecondVicePresident)
            }
            "secretary" => Some(Position::Secretary),
            "treasurer" => Some(Position::Treasurer),
            "parliamentarian" => Some(Position::Parliamentarian),
            "chaplain" => Some(Position::Chaplain),
            "historian" => Some(Position::Historian),
            "sergeant_at_arms" => Some(Position::SergeantAtArms),
            "board_member" => Some(Position::BoardMember),
            "other" => Some(Position::Other),
            _ => None,
        }
    }

    /// Lenient parse for import: an unrecognized title becomes Other with
    /// the raw text preserved as the custom title
    pub fn parse_lenient(raw: &str) -> (Position, String) {
        match Self::parse(raw) {
            Some(position) => (position, String::new()),
            None => (Position::Other, raw.trim().to_string()),
        }
    }
}

// ============================================================================
// OFFICER
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Officer {
    /// Stable identity (UUID) - never changes
    pub id: String,

    pub full_name: String,
    pub position: Position,

    /// Custom position title (when position is Other)
    pub position_custom: String,

    pub email: String,
    pub phone: String,
    pub bio: String,

    /// Order in which to display (lower numbers first)
    pub display_order: i64,

    pub is_active: bool,
    pub term_start: Option<NaiveDate>,
    pub term_end: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

impl Officer {
    pub fn new(full_name: String, position: Position) -> Self {
        Officer {
            id: uuid::Uuid::new_v4().to_string(),
            full_name,
            position,
            position_custom: String::new(),
            email: String::new(),
            phone: String::new(),
            bio: String::new(),
            display_order: 0,
            is_active: true,
            term_start: None,
            term_end: None,
            created_at: Utc::now(),
        }
    }

    /// Display title, preferring the custom text for Other positions
    pub fn position_title(&self) -> &str {
        if self.position == Position::Other && !self.position_custom.is_empty() {
            &self.position_custom
        } else {
            self.position.display_name()
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
