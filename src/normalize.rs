// 🧹 Row Normalizer - One CSV row in, one canonical record out
//
// Source files are externally produced and not fully controlled, so the
// policy here is best-effort ingestion: unknown enum values fall back to
// defaults, malformed numbers become zero, and only a blank identifier or
// a hard-required field with no fallback takes a row out of the run.

use crate::entities::{MemberStatus, Position, ProductCategory};
use crate::formats::{ColumnMap, Field, SourceFormat};
use crate::images::ImageRef;
use chrono::NaiveDate;
use csv::StringRecord;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Date patterns accepted for explicitly-dated columns, tried in order
pub const DATE_PATTERNS: &[&str] = &["%m/%d/%Y", "%Y-%m-%d", "%m-%d-%Y", "%d %b %Y"];

// ============================================================================
// ROW OUTCOMES
// ============================================================================

/// Why a row was dropped without being an error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    /// Identifier blank after trimming - decorative or intentionally empty row
    BlankIdentifier,

    /// Another row already covered this entity (shared variant key)
    DuplicateVariant,
}

/// A row-level problem worth telling the operator about
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowError {
    pub row: usize,
    pub message: String,
}

impl RowError {
    pub fn new(row: usize, message: impl Into<String>) -> Self {
        RowError {
            row,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for RowError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Row {}: {}", self.row, self.message)
    }
}

/// Result of normalizing one row.
///
/// Field errors on a Record are non-fatal: the record still persists, the
/// messages are tallied and reported (e.g. an unparseable initiation date
/// loses the date but keeps the member).
#[derive(Debug, Clone)]
pub enum RowOutcome<T> {
    Record {
        record: T,
        field_errors: Vec<RowError>,
    },
    Skip(SkipReason),
    Error(RowError),
}

// ============================================================================
// CANONICAL RECORDS
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberRecord {
    pub member_number: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub line_name: String,
    pub line_number: String,
    pub initiation_date: Option<NaiveDate>,
    /// Explicit status from the CSV, if recognized
    pub status: Option<MemberStatus>,
    /// Explicit dues flag from the CSV, if present
    pub dues_current: Option<bool>,
    pub row: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductRecord {
    pub name: String,
    pub category: ProductCategory,
    pub price: f64,
    pub inventory: i64,
    pub description: String,
    pub sizes: String,
    pub colors: String,
    pub image: Option<ImageRef>,
    pub row: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfficerRecord {
    pub full_name: String,
    pub position: Position,
    pub position_custom: String,
    pub email: String,
    pub phone: String,
    pub bio: String,
    pub display_order: i64,
    pub term_start: Option<NaiveDate>,
    pub term_end: Option<NaiveDate>,
    pub row: usize,
}

// ============================================================================
// VALUE PARSERS
// ============================================================================

/// Parse a money amount, tolerating currency symbols and thousands
/// separators ("$1,234.50" → 1234.50). Negative values clamp to zero and
/// unparseable values default to zero - the row is kept either way.
/// Accounting notation "(12.00)" counts as negative.
pub fn parse_money(raw: &str) -> f64 {
    let trimmed = raw.trim();
    let accounting_negative = trimmed.starts_with('(') && trimmed.ends_with(')');

    let cleaned: String = trimmed
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();

    match cleaned.parse::<f64>() {
        Ok(value) if value.is_finite() => {
            let value = if accounting_negative { -value } else { value };
            value.max(0.0)
        }
        _ => 0.0,
    }
}

/// Parse a whole-number count (inventory, display order) with the same
/// leniency as parse_money
pub fn parse_count(raw: &str) -> i64 {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();

    let value = match cleaned.parse::<i64>() {
        Ok(v) => v,
        Err(_) => match cleaned.parse::<f64>() {
            Ok(v) if v.is_finite() => v.trunc() as i64,
            _ => 0,
        },
    };

    value.max(0)
}

/// Parse a yes/no-ish cell. None when the value is blank or unrecognized.
pub fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "yes" | "y" | "true" | "t" | "1" | "paid" | "current" => Some(true),
        "no" | "n" | "false" | "f" | "0" | "unpaid" | "owed" => Some(false),
        _ => None,
    }
}

/// Try every accepted date pattern in order
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    DATE_PATTERNS
        .iter()
        .find_map(|pattern| NaiveDate::parse_from_str(trimmed, pattern).ok())
}

/// Split a combined name-and-address block: first line is the name, the
/// remaining lines are the mailing address
fn split_name_block(block: &str) -> (String, String) {
    let mut lines = block.lines().map(str::trim).filter(|l| !l.is_empty());
    let name = lines.next().unwrap_or("").to_string();
    let address = lines.collect::<Vec<_>>().join("\n");
    (name, address)
}

/// Split a full name at the last space into (first, last)
fn split_full_name(full: &str) -> (String, String) {
    match full.trim().rsplit_once(' ') {
        Some((first, last)) => (first.trim().to_string(), last.trim().to_string()),
        None => (full.trim().to_string(), String::new()),
    }
}

/// Scan the option-slot column pairs for one whose declared name matches
/// the target attribute ("size" or "color"), returning its paired value
fn option_slot(map: &ColumnMap, record: &StringRecord, target: &str) -> Option<String> {
    const SLOTS: &[(Field, Field)] = &[
        (Field::Option1Name, Field::Option1Value),
        (Field::Option2Name, Field::Option2Value),
        (Field::Option3Name, Field::Option3Value),
    ];

    for (name_field, value_field) in SLOTS {
        let slot_name = map.get_or_empty(record, *name_field);
        if slot_name.eq_ignore_ascii_case(target) {
            let value = map.get_or_empty(record, *value_field);
            if !value.is_empty() {
                return Some(value.to_string());
            }
        }
    }
    None
}

// ============================================================================
// MEMBER ROWS
// ============================================================================

/// Normalize one member-roster row.
///
/// A blank member number skips the row. A present member number with no
/// resolvable name is a hard error - there is no safe default for a name.
/// An unparseable initiation date is a field error: the member still
/// persists, dateless.
pub fn normalize_member(
    map: &ColumnMap,
    record: &StringRecord,
    row: usize,
) -> RowOutcome<MemberRecord> {
    let member_number = map.get_or_empty(record, Field::MemberNumber).to_string();
    if member_number.is_empty() {
        return RowOutcome::Skip(SkipReason::BlankIdentifier);
    }

    let mut field_errors = Vec::new();

    // Name resolution: dedicated columns, a single name column, or the
    // first line of a combined name-and-address block
    let mut address = map.get_or_empty(record, Field::Address).to_string();
    let (first_name, last_name) = if map.has(Field::FirstName) || map.has(Field::LastName) {
        (
            map.get_or_empty(record, Field::FirstName).to_string(),
            map.get_or_empty(record, Field::LastName).to_string(),
        )
    } else if !map.get_or_empty(record, Field::FullName).is_empty() {
        split_full_name(map.get_or_empty(record, Field::FullName))
    } else if map.has(Field::NameAddressBlock) {
        let (name, block_address) = split_name_block(map.get_or_empty(record, Field::NameAddressBlock));
        if address.is_empty() {
            address = block_address;
        }
        split_full_name(&name)
    } else {
        (String::new(), String::new())
    };

    if first_name.is_empty() && last_name.is_empty() {
        return RowOutcome::Error(RowError::new(row, "member name is required"));
    }

    let initiation_raw = map.get_or_empty(record, Field::InitiationDate);
    let initiation_date = if initiation_raw.is_empty() {
        None
    } else {
        match parse_date(initiation_raw) {
            Some(date) => Some(date),
            None => {
                field_errors.push(RowError::new(
                    row,
                    format!("invalid initiation date \"{}\"", initiation_raw),
                ));
                None
            }
        }
    };

    let record = MemberRecord {
        member_number,
        first_name,
        last_name,
        email: map.get_or_empty(record, Field::Email).to_string(),
        phone: map.get_or_empty(record, Field::Phone).to_string(),
        address,
        line_name: map.get_or_empty(record, Field::LineName).to_string(),
        line_number: map.get_or_empty(record, Field::LineNumber).to_string(),
        initiation_date,
        status: MemberStatus::parse(map.get_or_empty(record, Field::Status)),
        dues_current: parse_flag(map.get_or_empty(record, Field::DuesCurrent)),
        row,
    };

    RowOutcome::Record {
        record,
        field_errors,
    }
}

// ============================================================================
// PRODUCT ROWS
// ============================================================================

/// Stateful product normalizer: the storefront export emits one row per
/// variant, all sharing a handle. The first row of each handle wins; the
/// rest are skipped within one run.
pub struct ProductNormalizer {
    seen_keys: HashSet<String>,
}

impl ProductNormalizer {
    pub fn new() -> Self {
        ProductNormalizer {
            seen_keys: HashSet::new(),
        }
    }

    pub fn normalize(
        &mut self,
        map: &ColumnMap,
        record: &StringRecord,
        row: usize,
    ) -> RowOutcome<ProductRecord> {
        if map.format() == SourceFormat::StorefrontExport {
            let handle = map.get_or_empty(record, Field::Handle);
            if handle.is_empty() {
                return RowOutcome::Skip(SkipReason::BlankIdentifier);
            }
            if !self.seen_keys.insert(handle.to_lowercase()) {
                return RowOutcome::Skip(SkipReason::DuplicateVariant);
            }
        }

        let name = map.get_or_empty(record, Field::ProductName).to_string();
        if name.is_empty() {
            return RowOutcome::Skip(SkipReason::BlankIdentifier);
        }

        let (sizes, colors) = if map.format() == SourceFormat::StorefrontExport {
            (
                option_slot(map, record, "size").unwrap_or_default(),
                option_slot(map, record, "color").unwrap_or_default(),
            )
        } else {
            (
                map.get_or_empty(record, Field::Sizes).to_string(),
                map.get_or_empty(record, Field::Colors).to_string(),
            )
        };

        // Archive path takes precedence over a download URL
        let image_path = map.get_or_empty(record, Field::ImagePath);
        let image_url = map.get_or_empty(record, Field::ImageUrl);
        let image = if !image_path.is_empty() {
            Some(ImageRef::Archive(image_path.to_string()))
        } else if !image_url.is_empty() {
            Some(ImageRef::Url(image_url.to_string()))
        } else {
            None
        };

        let record = ProductRecord {
            name,
            category: ProductCategory::parse_lenient(map.get_or_empty(record, Field::Category)),
            price: parse_money(map.get_or_empty(record, Field::Price)),
            inventory: parse_count(map.get_or_empty(record, Field::Inventory)),
            description: map.get_or_empty(record, Field::Description).to_string(),
            sizes,
            colors,
            image,
            row,
        };

        RowOutcome::Record {
            record,
            field_errors: Vec::new(),
        }
    }
}

impl Default for ProductNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// OFFICER ROWS
// ============================================================================

pub fn normalize_officer(
    map: &ColumnMap,
    record: &StringRecord,
    row: usize,
) -> RowOutcome<OfficerRecord> {
    let full_name = map.get_or_empty(record, Field::FullName).to_string();
    if full_name.is_empty() {
        return RowOutcome::Skip(SkipReason::BlankIdentifier);
    }

    let mut field_errors = Vec::new();
    let (position, position_custom) =
        Position::parse_lenient(map.get_or_empty(record, Field::PositionTitle));

    let mut term_date = |field: Field, label: &str| {
        let raw = map.get_or_empty(record, field);
        if raw.is_empty() {
            return None;
        }
        match parse_date(raw) {
            Some(date) => Some(date),
            None => {
                field_errors.push(RowError::new(row, format!("invalid {} \"{}\"", label, raw)));
                None
            }
        }
    };

    let term_start = term_date(Field::TermStart, "term start");
    let term_end = term_date(Field::TermEnd, "term end");

    let record = OfficerRecord {
        full_name,
        position,
        position_custom,
        email: map.get_or_empty(record, Field::Email).to_string(),
        phone: map.get_or_empty(record, Field::Phone).to_string(),
        bio: map.get_or_empty(record, Field::Bio).to_string(),
        display_order: parse_count(map.get_or_empty(record, Field::DisplayOrder)),
        term_start,
        term_end,
        row,
    };

    RowOutcome::Record {
        record,
        field_errors,
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::{detect_format, ImportDomain};

    fn product_map(cols: &[&str]) -> ColumnMap {
        detect_format(&StringRecord::from(cols.to_vec()), ImportDomain::Merchandise).unwrap()
    }

    fn member_map(cols: &[&str]) -> ColumnMap {
        detect_format(&StringRecord::from(cols.to_vec()), ImportDomain::MemberRoster).unwrap()
    }

    #[test]
    fn test_parse_money_currency_and_separators() {
        assert_eq!(parse_money("$1,234.50"), 1234.50);
        assert_eq!(parse_money("12.50"), 12.50);
        assert_eq!(parse_money(" $40 "), 40.0);
    }

    #[test]
    fn test_parse_money_negative_clamps_to_zero() {
        assert_eq!(parse_money("-5.00"), 0.0);
        assert_eq!(parse_money("($12.00)"), 0.0);
    }

    #[test]
    fn test_parse_money_unparseable_defaults_to_zero() {
        assert_eq!(parse_money("call for pricing"), 0.0);
        assert_eq!(parse_money(""), 0.0);
        assert_eq!(parse_money("1.2.3"), 0.0);
    }

    #[test]
    fn test_parse_count() {
        assert_eq!(parse_count("1,200"), 1200);
        assert_eq!(parse_count("40"), 40);
        assert_eq!(parse_count("-3"), 0);
        assert_eq!(parse_count("12.9"), 12);
        assert_eq!(parse_count("many"), 0);
    }

    #[test]
    fn test_parse_date_patterns() {
        let expected = NaiveDate::from_ymd_opt(2019, 4, 9).unwrap();
        assert_eq!(parse_date("04/09/2019"), Some(expected));
        assert_eq!(parse_date("2019-04-09"), Some(expected));
        assert_eq!(parse_date("04-09-2019"), Some(expected));
        assert_eq!(parse_date("9 Apr 2019"), Some(expected));
        assert_eq!(parse_date("April ninth"), None);
        assert_eq!(parse_date(""), None);
    }

    #[test]
    fn test_blank_member_number_skips_row() {
        let map = member_map(&["Member#", "First Name", "Last Name"]);
        let row = StringRecord::from(vec!["  ", "Carl", "Brown"]);

        match normalize_member(&map, &row, 2) {
            RowOutcome::Skip(SkipReason::BlankIdentifier) => {}
            other => panic!("expected skip, got {:?}", other),
        }
    }

    #[test]
    fn test_member_without_name_is_hard_error() {
        let map = member_map(&["Member#", "First Name", "Last Name"]);
        let row = StringRecord::from(vec!["A001", "", ""]);

        match normalize_member(&map, &row, 3) {
            RowOutcome::Error(err) => {
                assert_eq!(err.row, 3);
                assert!(err.message.contains("name"));
            }
            other => panic!("expected error, got {:?}", other),
        }
    }

    #[test]
    fn test_member_bad_initiation_date_is_field_error_not_rejection() {
        let map = member_map(&["Member#", "First Name", "Last Name", "Initiation Date"]);
        let row = StringRecord::from(vec!["A001", "Carl", "Brown", "sometime in spring"]);

        match normalize_member(&map, &row, 4) {
            RowOutcome::Record {
                record,
                field_errors,
            } => {
                assert_eq!(record.member_number, "A001");
                assert_eq!(record.initiation_date, None);
                assert_eq!(field_errors.len(), 1);
                assert_eq!(field_errors[0].row, 4);
                assert!(field_errors[0].message.contains("initiation date"));
            }
            other => panic!("expected record, got {:?}", other),
        }
    }

    #[test]
    fn test_member_name_from_block() {
        let map = member_map(&["MAJOR_KEY", "NAME_AND_ADDRESS"]);
        let row = StringRecord::from(vec!["A007", "Marcus Reed\n12 Elm St\nColumbia SC"]);

        match normalize_member(&map, &row, 2) {
            RowOutcome::Record { record, .. } => {
                assert_eq!(record.first_name, "Marcus");
                assert_eq!(record.last_name, "Reed");
                assert_eq!(record.address, "12 Elm St\nColumbia SC");
            }
            other => panic!("expected record, got {:?}", other),
        }
    }

    #[test]
    fn test_product_generic_row() {
        let map = product_map(&["name", "category", "price", "inventory"]);
        let row = StringRecord::from(vec!["Chapter Mug", "drinkware", "12.50", "40"]);
        let mut normalizer = ProductNormalizer::new();

        match normalizer.normalize(&map, &row, 2) {
            RowOutcome::Record { record, .. } => {
                assert_eq!(record.name, "Chapter Mug");
                assert_eq!(record.category, ProductCategory::Drinkware);
                assert_eq!(record.price, 12.50);
                assert_eq!(record.inventory, 40);
            }
            other => panic!("expected record, got {:?}", other),
        }
    }

    #[test]
    fn test_product_unknown_category_falls_back_to_other() {
        let map = product_map(&["name", "category", "price"]);
        let row = StringRecord::from(vec!["Flag", "banners", "20"]);
        let mut normalizer = ProductNormalizer::new();

        match normalizer.normalize(&map, &row, 2) {
            RowOutcome::Record { record, .. } => {
                assert_eq!(record.category, ProductCategory::Other);
            }
            other => panic!("expected record, got {:?}", other),
        }
    }

    #[test]
    fn test_storefront_variant_rows_collapse_to_first() {
        let map = product_map(&[
            "Handle",
            "Title",
            "Option1 Name",
            "Option1 Value",
            "Variant Price",
        ]);
        let mut normalizer = ProductNormalizer::new();

        let first = StringRecord::from(vec!["chapter-tee", "Chapter Tee", "Size", "M", "25.00"]);
        let second = StringRecord::from(vec!["chapter-tee", "Chapter Tee", "Size", "L", "25.00"]);

        match normalizer.normalize(&map, &first, 2) {
            RowOutcome::Record { record, .. } => {
                assert_eq!(record.sizes, "M");
            }
            other => panic!("expected record, got {:?}", other),
        }

        match normalizer.normalize(&map, &second, 3) {
            RowOutcome::Skip(SkipReason::DuplicateVariant) => {}
            other => panic!("expected duplicate-variant skip, got {:?}", other),
        }
    }

    #[test]
    fn test_storefront_option_slots_find_color_in_any_slot() {
        let map = product_map(&[
            "Handle",
            "Title",
            "Option1 Name",
            "Option1 Value",
            "Option2 Name",
            "Option2 Value",
            "Variant Price",
        ]);
        let mut normalizer = ProductNormalizer::new();
        let row = StringRecord::from(vec![
            "cap",
            "Embroidered Cap",
            "Material",
            "Wool",
            "Color",
            "Royal Blue",
            "18.00",
        ]);

        match normalizer.normalize(&map, &row, 2) {
            RowOutcome::Record { record, .. } => {
                assert_eq!(record.colors, "Royal Blue");
                assert_eq!(record.sizes, "");
            }
            other => panic!("expected record, got {:?}", other),
        }
    }

    #[test]
    fn test_product_image_path_beats_url() {
        let map = product_map(&["name", "category", "price", "image_path", "image_url"]);
        let row = StringRecord::from(vec![
            "Mug",
            "drinkware",
            "12.50",
            "mug.png",
            "https://example.com/mug.png",
        ]);
        let mut normalizer = ProductNormalizer::new();

        match normalizer.normalize(&map, &row, 2) {
            RowOutcome::Record { record, .. } => {
                assert_eq!(record.image, Some(ImageRef::Archive("mug.png".to_string())));
            }
            other => panic!("expected record, got {:?}", other),
        }
    }

    #[test]
    fn test_officer_unknown_position_kept_as_custom() {
        let map = detect_format(
            &StringRecord::from(vec!["Name", "Position"]),
            ImportDomain::Officers,
        )
        .unwrap();
        let row = StringRecord::from(vec!["Marcus Reed", "Social Media Chair"]);

        match normalize_officer(&map, &row, 2) {
            RowOutcome::Record { record, .. } => {
                assert_eq!(record.position, Position::Other);
                assert_eq!(record.position_custom, "Social Media Chair");
            }
            other => panic!("expected record, got {:?}", other),
        }
    }

    #[test]
    fn test_member_explicit_status_and_dues() {
        let map = member_map(&["Member#", "First Name", "Last Name", "Status", "Dues Current"]);
        let row = StringRecord::from(vec!["A009", "Dion", "Carter", "suspended", "no"]);

        match normalize_member(&map, &row, 2) {
            RowOutcome::Record { record, .. } => {
                assert_eq!(record.status, Some(MemberStatus::Suspended));
                assert_eq!(record.dues_current, Some(false));
            }
            other => panic!("expected record, got {:?}", other),
        }
    }
}
