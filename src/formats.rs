// 📋 Format Detector - Decide which column-naming scheme an upload uses
//
// Three producers feed this pipeline and none of them agree on headers:
// a generic spreadsheet, the international HQ roster export (two vintages),
// and the storefront product export. Each supported scheme is a declared
// alias table; detection resolves the table against the actual header row
// once per file, and every later row lookup goes through the resulting
// ColumnMap. No per-row header guessing.

use csv::StringRecord;
use std::collections::HashMap;

// ============================================================================
// DOMAINS AND FORMATS
// ============================================================================

/// Which kind of entity an upload is for. Each domain has its own candidate
/// format list, tried in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportDomain {
    MemberRoster,
    Merchandise,
    Officers,
}

impl ImportDomain {
    pub fn name(&self) -> &'static str {
        match self {
            ImportDomain::MemberRoster => "member roster",
            ImportDomain::Merchandise => "merchandise",
            ImportDomain::Officers => "officers",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SourceFormat {
    /// Headquarters roster export, older vintage: MAJOR_KEY plus a combined
    /// name-and-address block
    HqVariantA,

    /// Headquarters roster export, newer vintage: Member# plus split
    /// first/last name columns
    HqVariantB,

    /// Storefront product export: Handle-grouped variant rows with
    /// OptionN Name/Value pairs
    StorefrontExport,

    /// Plain spreadsheet with self-describing headers
    Generic,
}

impl SourceFormat {
    pub fn name(&self) -> &'static str {
        match self {
            SourceFormat::HqVariantA => "hq-export-variant-a",
            SourceFormat::HqVariantB => "hq-export-variant-b",
            SourceFormat::StorefrontExport => "storefront-export",
            SourceFormat::Generic => "generic",
        }
    }
}

// ============================================================================
// CANONICAL FIELDS
// ============================================================================

/// Canonical fields a format may bind. One enum across all three domains;
/// each format table only names the fields it knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    // Member roster
    MemberNumber,
    FirstName,
    LastName,
    FullName,
    /// Combined free-text block: first line is the name, rest is the address
    NameAddressBlock,
    InitiationDate,
    LineName,
    LineNumber,
    Address,
    Status,
    DuesCurrent,

    // Shared contact fields
    Email,
    Phone,

    // Merchandise
    ProductName,
    Handle,
    Category,
    Price,
    Inventory,
    Description,
    Sizes,
    Colors,
    ImageUrl,
    ImagePath,
    Option1Name,
    Option1Value,
    Option2Name,
    Option2Value,
    Option3Name,
    Option3Value,

    // Officers
    PositionTitle,
    Bio,
    DisplayOrder,
    TermStart,
    TermEnd,
}

impl Field {
    /// Canonical name used in error messages
    pub fn name(&self) -> &'static str {
        match self {
            Field::MemberNumber => "member_number",
            Field::FirstName => "first_name",
            Field::LastName => "last_name",
            Field::FullName => "name",
            Field::NameAddressBlock => "name_and_address",
            Field::InitiationDate => "initiation_date",
            Field::LineName => "line_name",
            Field::LineNumber => "line_number",
            Field::Address => "address",
            Field::Status => "status",
            Field::DuesCurrent => "dues_current",
            Field::Email => "email",
            Field::Phone => "phone",
            Field::ProductName => "name",
            Field::Handle => "handle",
            Field::Category => "category",
            Field::Price => "price",
            Field::Inventory => "inventory",
            Field::Description => "description",
            Field::Sizes => "sizes",
            Field::Colors => "colors",
            Field::ImageUrl => "image_url",
            Field::ImagePath => "image_path",
            Field::Option1Name => "option1_name",
            Field::Option1Value => "option1_value",
            Field::Option2Name => "option2_name",
            Field::Option2Value => "option2_value",
            Field::Option3Name => "option3_name",
            Field::Option3Value => "option3_value",
            Field::PositionTitle => "position",
            Field::Bio => "bio",
            Field::DisplayOrder => "display_order",
            Field::TermStart => "term_start",
            Field::TermEnd => "term_end",
        }
    }
}

// ============================================================================
// FORMAT TABLES
// ============================================================================

struct FieldSpec {
    field: Field,
    aliases: &'static [&'static str],
    required: bool,
}

struct FormatSpec {
    format: SourceFormat,
    fields: &'static [FieldSpec],
}

const fn req(field: Field, aliases: &'static [&'static str]) -> FieldSpec {
    FieldSpec {
        field,
        aliases,
        required: true,
    }
}

const fn opt(field: Field, aliases: &'static [&'static str]) -> FieldSpec {
    FieldSpec {
        field,
        aliases,
        required: false,
    }
}

/// HQ roster export, older vintage. Identified by MAJOR_KEY and the
/// combined name-and-address block.
static HQ_VARIANT_A: FormatSpec = FormatSpec {
    format: SourceFormat::HqVariantA,
    fields: &[
        req(Field::MemberNumber, &["major_key"]),
        req(
            Field::NameAddressBlock,
            &["name_and_address", "name_addr", "member_name_and_address"],
        ),
        opt(Field::InitiationDate, &["init_dt", "initiation_dt"]),
        opt(Field::Email, &["email_addr"]),
        opt(Field::Phone, &["phone_nbr"]),
        opt(Field::Status, &["mbr_status", "fin_stat"]),
    ],
};

/// HQ roster export, newer vintage: split name columns.
static HQ_VARIANT_B: FormatSpec = FormatSpec {
    format: SourceFormat::HqVariantB,
    fields: &[
        req(Field::MemberNumber, &["member#", "member number", "member_number"]),
        req(Field::FirstName, &["first name", "first_name", "firstname"]),
        req(Field::LastName, &["last name", "last_name", "lastname"]),
        opt(Field::Email, &["email", "email address"]),
        opt(Field::Phone, &["phone", "phone number"]),
        opt(
            Field::InitiationDate,
            &["initiation date", "initiation_date", "init date"],
        ),
        opt(Field::LineName, &["line name", "line_name"]),
        opt(Field::LineNumber, &["line number", "line_number", "line #"]),
        opt(Field::Status, &["status", "member status"]),
        opt(Field::DuesCurrent, &["dues current", "dues_current", "dues paid"]),
    ],
};

/// Generic member spreadsheet. Only the member number is required - this is
/// also the shape the roster-sync cross-check accepts.
static GENERIC_MEMBER: FormatSpec = FormatSpec {
    format: SourceFormat::Generic,
    fields: &[
        req(
            Field::MemberNumber,
            &["member#", "member_number", "member number", "major_key"],
        ),
        opt(Field::FullName, &["name", "full name", "member name"]),
        opt(Field::FirstName, &["first name", "first_name"]),
        opt(Field::LastName, &["last name", "last_name"]),
        opt(Field::Email, &["email"]),
        opt(Field::Phone, &["phone"]),
        opt(Field::Address, &["address"]),
        opt(
            Field::InitiationDate,
            &["initiation date", "initiation_date"],
        ),
        opt(Field::LineName, &["line name", "line_name"]),
        opt(Field::LineNumber, &["line number", "line_number"]),
        opt(Field::Status, &["status"]),
        opt(Field::DuesCurrent, &["dues current", "dues_current", "dues paid"]),
    ],
};

/// Storefront export: one row per variant, grouped by handle.
static STOREFRONT: FormatSpec = FormatSpec {
    format: SourceFormat::StorefrontExport,
    fields: &[
        req(Field::Handle, &["handle"]),
        req(Field::ProductName, &["title"]),
        req(Field::Price, &["variant price", "price"]),
        opt(Field::Description, &["body (html)", "body html", "body"]),
        opt(
            Field::Inventory,
            &["variant inventory qty", "inventory qty", "variant inventory quantity"],
        ),
        opt(Field::Category, &["type", "product category", "product type"]),
        opt(Field::ImageUrl, &["image src"]),
        opt(Field::Option1Name, &["option1 name"]),
        opt(Field::Option1Value, &["option1 value"]),
        opt(Field::Option2Name, &["option2 name"]),
        opt(Field::Option2Value, &["option2 value"]),
        opt(Field::Option3Name, &["option3 name"]),
        opt(Field::Option3Value, &["option3 value"]),
    ],
};

/// Generic product spreadsheet: the boutique template.
static GENERIC_PRODUCT: FormatSpec = FormatSpec {
    format: SourceFormat::Generic,
    fields: &[
        req(Field::ProductName, &["name", "product name"]),
        req(Field::Category, &["category"]),
        req(Field::Price, &["price"]),
        opt(Field::Inventory, &["inventory", "qty", "quantity"]),
        opt(Field::Description, &["description"]),
        opt(Field::Sizes, &["sizes"]),
        opt(Field::Colors, &["colors"]),
        opt(Field::ImageUrl, &["image_url", "image url"]),
        opt(Field::ImagePath, &["image_path", "image path"]),
    ],
};

/// Officer list: always a generic spreadsheet.
static GENERIC_OFFICER: FormatSpec = FormatSpec {
    format: SourceFormat::Generic,
    fields: &[
        req(
            Field::FullName,
            &["name", "full name", "full_name", "officer name"],
        ),
        req(
            Field::PositionTitle,
            &["position", "office", "title", "role"],
        ),
        opt(Field::Email, &["email"]),
        opt(Field::Phone, &["phone"]),
        opt(Field::Bio, &["bio"]),
        opt(
            Field::DisplayOrder,
            &["display_order", "display order", "order"],
        ),
        opt(Field::TermStart, &["term start", "term_start"]),
        opt(Field::TermEnd, &["term end", "term_end"]),
    ],
};

fn candidates(domain: ImportDomain) -> &'static [&'static FormatSpec] {
    static MEMBER_ROSTER: &[&FormatSpec] = &[&HQ_VARIANT_A, &HQ_VARIANT_B, &GENERIC_MEMBER];
    static MERCHANDISE: &[&FormatSpec] = &[&STOREFRONT, &GENERIC_PRODUCT];
    static OFFICERS: &[&FormatSpec] = &[&GENERIC_OFFICER];
    match domain {
        ImportDomain::MemberRoster => MEMBER_ROSTER,
        ImportDomain::Merchandise => MERCHANDISE,
        ImportDomain::Officers => OFFICERS,
    }
}

// ============================================================================
// DETECTION FAILURE
// ============================================================================

/// No candidate format could resolve its required fields. Fatal: the run
/// aborts before any row is processed.
#[derive(Debug, Clone)]
pub struct MissingColumns {
    /// Canonical field names the fallback format could not resolve
    pub missing: Vec<&'static str>,

    /// Headers actually present in the file, as read
    pub found: Vec<String>,
}

impl std::fmt::Display for MissingColumns {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "CSV must contain these columns: {}. Found columns: {}",
            self.missing.join(", "),
            self.found.join(", ")
        )
    }
}

impl std::error::Error for MissingColumns {}

// ============================================================================
// COLUMN MAP
// ============================================================================

/// Result of detection: the chosen format plus canonical-field → column-index
/// bindings, resolved once per file.
#[derive(Debug, Clone)]
pub struct ColumnMap {
    format: SourceFormat,
    columns: HashMap<Field, usize>,
}

impl ColumnMap {
    pub fn format(&self) -> SourceFormat {
        self.format
    }

    pub fn has(&self, field: Field) -> bool {
        self.columns.contains_key(&field)
    }

    /// Look up a field in a data row. Returns the trimmed value, or None if
    /// the format has no such column or the row is too short.
    pub fn get<'r>(&self, record: &'r StringRecord, field: Field) -> Option<&'r str> {
        let idx = *self.columns.get(&field)?;
        record.get(idx).map(str::trim)
    }

    /// Like get, but treating a missing column and an empty cell the same
    pub fn get_or_empty<'r>(&self, record: &'r StringRecord, field: Field) -> &'r str {
        self.get(record, field).unwrap_or("")
    }
}

// ============================================================================
// DETECTION
// ============================================================================

/// Normalize one header for alias matching: strip the UTF-8 BOM (first
/// header only), trim whitespace, lowercase.
fn normalize_header(raw: &str, first: bool) -> String {
    let mut header = raw;
    if first {
        header = header.trim_start_matches('\u{feff}');
    }
    header.trim().to_lowercase()
}

/// Decide which column scheme an uploaded file uses.
///
/// Candidates for the domain are tried in priority order; a format whose
/// required canonical fields all resolve wins. A variant format missing a
/// required field falls through to the next candidate. If nothing matches,
/// the failure names the fields the fallback format could not resolve plus
/// the headers actually found.
pub fn detect_format(
    headers: &StringRecord,
    domain: ImportDomain,
) -> Result<ColumnMap, MissingColumns> {
    let normalized: Vec<String> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| normalize_header(h, i == 0))
        .collect();

    let mut last_missing: Vec<&'static str> = Vec::new();

    for spec in candidates(domain) {
        let mut columns = HashMap::new();
        let mut missing = Vec::new();

        for field_spec in spec.fields {
            let position = normalized.iter().position(|header| {
                field_spec
                    .aliases
                    .iter()
                    .any(|alias| header == alias)
            });

            match position {
                Some(idx) => {
                    // First header wins if a file repeats a column name
                    columns.entry(field_spec.field).or_insert(idx);
                }
                None if field_spec.required => missing.push(field_spec.field.name()),
                None => {}
            }
        }

        if missing.is_empty() {
            return Ok(ColumnMap {
                format: spec.format,
                columns,
            });
        }

        last_missing = missing;
    }

    Err(MissingColumns {
        missing: last_missing,
        found: headers.iter().map(|h| h.trim().to_string()).collect(),
    })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(cols: &[&str]) -> StringRecord {
        StringRecord::from(cols.to_vec())
    }

    #[test]
    fn test_detect_hq_variant_a() {
        let map = detect_format(
            &headers(&["MAJOR_KEY", "NAME_AND_ADDRESS", "INIT_DT"]),
            ImportDomain::MemberRoster,
        )
        .unwrap();

        assert_eq!(map.format(), SourceFormat::HqVariantA);
        assert!(map.has(Field::MemberNumber));
        assert!(map.has(Field::NameAddressBlock));
        assert!(map.has(Field::InitiationDate));
    }

    #[test]
    fn test_detect_hq_variant_b() {
        let map = detect_format(
            &headers(&["Member#", "First Name", "Last Name", "Email"]),
            ImportDomain::MemberRoster,
        )
        .unwrap();

        assert_eq!(map.format(), SourceFormat::HqVariantB);
    }

    #[test]
    fn test_detect_generic_member_from_sync_list() {
        // A bare member-number list (the roster-sync shape) is generic
        let map = detect_format(&headers(&["Member Number"]), ImportDomain::MemberRoster).unwrap();
        assert_eq!(map.format(), SourceFormat::Generic);
    }

    #[test]
    fn test_major_key_alone_falls_through_to_generic() {
        // MAJOR_KEY without the name block is not variant A
        let map = detect_format(&headers(&["MAJOR_KEY"]), ImportDomain::MemberRoster).unwrap();
        assert_eq!(map.format(), SourceFormat::Generic);
    }

    #[test]
    fn test_detect_storefront_export() {
        let map = detect_format(
            &headers(&[
                "Handle",
                "Title",
                "Body (HTML)",
                "Option1 Name",
                "Option1 Value",
                "Variant Price",
                "Variant Inventory Qty",
                "Image Src",
            ]),
            ImportDomain::Merchandise,
        )
        .unwrap();

        assert_eq!(map.format(), SourceFormat::StorefrontExport);
        assert!(map.has(Field::Option1Name));
        assert!(map.has(Field::ImageUrl));
    }

    #[test]
    fn test_detect_generic_product() {
        let map = detect_format(
            &headers(&["name", "category", "price", "inventory"]),
            ImportDomain::Merchandise,
        )
        .unwrap();

        assert_eq!(map.format(), SourceFormat::Generic);
    }

    #[test]
    fn test_headers_match_case_insensitively() {
        let map = detect_format(
            &headers(&["NAME", "Category", "PRICE"]),
            ImportDomain::Merchandise,
        )
        .unwrap();

        assert_eq!(map.format(), SourceFormat::Generic);
    }

    #[test]
    fn test_bom_on_first_header_is_stripped() {
        let map = detect_format(
            &headers(&["\u{feff}name", "category", "price"]),
            ImportDomain::Merchandise,
        )
        .unwrap();

        assert_eq!(map.format(), SourceFormat::Generic);
        let row = StringRecord::from(vec!["Chapter Mug", "drinkware", "12.50"]);
        assert_eq!(map.get(&row, Field::ProductName), Some("Chapter Mug"));
    }

    #[test]
    fn test_header_whitespace_is_insignificant() {
        let map = detect_format(
            &headers(&["  name ", " category", "price  "]),
            ImportDomain::Merchandise,
        )
        .unwrap();

        assert_eq!(map.format(), SourceFormat::Generic);
    }

    #[test]
    fn test_storefront_without_price_falls_through_and_fails() {
        // Handle present but no price column anywhere: storefront falls
        // through, generic then misses name/category/price
        let err = detect_format(
            &headers(&["Handle", "Title", "Vendor"]),
            ImportDomain::Merchandise,
        )
        .unwrap_err();

        assert!(err.missing.contains(&"name"));
        assert!(err.missing.contains(&"category"));
        assert!(err.missing.contains(&"price"));
        assert_eq!(err.found, vec!["Handle", "Title", "Vendor"]);
    }

    #[test]
    fn test_missing_columns_message_names_fields_and_headers() {
        let err = detect_format(&headers(&["foo", "bar"]), ImportDomain::Officers).unwrap_err();
        let message = err.to_string();

        assert!(message.contains("name"));
        assert!(message.contains("position"));
        assert!(message.contains("foo"));
        assert!(message.contains("bar"));
    }

    #[test]
    fn test_row_lookup_out_of_range_is_none() {
        let map = detect_format(
            &headers(&["name", "category", "price"]),
            ImportDomain::Merchandise,
        )
        .unwrap();

        // Short row: price column missing entirely
        let row = StringRecord::from(vec!["Mug"]);
        assert_eq!(map.get(&row, Field::Price), None);
        assert_eq!(map.get_or_empty(&row, Field::Price), "");
    }

    #[test]
    fn test_officer_headers() {
        let map = detect_format(
            &headers(&["Name", "Position", "Email", "Display Order"]),
            ImportDomain::Officers,
        )
        .unwrap();

        assert_eq!(map.format(), SourceFormat::Generic);
        assert!(map.has(Field::DisplayOrder));
    }
}
