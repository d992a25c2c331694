// 🗄️ Persisted Entity Store - SQLite tables for members, products, officers
//
// One entity per canonical identifier, enforced twice: the import engine
// looks up before creating, and UNIQUE constraints back it up at the
// database layer. The store never deletes on an import path - deletion
// belongs to the operator-run removal sweep.

use crate::entities::{Member, MemberStatus, Officer, Position, Product, ProductCategory};
use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, Row};
use std::path::PathBuf;
use std::time::Duration;

/// Date-only storage format (initiation dates, officer terms)
const DATE_FORMAT: &str = "%Y-%m-%d";

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Process-wide configuration, constructed once at startup and passed by
/// reference. No ambient global lookup.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// SQLite database file
    pub db_path: PathBuf,

    /// Directory for resolved merchandise images
    pub media_dir: PathBuf,

    /// Timeout for per-row image downloads
    pub fetch_timeout: Duration,
}

impl StoreConfig {
    pub fn new(db_path: impl Into<PathBuf>, media_dir: impl Into<PathBuf>) -> Self {
        StoreConfig {
            db_path: db_path.into(),
            media_dir: media_dir.into(),
            fetch_timeout: Duration::from_secs(10),
        }
    }

    pub fn open(&self) -> Result<Connection> {
        let conn = Connection::open(&self.db_path)
            .with_context(|| format!("Failed to open database {}", self.db_path.display()))?;
        setup_database(&conn)?;
        Ok(conn)
    }
}

// ============================================================================
// SCHEMA
// ============================================================================

pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS members (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            member_uuid TEXT UNIQUE NOT NULL,
            member_number TEXT UNIQUE NOT NULL,
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            email TEXT NOT NULL DEFAULT '',
            phone TEXT NOT NULL DEFAULT '',
            address TEXT NOT NULL DEFAULT '',
            line_name TEXT NOT NULL DEFAULT '',
            line_number TEXT NOT NULL DEFAULT '',
            status TEXT NOT NULL,
            dues_current INTEGER NOT NULL,
            is_officer INTEGER NOT NULL DEFAULT 0,
            initiation_date TEXT,
            marked_for_removal_date TEXT,
            removal_reason TEXT NOT NULL DEFAULT '',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS products (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            product_uuid TEXT UNIQUE NOT NULL,
            name TEXT UNIQUE NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            category TEXT NOT NULL,
            price REAL NOT NULL,
            inventory INTEGER NOT NULL DEFAULT 0,
            sizes TEXT NOT NULL DEFAULT '',
            colors TEXT NOT NULL DEFAULT '',
            image_file TEXT,
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS officers (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            officer_uuid TEXT UNIQUE NOT NULL,
            full_name TEXT NOT NULL,
            position TEXT NOT NULL,
            position_custom TEXT NOT NULL DEFAULT '',
            email TEXT NOT NULL DEFAULT '',
            phone TEXT NOT NULL DEFAULT '',
            bio TEXT NOT NULL DEFAULT '',
            display_order INTEGER NOT NULL DEFAULT 0,
            is_active INTEGER NOT NULL DEFAULT 1,
            term_start TEXT,
            term_end TEXT,
            created_at TEXT NOT NULL,
            UNIQUE(full_name, position)
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_members_number ON members(member_number)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_members_marked ON members(marked_for_removal_date)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_products_name ON products(name)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_officers_identity ON officers(full_name, position)",
        [],
    )?;

    Ok(())
}

// ============================================================================
// ROW MAPPING
// ============================================================================

fn parse_utc(raw: Option<String>) -> Option<DateTime<Utc>> {
    raw.and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

fn parse_stored_date(raw: Option<String>) -> Option<NaiveDate> {
    raw.and_then(|s| NaiveDate::parse_from_str(&s, DATE_FORMAT).ok())
}

const MEMBER_COLUMNS: &str = "member_uuid, member_number, first_name, last_name, email, phone,
        address, line_name, line_number, status, dues_current, is_officer,
        initiation_date, marked_for_removal_date, removal_reason, created_at, updated_at";

fn member_from_row(row: &Row) -> rusqlite::Result<Member> {
    let status_code: String = row.get(9)?;
    let initiation_raw: Option<String> = row.get(12)?;
    let marked_raw: Option<String> = row.get(13)?;
    let created_raw: String = row.get(15)?;
    let updated_raw: String = row.get(16)?;

    Ok(Member {
        id: row.get(0)?,
        member_number: row.get(1)?,
        first_name: row.get(2)?,
        last_name: row.get(3)?,
        email: row.get(4)?,
        phone: row.get(5)?,
        address: row.get(6)?,
        line_name: row.get(7)?,
        line_number: row.get(8)?,
        status: MemberStatus::parse(&status_code).unwrap_or(MemberStatus::Financial),
        dues_current: row.get(10)?,
        is_officer: row.get(11)?,
        initiation_date: parse_stored_date(initiation_raw),
        marked_for_removal_date: parse_utc(marked_raw),
        removal_reason: row.get(14)?,
        created_at: parse_utc(Some(created_raw)).unwrap_or_else(Utc::now),
        updated_at: parse_utc(Some(updated_raw)).unwrap_or_else(Utc::now),
    })
}

const PRODUCT_COLUMNS: &str = "product_uuid, name, description, category, price, inventory,
        sizes, colors, image_file, is_active, created_at";

fn product_from_row(row: &Row) -> rusqlite::Result<Product> {
    let category_code: String = row.get(3)?;
    let created_raw: String = row.get(10)?;

    Ok(Product {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        category: ProductCategory::parse(&category_code).unwrap_or(ProductCategory::Other),
        price: row.get(4)?,
        inventory: row.get(5)?,
        sizes: row.get(6)?,
        colors: row.get(7)?,
        image_file: row.get(8)?,
        is_active: row.get(9)?,
        created_at: parse_utc(Some(created_raw)).unwrap_or_else(Utc::now),
    })
}

const OFFICER_COLUMNS: &str = "officer_uuid, full_name, position, position_custom, email, phone,
        bio, display_order, is_active, term_start, term_end, created_at";

fn officer_from_row(row: &Row) -> rusqlite::Result<Officer> {
    let position_code: String = row.get(2)?;
    let term_start_raw: Option<String> = row.get(9)?;
    let term_end_raw: Option<String> = row.get(10)?;
    let created_raw: String = row.get(11)?;

    Ok(Officer {
        id: row.get(0)?,
        full_name: row.get(1)?,
        position: Position::parse(&position_code).unwrap_or(Position::Other),
        position_custom: row.get(3)?,
        email: row.get(4)?,
        phone: row.get(5)?,
        bio: row.get(6)?,
        display_order: row.get(7)?,
        is_active: row.get(8)?,
        term_start: parse_stored_date(term_start_raw),
        term_end: parse_stored_date(term_end_raw),
        created_at: parse_utc(Some(created_raw)).unwrap_or_else(Utc::now),
    })
}

// ============================================================================
// MEMBERS
// ============================================================================

pub fn insert_member(conn: &Connection, member: &Member) -> Result<()> {
    conn.execute(
        "INSERT INTO members (
            member_uuid, member_number, first_name, last_name, email, phone,
            address, line_name, line_number, status, dues_current, is_officer,
            initiation_date, marked_for_removal_date, removal_reason, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
        params![
            member.id,
            member.member_number,
            member.first_name,
            member.last_name,
            member.email,
            member.phone,
            member.address,
            member.line_name,
            member.line_number,
            member.status.code(),
            member.dues_current,
            member.is_officer,
            member.initiation_date.map(|d| d.format(DATE_FORMAT).to_string()),
            member.marked_for_removal_date.map(|dt| dt.to_rfc3339()),
            member.removal_reason,
            member.created_at.to_rfc3339(),
            member.updated_at.to_rfc3339(),
        ],
    )
    .with_context(|| format!("Failed to insert member {}", member.member_number))?;
    Ok(())
}

pub fn find_member_by_number(conn: &Connection, member_number: &str) -> Result<Option<Member>> {
    let sql = format!(
        "SELECT {} FROM members WHERE member_number = ?1",
        MEMBER_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query_map(params![member_number], member_from_row)?;
    match rows.next() {
        Some(member) => Ok(Some(member?)),
        None => Ok(None),
    }
}

pub fn get_all_members(conn: &Connection) -> Result<Vec<Member>> {
    let sql = format!(
        "SELECT {} FROM members ORDER BY last_name, first_name",
        MEMBER_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let members = stmt
        .query_map([], member_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(members)
}

pub fn members_marked_for_removal(conn: &Connection) -> Result<Vec<Member>> {
    let sql = format!(
        "SELECT {} FROM members WHERE marked_for_removal_date IS NOT NULL
         ORDER BY marked_for_removal_date",
        MEMBER_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let members = stmt
        .query_map([], member_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(members)
}

pub fn mark_member_for_removal(
    conn: &Connection,
    member_uuid: &str,
    when: DateTime<Utc>,
    reason: &str,
) -> Result<()> {
    conn.execute(
        "UPDATE members
         SET marked_for_removal_date = ?1, removal_reason = ?2, updated_at = ?3
         WHERE member_uuid = ?4",
        params![when.to_rfc3339(), reason, Utc::now().to_rfc3339(), member_uuid],
    )?;
    Ok(())
}

pub fn clear_removal_mark(conn: &Connection, member_uuid: &str) -> Result<()> {
    conn.execute(
        "UPDATE members
         SET marked_for_removal_date = NULL, removal_reason = '', updated_at = ?1
         WHERE member_uuid = ?2",
        params![Utc::now().to_rfc3339(), member_uuid],
    )?;
    Ok(())
}

pub fn delete_member(conn: &Connection, member_uuid: &str) -> Result<()> {
    conn.execute(
        "DELETE FROM members WHERE member_uuid = ?1",
        params![member_uuid],
    )?;
    Ok(())
}

/// Toggle the officer flag by member number. Returns false if no such member.
pub fn set_officer_flag(conn: &Connection, member_number: &str, is_officer: bool) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE members SET is_officer = ?1, updated_at = ?2 WHERE member_number = ?3",
        params![is_officer, Utc::now().to_rfc3339(), member_number],
    )?;
    Ok(changed > 0)
}

pub fn officer_members(conn: &Connection) -> Result<Vec<Member>> {
    let sql = format!(
        "SELECT {} FROM members WHERE is_officer = 1 ORDER BY last_name, first_name",
        MEMBER_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let members = stmt
        .query_map([], member_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(members)
}

pub fn count_members(conn: &Connection) -> Result<i64> {
    let count = conn.query_row("SELECT COUNT(*) FROM members", [], |row| row.get(0))?;
    Ok(count)
}

// ============================================================================
// PRODUCTS
// ============================================================================

pub fn insert_product(conn: &Connection, product: &Product) -> Result<()> {
    conn.execute(
        "INSERT INTO products (
            product_uuid, name, description, category, price, inventory,
            sizes, colors, image_file, is_active, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            product.id,
            product.name,
            product.description,
            product.category.code(),
            product.price,
            product.inventory,
            product.sizes,
            product.colors,
            product.image_file,
            product.is_active,
            product.created_at.to_rfc3339(),
        ],
    )
    .with_context(|| format!("Failed to insert product {}", product.name))?;
    Ok(())
}

pub fn find_product_by_name(conn: &Connection, name: &str) -> Result<Option<Product>> {
    let sql = format!("SELECT {} FROM products WHERE name = ?1", PRODUCT_COLUMNS);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query_map(params![name], product_from_row)?;
    match rows.next() {
        Some(product) => Ok(Some(product?)),
        None => Ok(None),
    }
}

pub fn get_all_products(conn: &Connection) -> Result<Vec<Product>> {
    let sql = format!("SELECT {} FROM products ORDER BY name", PRODUCT_COLUMNS);
    let mut stmt = conn.prepare(&sql)?;
    let products = stmt
        .query_map([], product_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(products)
}

pub fn count_products(conn: &Connection) -> Result<i64> {
    let count = conn.query_row("SELECT COUNT(*) FROM products", [], |row| row.get(0))?;
    Ok(count)
}

// ============================================================================
// OFFICERS
// ============================================================================

pub fn insert_officer(conn: &Connection, officer: &Officer) -> Result<()> {
    conn.execute(
        "INSERT INTO officers (
            officer_uuid, full_name, position, position_custom, email, phone,
            bio, display_order, is_active, term_start, term_end, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            officer.id,
            officer.full_name,
            officer.position.code(),
            officer.position_custom,
            officer.email,
            officer.phone,
            officer.bio,
            officer.display_order,
            officer.is_active,
            officer.term_start.map(|d| d.format(DATE_FORMAT).to_string()),
            officer.term_end.map(|d| d.format(DATE_FORMAT).to_string()),
            officer.created_at.to_rfc3339(),
        ],
    )
    .with_context(|| format!("Failed to insert officer {}", officer.full_name))?;
    Ok(())
}

/// Lookup by the canonical (full name, position) pair
pub fn find_officer(
    conn: &Connection,
    full_name: &str,
    position: Position,
) -> Result<Option<Officer>> {
    let sql = format!(
        "SELECT {} FROM officers WHERE full_name = ?1 AND position = ?2",
        OFFICER_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query_map(params![full_name, position.code()], officer_from_row)?;
    match rows.next() {
        Some(officer) => Ok(Some(officer?)),
        None => Ok(None),
    }
}

pub fn get_all_officers(conn: &Connection) -> Result<Vec<Officer>> {
    let sql = format!(
        "SELECT {} FROM officers ORDER BY display_order, position",
        OFFICER_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let officers = stmt
        .query_map([], officer_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(officers)
}

pub fn count_officers(conn: &Connection) -> Result<i64> {
    let count = conn.query_row("SELECT COUNT(*) FROM officers", [], |row| row.get(0))?;
    Ok(count)
}

// ============================================================================
// TESTS
// ============================================================================
