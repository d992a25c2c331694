// ⚖️ Import Engine - Reconcile uploaded CSVs against the entity store
//
// One invocation processes one uploaded file top to bottom, synchronously.
// Lookup is by canonical identifier only. Two reconciliation policies:
//
// - skip-duplicate (member / officer / merchandise import): an existing
//   identifier match leaves the stored entity untouched. Re-running the
//   same file is a no-op, which is the whole recovery story - there is no
//   cancellation once a run starts.
// - roster-sync (HQ member-number cross-check): members absent from the
//   supplied list get a grace-period mark, members that reappear get the
//   mark cleared. Sync never creates and never deletes; deletion belongs
//   to the separately-invoked removal sweep.
//
// Row-level problems never abort the batch. Only a file nobody can parse
// (bad encoding, no recognizable columns) fails before processing begins.

use crate::entities::{number_implies_life, Member, MemberStatus, Officer, Product};
use crate::formats::{detect_format, Field, ImportDomain};
use crate::images::ImageResolver;
use crate::normalize::{
    normalize_member, normalize_officer, MemberRecord, OfficerRecord, ProductNormalizer,
    ProductRecord, RowError, RowOutcome,
};
use crate::report::{ImportSummary, SyncSummary};
use crate::store;
use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use csv::ReaderBuilder;
use rusqlite::Connection;
use std::collections::HashSet;

/// Reason text written when roster sync marks a member
pub const HQ_LIST_REMOVAL_REASON: &str = "Not on current HQ list - requires dues verification";

/// Decode an uploaded file body: UTF-8, with or without a leading BOM.
/// Anything else aborts the run before a single row is touched.
pub fn decode_upload(bytes: &[u8]) -> Result<String> {
    let text = std::str::from_utf8(bytes).context("File is not valid UTF-8")?;
    Ok(text.trim_start_matches('\u{feff}').to_string())
}

// ============================================================================
// IMPORT ENGINE
// ============================================================================

pub struct ImportEngine<'a> {
    conn: &'a Connection,
}

impl<'a> ImportEngine<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        ImportEngine { conn }
    }

    /// CSV reader over decoded upload text. Flexible: short rows read as
    /// empty cells instead of failing, matching the leniency policy.
    fn reader(csv_text: &str) -> csv::Reader<&[u8]> {
        ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(csv_text.as_bytes())
    }

    fn headers(reader: &mut csv::Reader<&[u8]>) -> Result<csv::StringRecord> {
        let headers = reader
            .headers()
            .context("Failed to read CSV header row")?
            .clone();
        if headers.is_empty() || headers.iter().all(|h| h.trim().is_empty()) {
            return Err(anyhow!("CSV file is empty"));
        }
        Ok(headers)
    }

    // ------------------------------------------------------------------------
    // MEMBER IMPORT (skip-duplicate)
    // ------------------------------------------------------------------------

    pub fn import_members(&self, csv_text: &str) -> Result<ImportSummary> {
        let mut reader = Self::reader(csv_text);
        let headers = Self::headers(&mut reader)?;
        let map = detect_format(&headers, ImportDomain::MemberRoster)?;

        let mut summary = ImportSummary::new();

        for (idx, result) in reader.records().enumerate() {
            let row_number = idx + 2;
            let record = match result {
                Ok(record) => record,
                Err(e) => {
                    summary.record_error(&RowError::new(row_number, e.to_string()));
                    continue;
                }
            };

            match normalize_member(&map, &record, row_number) {
                RowOutcome::Record {
                    record,
                    field_errors,
                } => {
                    for error in &field_errors {
                        summary.record_error(error);
                    }
                    self.upsert_member(record, &mut summary)?;
                }
                RowOutcome::Skip(_) => summary.skipped += 1,
                RowOutcome::Error(error) => summary.record_error(&error),
            }
        }

        Ok(summary)
    }

    fn upsert_member(&self, record: MemberRecord, summary: &mut ImportSummary) -> Result<()> {
        if store::find_member_by_number(self.conn, &record.member_number)?.is_some() {
            // Skip-duplicate: this run never mutates a pre-existing record
            summary.skipped += 1;
            return Ok(());
        }

        let member = member_from_record(record);
        store::insert_member(self.conn, &member)?;
        summary.created += 1;
        Ok(())
    }

    // ------------------------------------------------------------------------
    // OFFICER IMPORT (skip-duplicate)
    // ------------------------------------------------------------------------

    pub fn import_officers(&self, csv_text: &str) -> Result<ImportSummary> {
        let mut reader = Self::reader(csv_text);
        let headers = Self::headers(&mut reader)?;
        let map = detect_format(&headers, ImportDomain::Officers)?;

        let mut summary = ImportSummary::new();

        for (idx, result) in reader.records().enumerate() {
            let row_number = idx + 2;
            let record = match result {
                Ok(record) => record,
                Err(e) => {
                    summary.record_error(&RowError::new(row_number, e.to_string()));
                    continue;
                }
            };

            match normalize_officer(&map, &record, row_number) {
                RowOutcome::Record {
                    record,
                    field_errors,
                } => {
                    for error in &field_errors {
                        summary.record_error(error);
                    }
                    self.upsert_officer(record, &mut summary)?;
                }
                RowOutcome::Skip(_) => summary.skipped += 1,
                RowOutcome::Error(error) => summary.record_error(&error),
            }
        }

        Ok(summary)
    }

    fn upsert_officer(&self, record: OfficerRecord, summary: &mut ImportSummary) -> Result<()> {
        if store::find_officer(self.conn, &record.full_name, record.position)?.is_some() {
            summary.skipped += 1;
            return Ok(());
        }

        let mut officer = Officer::new(record.full_name, record.position);
        officer.position_custom = record.position_custom;
        officer.email = record.email;
        officer.phone = record.phone;
        officer.bio = record.bio;
        officer.display_order = record.display_order;
        officer.term_start = record.term_start;
        officer.term_end = record.term_end;

        store::insert_officer(self.conn, &officer)?;
        summary.created += 1;
        Ok(())
    }

    // ------------------------------------------------------------------------
    // MERCHANDISE IMPORT (skip-duplicate + image side effect)
    // ------------------------------------------------------------------------

    pub fn import_products(
        &self,
        csv_text: &str,
        images: &mut ImageResolver,
    ) -> Result<ImportSummary> {
        let mut reader = Self::reader(csv_text);
        let headers = Self::headers(&mut reader)?;
        let map = detect_format(&headers, ImportDomain::Merchandise)?;

        let mut summary = ImportSummary::new();
        let mut normalizer = ProductNormalizer::new();

        for (idx, result) in reader.records().enumerate() {
            let row_number = idx + 2;
            let record = match result {
                Ok(record) => record,
                Err(e) => {
                    summary.record_error(&RowError::new(row_number, e.to_string()));
                    continue;
                }
            };

            match normalizer.normalize(&map, &record, row_number) {
                RowOutcome::Record {
                    record,
                    field_errors,
                } => {
                    for error in &field_errors {
                        summary.record_error(error);
                    }
                    self.upsert_product(record, images, &mut summary)?;
                }
                RowOutcome::Skip(_) => summary.skipped += 1,
                RowOutcome::Error(error) => summary.record_error(&error),
            }
        }

        Ok(summary)
    }

    fn upsert_product(
        &self,
        record: ProductRecord,
        images: &mut ImageResolver,
        summary: &mut ImportSummary,
    ) -> Result<()> {
        if store::find_product_by_name(self.conn, &record.name)?.is_some() {
            summary.skipped += 1;
            return Ok(());
        }

        let mut product = Product::new(record.name, record.category, record.price);
        product.inventory = record.inventory;
        product.description = record.description;
        product.sizes = record.sizes;
        product.colors = record.colors;

        // Image resolution must not fail the product - log and move on
        if let Some(image) = &record.image {
            match images.resolve(image) {
                Ok(filename) => product.image_file = Some(filename),
                Err(e) => summary.record_warning(format!(
                    "Row {}: image not resolved from {}: {}",
                    record.row,
                    image.describe(),
                    e
                )),
            }
        }

        store::insert_product(self.conn, &product)?;
        summary.created += 1;
        Ok(())
    }

    /// Parse-only pass for merchandise: detection plus normalization, no
    /// store writes and no image resolution. Returns the records that
    /// would be imported alongside the skip/error tallies.
    pub fn preview_products(csv_text: &str) -> Result<(Vec<ProductRecord>, ImportSummary)> {
        let mut reader = Self::reader(csv_text);
        let headers = Self::headers(&mut reader)?;
        let map = detect_format(&headers, ImportDomain::Merchandise)?;

        let mut summary = ImportSummary::new();
        let mut normalizer = ProductNormalizer::new();
        let mut records = Vec::new();

        for (idx, result) in reader.records().enumerate() {
            let row_number = idx + 2;
            let record = match result {
                Ok(record) => record,
                Err(e) => {
                    summary.record_error(&RowError::new(row_number, e.to_string()));
                    continue;
                }
            };

            match normalizer.normalize(&map, &record, row_number) {
                RowOutcome::Record {
                    record,
                    field_errors,
                } => {
                    for error in &field_errors {
                        summary.record_error(error);
                    }
                    records.push(record);
                }
                RowOutcome::Skip(_) => summary.skipped += 1,
                RowOutcome::Error(error) => summary.record_error(&error),
            }
        }

        Ok((records, summary))
    }

    // ------------------------------------------------------------------------
    // ROSTER SYNC (mark / clear, never create, never delete)
    // ------------------------------------------------------------------------

    pub fn sync_member_roster(&self, csv_text: &str) -> Result<SyncSummary> {
        let mut reader = Self::reader(csv_text);
        let headers = Self::headers(&mut reader)?;
        let map = detect_format(&headers, ImportDomain::MemberRoster)?;

        let mut summary = SyncSummary::default();
        let mut roster: HashSet<String> = HashSet::new();

        for (idx, result) in reader.records().enumerate() {
            let row_number = idx + 2;
            let record = match result {
                Ok(record) => record,
                Err(e) => {
                    summary.errors.push(RowError::new(row_number, e.to_string()).to_string());
                    continue;
                }
            };

            let number = map.get_or_empty(&record, Field::MemberNumber);
            if number.is_empty() {
                summary.skipped += 1;
            } else {
                roster.insert(number.to_string());
            }
        }

        if roster.is_empty() {
            return Err(anyhow!("No valid member numbers found in CSV"));
        }
        summary.roster_size = roster.len();

        let members = store::get_all_members(self.conn)?;
        let now = Utc::now();
        let mut store_numbers: HashSet<String> = HashSet::new();

        for member in &members {
            store_numbers.insert(member.member_number.clone());

            if roster.contains(&member.member_number) {
                summary.confirmed += 1;
                if member.is_marked_for_removal() {
                    store::clear_removal_mark(self.conn, &member.id)?;
                    summary.cleared += 1;
                }
            } else if member.is_marked_for_removal() {
                // Already in the grace period - the clock keeps its
                // original start, a re-sync must not restart it
                summary.already_marked += 1;
            } else {
                store::mark_member_for_removal(self.conn, &member.id, now, HQ_LIST_REMOVAL_REASON)?;
                summary.newly_marked += 1;
            }
        }

        summary.unknown_numbers = roster
            .iter()
            .filter(|number| !store_numbers.contains(*number))
            .count();

        Ok(summary)
    }
}

// ============================================================================
// CREATION DEFAULTS
// ============================================================================

/// Build a Member from a canonical record, applying the derived defaults:
/// freshly-imported members are assumed in good standing unless the CSV
/// says otherwise, and a life-marked member number forces life status.
/// This is chapter policy, not a security boundary.
fn member_from_record(record: MemberRecord) -> Member {
    let mut member = Member::new(record.member_number, record.first_name, record.last_name);
    member.email = record.email;
    member.phone = record.phone;
    member.address = record.address;
    member.line_name = record.line_name;
    member.line_number = record.line_number;
    member.initiation_date = record.initiation_date;

    member.dues_current = record.dues_current.unwrap_or(true);

    match record.status {
        Some(explicit) => member.status = explicit,
        None if number_implies_life(&member.member_number) => {
            if member.dues_current {
                member.status = MemberStatus::FinancialLifeMember;
            } else {
                member.status = MemberStatus::NonFinancialLifeMember;
            }
        }
        None => {}
    }

    member.derive_status();
    member
}

// ============================================================================
// TESTS
// ============================================================================
