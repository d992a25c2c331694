// Chapter Roster - Core Library
// CSV import & reconciliation for the chapter's member, officer, and
// merchandise records. Exposes all modules for use in the CLI and tests.

pub mod entities;
pub mod formats;     // Format detection: which column scheme is this upload?
pub mod images;      // Merchandise image resolution (ZIP bundle / URL)
pub mod normalize;   // Row → canonical record, with the leniency policy
pub mod reconcile;   // Import engine: skip-duplicate upsert + roster sync
pub mod report;      // Aggregate summaries shown to the operator
pub mod store;       // SQLite persistence for the three entity tables
pub mod sweep;       // 90-day grace-period removal sweep

// Re-export commonly used types
pub use entities::{
    number_implies_life, Member, MemberStatus, Officer, Position, Product, ProductCategory,
    GRACE_PERIOD_DAYS, LIFE_MEMBER_MARKER,
};
pub use formats::{detect_format, ColumnMap, Field, ImportDomain, MissingColumns, SourceFormat};
pub use images::{HttpImageFetcher, ImageArchive, ImageFetcher, ImageRef, ImageResolver};
pub use normalize::{
    normalize_member, normalize_officer, MemberRecord, OfficerRecord, ProductNormalizer,
    ProductRecord, RowError, RowOutcome, SkipReason,
};
pub use reconcile::{decode_upload, ImportEngine, HQ_LIST_REMOVAL_REASON};
pub use report::{ImportSummary, SyncSummary, ERROR_DISPLAY_CAP};
pub use store::{setup_database, StoreConfig};
pub use sweep::{RemovalSweep, SweepOutcome};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
