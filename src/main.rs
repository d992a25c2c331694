use anyhow::{anyhow, Context, Result};
use std::env;
use std::path::Path;

use chapter_roster::{
    decode_upload, HttpImageFetcher, ImageArchive, ImageResolver, ImportEngine, RemovalSweep,
    StoreConfig,
};

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_usage();
        return Ok(());
    }

    let config = config_from_env();

    match args[1].as_str() {
        "import-products" => run_import_products(&config, &args[2..]),
        "validate-products" => run_validate_products(&args[2..]),
        "import-members" => run_import_members(&config, &args[2..]),
        "import-officers" => run_import_officers(&config, &args[2..]),
        "sync-roster" => run_sync_roster(&config, &args[2..]),
        "sweep" => run_sweep(&config, &args[2..]),
        "officers" => run_officers(&config, &args[2..]),
        "stats" => run_stats(&config),
        other => {
            eprintln!("Unknown command: {}\n", other);
            print_usage();
            Ok(())
        }
    }
}

fn print_usage() {
    println!("Chapter Roster v{}", chapter_roster::VERSION);
    println!();
    println!("Usage: chapter-roster <command> [options]");
    println!();
    println!("Commands:");
    println!("  import-products <csv> [--images <zip>]   Import merchandise from CSV");
    println!("  validate-products <csv>                  Parse a merchandise CSV without importing");
    println!("  import-members <csv>                     Import member roster from CSV");
    println!("  import-officers <csv>                    Import chapter leadership from CSV");
    println!("  sync-roster <csv>                        Cross-check members against the HQ list");
    println!("  sweep [--dry-run]                        Remove members past the 90-day grace period");
    println!("  officers list                            List members with officer privileges");
    println!("  officers grant <member#>                 Grant officer privileges");
    println!("  officers revoke <member#>                Revoke officer privileges");
    println!("  stats                                    Show store counts");
    println!();
    println!("Environment:");
    println!("  CHAPTER_ROSTER_DB      database file (default: chapter-roster.db)");
    println!("  CHAPTER_ROSTER_MEDIA   media directory (default: media/merchandise)");
}

/// Build the process-wide configuration once; everything downstream takes
/// it by reference.
fn config_from_env() -> StoreConfig {
    let db_path = env::var("CHAPTER_ROSTER_DB").unwrap_or_else(|_| "chapter-roster.db".to_string());
    let media_dir =
        env::var("CHAPTER_ROSTER_MEDIA").unwrap_or_else(|_| "media/merchandise".to_string());
    StoreConfig::new(db_path, media_dir)
}

fn read_upload(path: &str) -> Result<String> {
    let bytes = std::fs::read(Path::new(path))
        .with_context(|| format!("Failed to read file: {}", path))?;
    decode_upload(&bytes)
}

fn require_arg<'a>(args: &'a [String], index: usize, what: &str) -> Result<&'a str> {
    args.get(index)
        .map(String::as_str)
        .ok_or_else(|| anyhow!("Missing argument: {}", what))
}

fn run_import_products(config: &StoreConfig, args: &[String]) -> Result<()> {
    let csv_path = require_arg(args, 0, "<csv>")?;
    let csv_text = read_upload(csv_path)?;

    println!("🛍️  Importing merchandise from {}", csv_path);

    let mut resolver = ImageResolver::new(&config.media_dir).with_fetcher(Box::new(
        HttpImageFetcher::new(config.fetch_timeout)?,
    ));

    // Optional ZIP of images keyed by filename
    if let Some(flag_pos) = args.iter().position(|a| a == "--images") {
        let zip_path = require_arg(args, flag_pos + 1, "--images <zip>")?;
        let zip_bytes = std::fs::read(zip_path)
            .with_context(|| format!("Failed to read images ZIP: {}", zip_path))?;
        resolver = resolver.with_archive(ImageArchive::from_bytes(zip_bytes)?);
        println!("✓ Images ZIP loaded: {}", zip_path);
    }

    let conn = config.open()?;
    let engine = ImportEngine::new(&conn);
    let summary = engine.import_products(&csv_text, &mut resolver)?;

    println!("{}", summary);
    Ok(())
}

fn run_validate_products(args: &[String]) -> Result<()> {
    let csv_path = require_arg(args, 0, "<csv>")?;
    let csv_text = read_upload(csv_path)?;

    println!("📋 Validating {} (no database changes)", csv_path);

    let (records, summary) = ImportEngine::preview_products(&csv_text)?;

    println!("✓ Parsed {} product(s)", records.len());
    for (i, record) in records.iter().enumerate() {
        println!(
            "  {}. {} [{}] ${:.2}, {} in stock",
            i + 1,
            record.name,
            record.category.display_name(),
            record.price,
            record.inventory
        );
    }
    if summary.skipped > 0 || summary.has_errors() {
        println!("{}", summary);
    }
    Ok(())
}

fn run_import_members(config: &StoreConfig, args: &[String]) -> Result<()> {
    let csv_path = require_arg(args, 0, "<csv>")?;
    let csv_text = read_upload(csv_path)?;

    println!("🧑 Importing member roster from {}", csv_path);

    let conn = config.open()?;
    let engine = ImportEngine::new(&conn);
    let summary = engine.import_members(&csv_text)?;

    println!("{}", summary);
    Ok(())
}

fn run_import_officers(config: &StoreConfig, args: &[String]) -> Result<()> {
    let csv_path = require_arg(args, 0, "<csv>")?;
    let csv_text = read_upload(csv_path)?;

    println!("🎖️  Importing chapter leadership from {}", csv_path);

    let conn = config.open()?;
    let engine = ImportEngine::new(&conn);
    let summary = engine.import_officers(&csv_text)?;

    println!("{}", summary);
    Ok(())
}

fn run_sync_roster(config: &StoreConfig, args: &[String]) -> Result<()> {
    let csv_path = require_arg(args, 0, "<csv>")?;
    let csv_text = read_upload(csv_path)?;

    println!("🔄 Syncing members against HQ list {}", csv_path);
    println!("   Members not on the list get a {}-day countdown to pay dues", chapter_roster::GRACE_PERIOD_DAYS);

    let conn = config.open()?;
    let engine = ImportEngine::new(&conn);
    let summary = engine.sync_member_roster(&csv_text)?;

    println!("{}", summary);
    Ok(())
}

fn run_sweep(config: &StoreConfig, args: &[String]) -> Result<()> {
    let dry_run = args.iter().any(|a| a == "--dry-run");

    if dry_run {
        println!("=== DRY RUN MODE (No changes will be made) ===");
    }

    let conn = config.open()?;
    let outcome = RemovalSweep::new(dry_run).run(&conn, chrono::Utc::now())?;

    for entry in &outcome.entries {
        println!("  {}", entry);
    }
    println!("{}", outcome);
    Ok(())
}

fn run_officers(config: &StoreConfig, args: &[String]) -> Result<()> {
    let conn = config.open()?;

    match args.first().map(String::as_str) {
        Some("list") => {
            let officers = chapter_roster::store::officer_members(&conn)?;
            println!("Officers with admin privileges ({} total)", officers.len());
            for member in officers {
                println!("  • {} ({})", member.full_name(), member.member_number);
            }
            Ok(())
        }
        Some("grant") => {
            let number = require_arg(args, 1, "<member#>")?;
            if chapter_roster::store::set_officer_flag(&conn, number, true)? {
                println!("✓ Granted officer privileges to {}", number);
            } else {
                eprintln!("❌ Member '{}' not found", number);
            }
            Ok(())
        }
        Some("revoke") => {
            let number = require_arg(args, 1, "<member#>")?;
            if chapter_roster::store::set_officer_flag(&conn, number, false)? {
                println!("✓ Revoked officer privileges from {}", number);
            } else {
                eprintln!("❌ Member '{}' not found", number);
            }
            Ok(())
        }
        _ => Err(anyhow!("Usage: chapter-roster officers <list|grant|revoke>")),
    }
}

fn run_stats(config: &StoreConfig) -> Result<()> {
    let conn = config.open()?;

    println!("📊 Store counts");
    println!("  Members:  {}", chapter_roster::store::count_members(&conn)?);
    println!("  Products: {}", chapter_roster::store::count_products(&conn)?);
    println!("  Officers: {}", chapter_roster::store::count_officers(&conn)?);
    Ok(())
}
