//! Inspect command implementation.

use super::{CliResult, Context};
use kairos_core::journal::FrameReader;
use kairos_core::DatabaseStats;
use serde::Serialize;

/// Database inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Database path.
    pub path: String,
    /// Row counts and journal position.
    #[serde(flatten)]
    pub stats: DatabaseStats,
    /// Number of commit frames in the journal.
    pub journal_frames: usize,
    /// Whether the journal ends in an incomplete frame.
    pub torn_tail: bool,
}

/// Runs the inspect command.
pub fn run(ctx: &Context) -> CliResult<()> {
    let stats = ctx.db.stats()?;
    let (journal_frames, torn_tail) = match ctx.db.journal_path() {
        Some(journal) if journal.exists() => {
            let bytes = std::fs::read(&journal).map_err(kairos_core::CoreError::from)?;
            let mut reader = FrameReader::new(&bytes);
            let mut frames = 0;
            for frame in reader.by_ref() {
                frame?;
                frames += 1;
            }
            (frames, reader.torn_tail())
        }
        _ => (0, false),
    };

    let result = InspectResult {
        path: ctx
            .db
            .path()
            .map(|path| path.display().to_string())
            .unwrap_or_default(),
        stats,
        journal_frames,
        torn_tail,
    };
    ctx.emit(&result, print_text_output)
}

fn print_text_output(result: &InspectResult) {
    println!("Kairos Database Inspection");
    println!("==========================");
    println!();
    println!("Path: {}", result.path);
    println!();
    println!("Journal:");
    println!("  size:      {}", format_size(result.stats.journal_bytes));
    println!("  frames:    {}", result.journal_frames);
    println!("  committed: seq:{}", result.stats.committed_seq);
    if result.torn_tail {
        println!("  (ends in an incomplete frame)");
    }
    println!();
    println!("Rows:");
    println!("  users:       {}", result.stats.users);
    println!("  events:      {}", result.stats.events);
    println!("  permissions: {}", result.stats.permissions);
    println!("  versions:    {}", result.stats.versions);
    println!("  changelogs:  {}", result.stats.changelogs);
}

fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} bytes")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.1} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}
