// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};
use mds_journal::EventKind;
use std::path::Path;

use crate::scan::scan_journal;

pub fn run(path: &Path, kind: Option<EventKind>) -> anyhow::Result<()> {
    let scan = scan_journal(path)?;

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Offset", "End", "Kind", "Bytes", "Event"]);

    for entry in scan
        .events
        .iter()
        .filter(|e| kind.map_or(true, |k| e.event.kind() == k))
    {
        table.add_row(vec![
            entry.start.to_string(),
            entry.end.to_string(),
            entry.event.kind().to_string(),
            (entry.end - entry.start).to_string(),
            entry.event.body().to_string(),
        ]);
    }

    println!("\nJournal {}\n", path.display());
    println!("Live range:  {}..{}", scan.expire_pos, scan.write_pos);
    println!("Events:      {}\n", scan.events.len());
    println!("{table}\n");

    if let Some(e) = &scan.error {
        println!("⚠️  Stopped at bad record: {}\n", e);
    }
    Ok(())
}
