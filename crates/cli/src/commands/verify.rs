// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::path::Path;

use mds_journal::MdsState;

use crate::scan::scan_journal;

/// Decodes the whole journal and dry-runs its replay into empty state.
pub fn run(path: &Path) -> anyhow::Result<()> {
    let scan = scan_journal(path)?;

    if let Some(e) = scan.error {
        println!("\n❌ CORRUPTED\n");
        println!("Valid events: {}", scan.events.len());
        println!("First error:  {}\n", e);
        return Err(e.into());
    }

    let mut mds = MdsState::new();
    for entry in &scan.events {
        if entry.event.has_happened(&mds) {
            continue;
        }
        if let Err(e) = entry.event.replay(&mut mds) {
            println!("\n❌ REPLAY FAILED\n");
            println!("Event at offset {}: {}\n", entry.start, e);
            return Err(e.into());
        }
    }

    println!("\n✅ VERIFIED\n");
    println!("Events:       {}", scan.events.len());
    println!("Live range:   {}..{}", scan.expire_pos, scan.write_pos);
    println!("State digest: {}\n", digest_hex(&mds.digest()));
    Ok(())
}

fn digest_hex(digest: &[u8; 32]) -> String {
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}
