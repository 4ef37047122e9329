// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
pub mod config;
pub mod errors;
pub mod journal_file;
pub mod recovery;
pub mod telemetry;
