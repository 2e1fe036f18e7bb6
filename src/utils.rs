//! Utility functions shared by the optimizers and the binary.

use crate::error::Result;
use crate::result::Algorithm;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Duration;

/// Format a duration as hours, minutes, seconds and milliseconds.
pub fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.as_secs();
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!(
        "{}h {:02}m {:02}.{:03}s",
        hours,
        minutes,
        seconds,
        duration.subsec_millis()
    )
}

/// Round `value` to `decimals` decimal places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Random stream for one optimizer run.
///
/// Every (seller, algorithm) pair gets its own ChaCha stream of the master
/// seed, so a run draws the same numbers whether runs execute sequentially
/// or in parallel.
pub fn run_rng(master_seed: u64, seller_index: usize, algorithm: Algorithm) -> ChaCha8Rng {
    let mut rng = ChaCha8Rng::seed_from_u64(master_seed);
    rng.set_stream(seller_index as u64 * Algorithm::ALL.len() as u64 + algorithm.index());
    rng
}

/// Serialize `value` as pretty JSON into `path`.
pub fn save_json<T: Serialize, P: AsRef<Path>>(value: &T, path: P) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}
