//! Collision-free object key resolution.
//!
//! `report.pdf` with suffix `.zip` becomes `report.pdf.zip`, then
//! `report_1.pdf.zip`, `report_2.pdf.zip`, ... while the candidate is taken.

use crate::services::inventory::MANIFEST_KEY;
use std::future::Future;

/// Split `filename` into `(base, extension)` at the last dot.
///
/// Leading dots belong to the base, so `.env` has no extension and
/// `..tar` keeps its dots.
pub fn split_extension(filename: &str) -> (&str, &str) {
    let lead = filename.len() - filename.trim_start_matches('.').len();
    match filename[lead..].rfind('.') {
        Some(idx) => filename.split_at(lead + idx),
        None => (filename, ""),
    }
}

/// Find the first key derived from `filename` + `suffix` for which `exists`
/// reports `false`.
///
/// The predicate is evaluated once per candidate, in order. The manifest key
/// is always treated as taken.
pub async fn resolve_key<F, Fut, E>(filename: &str, suffix: &str, mut exists: F) -> Result<String, E>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<bool, E>>,
{
    let desired = format!("{filename}{suffix}");
    if !is_taken(&desired, &mut exists).await? {
        return Ok(desired);
    }

    let (base, ext) = split_extension(filename);
    let mut counter: u64 = 1;
    loop {
        let candidate = format!("{base}_{counter}{ext}{suffix}");
        if !is_taken(&candidate, &mut exists).await? {
            return Ok(candidate);
        }
        counter += 1;
    }
}

async fn is_taken<F, Fut, E>(key: &str, exists: &mut F) -> Result<bool, E>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<bool, E>>,
{
    if key == MANIFEST_KEY {
        return Ok(true);
    }
    exists(key.to_string()).await
}
