use std::ffi::OsString;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde::Serialize;

pub fn report_timestamp(ts: DateTime<Local>) -> String {
    ts.format("%Y/%m/%d %H:%M:%S").to_string()
}

pub fn now_report_timestamp() -> String {
    report_timestamp(Local::now())
}

/// Renders a ratio as a percentage without float noise (`0.7` -> `70`).
pub fn format_ratio_percent(ratio: f64) -> String {
    let scaled = (ratio * 10_000.0).round() / 100.0;
    let text = format!("{scaled:.2}");
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}

pub fn ensure_directory(path: &Path) -> Result<()> {
    fs::create_dir_all(path)
        .with_context(|| format!("failed to create directory: {}", path.display()))
}

/// Runs `write` against a sibling partial file and renames it over `path`.
///
/// A failed write removes the partial file and leaves `path` untouched.
pub fn write_atomically<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&Path) -> Result<()>,
{
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        ensure_directory(parent)?;
    }

    let partial = partial_path(path);
    if let Err(err) = write(&partial) {
        let _ = fs::remove_file(&partial);
        return Err(err);
    }

    if let Err(err) = fs::rename(&partial, path) {
        let _ = fs::remove_file(&partial);
        return Err(anyhow::Error::new(err)
            .context(format!("failed to move file into place: {}", path.display())));
    }
    Ok(())
}

/// `dir/report.xlsx` -> `dir/.partial-report.xlsx`
fn partial_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(".partial-");
    name.push(path.file_name().unwrap_or(path.as_os_str()));
    path.with_file_name(name)
}

pub fn write_json_pretty<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let data = serde_json::to_vec_pretty(value)
        .with_context(|| format!("failed to serialize json: {}", path.display()))?;

    write_atomically(path, |partial| {
        let mut file = File::create(partial)
            .with_context(|| format!("failed to create json file: {}", partial.display()))?;
        file.write_all(&data)
            .with_context(|| format!("failed to write json file: {}", partial.display()))?;
        file.write_all(b"\n")
            .with_context(|| format!("failed to finalize json file: {}", partial.display()))?;
        file.sync_all()
            .with_context(|| format!("failed to flush json file: {}", partial.display()))?;
        Ok(())
    })
}
