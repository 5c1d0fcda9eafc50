//! Utility functions shared across the crate.

use std::path::PathBuf;

/// Get the user's config directory following XDG conventions.
///
/// Returns `$XDG_CONFIG_HOME` if set, otherwise `$HOME/.config`.
pub fn config_dir() -> Option<PathBuf> {
    std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))
}

/// Normalize a user-supplied download name.
///
/// Blank names fall back to `default`; a `.pdf` extension is appended
/// when missing (checked case-insensitively).
pub fn output_filename(requested: Option<&str>, default: &str) -> String {
    let name = requested.map(str::trim).unwrap_or_default();
    if name.is_empty() {
        return default.to_string();
    }
    if name.to_ascii_lowercase().ends_with(".pdf") {
        name.to_string()
    } else {
        format!("{name}.pdf")
    }
}
