use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum KiraError {
    #[error("data unavailable at {location}: {reason}")]
    DataUnavailable { location: String, reason: String },

    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error("invalid screen id: {0}")]
    InvalidScreenId(String),

    #[error("duplicate screen id in index: {0}")]
    DuplicateScreenId(String),

    #[error("{table} has no column `{column}`{hint}")]
    MissingColumn {
        table: String,
        column: String,
        hint: String,
    },

    #[error("invalid location: {0}")]
    InvalidLocation(String),

    #[error("remote request failed: {0}")]
    RemoteHttp(String),

    #[error("remote storage returned status {status}: {message}")]
    RemoteStatus { status: u16, message: String },

    #[error("missing config file kira-cs.json in current directory (or pass --index)")]
    MissingConfig,

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("unknown tool: {0}")]
    UnknownTool(String),
}

impl KiraError {
    pub fn unavailable(location: impl ToString, reason: impl ToString) -> Self {
        KiraError::DataUnavailable {
            location: location.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn missing_column<'a>(
        table: &str,
        column: &str,
        known: impl IntoIterator<Item = &'a String>,
    ) -> Self {
        let hint = closest_column(column, known)
            .map(|name| format!(" (did you mean `{name}`?)"))
            .unwrap_or_default();
        KiraError::MissingColumn {
            table: table.to_string(),
            column: column.to_string(),
            hint,
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, KiraError::RemoteHttp(_) | KiraError::RemoteStatus { .. })
    }
}

fn closest_column<'a>(needle: &str, known: impl IntoIterator<Item = &'a String>) -> Option<String> {
    const THRESHOLD: f64 = 0.55;

    let needle = needle.to_uppercase();
    let mut best: Option<(f64, &String)> = None;
    for candidate in known {
        let sim = strsim::normalized_levenshtein(&needle, &candidate.to_uppercase());
        if sim >= THRESHOLD && best.is_none_or(|(score, _)| sim > score) {
            best = Some((sim, candidate));
        }
    }
    best.map(|(_, name)| name.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_column_suggests_close_name() {
        let known = vec!["CELL_LINE".to_string(), "SCREEN_ID".to_string()];
        let err = KiraError::missing_column("index", "cell_lines", known.iter());
        assert_eq!(
            err.to_string(),
            "index has no column `cell_lines` (did you mean `CELL_LINE`?)"
        );
    }

    #[test]
    fn missing_column_without_candidate() {
        let known = vec!["SCREEN_ID".to_string()];
        let err = KiraError::missing_column("screen 7", "HIT", known.iter());
        assert_eq!(err.to_string(), "screen 7 has no column `HIT`");
    }
}
