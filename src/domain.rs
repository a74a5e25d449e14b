use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use camino::Utf8PathBuf;
use clap::ValueEnum;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::KiraError;

static S3_URI: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^s3://([a-z0-9][a-z0-9.\-]{1,61}[a-z0-9])(?:/(.*))?$").unwrap());

// ids are interpolated into screen file names
static SCREEN_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._\-]*$").unwrap());

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ScreenId(String);

impl ScreenId {
    /// Caller-supplied ids must be numeric.
    pub fn numeric(value: &str) -> Result<Self, KiraError> {
        let id: ScreenId = value.parse()?;
        if !id.0.chars().all(|ch| ch.is_ascii_digit()) {
            return Err(KiraError::InvalidScreenId(value.to_string()));
        }
        Ok(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScreenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ScreenId {
    type Err = KiraError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        // pandas float columns render integer ids as "101.0"
        let normalized = match trimmed.strip_suffix(".0") {
            Some(digits) if !digits.is_empty() && digits.chars().all(|ch| ch.is_ascii_digit()) => {
                digits
            }
            _ => trimmed,
        };
        if !SCREEN_ID.is_match(normalized) || normalized.contains("..") {
            return Err(KiraError::InvalidScreenId(value.to_string()));
        }
        Ok(Self(normalized.to_string()))
    }
}

impl From<u64> for ScreenId {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

impl TryFrom<String> for ScreenId {
    type Error = KiraError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ScreenId> for String {
    fn from(value: ScreenId) -> Self {
        value.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    Local(Utf8PathBuf),
    Remote(String),
}

impl Location {
    /// Parse a path, `http(s)://` URL or `s3://bucket/key` URI. S3 URIs map to
    /// the bucket's public virtual-hosted endpoint in `region`.
    pub fn parse(value: &str, region: &str) -> Result<Self, KiraError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(KiraError::InvalidLocation(value.to_string()));
        }
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            return Ok(Location::Remote(trimmed.to_string()));
        }
        if trimmed.starts_with("s3://") {
            let captures = S3_URI
                .captures(trimmed)
                .ok_or_else(|| KiraError::InvalidLocation(value.to_string()))?;
            let bucket = &captures[1];
            let key = captures.get(2).map(|m| m.as_str()).unwrap_or("");
            return Ok(Location::Remote(format!(
                "https://{bucket}.s3.{region}.amazonaws.com/{key}"
            )));
        }
        if trimmed.contains("://") {
            return Err(KiraError::InvalidLocation(value.to_string()));
        }
        Ok(Location::Local(Utf8PathBuf::from(trimmed)))
    }

    pub fn join(&self, file_name: &str) -> Location {
        match self {
            Location::Local(dir) => Location::Local(dir.join(file_name)),
            Location::Remote(prefix) if prefix.ends_with('/') => {
                Location::Remote(format!("{prefix}{file_name}"))
            }
            Location::Remote(prefix) => Location::Remote(format!("{prefix}/{file_name}")),
        }
    }

    pub fn parent(&self) -> Location {
        match self {
            Location::Local(path) => Location::Local(
                path.parent()
                    .map(|parent| parent.to_path_buf())
                    .unwrap_or_else(|| Utf8PathBuf::from(".")),
            ),
            Location::Remote(url) => {
                let trimmed = url.trim_end_matches('/');
                match trimmed.rsplit_once('/') {
                    Some((head, _)) if !head.ends_with('/') => Location::Remote(format!("{head}/")),
                    _ => Location::Remote(format!("{trimmed}/")),
                }
            }
        }
    }

    pub fn is_gzip(&self) -> bool {
        self.as_str().ends_with(".gz")
    }

    pub fn as_str(&self) -> &str {
        match self {
            Location::Local(path) => path.as_str(),
            Location::Remote(url) => url.as_str(),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum VocabularyKind {
    Conditions,
    CellLines,
    Organisms,
}

impl fmt::Display for VocabularyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VocabularyKind::Conditions => write!(f, "conditions"),
            VocabularyKind::CellLines => write!(f, "cell-lines"),
            VocabularyKind::Organisms => write!(f, "organisms"),
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn parse_screen_id_valid() {
        let id: ScreenId = " 101 ".parse().unwrap();
        assert_eq!(id.as_str(), "101");
        let id: ScreenId = "42.0".parse().unwrap();
        assert_eq!(id.as_str(), "42");
    }

    #[test]
    fn parse_screen_id_accepts_path_safe_names() {
        assert_eq!("ORCS-9".parse::<ScreenId>().unwrap().as_str(), "ORCS-9");
        assert_eq!("v1.0".parse::<ScreenId>().unwrap().as_str(), "v1.0");
        for raw in ["", "-", "../7", "a/b", "1..2", "x y"] {
            let err = raw.parse::<ScreenId>().unwrap_err();
            assert_matches!(err, KiraError::InvalidScreenId(_), "{raw}");
        }
    }

    #[test]
    fn numeric_screen_id_rejects_names() {
        assert_eq!(ScreenId::numeric("42.0").unwrap().as_str(), "42");
        let err = ScreenId::numeric("screen-7").unwrap_err();
        assert_matches!(err, KiraError::InvalidScreenId(_));
    }

    #[test]
    fn s3_uri_maps_to_https() {
        let loc = Location::parse("s3://bioinf-data/crispr/index.txt", "us-west-2").unwrap();
        assert_eq!(
            loc,
            Location::Remote(
                "https://bioinf-data.s3.us-west-2.amazonaws.com/crispr/index.txt".to_string()
            )
        );
    }

    #[test]
    fn join_and_parent() {
        let dir = Location::parse("https://host/data/SCREENS/", "us-west-2").unwrap();
        assert_eq!(dir.join("a.txt").as_str(), "https://host/data/SCREENS/a.txt");

        let index = Location::parse("https://host/data/index.txt", "us-west-2").unwrap();
        assert_eq!(index.parent().as_str(), "https://host/data/");

        let local = Location::parse("/srv/biogrid/index.tab.txt", "us-west-2").unwrap();
        assert_eq!(local.parent().join("x").as_str(), "/srv/biogrid/x");
    }

    #[test]
    fn unknown_scheme_rejected() {
        let err = Location::parse("ftp://host/file", "us-west-2").unwrap_err();
        assert_matches!(err, KiraError::InvalidLocation(_));
    }
}
