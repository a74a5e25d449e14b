use serde::Serialize;
use tracing::debug;

use crate::config::validate_threshold;
use crate::domain::ScreenId;
use crate::error::KiraError;
use crate::fuzzy;
use crate::index::IndexTable;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConditionMatch {
    Exact {
        screens: Vec<ScreenId>,
    },
    Approximate {
        value: String,
        score: f64,
        screens: Vec<ScreenId>,
    },
    NoMatch {
        best: Option<String>,
        score: Option<f64>,
    },
}

impl ConditionMatch {
    pub fn screens(&self) -> &[ScreenId] {
        match self {
            ConditionMatch::Exact { screens } | ConditionMatch::Approximate { screens, .. } => {
                screens
            }
            ConditionMatch::NoMatch { .. } => &[],
        }
    }

    pub fn is_match(&self) -> bool {
        !matches!(self, ConditionMatch::NoMatch { .. })
    }
}

pub struct ConditionMatcher<'a> {
    index: &'a IndexTable,
    column: &'a str,
    threshold: f64,
}

impl<'a> ConditionMatcher<'a> {
    pub fn new(index: &'a IndexTable, column: &'a str, threshold: f64) -> Result<Self, KiraError> {
        validate_threshold(threshold)?;
        index.require_column(column)?;
        Ok(Self {
            index,
            column,
            threshold,
        })
    }

    pub fn resolve(&self, query: &str) -> ConditionMatch {
        let needle = query.to_lowercase();
        let exact = self.index.screens_where(|row| {
            row.get(self.column)
                .is_some_and(|value| value.to_lowercase() == needle)
        });
        if !exact.is_empty() {
            debug!(query, screens = exact.len(), "exact condition match");
            return ConditionMatch::Exact { screens: exact };
        }

        let vocabulary = self.index.vocabulary(self.column);
        let Some((best, score)) = fuzzy::extract_one(query, vocabulary.iter().map(String::as_str))
        else {
            return ConditionMatch::NoMatch {
                best: None,
                score: None,
            };
        };

        if score > self.threshold {
            let screens = self
                .index
                .screens_where(|row| row.get(self.column) == Some(best));
            debug!(query, value = best, score, "approximate condition match");
            ConditionMatch::Approximate {
                value: best.to_string(),
                score,
                screens,
            }
        } else {
            debug!(query, value = best, score, threshold = self.threshold, "no condition match");
            ConditionMatch::NoMatch {
                best: Some(best.to_string()),
                score: Some(score),
            }
        }
    }
}
