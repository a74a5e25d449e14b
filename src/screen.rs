use std::collections::HashSet;

use tracing::debug;

use crate::domain::ScreenId;
use crate::error::KiraError;
use crate::source::{DataSource, fetch_text};
use crate::store::Store;
use crate::table::Table;

#[derive(Debug, Clone, PartialEq)]
pub struct ScoreThreshold {
    pub column: String,
    pub max: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScreenFilter {
    pub gene_symbols: Option<HashSet<String>>,
    pub hit_value: Option<String>,
    pub score_max: Option<ScoreThreshold>,
}

impl ScreenFilter {
    pub fn genes<I, T>(symbols: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            gene_symbols: Some(symbols.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    pub fn hits(hit_value: &str) -> Self {
        Self {
            hit_value: Some(hit_value.to_string()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.gene_symbols.is_none() && self.hit_value.is_none() && self.score_max.is_none()
    }

    pub fn validate(&self) -> Result<(), KiraError> {
        if self.gene_symbols.as_ref().is_some_and(HashSet::is_empty) {
            return Err(KiraError::MalformedInput(
                "gene symbol filter needs at least one symbol".to_string(),
            ));
        }
        if let Some(threshold) = &self.score_max {
            if threshold.column.trim().is_empty() {
                return Err(KiraError::MalformedInput(
                    "score threshold needs a column name".to_string(),
                ));
            }
            if threshold.max.is_nan() {
                return Err(KiraError::MalformedInput(
                    "score threshold must be a number".to_string(),
                ));
            }
        }
        Ok(())
    }

    fn apply(&self, table: &Table, symbol_column: &str, hit_column: &str) -> Table {
        table.filter(|row| {
            let genes = self.gene_symbols.as_ref().is_none_or(|symbols| {
                row.get(symbol_column)
                    .is_some_and(|symbol| symbols.contains(symbol))
            });
            let hit = self
                .hit_value
                .as_deref()
                .is_none_or(|wanted| row.get(hit_column) == Some(wanted));
            let score = self.score_max.as_ref().is_none_or(|threshold| {
                row.get_f64(&threshold.column)
                    .is_some_and(|value| value <= threshold.max)
            });
            genes && hit && score
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScreenRead {
    Found(Table),
    Missing,
}

impl ScreenRead {
    pub fn is_missing(&self) -> bool {
        matches!(self, ScreenRead::Missing)
    }

    pub fn into_table(self) -> Table {
        match self {
            ScreenRead::Found(table) => table,
            ScreenRead::Missing => Table::default(),
        }
    }
}

pub struct ScreenReader<'a> {
    source: &'a dyn DataSource,
    store: &'a Store,
    id_column: &'a str,
    symbol_column: &'a str,
    hit_column: &'a str,
}

impl<'a> ScreenReader<'a> {
    pub fn new(
        source: &'a dyn DataSource,
        store: &'a Store,
        id_column: &'a str,
        symbol_column: &'a str,
        hit_column: &'a str,
    ) -> Self {
        Self {
            source,
            store,
            id_column,
            symbol_column,
            hit_column,
        }
    }

    pub fn read(&self, id: &ScreenId, filter: &ScreenFilter) -> Result<ScreenRead, KiraError> {
        filter.validate()?;
        let location = self.store.screen_location(id);
        let Some(text) = fetch_text(self.source, &location)? else {
            debug!(screen = %id, location = %location, "screen file missing");
            return Ok(ScreenRead::Missing);
        };
        let table =
            Table::parse_tsv(&text).map_err(|err| KiraError::unavailable(&location, err))?;
        self.check_columns(id, &table, filter)?;

        let table = if filter.is_empty() {
            table
        } else {
            filter.apply(&table, self.symbol_column, self.hit_column)
        };
        debug!(screen = %id, rows = table.len(), "read screen");
        Ok(ScreenRead::Found(
            table.with_constant_column(self.id_column, Some(id.to_string())),
        ))
    }

    fn check_columns(
        &self,
        id: &ScreenId,
        table: &Table,
        filter: &ScreenFilter,
    ) -> Result<(), KiraError> {
        let mut required = Vec::new();
        if filter.gene_symbols.is_some() {
            required.push(self.symbol_column);
        }
        if filter.hit_value.is_some() {
            required.push(self.hit_column);
        }
        if let Some(threshold) = &filter.score_max {
            required.push(threshold.column.as_str());
        }
        for column in required {
            if !table.has_column(column) {
                return Err(KiraError::missing_column(
                    &format!("screen {id}"),
                    column,
                    table.columns(),
                ));
            }
        }
        Ok(())
    }
}
