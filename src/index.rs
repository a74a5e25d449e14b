use std::collections::{HashMap, HashSet};

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::config::ColumnNames;
use crate::domain::{Location, ScreenId, VocabularyKind};
use crate::error::KiraError;
use crate::source::{DataSource, fetch_text};
use crate::table::{Row, Table};

const SCORE_TYPE_SLOTS: usize = 5;

#[derive(Debug, Clone)]
pub struct IndexTable {
    table: Table,
    ids: Vec<ScreenId>,
    positions: HashMap<ScreenId, usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Vocabularies {
    pub conditions: Vec<String>,
    pub cell_lines: Vec<String>,
    pub organisms: Vec<String>,
}

impl Vocabularies {
    pub fn get(&self, kind: VocabularyKind) -> &[String] {
        match kind {
            VocabularyKind::Conditions => &self.conditions,
            VocabularyKind::CellLines => &self.cell_lines,
            VocabularyKind::Organisms => &self.organisms,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignificanceCriteria {
    pub indicator: Option<String>,
    pub criteria: Option<String>,
    pub score_types: Vec<String>,
}

impl SignificanceCriteria {
    pub fn explain(&self) -> String {
        format!(
            "Hits are defined by: {} with criteria: {}. Score columns: [{}]",
            self.indicator.as_deref().unwrap_or("not reported"),
            self.criteria.as_deref().unwrap_or("not reported"),
            self.score_types.join(", ")
        )
    }
}

impl IndexTable {
    pub fn load(
        source: &dyn DataSource,
        location: &Location,
        id_column: &str,
    ) -> Result<Self, KiraError> {
        let text = fetch_text(source, location)?
            .ok_or_else(|| KiraError::unavailable(location, "index file not found"))?;
        let table = Table::parse_tsv(&text)
            .map_err(|err| KiraError::unavailable(location, err))?;
        let index = Self::from_table(table, id_column)?;
        info!(location = %location, screens = index.len(), "loaded screen index");
        Ok(index)
    }

    /// Rows without a usable id are dropped with a warning; repeated ids are
    /// an error.
    pub fn from_table(table: Table, id_column: &str) -> Result<Self, KiraError> {
        if !table.has_column(id_column) {
            return Err(KiraError::missing_column("index", id_column, table.columns()));
        }

        let mut kept = Table::new(table.columns().to_vec());
        let mut ids = Vec::with_capacity(table.len());
        let mut positions = HashMap::with_capacity(table.len());
        for (line, row) in table.rows().enumerate() {
            let id = match row.get(id_column).map(str::parse::<ScreenId>) {
                Some(Ok(id)) => id,
                Some(Err(err)) => {
                    warn!(row = line + 1, error = %err, "skipping index row");
                    continue;
                }
                None => {
                    warn!(row = line + 1, column = id_column, "skipping index row without id");
                    continue;
                }
            };
            if positions.insert(id.clone(), ids.len()).is_some() {
                return Err(KiraError::DuplicateScreenId(id.to_string()));
            }
            ids.push(id);
            kept.push_row(row.cells().to_vec());
        }

        Ok(Self {
            table: kept,
            ids,
            positions,
        })
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn screen_ids(&self) -> &[ScreenId] {
        &self.ids
    }

    pub fn row(&self, id: &ScreenId) -> Option<Row<'_>> {
        self.positions.get(id).and_then(|&idx| self.table.row(idx))
    }

    pub fn metadata(&self, id: &ScreenId) -> Option<Map<String, Value>> {
        self.row(id).map(|row| row.to_record())
    }

    pub fn require_column(&self, column: &str) -> Result<(), KiraError> {
        if self.table.has_column(column) {
            Ok(())
        } else {
            Err(KiraError::missing_column("index", column, self.table.columns()))
        }
    }

    pub fn vocabulary(&self, column: &str) -> Vec<String> {
        let Some(values) = self.table.column_values(column) else {
            return Vec::new();
        };
        let mut seen = HashSet::new();
        values
            .flatten()
            .filter(|value| seen.insert(*value))
            .map(str::to_string)
            .collect()
    }

    pub fn vocabularies(&self, columns: &ColumnNames) -> Vocabularies {
        Vocabularies {
            conditions: self.vocabulary(&columns.condition),
            cell_lines: self.vocabulary(&columns.cell_line),
            organisms: self.vocabulary(&columns.organism),
        }
    }

    pub fn screens_where(&self, mut keep: impl FnMut(&Row<'_>) -> bool) -> Vec<ScreenId> {
        self.ids
            .iter()
            .zip(self.table.rows())
            .filter(|(_, row)| keep(row))
            .map(|(id, _)| id.clone())
            .collect()
    }

    pub fn filter_screens(&self, filters: &[(String, String)]) -> Result<Vec<ScreenId>, KiraError> {
        for (column, _) in filters {
            self.require_column(column)?;
        }
        Ok(self.screens_where(|row| {
            filters
                .iter()
                .all(|(column, value)| row.get(column) == Some(value.as_str()))
        }))
    }

    pub fn significance(
        &self,
        id: &ScreenId,
        columns: &ColumnNames,
    ) -> Option<SignificanceCriteria> {
        let row = self.row(id)?;
        let score_types = (1..=SCORE_TYPE_SLOTS)
            .filter_map(|slot| row.get(&format!("SCORE.{slot}_TYPE")))
            .map(str::to_string)
            .collect();
        Some(SignificanceCriteria {
            indicator: row.get(&columns.significance_indicator).map(str::to_string),
            criteria: row.get(&columns.significance_criteria).map(str::to_string),
            score_types,
        })
    }
}
