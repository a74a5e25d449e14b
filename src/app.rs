use serde::Serialize;
use tracing::{info, warn};

use crate::config::ResolvedConfig;
use crate::domain::{ScreenId, VocabularyKind};
use crate::error::KiraError;
use crate::index::{IndexTable, Vocabularies};
use crate::matcher::{ConditionMatch, ConditionMatcher};
use crate::screen::{ScoreThreshold, ScreenFilter, ScreenRead, ScreenReader};
use crate::source::DataSource;
use crate::store::Store;
use crate::summary::{self, ScreenSummary};
use crate::table::Table;

#[derive(Debug, Clone, Serialize)]
pub struct ConditionResults {
    pub query: String,
    #[serde(rename = "match")]
    pub matched: ConditionMatch,
    pub rows: Table,
}

pub struct App<S: DataSource> {
    config: ResolvedConfig,
    store: Store,
    source: S,
    index: IndexTable,
    vocabularies: Vocabularies,
}

impl<S: DataSource> App<S> {
    pub fn load(config: ResolvedConfig, source: S) -> Result<Self, KiraError> {
        let store = Store::new(config.layout.clone());
        let index = IndexTable::load(&source, store.index_location(), &config.columns.screen_id)?;
        Ok(Self::with_index(config, source, index))
    }

    pub fn with_index(config: ResolvedConfig, source: S, index: IndexTable) -> Self {
        let store = Store::new(config.layout.clone());
        let vocabularies = index.vocabularies(&config.columns);
        info!(
            conditions = vocabularies.conditions.len(),
            cell_lines = vocabularies.cell_lines.len(),
            organisms = vocabularies.organisms.len(),
            "vocabularies ready"
        );
        Self {
            config,
            store,
            source,
            index,
            vocabularies,
        }
    }

    pub fn config(&self) -> &ResolvedConfig {
        &self.config
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn index(&self) -> &IndexTable {
        &self.index
    }

    pub fn vocabularies(&self) -> &Vocabularies {
        &self.vocabularies
    }

    pub fn vocabulary(&self, kind: VocabularyKind) -> &[String] {
        self.vocabularies.get(kind)
    }

    pub fn score_threshold(&self, max: f64) -> ScoreThreshold {
        ScoreThreshold {
            column: self.config.columns.score_filter.clone(),
            max,
        }
    }

    pub fn read_screen(&self, id: &ScreenId, filter: &ScreenFilter) -> Result<ScreenRead, KiraError> {
        self.reader().read(id, filter)
    }

    pub fn resolve_condition(&self, query: &str) -> Result<ConditionMatch, KiraError> {
        self.resolve_condition_with(query, self.config.condition_threshold)
    }

    pub fn resolve_condition_with(
        &self,
        query: &str,
        threshold: f64,
    ) -> Result<ConditionMatch, KiraError> {
        let matcher = ConditionMatcher::new(&self.index, &self.config.columns.condition, threshold)?;
        Ok(matcher.resolve(query))
    }

    pub fn results_by_genes<T: AsRef<str>>(&self, genes: &[T]) -> Result<Table, KiraError> {
        let filter = ScreenFilter::genes(genes.iter().map(|gene| gene.as_ref().to_string()));
        filter.validate()?;

        let reader = self.reader();
        let mut parts = Vec::new();
        for id in self.index.screen_ids() {
            let Some(rows) = self.read_for_aggregate(&reader, id, &filter)? else {
                continue;
            };
            parts.push(self.enrich(rows, id));
        }
        Ok(Table::concat(parts))
    }

    pub fn results_by_screens(&self, ids: &[ScreenId]) -> Result<Table, KiraError> {
        let reader = self.reader();
        let filter = ScreenFilter::default();
        let mut parts = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(rows) = self.read_for_aggregate(&reader, id, &filter)? {
                parts.push(rows);
            }
        }
        Ok(Table::concat(parts))
    }

    pub fn results_by_condition(&self, query: &str) -> Result<ConditionResults, KiraError> {
        self.results_by_condition_with(query, self.config.condition_threshold)
    }

    pub fn results_by_condition_with(
        &self,
        query: &str,
        threshold: f64,
    ) -> Result<ConditionResults, KiraError> {
        let matched = self.resolve_condition_with(query, threshold)?;
        let rows = self.results_by_screens(matched.screens())?;
        Ok(ConditionResults {
            query: query.to_string(),
            matched,
            rows,
        })
    }

    pub fn hits(&self, id: &ScreenId) -> Result<ScreenRead, KiraError> {
        self.read_screen(id, &ScreenFilter::hits(&self.config.hit_value))
    }

    pub fn gene_rows(&self, id: &ScreenId, symbol: &str) -> Result<ScreenRead, KiraError> {
        self.read_screen(id, &ScreenFilter::genes([symbol]))
    }

    pub fn summarize_screen(&self, id: &ScreenId) -> Result<Option<ScreenSummary>, KiraError> {
        let hits = match self.hits(id)? {
            ScreenRead::Found(hits) => hits,
            ScreenRead::Missing => return Ok(None),
        };
        let criteria = self.index.significance(id, &self.config.columns);
        Ok(Some(ScreenSummary {
            screen_id: id.clone(),
            metadata: self.index.metadata(id).unwrap_or_default(),
            explanation: summary::explanation(criteria.as_ref()),
            criteria,
            num_hits: hits.len(),
            top_hits: summary::top_hits(
                &hits,
                &self.config.columns.top_hits_score,
                self.config.top_hits,
            ),
        }))
    }

    pub fn explain_significance(&self, id: &ScreenId) -> String {
        summary::explanation(self.index.significance(id, &self.config.columns).as_ref())
    }

    pub fn screens_by_metadata(
        &self,
        filters: &[(String, String)],
    ) -> Result<Vec<ScreenSummary>, KiraError> {
        let ids = self.index.filter_screens(filters)?;
        let mut summaries = Vec::new();
        for id in &ids {
            match self.summarize_screen(id) {
                Ok(Some(summary)) => summaries.push(summary),
                Ok(None) => {}
                Err(err) if err.is_remote() => return Err(err),
                Err(err) => warn!(screen = %id, error = %err, "skipping screen"),
            }
        }
        Ok(summaries)
    }

    fn reader(&self) -> ScreenReader<'_> {
        let columns = &self.config.columns;
        ScreenReader::new(
            &self.source,
            &self.store,
            &columns.screen_id,
            &columns.official_symbol,
            &columns.hit,
        )
    }

    /// One screen's contribution to an aggregate. Missing files and broken
    /// screen data contribute nothing; remote storage failures abort.
    fn read_for_aggregate(
        &self,
        reader: &ScreenReader<'_>,
        id: &ScreenId,
        filter: &ScreenFilter,
    ) -> Result<Option<Table>, KiraError> {
        match reader.read(id, filter) {
            Ok(ScreenRead::Found(table)) if !table.is_empty() => Ok(Some(table)),
            Ok(_) => Ok(None),
            Err(err) if err.is_remote() => Err(err),
            Err(err) => {
                warn!(screen = %id, error = %err, "skipping screen");
                Ok(None)
            }
        }
    }

    fn enrich(&self, rows: Table, id: &ScreenId) -> Table {
        let Some(meta) = self.index.row(id) else {
            return rows;
        };
        self.index
            .table()
            .columns()
            .iter()
            .fold(rows, |rows, column| {
                rows.with_constant_column(column, meta.get(column).map(str::to_string))
            })
    }
}
