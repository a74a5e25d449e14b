use serde::Serialize;
use serde_json::{Map, Value};

use crate::domain::ScreenId;
use crate::index::SignificanceCriteria;
use crate::table::Table;

#[derive(Debug, Clone, Serialize)]
pub struct ScreenSummary {
    pub screen_id: ScreenId,
    pub metadata: Map<String, Value>,
    pub criteria: Option<SignificanceCriteria>,
    pub explanation: String,
    pub num_hits: usize,
    pub top_hits: Table,
}

pub const NO_CRITERIA: &str = "No criteria found.";

impl ScreenSummary {
    pub fn to_markdown(&self) -> String {
        let mut out = format!(
            "## Screen {}: {} hits\n\n{}\n\n",
            self.screen_id, self.num_hits, self.explanation
        );
        if self.top_hits.is_empty() {
            out.push_str("_no hits_\n");
        } else {
            out.push_str(&self.top_hits.to_markdown());
        }
        out
    }
}

pub fn to_markdown(summaries: &[ScreenSummary]) -> String {
    if summaries.is_empty() {
        return "_no matching screens_\n".to_string();
    }
    summaries
        .iter()
        .map(ScreenSummary::to_markdown)
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn top_hits(hits: &Table, score_column: &str, n: usize) -> Table {
    hits.sorted_desc_by(score_column).head(n)
}

pub fn explanation(criteria: Option<&SignificanceCriteria>) -> String {
    criteria
        .map(SignificanceCriteria::explain)
        .unwrap_or_else(|| NO_CRITERIA.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn top_hits_are_highest_first() {
        let mut rows = String::from("OFFICIAL_SYMBOL\tSCORE.1\n");
        for i in 0..15 {
            rows.push_str(&format!("G{i}\t{i}\n"));
        }
        let table = Table::parse_tsv(&rows).unwrap();
        let top = top_hits(&table, "SCORE.1", 10);
        assert_eq!(top.len(), 10);
        assert_eq!(top.row(0).unwrap().get("OFFICIAL_SYMBOL"), Some("G14"));
        assert_eq!(top.row(9).unwrap().get("OFFICIAL_SYMBOL"), Some("G5"));
    }

    fn summary(id: u64, hits: &str) -> ScreenSummary {
        let top_hits = Table::parse_tsv(hits).unwrap();
        ScreenSummary {
            screen_id: ScreenId::from(id),
            metadata: Map::new(),
            criteria: None,
            explanation: NO_CRITERIA.to_string(),
            num_hits: top_hits.len(),
            top_hits,
        }
    }

    #[test]
    fn summaries_render_as_markdown_sections() {
        let text = to_markdown(&[
            summary(1, "OFFICIAL_SYMBOL\tSCORE.1\nTP53\t3.2\n"),
            summary(2, "OFFICIAL_SYMBOL\tSCORE.1\n"),
        ]);
        assert_eq!(
            text,
            "## Screen 1: 1 hits\n\nNo criteria found.\n\n\
| OFFICIAL_SYMBOL | SCORE.1 |\n| --- | --- |\n| TP53 | 3.2 |\n\
\n## Screen 2: 0 hits\n\nNo criteria found.\n\n_no hits_\n"
        );
        assert_eq!(to_markdown(&[]), "_no matching screens_\n");
    }

    #[test]
    fn missing_criteria_message() {
        assert_eq!(explanation(None), "No criteria found.");
    }
}
