use std::cmp::Ordering;
use std::fmt::Write as _;

use csv::ReaderBuilder;
use serde::ser::{Serialize, SerializeSeq, Serializer};
use serde_json::{Map, Number, Value};

use crate::error::KiraError;

pub type Cell = Option<String>;

const NULL_TOKENS: &[&str] = &["", "NA", "N/A", "NaN", "nan", "null", "NULL", "-"];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    columns: &'a [String],
    cells: &'a [Cell],
}

impl<'a> Row<'a> {
    pub fn get(&self, column: &str) -> Option<&'a str> {
        let idx = self.columns.iter().position(|name| name == column)?;
        self.cells.get(idx).and_then(|cell| cell.as_deref())
    }

    pub fn get_f64(&self, column: &str) -> Option<f64> {
        self.get(column).and_then(parse_number)
    }

    pub fn cells(&self) -> &'a [Cell] {
        self.cells
    }

    pub fn to_record(&self) -> Map<String, Value> {
        self.columns
            .iter()
            .zip(self.cells)
            .map(|(name, cell)| (name.clone(), cell_to_json(cell.as_deref())))
            .collect()
    }
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    pub fn push_row(&mut self, mut cells: Vec<Cell>) {
        cells.resize(self.columns.len(), None);
        self.rows.push(cells);
    }

    pub fn row(&self, idx: usize) -> Option<Row<'_>> {
        self.rows.get(idx).map(|cells| Row {
            columns: &self.columns,
            cells,
        })
    }

    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> {
        self.rows.iter().map(|cells| Row {
            columns: &self.columns,
            cells,
        })
    }

    pub fn column_values(&self, name: &str) -> Option<impl Iterator<Item = Option<&str>>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(move |row| row[idx].as_deref()))
    }

    pub fn filter(&self, mut keep: impl FnMut(&Row<'_>) -> bool) -> Table {
        let rows = self
            .rows()
            .filter(|row| keep(row))
            .map(|row| row.cells.to_vec())
            .collect();
        Table {
            columns: self.columns.clone(),
            rows,
        }
    }

    pub fn head(&self, n: usize) -> Table {
        Table {
            columns: self.columns.clone(),
            rows: self.rows.iter().take(n).cloned().collect(),
        }
    }

    pub fn with_constant_column(mut self, name: &str, value: Cell) -> Table {
        if self.has_column(name) {
            return self;
        }
        self.columns.push(name.to_string());
        for row in &mut self.rows {
            row.push(value.clone());
        }
        self
    }

    /// Stable sort by a numeric column, largest first; nulls and
    /// non-numeric values go last.
    pub fn sorted_desc_by(&self, column: &str) -> Table {
        let Some(idx) = self.column_index(column) else {
            return self.clone();
        };
        let mut rows = self.rows.clone();
        rows.sort_by(|a, b| {
            let a = a[idx].as_deref().and_then(parse_number);
            let b = b[idx].as_deref().and_then(parse_number);
            match (a, b) {
                (Some(a), Some(b)) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            }
        });
        Table {
            columns: self.columns.clone(),
            rows,
        }
    }

    /// Concatenate tables in order. Columns are unioned in first-seen order
    /// and cells a table does not have are null.
    pub fn concat(tables: impl IntoIterator<Item = Table>) -> Table {
        let mut out = Table::default();
        for table in tables {
            let mapping = table
                .columns
                .iter()
                .map(|name| match out.column_index(name) {
                    Some(idx) => idx,
                    None => {
                        out.columns.push(name.clone());
                        for row in &mut out.rows {
                            row.push(None);
                        }
                        out.columns.len() - 1
                    }
                })
                .collect::<Vec<_>>();
            for row in table.rows {
                let mut cells = vec![None; out.columns.len()];
                for (cell, &idx) in row.into_iter().zip(&mapping) {
                    cells[idx] = cell;
                }
                out.rows.push(cells);
            }
        }
        out
    }

    pub fn to_records(&self) -> Vec<Map<String, Value>> {
        self.rows().map(|row| row.to_record()).collect()
    }

    pub fn to_markdown(&self) -> String {
        if self.columns.is_empty() {
            return String::new();
        }
        let mut out = String::new();
        let header = self
            .columns
            .iter()
            .map(|name| escape_markdown(name))
            .collect::<Vec<_>>();
        let _ = writeln!(out, "| {} |", header.join(" | "));
        let _ = writeln!(
            out,
            "|{}|",
            vec![" --- "; self.columns.len()].join("|")
        );
        for row in &self.rows {
            let cells = row
                .iter()
                .map(|cell| cell.as_deref().map(escape_markdown).unwrap_or_default())
                .collect::<Vec<_>>();
            let _ = writeln!(out, "| {} |", cells.join(" | "));
        }
        out
    }

    /// Parse tab-separated text. The first non-blank line is the header,
    /// with any leading `#` markers stripped from it; later lines starting
    /// with `#` are comments and are dropped.
    pub fn parse_tsv(text: &str) -> Result<Table, KiraError> {
        let mut offset = 0;
        let mut header = None;
        for line in text.split_inclusive('\n') {
            offset += line.len();
            let trimmed = line.trim_end_matches(['\r', '\n']);
            if !trimmed.trim().is_empty() {
                header = Some(trimmed);
                break;
            }
        }
        let Some(header) = header else {
            return Ok(Table::default());
        };

        let columns = header
            .split('\t')
            .map(normalize_column_name)
            .collect::<Vec<_>>();
        let mut table = Table::new(columns);

        let mut reader = ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .flexible(true)
            .quoting(false)
            .comment(Some(b'#'))
            .from_reader(text[offset..].as_bytes());
        for record in reader.records() {
            let record = record.map_err(|err| KiraError::MalformedInput(err.to_string()))?;
            if record.iter().all(|field| field.trim().is_empty()) {
                continue;
            }
            table.push_row(record.iter().map(parse_cell).collect());
        }
        Ok(table)
    }
}

impl Serialize for Table {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.rows.len()))?;
        for row in self.rows() {
            seq.serialize_element(&row.to_record())?;
        }
        seq.end()
    }
}

pub fn normalize_column_name(raw: &str) -> String {
    raw.trim().trim_start_matches('#').trim().to_string()
}

fn parse_cell(raw: &str) -> Cell {
    let value = raw.trim_end_matches('\r');
    if NULL_TOKENS.contains(&value.trim()) {
        None
    } else {
        Some(value.to_string())
    }
}

pub fn parse_number(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn cell_to_json(cell: Option<&str>) -> Value {
    let Some(text) = cell else {
        return Value::Null;
    };
    let trimmed = text.trim();
    let leading_zero = trimmed.len() > 1 && trimmed.starts_with('0') && !trimmed.starts_with("0.");
    if !leading_zero {
        if let Ok(int) = trimmed.parse::<i64>() {
            return Value::Number(int.into());
        }
        if let Some(number) = parse_number(trimmed).and_then(Number::from_f64) {
            return Value::Number(number);
        }
    }
    Value::String(text.to_string())
}

fn escape_markdown(value: &str) -> String {
    value.replace('|', "\\|").replace('\n', " ")
}
