use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use serde_json::{Value, json};

use crate::app::App;
use crate::domain::{ScreenId, VocabularyKind};
use crate::error::KiraError;
use crate::index::Vocabularies;
use crate::source::DataSource;

pub const SCREEN_QUERY_ROW_LIMIT: usize = 100;
const PREVIEW_VALUES: usize = 5;
const PROMPT_VALUES: usize = 10;

static LIST_SEPARATOR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[,;\s]+").unwrap());

type Handler<S> = fn(&App<S>, &Value) -> Result<Value, KiraError>;

#[derive(Debug, Clone, Serialize)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: String,
    pub input_schema: Value,
}

struct Tool<S: DataSource> {
    spec: ToolSpec,
    handler: Handler<S>,
}

pub struct ToolRegistry<'a, S: DataSource> {
    app: &'a App<S>,
    tools: Vec<Tool<S>>,
}

impl<'a, S: DataSource> ToolRegistry<'a, S> {
    pub fn new(app: &'a App<S>) -> Self {
        let vocab = app.vocabularies();
        let tools = vec![
            Tool {
                spec: ToolSpec {
                    name: "GeneQuery",
                    description: format!(
                        "Retrieve CRISPR screen results for a given gene symbol or list of symbols. \
                         Valid viruses: {}... Valid cell lines: {}... Valid species: {}... \
                         Use the List tools for full options.",
                        preview(&vocab.conditions, PREVIEW_VALUES),
                        preview(&vocab.cell_lines, PREVIEW_VALUES),
                        preview(&vocab.organisms, PREVIEW_VALUES),
                    ),
                    input_schema: one_or_many_schema("string", "Official gene symbol(s)"),
                },
                handler: gene_query::<S>,
            },
            Tool {
                spec: ToolSpec {
                    name: "ScreenQuery",
                    description: format!(
                        "Retrieve up to the first {SCREEN_QUERY_ROW_LIMIT} CRISPR screen results \
                         for a given SCREEN_ID or list of SCREEN_IDs, formatted as a markdown table."
                    ),
                    input_schema: one_or_many_schema("integer", "Screen id(s)"),
                },
                handler: screen_query::<S>,
            },
            Tool {
                spec: ToolSpec {
                    name: "ConditionQuery",
                    description: format!(
                        "Retrieve CRISPR screen results for a given virus or condition name \
                         (fuzzy matching supported). Valid viruses: {}...",
                        preview(&vocab.conditions, PREVIEW_VALUES),
                    ),
                    input_schema: json!({
                        "type": "string",
                        "description": "Virus or condition name",
                    }),
                },
                handler: condition_query::<S>,
            },
            list_tool(
                "ListViruses",
                "List all valid virus names for CRISPR screens.",
                list_viruses::<S>,
            ),
            list_tool(
                "ListCellLines",
                "List all valid cell line names for CRISPR screens.",
                list_cell_lines::<S>,
            ),
            list_tool(
                "ListSpecies",
                "List all valid species names for CRISPR screens.",
                list_species::<S>,
            ),
        ];
        Self { app, tools }
    }

    pub fn specs(&self) -> Vec<&ToolSpec> {
        self.tools.iter().map(|tool| &tool.spec).collect()
    }

    pub fn invoke(&self, name: &str, input: &Value) -> Result<Value, KiraError> {
        let tool = self
            .tools
            .iter()
            .find(|tool| tool.spec.name == name)
            .ok_or_else(|| KiraError::UnknownTool(name.to_string()))?;
        (tool.handler)(self.app, input)
    }
}

pub fn system_prompt(vocab: &Vocabularies) -> String {
    format!(
        "You are an expert CRISPR screen data agent. \
         The valid options for virus are: {}... \
         The valid options for cell line are: {}... \
         The valid options for species are: {}... \
         When a user asks for a result, always map their input to the closest valid value. \
         If unsure, use the List tools to clarify the options. \
         If a user asks a question that is not about CRISPR screen data, or is unsafe, \
         politely refuse to answer.",
        preview(&vocab.conditions, PROMPT_VALUES),
        preview(&vocab.cell_lines, PROMPT_VALUES),
        preview(&vocab.organisms, PROMPT_VALUES),
    )
}

fn list_tool<S: DataSource>(name: &'static str, description: &str, handler: Handler<S>) -> Tool<S> {
    Tool {
        spec: ToolSpec {
            name,
            description: description.to_string(),
            input_schema: json!({ "type": "null" }),
        },
        handler,
    }
}

fn gene_query<S: DataSource>(app: &App<S>, input: &Value) -> Result<Value, KiraError> {
    let genes = string_list(input, "gene symbol")?;
    let rows = app.results_by_genes(&genes)?;
    Ok(Value::Array(rows.to_records().into_iter().map(Value::Object).collect()))
}

fn screen_query<S: DataSource>(app: &App<S>, input: &Value) -> Result<Value, KiraError> {
    let ids = screen_ids(input)?;
    let rows = app.results_by_screens(&ids)?;
    Ok(Value::String(rows.head(SCREEN_QUERY_ROW_LIMIT).to_markdown()))
}

fn condition_query<S: DataSource>(app: &App<S>, input: &Value) -> Result<Value, KiraError> {
    let query = input
        .as_str()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| KiraError::MalformedInput("condition query must be a string".to_string()))?;
    let results = app.results_by_condition(query)?;
    Ok(Value::Array(
        results
            .rows
            .to_records()
            .into_iter()
            .map(Value::Object)
            .collect(),
    ))
}

fn list_viruses<S: DataSource>(app: &App<S>, _input: &Value) -> Result<Value, KiraError> {
    Ok(json!(app.vocabulary(VocabularyKind::Conditions)))
}

fn list_cell_lines<S: DataSource>(app: &App<S>, _input: &Value) -> Result<Value, KiraError> {
    Ok(json!(app.vocabulary(VocabularyKind::CellLines)))
}

fn list_species<S: DataSource>(app: &App<S>, _input: &Value) -> Result<Value, KiraError> {
    Ok(json!(app.vocabulary(VocabularyKind::Organisms)))
}

fn one_or_many_schema(item_type: &str, description: &str) -> Value {
    json!({
        "description": description,
        "oneOf": [
            { "type": item_type },
            { "type": "array", "items": { "type": item_type }, "minItems": 1 },
        ],
    })
}

fn preview(values: &[String], n: usize) -> String {
    values
        .iter()
        .take(n)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

fn string_list(input: &Value, what: &str) -> Result<Vec<String>, KiraError> {
    let malformed = || KiraError::MalformedInput(format!("expected a {what} or a list of them"));
    let values = match input {
        Value::String(value) => vec![value.trim().to_string()],
        Value::Array(items) => items
            .iter()
            .map(|item| item.as_str().map(|s| s.trim().to_string()).ok_or_else(malformed))
            .collect::<Result<Vec<_>, _>>()?,
        _ => return Err(malformed()),
    };
    if values.is_empty() || values.iter().any(String::is_empty) {
        return Err(malformed());
    }
    Ok(values)
}

/// Screen ids from a number, a string (comma or space separated) or an array
/// of either.
fn screen_ids(input: &Value) -> Result<Vec<ScreenId>, KiraError> {
    fn one(value: &Value, out: &mut Vec<ScreenId>) -> Result<(), KiraError> {
        match value {
            Value::Number(number) => {
                let id = number
                    .as_u64()
                    .ok_or_else(|| KiraError::InvalidScreenId(number.to_string()))?;
                out.push(ScreenId::from(id));
            }
            Value::String(text) => {
                for part in LIST_SEPARATOR.split(text.trim()).filter(|p| !p.is_empty()) {
                    out.push(ScreenId::numeric(part)?);
                }
            }
            other => return Err(KiraError::InvalidScreenId(other.to_string())),
        }
        Ok(())
    }

    let mut ids = Vec::new();
    match input {
        Value::Array(items) => {
            for item in items {
                one(item, &mut ids)?;
            }
        }
        other => one(other, &mut ids)?,
    }
    if ids.is_empty() {
        return Err(KiraError::MalformedInput("no screen id given".to_string()));
    }
    Ok(ids)
}
