use std::io::{self, Write};

use clap::ValueEnum;
use serde::Serialize;

use crate::table::Table;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Markdown,
}

#[derive(Debug, Serialize)]
pub struct Report<'a, T: Serialize> {
    pub tool: String,
    pub generated_at: String,
    pub command: &'a str,
    pub result: &'a T,
}

impl<'a, T: Serialize> Report<'a, T> {
    pub fn new(command: &'a str, result: &'a T) -> Self {
        Self {
            tool: format!("kira-cs/{}", env!("CARGO_PKG_VERSION")),
            generated_at: chrono::Utc::now().to_rfc3339(),
            command,
            result,
        }
    }
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_report<T: Serialize>(command: &str, result: &T) -> io::Result<()> {
        Self::print_json(&Report::new(command, result))
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

pub struct MarkdownOutput;

impl MarkdownOutput {
    pub fn print_table(table: &Table) -> io::Result<()> {
        let mut stdout = io::stdout();
        if table.columns().is_empty() {
            stdout.write_all(b"_no rows_\n")?;
        } else {
            stdout.write_all(table.to_markdown().as_bytes())?;
        }
        Ok(())
    }

    pub fn print_lines<I, T>(lines: I) -> io::Result<()>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let mut stdout = io::stdout();
        for line in lines {
            writeln!(stdout, "- {}", line.as_ref())?;
        }
        Ok(())
    }

    pub fn print_text(text: &str) -> io::Result<()> {
        writeln!(io::stdout(), "{text}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_carries_tool_version() {
        let result = vec!["A549".to_string()];
        let report = Report::new("vocab", &result);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["command"], "vocab");
        assert_eq!(json["result"][0], "A549");
        assert!(json["tool"].as_str().unwrap().starts_with("kira-cs/"));
    }
}
