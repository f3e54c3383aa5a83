//! # Question Analysis
//!
//! Light, regex-only inspection of the user's question: which tables it names,
//! whether it asks about columns, and extraction of column names from a schema
//! document.

use regex::Regex;
use std::collections::HashSet;

/// Words that can follow "table"/"column" without being a table name.
const STOPWORDS: &[&str] = &[
    // English
    "a", "all", "an", "and", "are", "called", "do", "does", "for", "from", "has", "have", "in",
    "is", "its", "list", "name", "named", "names", "of", "on", "or", "the", "that", "their",
    "this", "what", "which", "with",
    // Spanish
    "con", "cual", "cuales", "de", "del", "el", "en", "es", "la", "las", "lista", "los",
    "nombre", "nombres", "para", "que", "son", "sus", "tiene", "tienen", "todas", "y",
];

/// Table keywords, singular and plural, English and Spanish.
const TABLE_KEYWORDS: &[&str] = &["table", "tables", "tabla", "tablas"];

/// Column keywords, singular and plural, English and Spanish.
const COLUMN_KEYWORDS: &[&str] = &["column", "columns", "columna", "columnas"];

/// Compiled patterns for question analysis.
#[derive(Debug, Clone)]
pub struct QuestionAnalyzer {
    table_mention: Regex,
    column_question: Regex,
    column_entry: Regex,
}

impl QuestionAnalyzer {
    pub fn new() -> Result<Self, regex::Error> {
        let keywords = [TABLE_KEYWORDS, COLUMN_KEYWORDS].concat().join("|");
        let fillers = format!("{}|{}", STOPWORDS.join("|"), keywords);
        // A keyword, any run of filler words, then the identifier we want.
        let table_mention = Regex::new(&format!(
            r"(?i)\b(?:{keywords})\s+(?:(?:{fillers})\s+)*([\p{{L}}_][\p{{L}}\p{{N}}_]*)"
        ))?;
        let column_question = Regex::new(r"(?i)\b(?:columns?|columnas?|fields?|campos?)\b")?;
        let column_entry = Regex::new(r"Column:\s*([^\s,(]+)")?;
        Ok(Self {
            table_mention,
            column_question,
            column_entry,
        })
    }

    /// Returns the table names mentioned after "table"/"column" keywords.
    ///
    /// Stopwords and keywords are dropped; order is preserved and duplicates
    /// (case-insensitive) removed. When some mention goes through a table
    /// keyword, words that only follow a column keyword ("table Sales has
    /// columns id") are column names and are dropped too.
    pub fn extract_table_names(&self, question: &str) -> Vec<String> {
        let candidates: Vec<(&str, bool)> = self
            .table_mention
            .captures_iter(question)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                let name = caps.get(1)?;
                let lead = &question[whole.start()..name.start()];
                let via_table = lead
                    .split_whitespace()
                    .any(|word| TABLE_KEYWORDS.contains(&word.to_lowercase().as_str()));
                Some((name.as_str(), via_table))
            })
            .filter(|(candidate, _)| !is_filler(candidate))
            .collect();

        let any_via_table = candidates.iter().any(|(_, via_table)| *via_table);
        let mut seen = HashSet::new();
        candidates
            .into_iter()
            .filter(|(_, via_table)| *via_table || !any_via_table)
            .filter(|(candidate, _)| seen.insert(candidate.to_lowercase()))
            .map(|(candidate, _)| candidate.to_string())
            .collect()
    }

    /// True when the question asks about columns or fields.
    pub fn is_column_question(&self, question: &str) -> bool {
        self.column_question.is_match(question)
    }

    /// Pulls the `Column: X` entries out of a schema document, in order.
    pub fn extract_column_names(&self, schema_text: &str) -> Vec<String> {
        self.column_entry
            .captures_iter(schema_text)
            .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
            .collect()
    }
}

fn is_filler(word: &str) -> bool {
    let lower = word.to_lowercase();
    let lower = lower.as_str();
    STOPWORDS.contains(&lower) || TABLE_KEYWORDS.contains(&lower) || COLUMN_KEYWORDS.contains(&lower)
}
