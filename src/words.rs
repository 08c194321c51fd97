use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use thiserror::Error;

use crate::romaji::space_romaji;

/// Filter label meaning "every category".
pub const ALL_CATEGORIES: &str = "全部";

pub const DEFAULT_CATEGORIES: &[&str] = &[
    "問候", "日常", "食物", "交通", "購物", "旅遊", "工作", "學習", "其他",
];

/// A saved vocabulary card.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WordEntry {
    pub id: String,
    pub chinese: String,
    pub japanese: String,
    pub hiragana: String,
    pub katakana: String,
    pub romaji: String,
    pub example: String,
    pub example_japanese: String,
    pub example_romaji: String,
    pub example_note: String,
    pub category: String,
    pub created_at: i64,
}

/// Create payload. `id` and `createdAt` are assigned by the service when absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WordDraft {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub chinese: String,
    pub japanese: String,
    pub hiragana: String,
    pub katakana: String,
    pub romaji: String,
    pub example: String,
    pub example_japanese: String,
    pub example_romaji: String,
    pub example_note: String,
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
}

impl WordDraft {
    pub fn into_entry(self, id: String, created_at: i64) -> WordEntry {
        WordEntry {
            id,
            chinese: self.chinese,
            japanese: self.japanese,
            hiragana: self.hiragana,
            katakana: self.katakana,
            romaji: self.romaji,
            example: self.example,
            example_japanese: self.example_japanese,
            example_romaji: self.example_romaji,
            example_note: self.example_note,
            category: self.category,
            created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub reason: String,
}

impl FieldError {
    fn new(field: &str, reason: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

/// Every field that failed validation, in form order.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid word entry: {}", describe_fields(.fields))]
pub struct ValidationError {
    pub fields: Vec<FieldError>,
}

impl ValidationError {
    pub fn has_field(&self, field: &str) -> bool {
        self.fields.iter().any(|error| error.field == field)
    }
}

fn describe_fields(fields: &[FieldError]) -> String {
    fields
        .iter()
        .map(|error| format!("{} {}", error.field, error.reason))
        .collect::<Vec<_>>()
        .join("; ")
}

/// The closed set of category labels a card may carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Categories {
    labels: Vec<String>,
}

impl Default for Categories {
    fn default() -> Self {
        Self::new(DEFAULT_CATEGORIES.iter().map(|label| label.to_string()))
    }
}

impl Categories {
    pub fn new(labels: impl IntoIterator<Item = String>) -> Self {
        let mut unique: Vec<String> = Vec::new();
        for label in labels {
            let label = label.trim().to_string();
            if !label.is_empty() && label != ALL_CATEGORIES && !unique.contains(&label) {
                unique.push(label);
            }
        }
        Self { labels: unique }
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn contains(&self, label: &str) -> bool {
        self.labels.iter().any(|known| known == label)
    }
}

/// Checks the fields every persisted card needs. Category membership is only
/// enforced when a category set is given.
pub fn validate_required(
    chinese: &str,
    example: &str,
    category: &str,
    categories: Option<&Categories>,
) -> Result<(), ValidationError> {
    let mut fields = Vec::new();
    if chinese.trim().is_empty() {
        fields.push(FieldError::new("chinese", "is required"));
    }
    if example.trim().is_empty() {
        fields.push(FieldError::new("example", "is required"));
    }
    let category = category.trim();
    if category.is_empty() {
        fields.push(FieldError::new("category", "is required"));
    } else if let Some(categories) = categories {
        if !categories.contains(category) {
            fields.push(FieldError::new(
                "category",
                format!("'{}' is not one of: {}", category, categories.labels().join(", ")),
            ));
        }
    }
    if fields.is_empty() {
        Ok(())
    } else {
        Err(ValidationError { fields })
    }
}

/// Keeps entries in `category`; `全部` or an empty filter keeps everything.
pub fn filter_by_category<'a>(entries: &'a [WordEntry], category: &str) -> Vec<&'a WordEntry> {
    let category = category.trim();
    entries
        .iter()
        .filter(|entry| {
            category.is_empty() || category == ALL_CATEGORIES || entry.category == category
        })
        .collect()
}

/// Which half of a card to read aloud.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardPart {
    Word,
    Example,
}

/// Text a card plays for `part`, or `None` when the card has nothing to say.
pub fn speech_text(entry: &WordEntry, part: CardPart) -> Option<&str> {
    let candidates = match part {
        CardPart::Word => [&entry.japanese, &entry.hiragana, &entry.chinese],
        CardPart::Example => [&entry.example_japanese, &entry.example, &entry.chinese],
    };
    candidates
        .into_iter()
        .map(|value| value.as_str())
        .find(|value| !value.trim().is_empty())
}

/// Plain-text card. Lines that only repeat another field are left out and romaji
/// is shown spaced.
pub fn render_card(entry: &WordEntry) -> String {
    let mut out = String::new();
    let _ = write!(out, "[{}] {}", entry.category, entry.id);
    out.push('\n');

    let mut headline = Vec::new();
    if shown(&entry.japanese, &[&entry.chinese]) {
        headline.push(entry.japanese.clone());
    }
    if shown(&entry.romaji, &[&entry.japanese, &entry.chinese]) {
        headline.push(space_romaji(&entry.romaji));
    }
    if !headline.is_empty() {
        let _ = writeln!(out, "  {}", headline.join("  "));
    }
    if shown(&entry.hiragana, &[&entry.japanese, &entry.chinese]) {
        let _ = writeln!(out, "  {}", entry.hiragana);
    }
    if !entry.chinese.trim().is_empty() {
        let _ = writeln!(out, "  {}", entry.chinese);
    }
    if !entry.example.trim().is_empty() {
        let _ = writeln!(out, "  例句: {}", entry.example);
        if shown(&entry.example_japanese, &[&entry.example]) {
            let _ = writeln!(out, "    日文: {}", entry.example_japanese);
        }
        if shown(&entry.example_romaji, &[&entry.example]) {
            let _ = writeln!(out, "    羅馬拼音: {}", space_romaji(&entry.example_romaji));
        }
        if !entry.example_note.trim().is_empty() {
            let _ = writeln!(out, "    備註: {}", entry.example_note);
        }
    }
    out
}

fn shown(value: &str, duplicates: &[&String]) -> bool {
    !value.trim().is_empty() && duplicates.iter().all(|other| other.as_str() != value)
}
