use tracing::debug;

use crate::phonetics::PhoneticConverter;
use crate::words::{Categories, ValidationError, WordDraft, WordEntry, validate_required};

/// Raw user input for a card, before readings are derived.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WordForm {
    pub chinese: String,
    pub japanese: String,
    pub japanese_kanji: String,
    pub romaji: String,
    pub example: String,
    pub example_japanese: String,
    pub example_romaji: String,
    pub example_note: String,
    pub category: String,
}

impl WordForm {
    /// Prefills a form from a saved card for editing.
    pub fn from_entry(entry: &WordEntry) -> Self {
        Self {
            chinese: entry.chinese.clone(),
            japanese: entry.japanese.clone(),
            japanese_kanji: String::new(),
            romaji: entry.romaji.clone(),
            example: entry.example.clone(),
            example_japanese: entry.example_japanese.clone(),
            example_romaji: entry.example_romaji.clone(),
            example_note: entry.example_note.clone(),
            category: entry.category.clone(),
        }
    }
}

/// Field values given on the command line; `None` leaves a field as it was.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormPatch {
    pub chinese: Option<String>,
    pub japanese: Option<String>,
    pub japanese_kanji: Option<String>,
    pub romaji: Option<String>,
    pub example: Option<String>,
    pub example_japanese: Option<String>,
    pub example_romaji: Option<String>,
    pub example_note: Option<String>,
    pub category: Option<String>,
}

impl FormPatch {
    pub fn apply(self, form: &mut WordForm) {
        let fields = [
            (self.chinese, &mut form.chinese),
            (self.japanese, &mut form.japanese),
            (self.japanese_kanji, &mut form.japanese_kanji),
            (self.romaji, &mut form.romaji),
            (self.example, &mut form.example),
            (self.example_japanese, &mut form.example_japanese),
            (self.example_romaji, &mut form.example_romaji),
            (self.example_note, &mut form.example_note),
            (self.category, &mut form.category),
        ];
        for (value, slot) in fields {
            if let Some(value) = value {
                *slot = value;
            }
        }
    }
}

/// Validates `form` and fills in the derived readings.
///
/// Conversion failures never reject the card; they only leave readings empty.
/// When `editing` is set the result keeps its `id` and `createdAt`.
pub async fn compose_entry(
    converter: &PhoneticConverter,
    form: &WordForm,
    editing: Option<&WordEntry>,
    categories: &Categories,
) -> Result<WordDraft, ValidationError> {
    validate_required(&form.chinese, &form.example, &form.category, Some(categories))?;

    let chinese = form.chinese.trim();
    let japanese = [form.japanese_kanji.trim(), form.japanese.trim(), chinese]
        .into_iter()
        .find(|text| !text.is_empty())
        .unwrap_or(chinese)
        .to_string();
    let readings = converter.convert(&japanese).await;
    debug!("word readings for {:?}: {:?}", japanese, readings);

    let mut romaji = readings.romaji;
    let user_romaji = form.romaji.trim();
    if editing.is_some() && !user_romaji.is_empty() {
        romaji = user_romaji.to_string();
    }

    let example = form.example.trim().to_string();
    let user_example_romaji = match editing {
        Some(_) => form.example_romaji.trim(),
        None => "",
    };
    let (example_japanese, example_romaji) = if !form.example_japanese.trim().is_empty() {
        let example_japanese = form.example_japanese.trim().to_string();
        let example_romaji = if user_example_romaji.is_empty() {
            converter.convert(&example_japanese).await.romaji
        } else {
            user_example_romaji.to_string()
        };
        (example_japanese, example_romaji)
    } else {
        let converted = converter.convert(&example).await;
        let example_japanese = if converted.is_empty() {
            example.clone()
        } else {
            [converted.hiragana.as_str(), converted.katakana.as_str()]
                .into_iter()
                .find(|text| !text.is_empty())
                .unwrap_or(example.as_str())
                .to_string()
        };
        let example_romaji = if user_example_romaji.is_empty() {
            converted.romaji
        } else {
            user_example_romaji.to_string()
        };
        (example_japanese, example_romaji)
    };

    Ok(WordDraft {
        id: editing.map(|entry| entry.id.clone()),
        chinese: chinese.to_string(),
        japanese,
        hiragana: readings.hiragana,
        katakana: readings.katakana,
        romaji,
        example,
        example_japanese,
        example_romaji,
        example_note: form.example_note.trim().to_string(),
        category: form.category.trim().to_string(),
        created_at: editing.map(|entry| entry.created_at),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phonetics::testing::ScriptedSource;
    use crate::phonetics::{ConvertFuture, ReadingSource, Readings};
    use std::collections::HashMap;
    use std::sync::Arc;

    struct FixedDictionary(HashMap<&'static str, Readings>);

    impl ReadingSource for FixedDictionary {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn applies_to(&self, _text: &str) -> bool {
            true
        }

        fn try_convert<'a>(&'a self, text: &'a str) -> ConvertFuture<'a> {
            Box::pin(async move { Ok(self.0.get(text).cloned().unwrap_or_default()) })
        }
    }

    fn readings(hiragana: &str, katakana: &str, romaji: &str) -> Readings {
        Readings {
            hiragana: hiragana.to_string(),
            katakana: katakana.to_string(),
            romaji: romaji.to_string(),
        }
    }

    fn dictionary(entries: Vec<(&'static str, Readings)>) -> PhoneticConverter {
        let sources: Vec<Arc<dyn ReadingSource>> =
            vec![Arc::new(FixedDictionary(entries.into_iter().collect()))];
        PhoneticConverter::new(sources)
    }

    fn form(chinese: &str, example: &str, category: &str) -> WordForm {
        WordForm {
            chinese: chinese.to_string(),
            example: example.to_string(),
            category: category.to_string(),
            ..WordForm::default()
        }
    }

    #[tokio::test]
    async fn rejects_every_missing_field_before_converting() {
        let source = Arc::new(ScriptedSource::answering(readings("あ", "ア", "a")));
        let sources: Vec<Arc<dyn ReadingSource>> = vec![source.clone()];
        let converter = PhoneticConverter::new(sources);

        let err = compose_entry(&converter, &form("", " ", ""), None, &Categories::default())
            .await
            .unwrap_err();
        assert_eq!(err.fields.len(), 3);
        assert_eq!(source.call_count(), 0);
    }

    #[tokio::test]
    async fn unknown_category_is_rejected() {
        let converter = PhoneticConverter::local_only();
        let err = compose_entry(
            &converter,
            &form("你好", "打招呼", "問題"),
            None,
            &Categories::default(),
        )
        .await
        .unwrap_err();
        assert!(err.has_field("category"));
    }

    #[tokio::test]
    async fn chinese_only_card_saves_with_empty_readings() {
        let converter = PhoneticConverter::local_only();
        let draft = compose_entry(
            &converter,
            &form("你好", "打招呼", "問候"),
            None,
            &Categories::default(),
        )
        .await
        .unwrap();
        assert_eq!(draft.japanese, "你好");
        assert_eq!(draft.hiragana, "");
        assert_eq!(draft.katakana, "");
        assert_eq!(draft.romaji, "");
        assert_eq!(draft.example_japanese, "打招呼");
        assert_eq!(draft.example_romaji, "");
        assert_eq!(draft.id, None);
        assert_eq!(draft.created_at, None);
    }

    #[tokio::test]
    async fn kanji_field_wins_over_japanese() {
        let converter = dictionary(vec![
            ("電車", readings("でんしゃ", "デンシャ", "densha")),
            ("でんしゃ", readings("でんしゃ", "デンシャ", "densha")),
        ]);
        let mut input = form("電車", "搭電車", "交通");
        input.japanese = "でんしゃ".to_string();
        input.japanese_kanji = "電車".to_string();

        let draft = compose_entry(&converter, &input, None, &Categories::default())
            .await
            .unwrap();
        assert_eq!(draft.japanese, "電車");
        assert_eq!(draft.hiragana, "でんしゃ");
        assert_eq!(draft.romaji, "densha");
    }

    #[tokio::test]
    async fn converted_example_prefers_hiragana() {
        let converter = dictionary(vec![(
            "電車に乗る",
            readings("でんしゃにのる", "デンシャニノル", "denshaninoru"),
        )]);
        let draft = compose_entry(
            &converter,
            &form("搭電車", "電車に乗る", "交通"),
            None,
            &Categories::default(),
        )
        .await
        .unwrap();
        assert_eq!(draft.example, "電車に乗る");
        assert_eq!(draft.example_japanese, "でんしゃにのる");
        assert_eq!(draft.example_romaji, "denshaninoru");
    }

    #[tokio::test]
    async fn user_example_japanese_is_kept_and_only_romanized() {
        let converter = dictionary(vec![(
            "でんしゃにのる",
            readings("でんしゃにのる", "デンシャニノル", "denshaninoru"),
        )]);
        let mut input = form("搭電車", "我搭電車", "交通");
        input.example_japanese = "でんしゃにのる".to_string();

        let draft = compose_entry(&converter, &input, None, &Categories::default())
            .await
            .unwrap();
        assert_eq!(draft.example, "我搭電車");
        assert_eq!(draft.example_japanese, "でんしゃにのる");
        assert_eq!(draft.example_romaji, "denshaninoru");
    }

    #[tokio::test]
    async fn romaji_overrides_apply_only_when_editing() {
        let converter = dictionary(vec![
            ("電車", readings("でんしゃ", "デンシャ", "densha")),
            ("でんしゃにのる", readings("でんしゃにのる", "", "denshaninoru")),
        ]);
        let mut input = form("電車", "我搭電車", "交通");
        input.japanese = "電車".to_string();
        input.romaji = "den sha".to_string();
        input.example_japanese = "でんしゃにのる".to_string();
        input.example_romaji = "densha ni noru".to_string();

        let created = compose_entry(&converter, &input, None, &Categories::default())
            .await
            .unwrap();
        assert_eq!(created.romaji, "densha");
        assert_eq!(created.example_romaji, "denshaninoru");

        let saved = WordEntry {
            id: "1700000000000".to_string(),
            created_at: 1_700_000_000_000,
            ..WordEntry::default()
        };
        let edited = compose_entry(&converter, &input, Some(&saved), &Categories::default())
            .await
            .unwrap();
        assert_eq!(edited.romaji, "den sha");
        assert_eq!(edited.example_romaji, "densha ni noru");
        assert_eq!(edited.id.as_deref(), Some("1700000000000"));
        assert_eq!(edited.created_at, Some(1_700_000_000_000));
    }

    #[test]
    fn edit_form_starts_from_saved_card() {
        let saved = WordEntry {
            chinese: "電車".to_string(),
            japanese: "電車".to_string(),
            romaji: "densha".to_string(),
            category: "交通".to_string(),
            ..WordEntry::default()
        };
        let form = WordForm::from_entry(&saved);
        assert_eq!(form.japanese, "電車");
        assert_eq!(form.japanese_kanji, "");
        assert_eq!(form.romaji, "densha");
    }

    #[test]
    fn patch_only_touches_given_fields() {
        let mut form = form("電車", "搭電車", "交通");
        FormPatch {
            japanese: Some("電車".to_string()),
            example_romaji: Some(String::new()),
            ..FormPatch::default()
        }
        .apply(&mut form);
        assert_eq!(form.chinese, "電車");
        assert_eq!(form.japanese, "電車");
        assert_eq!(form.example_romaji, "");
        assert_eq!(form.category, "交通");
    }
}
