use anyhow::{Result, anyhow};
use std::path::Path;

pub mod compose;
pub mod context;
pub mod logging;
pub mod paths;
pub mod phonetics;
pub mod romaji;
pub mod script;
pub mod server;
pub mod settings;
pub mod speech;
pub mod store;
pub mod words;

pub use compose::{FormPatch, WordForm, compose_entry};
pub use context::AppContext;
pub use phonetics::{PhoneticConverter, Readings};
pub use romaji::space_romaji;
pub use speech::SpeechPlayer;
pub use store::{StoreError, WordStore};
pub use words::{WordDraft, WordEntry};

use words::{ALL_CATEGORIES, CardPart, render_card, speech_text};

#[derive(Debug, Clone)]
pub struct Config {
    pub settings_path: Option<String>,
    pub command: Command,
}

#[derive(Debug, Clone)]
pub enum Command {
    Serve { addr: Option<String> },
    List { category: Option<String> },
    Add { fields: FormPatch },
    Edit { id: String, fields: FormPatch },
    Delete { id: String },
    Convert { text: String },
    Space { romaji: String },
    Speak { text: String, hiragana: Option<String> },
    Play { id: String, example: bool },
    Categories,
}

/// Runs one command and returns what should be printed.
pub async fn run(config: Config) -> Result<String> {
    let settings_path = config.settings_path.as_deref().map(Path::new);
    let settings = settings::load_settings(settings_path)?;

    match config.command {
        Command::Space { romaji } => Ok(space_romaji(&romaji)),
        Command::Categories => Ok(settings.category_set().labels().join("\n")),
        Command::Serve { addr } => {
            let addr = addr.unwrap_or_else(|| settings.server_addr.clone());
            server::run_server(&settings, &addr).await?;
            Ok(String::new())
        }
        command => {
            let context = AppContext::new(settings)?;
            run_with_context(&context, command).await
        }
    }
}

async fn run_with_context(context: &AppContext, command: Command) -> Result<String> {
    match command {
        Command::List { category } => {
            let category = category.unwrap_or_else(|| ALL_CATEGORIES.to_string());
            let entries = context.store().list_by_category(&category).await;
            if entries.is_empty() {
                return Ok("no words yet".to_string());
            }
            Ok(entries
                .iter()
                .map(render_card)
                .collect::<Vec<_>>()
                .join("\n"))
        }
        Command::Add { fields } => {
            let mut form = WordForm::default();
            fields.apply(&mut form);
            let draft =
                compose_entry(context.converter(), &form, None, context.categories()).await?;
            let created = context.store().create(&draft).await?;
            Ok(render_card(&created))
        }
        Command::Edit { id, fields } => {
            let existing = find_entry(context, &id).await?;
            let mut form = WordForm::from_entry(&existing);
            fields.apply(&mut form);
            let draft = compose_entry(
                context.converter(),
                &form,
                Some(&existing),
                context.categories(),
            )
            .await?;
            let entry = draft.into_entry(existing.id.clone(), existing.created_at);
            let updated = context.store().update(&id, &entry).await?;
            Ok(render_card(&updated))
        }
        Command::Delete { id } => {
            context.store().delete(&id).await?;
            Ok(format!("deleted {}", id))
        }
        Command::Convert { text } => {
            let readings = context.converter().convert(&text).await;
            Ok(serde_json::to_string_pretty(&readings)?)
        }
        Command::Speak { text, hiragana } => {
            context.speech().speak(&text, hiragana.as_deref()).await;
            Ok(String::new())
        }
        Command::Play { id, example } => {
            let entry = find_entry(context, &id).await?;
            let part = if example {
                CardPart::Example
            } else {
                CardPart::Word
            };
            let text = speech_text(&entry, part)
                .ok_or_else(|| anyhow!("word {} has nothing to play", id))?;
            let hint = match part {
                CardPart::Word if text == entry.japanese && !entry.hiragana.is_empty() => {
                    Some(entry.hiragana.as_str())
                }
                _ => None,
            };
            context.speech().speak(text, hint).await;
            Ok(String::new())
        }
        Command::Serve { .. } | Command::Space { .. } | Command::Categories => {
            Err(anyhow!("command does not need the client context"))
        }
    }
}

async fn find_entry(context: &AppContext, id: &str) -> Result<WordEntry> {
    context
        .store()
        .list()
        .await
        .into_iter()
        .find(|entry| entry.id == id)
        .ok_or_else(|| StoreError::NotFound(id.to_string()).into())
}
