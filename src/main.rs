use std::io::{self, IsTerminal, Read};

use anyhow::{Result, anyhow};
use clap::{Args, Parser, Subcommand};

use tango_notebook::{Command, Config, FormPatch};

#[derive(Parser, Debug)]
#[command(
    name = "tango",
    version,
    about = "Japanese vocabulary notebook with readings and pronunciation"
)]
struct Cli {
    /// Read extra settings from a local TOML file
    #[arg(short = 'r', long = "read-settings", global = true)]
    read_settings: Option<String>,

    /// Enable verbose logging
    #[arg(long = "verbose", global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand, Debug)]
enum CliCommand {
    /// Run the word API service
    Serve {
        /// Listen address (default from settings [server] addr)
        #[arg(long = "addr")]
        addr: Option<String>,
    },
    /// List saved words
    List {
        /// Only show one category ("全部" shows all)
        #[arg(short = 'c', long = "category")]
        category: Option<String>,
    },
    /// Add a word
    Add(FormArgs),
    /// Edit a saved word; omitted fields keep their value
    Edit {
        id: String,
        #[command(flatten)]
        form: FormArgs,
    },
    /// Delete a saved word
    Delete { id: String },
    /// Show hiragana/katakana/romaji for text (reads stdin when omitted)
    Convert { text: Option<String> },
    /// Insert syllable spaces into romaji
    Space { romaji: String },
    /// Pronounce Japanese text (reads stdin when omitted)
    Speak {
        text: Option<String>,
        /// Known hiragana reading, skips conversion
        #[arg(long = "hiragana")]
        hiragana: Option<String>,
    },
    /// Pronounce a saved word
    Play {
        id: String,
        /// Play the example sentence instead of the word
        #[arg(long = "example")]
        example: bool,
    },
    /// Show the configured categories
    Categories,
}

#[derive(Args, Debug, Default)]
struct FormArgs {
    /// Chinese meaning (required)
    #[arg(long = "chinese")]
    chinese: Option<String>,
    /// Japanese in any script
    #[arg(long = "japanese")]
    japanese: Option<String>,
    /// Japanese kanji spelling, preferred over --japanese
    #[arg(long = "kanji")]
    kanji: Option<String>,
    /// Romaji override (edit only)
    #[arg(long = "romaji")]
    romaji: Option<String>,
    /// Example sentence (required)
    #[arg(long = "example")]
    example: Option<String>,
    /// Example sentence in Japanese
    #[arg(long = "example-japanese")]
    example_japanese: Option<String>,
    /// Example romaji override (edit only)
    #[arg(long = "example-romaji")]
    example_romaji: Option<String>,
    /// Free-form note for the example
    #[arg(long = "example-note")]
    example_note: Option<String>,
    /// Category (see `tango categories`)
    #[arg(short = 'c', long = "category")]
    category: Option<String>,
}

impl From<FormArgs> for FormPatch {
    fn from(args: FormArgs) -> Self {
        FormPatch {
            chinese: args.chinese,
            japanese: args.japanese,
            japanese_kanji: args.kanji,
            romaji: args.romaji,
            example: args.example,
            example_japanese: args.example_japanese,
            example_romaji: args.example_romaji,
            example_note: args.example_note,
            category: args.category,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    tango_notebook::logging::init(cli.verbose)?;

    let command = match cli.command {
        CliCommand::Serve { addr } => Command::Serve { addr },
        CliCommand::List { category } => Command::List { category },
        CliCommand::Add(form) => Command::Add {
            fields: form.into(),
        },
        CliCommand::Edit { id, form } => Command::Edit {
            id,
            fields: form.into(),
        },
        CliCommand::Delete { id } => Command::Delete { id },
        CliCommand::Convert { text } => Command::Convert {
            text: text_or_stdin(text)?,
        },
        CliCommand::Space { romaji } => Command::Space { romaji },
        CliCommand::Speak { text, hiragana } => Command::Speak {
            text: text_or_stdin(text)?,
            hiragana,
        },
        CliCommand::Play { id, example } => Command::Play { id, example },
        CliCommand::Categories => Command::Categories,
    };

    let config = Config {
        settings_path: cli.read_settings,
        command,
    };
    let output = tango_notebook::run(config).await?;
    if !output.is_empty() {
        println!("{}", output);
    }
    Ok(())
}

fn text_or_stdin(text: Option<String>) -> Result<String> {
    if let Some(text) = text {
        return Ok(text);
    }
    if io::stdin().is_terminal() {
        return Err(anyhow!("no text given and stdin is a terminal"));
    }
    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;
    let text = buffer.trim();
    if text.is_empty() {
        return Err(anyhow!("stdin is empty"));
    }
    Ok(text.to_string())
}
