mod dictionary;
mod handlers;
mod models;
mod records;
mod state;
mod tts;

pub use handlers::{run_server, serve};
pub(crate) use tts::DEFAULT_TTS_UPSTREAM;
