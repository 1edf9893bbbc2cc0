//! Terminal stand-ins for the speaker: stdout is speech, stdin lines are
//! transcriptions.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};

use ability_agent::{AgentError, Speech};
use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::Mutex;

/// Shared by the top-level prompt and every session, so both read from
/// the same line buffer.
pub struct ConsoleSpeech {
    lines: Mutex<Lines<BufReader<Stdin>>>,
    eof: AtomicBool,
}

impl Default for ConsoleSpeech {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsoleSpeech {
    pub fn new() -> Self {
        Self {
            lines: Mutex::new(BufReader::new(tokio::io::stdin()).lines()),
            eof: AtomicBool::new(false),
        }
    }

    /// The next line from stdin, or `None` once it is closed.
    pub async fn next_line(&self, prompt: &str) -> std::io::Result<Option<String>> {
        if self.eof.load(Ordering::Acquire) {
            return Ok(None);
        }
        print!("{prompt}");
        std::io::stdout().flush()?;

        let line = self.lines.lock().await.next_line().await?;
        if line.is_none() {
            self.eof.store(true, Ordering::Release);
            println!();
        }
        Ok(line)
    }

    pub fn is_closed(&self) -> bool {
        self.eof.load(Ordering::Acquire)
    }
}

fn speech_error(e: std::io::Error) -> AgentError {
    AgentError::Speech {
        reason: e.to_string(),
    }
}

#[async_trait]
impl Speech for ConsoleSpeech {
    async fn speak(&self, text: &str) -> ability_agent::Result<()> {
        let mut out = std::io::stdout().lock();
        writeln!(out, "  {text}").map_err(speech_error)?;
        out.flush().map_err(speech_error)
    }

    /// A closed stdin is heard as silence, so sessions wind down through
    /// idle detection.
    async fn user_response(&self) -> ability_agent::Result<String> {
        let line = self.next_line("you> ").await.map_err(speech_error)?;
        Ok(line.unwrap_or_default())
    }
}
