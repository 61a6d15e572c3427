use std::io::Write as _;

use async_trait::async_trait;
use functional_agent_core::HumanPrompt;
use owo_colors::OwoColorize;
use tokio::io::{self, AsyncBufReadExt, BufReader, Stdin};
use tokio::sync::Mutex;

const BAR_CHAR: &str = "▎";

/// Prompts the operator on the terminal and reads answers from stdin.
///
/// All lines are read through one buffered reader, so the same prompt
/// should be used for every read of stdin in the process.
pub struct TerminalPrompt {
    stdin: Mutex<BufReader<Stdin>>,
}

impl TerminalPrompt {
    /// Creates a prompt over the process stdin.
    #[inline]
    pub fn new() -> Self {
        Self {
            stdin: Mutex::new(BufReader::new(io::stdin())),
        }
    }

    /// Reads one line without showing anything. `None` at end of input.
    pub async fn read_line(&self) -> Option<String> {
        let mut stdin = self.stdin.lock().await;
        let mut line = String::new();
        match stdin.read_line(&mut line).await {
            Ok(0) => None,
            Ok(_) => Some(line.trim_end_matches(['\r', '\n']).to_owned()),
            Err(err) => {
                error!("error reading input: {}", err);
                None
            }
        }
    }
}

impl Default for TerminalPrompt {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HumanPrompt for TerminalPrompt {
    async fn prompt(&self, text: &str) -> Option<String> {
        let bar = BAR_CHAR.bright_yellow();
        let mut lines = text.lines().peekable();
        while let Some(line) = lines.next() {
            if lines.peek().is_some() {
                println!("{bar}{}", line.bright_white());
            } else {
                print!("{bar}{} ", line.trim_end().bright_white().bold());
            }
        }
        std::io::stdout().flush().ok();
        self.read_line().await
    }
}
