use crate::{dispatch::Command, input::Input};
use anyhow::Context;
use log::debug;
use std::io::{self, BufRead, StdinLock, Write};

/// Line-based prompting, on stdin or any other reader
#[derive(Debug)]
pub struct Prompt<R> {
    reader: R,
}

impl<R: BufRead> Prompt<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    /// Print a message, then wait for a line of input. Returns `None` at end
    /// of input. Surrounding whitespace is trimmed off.
    pub fn ask(&mut self, message: &str) -> anyhow::Result<Option<String>> {
        print!("{message}");
        io::stdout().flush().context("Error flushing stdout")?;

        let mut line = String::new();
        let len = self
            .reader
            .read_line(&mut line)
            .context("Error reading input")?;
        if len == 0 {
            debug!("End of input");
            Ok(None)
        } else {
            Ok(Some(line.trim().to_owned()))
        }
    }
}

impl Prompt<StdinLock<'static>> {
    pub fn stdin() -> Self {
        Self::new(io::stdin().lock())
    }
}

/// Commands typed on the console, one per line
#[derive(Debug)]
pub struct ConsoleInput<R> {
    prompt: Prompt<R>,
}

impl<R: BufRead> ConsoleInput<R> {
    const PROMPT: &'static str =
        "Enter a command ('help' to show list of commands): ";

    pub fn new(prompt: Prompt<R>) -> Self {
        Self { prompt }
    }
}

impl<R: BufRead> Input for ConsoleInput<R> {
    fn next_command(&mut self) -> anyhow::Result<Option<Command>> {
        // Closing stdin is as good as typing exit
        let Some(line) = self.prompt.ask(Self::PROMPT)? else {
            return Ok(Some(Command::Exit));
        };
        if line.is_empty() {
            return Ok(None);
        }
        match line.parse() {
            Ok(command) => Ok(Some(command)),
            Err(err) => {
                println!("{err}");
                Ok(None)
            }
        }
    }
}
