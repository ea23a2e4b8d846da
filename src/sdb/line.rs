use std::{
    fs::File,
    io::{self, BufRead, BufReader},
    path::Path,
};

use anyhow::Result;
use rustyline::{error::ReadlineError, DefaultEditor};

/// Where the monitor gets its command lines from.
pub trait LineSource {
    /// Blocks until a line is available. `Ok(None)` means end of input.
    fn read_line(&mut self) -> Result<Option<String>>;
}

/// Reads lines from the terminal with line editing and history.
pub struct Prompt {
    editor: DefaultEditor,
    prompt: String,
}

impl Prompt {
    pub fn new(prompt: &str) -> Result<Self> {
        Ok(Self {
            editor: DefaultEditor::new()?,
            prompt: prompt.to_string(),
        })
    }
}

impl LineSource for Prompt {
    fn read_line(&mut self) -> Result<Option<String>> {
        match self.editor.readline(&self.prompt) {
            Ok(line) => {
                if !line.is_empty() {
                    self.editor.add_history_entry(line.as_str())?;
                }
                Ok(Some(line))
            }
            // Ctrl-C abandons the current line
            Err(ReadlineError::Interrupted) => Ok(Some(String::new())),
            Err(ReadlineError::Eof) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}

/// Reads lines from a script, or from any other buffered reader.
pub struct Script<R> {
    lines: io::Lines<R>,
}

impl<R: BufRead> Script<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
        }
    }
}

impl Script<BufReader<File>> {
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self::new(BufReader::new(File::open(path)?)))
    }
}

impl<R: BufRead> LineSource for Script<R> {
    fn read_line(&mut self) -> Result<Option<String>> {
        let line = self.lines.next().transpose()?;
        Ok(line.map(|mut line| {
            if line.ends_with('\r') {
                line.pop();
            }
            line
        }))
    }
}
