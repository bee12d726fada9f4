use std::io::{self, Write};

use chrono::Local;
use clap::ValueEnum;
use crossterm::cursor::MoveToColumn;
use crossterm::queue;
use crossterm::style::{Print, Stylize};
use crossterm::terminal::{Clear, ClearType};

use super::conversation_state::Role;
use super::render::render_message;
use super::typing_indicator::TypingIndicator;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Plain terminal transcript
    #[default]
    Text,
    /// HTML message fragments, one per line
    Html,
}

/// Where the send flow puts turns and the typing indicator.
pub trait ChatView {
    fn append_turn(&mut self, role: Role, content: &str, sources: &[String]) -> io::Result<()>;
    fn show_typing(&mut self) -> io::Result<()>;
    fn hide_typing(&mut self) -> io::Result<()>;
}

pub struct TerminalView<W: Write> {
    output: W,
    format: OutputFormat,
    echo_user: bool,
    indicator: TypingIndicator,
}

impl<W: Write> TerminalView<W> {
    pub fn new(output: W, format: OutputFormat, echo_user: bool) -> Self {
        Self {
            output,
            format,
            echo_user,
            indicator: TypingIndicator::default(),
        }
    }

    pub fn output(&mut self) -> &mut W {
        &mut self.output
    }

    #[cfg(test)]
    pub fn get_ref(&self) -> &W {
        &self.output
    }

    #[cfg(test)]
    pub fn indicator(&self) -> TypingIndicator {
        self.indicator
    }

    fn write_text_turn(&mut self, role: Role, content: &str, sources: &[String]) -> io::Result<()> {
        let label = match role {
            Role::User => role.as_str().green().bold(),
            Role::Assistant => role.as_str().cyan().bold(),
        };
        let timestamp = format!("[{}]", Local::now().format("%H:%M"));

        queue!(
            self.output,
            Print(timestamp.dim()),
            Print(" "),
            Print(label),
            Print(": "),
            Print(content.trim_end()),
            Print("\n")
        )?;

        if !sources.is_empty() {
            queue!(
                self.output,
                Print(format!("Sources: {}", sources.join(", ")).dim()),
                Print("\n")
            )?;
        }
        Ok(())
    }
}

impl<W: Write> ChatView for TerminalView<W> {
    fn append_turn(&mut self, role: Role, content: &str, sources: &[String]) -> io::Result<()> {
        if role == Role::User && !self.echo_user {
            return Ok(());
        }

        match self.format {
            OutputFormat::Text => self.write_text_turn(role, content, sources)?,
            OutputFormat::Html => {
                writeln!(self.output, "{}", render_message(role, content, sources))?;
            }
        }
        self.output.flush()
    }

    fn show_typing(&mut self) -> io::Result<()> {
        if !self.indicator.show() || self.format == OutputFormat::Html {
            return Ok(());
        }
        queue!(self.output, Print("assistant is typing...".dim()))?;
        self.output.flush()
    }

    fn hide_typing(&mut self) -> io::Result<()> {
        if !self.indicator.hide() || self.format == OutputFormat::Html {
            return Ok(());
        }
        queue!(self.output, MoveToColumn(0), Clear(ClearType::CurrentLine))?;
        self.output.flush()
    }
}
