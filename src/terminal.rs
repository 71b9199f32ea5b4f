//! Line-oriented front-end: prints rounds to a writer, reads commands from a
//! buffered reader.

use std::io::Write;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc::UnboundedReceiver;

use crate::engine::QuizEngine;
use crate::quiz::rating::{format_stars, PlayerCard};
use crate::quiz::session::{ClickOutcome, QuizSession};
use crate::quiz::timer::AdvanceTicket;
use crate::quiz::view::{ChoiceMark, ChoiceView, Feedback, QuizView, RenderError, RoundView, StatsLine};

const HELP: &str = "1-9 choose | n next | r restart | p player card | l <locale> phonetics | q quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Choose(char),
    Next,
    Restart,
    PlayerCard,
    Locale(String),
    Quit,
    Unknown(String),
}

/// `None` for blank input.
pub fn parse_command(line: &str) -> Option<Command> {
    let line = line.trim();
    let mut parts = line.splitn(2, char::is_whitespace);
    let head = parts.next()?;
    if head.is_empty() {
        return None;
    }
    let rest = parts.next().unwrap_or_default().trim();

    let mut chars = head.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        if c.is_ascii_digit() {
            return Some(Command::Choose(c));
        }
    }

    Some(match head.to_ascii_lowercase().as_str() {
        "n" | "next" => Command::Next,
        "r" | "restart" => Command::Restart,
        "p" | "player" => Command::PlayerCard,
        "l" | "locale" if !rest.is_empty() => Command::Locale(rest.to_string()),
        "q" | "quit" | "exit" => Command::Quit,
        _ => Command::Unknown(line.to_string()),
    })
}

pub struct TerminalView<W: Write> {
    out: W,
}

impl<W: Write> TerminalView<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn writer(&self) -> &W {
        &self.out
    }

    pub fn show_player_card(&mut self, card: &PlayerCard) -> Result<(), RenderError> {
        writeln!(self.out, "{}  Level {}", card.display_name, card.level)?;
        writeln!(
            self.out,
            "  XP {}/{} ({}%) | Accuracy {}% | Completed {} | Stars {}",
            card.xp, card.max_xp, card.progress_percent, card.accuracy, card.quizzes_completed,
            card.total_stars
        )?;
        Ok(())
    }

    pub fn show_message(&mut self, message: &str) -> Result<(), RenderError> {
        writeln!(self.out, "{message}")?;
        Ok(())
    }

    fn write_choices(&mut self, choices: &[ChoiceView]) -> Result<(), RenderError> {
        for choice in choices {
            let mark = match choice.mark {
                ChoiceMark::None => " ",
                ChoiceMark::Correct => "✓",
                ChoiceMark::Wrong => "✗",
            };
            writeln!(self.out, "  {mark} [{}] {}", choice.position, choice.label)?;
        }
        self.out.flush()?;
        Ok(())
    }
}

impl<W: Write> QuizView for TerminalView<W> {
    fn render_round(&mut self, round: &RoundView) -> Result<(), RenderError> {
        let symbol = &round.symbol;
        let head = [symbol.emoji.as_str(), symbol.english.as_str(), symbol.thai.as_str()]
            .iter()
            .filter(|part| !part.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join("  ");
        writeln!(self.out)?;
        writeln!(self.out, "{head}")?;
        self.write_choices(&round.choices)
    }

    fn update_choices(&mut self, choices: &[ChoiceView]) -> Result<(), RenderError> {
        self.write_choices(choices)
    }

    fn show_feedback(&mut self, feedback: &Feedback) -> Result<(), RenderError> {
        match feedback {
            Feedback::Clear => {}
            Feedback::Correct => writeln!(self.out, "Correct!")?,
            Feedback::Wrong => writeln!(self.out, "Not quite, try again.")?,
            Feedback::Example(example) => writeln!(self.out, "Correct! {}", example.text())?,
        }
        Ok(())
    }

    fn show_no_data(&mut self, message: &str) -> Result<(), RenderError> {
        writeln!(self.out, "{message}")?;
        Ok(())
    }

    fn update_stats(&mut self, stats: &StatsLine) -> Result<(), RenderError> {
        writeln!(self.out, "{stats}")?;
        Ok(())
    }

    fn set_restart_visible(&mut self, visible: bool) -> Result<(), RenderError> {
        if visible {
            writeln!(self.out, "All questions answered. Press r to restart.")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub fn handle_command<W: Write>(
    session: &mut QuizSession<TerminalView<W>>,
    engine: &QuizEngine,
    command: Command,
) -> Flow {
    let shown = match command {
        Command::Choose(key) => {
            let outcome = session.press_key(key);
            if let ClickOutcome::Ignored(reason) = outcome {
                tracing::debug!(key = %key, ?reason, "Choice ignored");
            }
            Ok(())
        }
        Command::Next => {
            session.next();
            Ok(())
        }
        Command::Restart => {
            session.restart();
            Ok(())
        }
        Command::PlayerCard => {
            let card = engine.player_card();
            let stars = format_stars(session.stats_line().stars);
            let view = session.view_mut();
            view.show_player_card(&card)
                .and_then(|_| view.show_message(&format!("  This quiz: {stars}")))
        }
        Command::Locale(locale) => {
            let stored = engine.store().set_preferred_phonetic_locale(&locale);
            let rerendered = session.set_phonetic_locale(&stored, None);
            if rerendered {
                Ok(())
            } else {
                session
                    .view_mut()
                    .show_message(&format!("Phonetic locale set to {stored}"))
            }
        }
        Command::Quit => return Flow::Quit,
        Command::Unknown(_) => session.view_mut().show_message(HELP),
    };
    if let Err(e) = shown {
        tracing::warn!(error = %e, "Terminal output failed");
    }
    Flow::Continue
}

/// Plays until `q`, end of input, or the advance channel closes.
pub async fn run<W, R>(
    session: &mut QuizSession<TerminalView<W>>,
    engine: &QuizEngine,
    advances: &mut UnboundedReceiver<AdvanceTicket>,
    input: R,
) where
    W: Write,
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    if let Err(e) = session.view_mut().show_message(HELP) {
        tracing::warn!(error = %e, "Terminal output failed");
    }
    session.start();

    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    let Some(command) = parse_command(&line) else { continue };
                    if handle_command(session, engine, command) == Flow::Quit {
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to read input");
                    break;
                }
            },
            ticket = advances.recv() => match ticket {
                Some(ticket) => {
                    session.on_advance(ticket);
                }
                None => break,
            },
        }
    }
}
