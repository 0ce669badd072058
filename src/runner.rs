use crate::config::Config;
use crate::error::AnnotateError;
use crate::export::{self, ExportFormat};
use crate::models::{MAX_SCORE, MIN_SCORE, RUBRIC_LEN, Scores};
use crate::output;
use crate::session::{Action, Annotator, Outcome, Phase, Submission};
use anyhow::Result;
use clap::ValueEnum;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use tracing::debug;

const HELP: &str = "\
Commands:
  sources              list the configured sources
  select <key>         start evaluating a source
  none                 clear the selected source
  reset                draw a new sample for the selected source
  judge                score the current item
  show                 show the current item again
  status               judgments collected per source
  export <csv|json>    save this source's judgments
  quit                 leave (unsaved judgments are lost)";

/// A line typed by the evaluator
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Help,
    Sources,
    Select(String),
    Deselect,
    Reset,
    Judge,
    Show,
    Status,
    Export(ExportFormat),
    Quit,
}

/// Parse one input line; blank lines yield `None`
pub fn parse_command(line: &str) -> Result<Option<Command>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let command = match (word.to_lowercase().as_str(), rest) {
        ("help" | "?", _) => Command::Help,
        ("sources" | "ls", _) => Command::Sources,
        ("select" | "open", "") => return Err("usage: select <key>".to_string()),
        ("select" | "open", key) => Command::Select(key.to_string()),
        ("none" | "deselect", _) => Command::Deselect,
        ("reset", _) => Command::Reset,
        ("judge" | "j", _) => Command::Judge,
        ("show", _) => Command::Show,
        ("status", _) => Command::Status,
        ("export", format) => Command::Export(
            ExportFormat::from_str(format, true)
                .map_err(|_| "usage: export <csv|json>".to_string())?,
        ),
        ("quit" | "exit" | "q", _) => Command::Quit,
        (other, _) => return Err(format!("unknown command '{}'; type `help`", other)),
    };
    Ok(Some(command))
}

/// Parse a score answer; blank means "use the default"
fn parse_score(line: &str) -> Result<Option<u8>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    match line.parse::<u8>() {
        Ok(score) if (MIN_SCORE..=MAX_SCORE).contains(&score) => Ok(Some(score)),
        _ => Err(format!(
            "please enter a number from {} to {}",
            MIN_SCORE, MAX_SCORE
        )),
    }
}

/// Interactive loop feeding evaluator commands to an [`Annotator`]
pub struct Runner<R, W> {
    annotator: Annotator,
    input: R,
    output: W,
    title: String,
    output_dir: PathBuf,
}

impl<R: BufRead, W: Write> Runner<R, W> {
    pub fn new(config: &Config, annotator: Annotator, input: R, output: W) -> Self {
        Self {
            annotator,
            input,
            output,
            title: config.title.clone(),
            output_dir: config.output_dir.clone(),
        }
    }

    /// Read commands until `quit` or end of input, optionally opening a source first
    pub fn run(&mut self, open: Option<String>) -> Result<()> {
        writeln!(self.output, "=== {} ===", self.title)?;
        writeln!(self.output, "Type `help` for commands.")?;
        writeln!(self.output)?;
        match open {
            Some(key) => self.execute(Command::Select(key))?,
            None => output::print_state(&mut self.output, &self.annotator)?,
        }

        loop {
            write!(self.output, "> ")?;
            self.output.flush()?;
            let Some(line) = self.read_line()? else {
                break;
            };

            match parse_command(&line) {
                Ok(None) => continue,
                Ok(Some(Command::Quit)) => break,
                Ok(Some(command)) => self.execute(command)?,
                Err(message) => writeln!(self.output, "{}", message)?,
            }
        }
        Ok(())
    }

    pub fn execute(&mut self, command: Command) -> Result<()> {
        debug!(?command, "executing command");
        match command {
            Command::Help => writeln!(self.output, "{}", HELP)?,
            Command::Sources => output::print_sources(&mut self.output, &self.annotator)?,
            Command::Select(key) => self.apply(Action::Select(key))?,
            Command::Deselect => self.apply(Action::Deselect)?,
            Command::Reset => self.apply(Action::Reset)?,
            Command::Judge => self.judge()?,
            Command::Show => output::print_state(&mut self.output, &self.annotator)?,
            Command::Status => output::print_status(&mut self.output, &self.annotator)?,
            Command::Export(format) => self.export(format)?,
            Command::Quit => {}
        }
        Ok(())
    }

    fn apply(&mut self, action: Action) -> Result<()> {
        match self.annotator.handle(action) {
            Ok(Outcome::Unchanged) => {}
            Ok(outcome) => {
                if matches!(outcome, Outcome::Advanced { .. } | Outcome::Completed { .. }) {
                    output::print_last_judgment(&mut self.output, &self.annotator)?;
                }
                output::print_outcome(&mut self.output, &outcome)?;
                output::print_state(&mut self.output, &self.annotator)?;
            }
            Err(err) => writeln!(self.output, "error: {}", err)?,
        }
        Ok(())
    }

    /// Ask every rubric question, then the comment, then submit
    fn judge(&mut self) -> Result<()> {
        if self.annotator.phase() != Phase::Active {
            writeln!(self.output, "error: {}", AnnotateError::NotAwaitingJudgment)?;
            return Ok(());
        }

        let questions = self.annotator.rubric().questions().to_vec();
        let mut answers = [None; RUBRIC_LEN];
        for (answer, question) in answers.iter_mut().zip(&questions) {
            loop {
                output::print_question(&mut self.output, question)?;
                let Some(line) = self.read_line()? else {
                    writeln!(self.output, "judgment abandoned")?;
                    return Ok(());
                };
                match parse_score(&line) {
                    Ok(score) => {
                        *answer = score;
                        break;
                    }
                    Err(message) => writeln!(self.output, "{}", message)?,
                }
            }
        }

        write!(self.output, "comment (optional): ")?;
        self.output.flush()?;
        let comment = self.read_line()?.unwrap_or_default().trim().to_string();

        let scores = match Scores::from_answers(answers) {
            Ok(scores) => scores,
            Err(err) => {
                writeln!(self.output, "error: {}", err)?;
                return Ok(());
            }
        };
        self.apply(Action::Submit(Submission { scores, comment }))
    }

    fn export(&mut self, format: ExportFormat) -> Result<()> {
        let export = match self.annotator.export_current_file(format) {
            Ok(export) => export,
            Err(err) => {
                writeln!(self.output, "error: {}", err)?;
                return Ok(());
            }
        };

        let count = self
            .annotator
            .session()
            .map_or(0, |session| session.judgments().len());
        match export::write_export(&self.output_dir, &export) {
            Ok(path) => writeln!(
                self.output,
                "💾 Saved {} judgments to {}",
                count,
                path.display()
            )?,
            Err(err) => writeln!(self.output, "error: {:#}", err)?,
        }
        Ok(())
    }

    fn read_line(&mut self) -> Result<Option<String>> {
        let mut buf = String::new();
        if self.input.read_line(&mut buf)? == 0 {
            return Ok(None);
        }
        Ok(Some(buf.trim_end_matches(['\r', '\n']).to_string()))
    }
}
