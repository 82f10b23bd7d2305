//! Line-oriented command loop.
//!
//! Each input line is split into shell-like words (double quotes group
//! words containing spaces) and parsed with clap. Mistakes are reported and
//! the prompt comes back; only `quit` or end of input ends the session.

use crate::render;
use anyhow::{Context, bail};
use bitemp::{Bitemp, FormatConfig, HistoryQuery, SeriesKey, ValidTimeQuery};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use clap::{Args, CommandFactory, Parser, Subcommand};
use std::io::{BufRead, Write};

const PROMPT: &str = "bitemp> ";

#[derive(Parser, Debug)]
#[command(
    name = "bitemp",
    no_binary_name = true,
    disable_help_subcommand = true,
    disable_version_flag = true
)]
struct Line {
    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct SeriesArgs {
    first_name: String,
    last_name: String,
    /// LOINC code, e.g. 14743-9
    code: String,
}

impl SeriesArgs {
    fn key(&self) -> SeriesKey {
        SeriesKey::new(&*self.first_name, &*self.last_name, &*self.code)
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Retrieve a measurement; without TIME, the latest one of DATE
    Get {
        #[command(flatten)]
        series: SeriesArgs,
        date: String,
        time: Option<String>,
        /// Perspective (defaults to the system perspective)
        #[arg(long)]
        at: Option<String>,
    },
    /// Every recorded version with valid time between FROM and TO
    History {
        #[command(flatten)]
        series: SeriesArgs,
        /// Datetime, or a date meaning its first minute
        from: String,
        /// Datetime, or a date meaning its last minute
        to: String,
        #[arg(long)]
        tx_from: Option<String>,
        #[arg(long)]
        tx_to: Option<String>,
        /// Only the newest version of each valid time
        #[arg(long)]
        latest: bool,
    },
    /// Record a corrected value for an existing measurement
    Update {
        #[command(flatten)]
        series: SeriesArgs,
        date: String,
        time: String,
        #[arg(allow_negative_numbers = true)]
        value: f64,
        /// Transaction time (defaults to the system perspective)
        #[arg(long)]
        at: Option<String>,
    },
    /// Logically delete a measurement; without TIME, the latest one of DATE
    Delete {
        #[command(flatten)]
        series: SeriesArgs,
        date: String,
        time: Option<String>,
        #[arg(long)]
        at: Option<String>,
    },
    /// Show the system perspective, or move it to DATETIME
    Now { datetime: Option<String> },
    /// Store statistics
    Stats,
    /// List commands
    Help,
    /// Leave the console
    #[command(alias = "exit")]
    Quit,
}

#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

pub struct Console<R, W> {
    db: Bitemp,
    formats: FormatConfig,
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Console<R, W> {
    pub fn new(db: Bitemp, input: R, output: W) -> Self {
        let formats = db.config().formats.clone();
        Self {
            db,
            formats,
            input,
            output,
        }
    }

    pub fn run(&mut self) -> anyhow::Result<()> {
        let mut line = String::new();
        loop {
            write!(self.output, "{PROMPT}")?;
            self.output.flush()?;

            line.clear();
            if self.input.read_line(&mut line)? == 0 {
                writeln!(self.output)?;
                break;
            }

            match self.execute(line.trim()) {
                Ok(Flow::Continue) => {}
                Ok(Flow::Quit) => break,
                Err(e) => writeln!(self.output, "{}", render::error(&e))?,
            }
        }
        Ok(())
    }

    fn execute(&mut self, line: &str) -> anyhow::Result<Flow> {
        let words = tokenize(line)?;
        if words.is_empty() {
            return Ok(Flow::Continue);
        }

        let command = match Line::try_parse_from(&words) {
            Ok(parsed) => parsed.command,
            Err(e) => {
                write!(self.output, "{e}")?;
                return Ok(Flow::Continue);
            }
        };

        match command {
            Command::Get {
                series,
                date,
                time,
                at,
            } => {
                let query = self.valid_time(&date, time.as_deref())?;
                let at = self.optional_instant(at.as_deref())?;
                let found = self.db.retrieve_query(&series.key(), query, at)?;
                writeln!(self.output, "{}", render::measurement(&self.formats, &found))?;
            }
            Command::History {
                series,
                from,
                to,
                tx_from,
                tx_to,
                latest,
            } => {
                let start = self.instant(&from, false)?;
                let end = self.instant(&to, true)?;
                let mut query = HistoryQuery::new();
                if tx_from.is_some() || tx_to.is_some() {
                    let tx_from = match tx_from {
                        Some(raw) => self.instant(&raw, false)?,
                        None => NaiveDateTime::MIN,
                    };
                    let tx_to = match tx_to {
                        Some(raw) => self.instant(&raw, true)?,
                        None => NaiveDateTime::MAX,
                    };
                    query = query.with_transaction_window(tx_from, tx_to);
                }
                if latest {
                    query = query.latest_per_valid_time();
                }
                let rows = self
                    .db
                    .query_history_with(&series.key(), start, end, &query)?;
                writeln!(self.output, "{}", render::history(&self.formats, &rows))?;
            }
            Command::Update {
                series,
                date,
                time,
                value,
                at,
            } => {
                let valid_time = self.date(&date)?.and_time(self.time(&time)?);
                let at = self.optional_instant(at.as_deref())?;
                let key = series.key().at(valid_time);
                let handle = self.db.update(&key, value, at)?;
                let current = self.db.retrieve_exact(&key, at)?;
                writeln!(
                    self.output,
                    "updated (version {})\n{}",
                    handle.ordinal + 1,
                    render::measurement(&self.formats, &current)
                )?;
            }
            Command::Delete {
                series,
                date,
                time,
                at,
            } => {
                let query = self.valid_time(&date, time.as_deref())?;
                let at = self.optional_instant(at.as_deref())?;
                let closed = self.db.delete(&series.key(), query, at)?;
                writeln!(
                    self.output,
                    "deleted\n{}",
                    render::measurement(&self.formats, &closed)
                )?;
            }
            Command::Now { datetime: None } => {
                let now = self.db.system_perspective();
                writeln!(self.output, "{}", self.formats.render_datetime(now))?;
            }
            Command::Now {
                datetime: Some(raw),
            } => {
                let now = self.instant(&raw, false)?;
                let previous = self.db.set_system_perspective(now);
                writeln!(
                    self.output,
                    "{} (was {})",
                    self.formats.render_datetime(now),
                    self.formats.render_datetime(previous)
                )?;
            }
            Command::Stats => {
                writeln!(self.output, "{}", render::stats(&self.db.stats()))?;
            }
            Command::Help => {
                writeln!(self.output, "{}", Line::command().render_help())?;
            }
            Command::Quit => return Ok(Flow::Quit),
        }

        Ok(Flow::Continue)
    }

    fn date(&self, raw: &str) -> anyhow::Result<NaiveDate> {
        self.formats
            .parse_date(raw)
            .with_context(|| format!("'{}' is not a date ({})", raw, self.formats.date))
    }

    fn time(&self, raw: &str) -> anyhow::Result<NaiveTime> {
        self.formats
            .parse_time(raw)
            .with_context(|| format!("'{}' is not a time ({})", raw, self.formats.time))
    }

    fn valid_time(&self, date: &str, time: Option<&str>) -> anyhow::Result<ValidTimeQuery> {
        let date = self.date(date)?;
        let time = time.map(|raw| self.time(raw)).transpose()?;
        Ok(ValidTimeQuery::from_parts(date, time))
    }

    /// A full datetime, or a bare date taken at its first or last minute.
    fn instant(&self, raw: &str, end_of_day: bool) -> anyhow::Result<NaiveDateTime> {
        if let Some(at) = self.formats.parse_datetime(raw) {
            return Ok(at);
        }
        let Some(date) = self.formats.parse_date(raw) else {
            bail!(
                "'{}' is neither a datetime ({}) nor a date ({})",
                raw,
                self.formats.datetime,
                self.formats.date
            );
        };
        let time = if end_of_day {
            NaiveTime::from_hms_opt(23, 59, 59)
        } else {
            NaiveTime::from_hms_opt(0, 0, 0)
        };
        time.map(|time| date.and_time(time))
            .context("invalid time of day")
    }

    fn optional_instant(&self, raw: Option<&str>) -> anyhow::Result<Option<NaiveDateTime>> {
        raw.map(|raw| self.instant(raw, false)).transpose()
    }
}

/// Whitespace-separated words; double quotes group.
fn tokenize(line: &str) -> anyhow::Result<Vec<String>> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quoted = false;

    for c in line.chars() {
        match c {
            '"' => {
                quoted = !quoted;
                in_word = true;
            }
            c if c.is_whitespace() && !quoted => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            c => {
                current.push(c);
                in_word = true;
            }
        }
    }

    if quoted {
        bail!("unterminated quote");
    }
    if in_word {
        words.push(current);
    }
    Ok(words)
}
