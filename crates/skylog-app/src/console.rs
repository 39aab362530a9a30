//! Line-oriented front end.
//!
//! The interaction thread parses a command, runs it, and renders the output
//! lines. Lookups run on the runtime; their results are picked up by
//! [`Console::poll`].

use std::path::PathBuf;
use std::sync::mpsc::{Receiver, Sender};
use std::sync::Arc;

use chrono::NaiveDate;
use skylog_records::{
    normalize, BulkDeleteError, ConfirmationToken, NewRecord, RecordStore, Resolution,
    SaveOutcome, DATE_FORMAT,
};
use skylog_weather::{ForecastSource, Geocoder, LocationQuery};

use crate::error_mapping::IntoAppError;
use crate::models::{ForecastModel, PeriodSelector, RecordsModel};
use crate::services::{request_lookup, LookupServiceMessage, LookupTracker};

pub const HELP: &str = "\
Commands:
  lookup <zip | city, state>       fetch current conditions and forecast
  save <n | current> [YYYY-MM-DD]  save a forecast period
  confirm <token> yes|no           answer an overwrite prompt
  list [filter]                    list saved records, optionally by location
  select <n..> | all | none        toggle rows for deletion
  delete                           delete the selected rows
  export [path]                    write all saved records as XML
  count                            number of saved records
  help                             show this text
  quit                             exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectArgs {
    Rows(Vec<usize>),
    All,
    None,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Lookup(String),
    Save {
        period: PeriodSelector,
        date: Option<NaiveDate>,
    },
    Confirm {
        token: ConfirmationToken,
        overwrite: bool,
    },
    List(Option<String>),
    Select(SelectArgs),
    Delete,
    Export(Option<PathBuf>),
    Count,
    Help,
    Quit,
}

impl Command {
    /// Parse one input line. Errors carry a usage hint for the user.
    pub fn parse(line: &str) -> Result<Self, String> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        match word.to_ascii_lowercase().as_str() {
            "lookup" if !rest.is_empty() => Ok(Self::Lookup(rest.to_string())),
            "lookup" => Err("usage: lookup <zip | city, state>".to_string()),
            "save" => parse_save(rest),
            "confirm" => parse_confirm(rest),
            "list" => Ok(Self::List((!rest.is_empty()).then(|| rest.to_string()))),
            "select" => parse_select(rest),
            "delete" => Ok(Self::Delete),
            "export" => Ok(Self::Export((!rest.is_empty()).then(|| PathBuf::from(rest)))),
            "count" => Ok(Self::Count),
            "help" | "?" => Ok(Self::Help),
            "quit" | "exit" => Ok(Self::Quit),
            "" => Err(String::new()),
            other => Err(format!("unknown command '{}'; type 'help'", other)),
        }
    }
}

fn parse_save(rest: &str) -> Result<Command, String> {
    const USAGE: &str = "usage: save <n | current> [YYYY-MM-DD]";

    let mut args = rest.split_whitespace();
    let period = args
        .next()
        .and_then(PeriodSelector::parse)
        .ok_or_else(|| USAGE.to_string())?;
    let date = match args.next() {
        Some(raw) => Some(
            NaiveDate::parse_from_str(raw, DATE_FORMAT)
                .map_err(|_| format!("invalid date '{}'; {}", raw, USAGE))?,
        ),
        None => None,
    };
    if args.next().is_some() {
        return Err(USAGE.to_string());
    }

    Ok(Command::Save { period, date })
}

fn parse_confirm(rest: &str) -> Result<Command, String> {
    const USAGE: &str = "usage: confirm <token> yes|no";

    let mut args = rest.split_whitespace();
    let token = args
        .next()
        .and_then(ConfirmationToken::parse)
        .ok_or_else(|| USAGE.to_string())?;
    let overwrite = match args.next().map(str::to_ascii_lowercase).as_deref() {
        Some("yes" | "y") => true,
        Some("no" | "n") => false,
        _ => return Err(USAGE.to_string()),
    };

    Ok(Command::Confirm { token, overwrite })
}

fn parse_select(rest: &str) -> Result<Command, String> {
    match rest.to_ascii_lowercase().as_str() {
        "all" => Ok(Command::Select(SelectArgs::All)),
        "none" => Ok(Command::Select(SelectArgs::None)),
        "" => Err("usage: select <n..> | all | none".to_string()),
        _ => rest
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|s| !s.is_empty())
            .map(|s| s.parse::<usize>().map_err(|_| format!("invalid row '{}'", s)))
            .collect::<Result<Vec<_>, _>>()
            .map(|rows| Command::Select(SelectArgs::Rows(rows))),
    }
}

/// What the caller should do after a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct Console<G, F> {
    runtime: tokio::runtime::Handle,
    geocoder: Arc<G>,
    source: Arc<F>,
    tracker: LookupTracker,
    lookup_tx: Sender<LookupServiceMessage>,
    lookup_rx: Receiver<LookupServiceMessage>,
    forecast: ForecastModel,
    records: RecordsModel,
}

impl<G, F> Console<G, F>
where
    G: Geocoder + 'static,
    F: ForecastSource + 'static,
{
    pub fn new(
        runtime: tokio::runtime::Handle,
        geocoder: Arc<G>,
        source: Arc<F>,
        store: Arc<RecordStore>,
        export_dir: impl Into<PathBuf>,
    ) -> Self {
        let (lookup_tx, lookup_rx) = std::sync::mpsc::channel();
        Self {
            runtime,
            geocoder,
            source,
            tracker: LookupTracker::new(),
            lookup_tx,
            lookup_rx,
            forecast: ForecastModel::new(),
            records: RecordsModel::new(store, export_dir),
        }
    }

    pub fn forecast(&self) -> &ForecastModel {
        &self.forecast
    }

    pub fn records(&self) -> &RecordsModel {
        &self.records
    }

    /// Run one input line, appending output to `out`.
    pub fn handle_line(&mut self, line: &str, out: &mut Vec<String>) -> Flow {
        match Command::parse(line) {
            Ok(command) => self.execute(command, out),
            Err(message) => {
                if !message.is_empty() {
                    out.push(message);
                }
                Flow::Continue
            }
        }
    }

    pub fn execute(&mut self, command: Command, out: &mut Vec<String>) -> Flow {
        match command {
            Command::Lookup(input) => self.lookup(&input, out),
            Command::Save { period, date } => self.save(period, date, out),
            Command::Confirm { token, overwrite } => self.confirm(token, overwrite, out),
            Command::List(filter) => {
                self.records.list(filter.as_deref());
                self.render_listing(out);
            }
            Command::Select(args) => self.select(args, out),
            Command::Delete => self.delete(out),
            Command::Export(path) => match self.records.export(path.as_deref()) {
                Some((written, 0)) => {
                    out.push(format!("Exported 0 records to {}", written.display()));
                    out.push("No saved records to export".to_string());
                }
                Some((written, n)) => {
                    out.push(format!("Exported {} records to {}", n, written.display()))
                }
                None => out.push("Export failed".to_string()),
            },
            Command::Count => out.push(format!("{} saved records", self.records.count())),
            Command::Help => out.push(HELP.to_string()),
            Command::Quit => {
                self.tracker.cancel();
                return Flow::Quit;
            }
        }
        Flow::Continue
    }

    /// Render any finished lookups. Stale ones are dropped silently.
    pub fn poll(&mut self, out: &mut Vec<String>) {
        while let Ok(message) = self.lookup_rx.try_recv() {
            if self.forecast.apply(message) {
                out.extend(self.forecast.summary_lines());
                out.extend(self.forecast.future_lines());
            }
        }
    }

    fn lookup(&mut self, input: &str, out: &mut Vec<String>) {
        let query = match LocationQuery::parse(input) {
            Ok(query) => query,
            Err(e) => {
                out.push(e.into_app_error().user_message().to_string());
                return;
            }
        };

        let seq = request_lookup(
            &self.runtime,
            &self.lookup_tx,
            &self.tracker,
            self.geocoder.clone(),
            self.source.clone(),
            query.clone(),
        );
        self.forecast.begin(seq, query);
        out.extend(self.forecast.summary_lines());
    }

    fn save(&mut self, selector: PeriodSelector, date: Option<NaiveDate>, out: &mut Vec<String>) {
        let (Some(location), Some(period)) =
            (self.forecast.location_name(), self.forecast.period(selector))
        else {
            out.push("Nothing to save; look up a location first".to_string());
            return;
        };

        let date = date.unwrap_or_else(|| ForecastModel::default_date(period));
        let record = NewRecord::from_candidate(location, date, normalize(period));
        let key = record.key();

        match self.records.save(record) {
            SaveOutcome::Saved => out.push(format!("Saved {}", key)),
            SaveOutcome::Failed => out.push(format!("Could not save {}", key)),
            SaveOutcome::NeedsConfirmation { token, existing } => {
                out.push(format!(
                    "A record for {} already exists ({}°F, {}).",
                    key, existing.temperature, existing.forecast
                ));
                out.push(format!("Overwrite? confirm {} yes|no", token));
            }
        }
    }

    fn confirm(&mut self, token: ConfirmationToken, overwrite: bool, out: &mut Vec<String>) {
        let message = match self.records.confirm(token, overwrite) {
            Resolution::Committed(true) => "Record overwritten",
            Resolution::Committed(false) => "Could not overwrite record",
            Resolution::Cancelled => "Kept existing record",
            Resolution::UnknownToken => "No pending save for that token",
        };
        out.push(message.to_string());
    }

    fn select(&mut self, args: SelectArgs, out: &mut Vec<String>) {
        match args {
            SelectArgs::All => self.records.select_all(),
            SelectArgs::None => self.records.clear_selection(),
            SelectArgs::Rows(rows) => {
                for row in rows {
                    if self.records.toggle(row).is_none() {
                        out.push(format!("No row {}", row));
                    }
                }
            }
        }
        out.push(format!("{} selected", self.records.selected_count()));
    }

    fn delete(&mut self, out: &mut Vec<String>) {
        match self.records.delete_selected() {
            Ok(report) => {
                out.push(format!(
                    "Deleted {} of {} records",
                    report.deleted, report.requested
                ));
                self.render_listing(out);
            }
            Err(BulkDeleteError::EmptySelection) => out.push("No records selected".to_string()),
        }
    }

    fn render_listing(&self, out: &mut Vec<String>) {
        let records = self.records.records();
        if records.is_empty() {
            out.push(match self.records.filter() {
                Some(filter) => format!("No saved records matching '{}'", filter),
                None => "No saved records".to_string(),
            });
            return;
        }

        for (i, record) in records.iter().enumerate() {
            let mark = if self.records.is_selected(i) { "x" } else { " " };
            out.push(format!(
                "[{}] {:>2}. {}  {:<24} {:>4}°F  {} {}  {}",
                mark,
                i + 1,
                record.date.format(DATE_FORMAT),
                record.location,
                record.temperature,
                record.wind_speed,
                record.wind_direction,
                record.forecast
            ));
        }
    }
}
