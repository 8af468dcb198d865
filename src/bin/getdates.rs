use clap::{Args, Parser, Subcommand, ValueEnum};
use getdates::config::{parse_date, parse_weekday};
use getdates::{
    Bound, Interval, MonthlyTarget, OutputFormat, OverflowPolicy, RecurrenceConfig,
    RecurrenceError,
};
use jiff::tz::TimeZone;
use jiff::Zoned;
use log::{debug, info};
use std::process;

#[derive(Parser)]
#[command(
    name = "getdates",
    about = "Generate sequences of dates from recurrence rules",
    version
)]
struct Cli {
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Subcommand)]
enum Mode {
    /// Reference-date mode: every N days or weeks, or every next/previous weekday
    #[command(name = "r", alias = "reference")]
    Reference(SeriesArgs),
    /// Monthly mode: the Kth day or the Nth weekday of every M months
    #[command(name = "m", alias = "monthly")]
    Monthly(SeriesArgs),
}

#[derive(Args)]
struct SeriesArgs {
    /// Start date (YYYY-MM-DD). Defaults to today.
    #[arg(short, long)]
    start: Option<String>,

    /// End date (YYYY-MM-DD), inclusive
    #[arg(short, long)]
    end: Option<String>,

    /// Number of repetitions
    #[arg(short = 'n', long = "count")]
    count: Option<u32>,

    /// Step in days (reference mode) or day of month, negative counts from the end (monthly mode)
    #[arg(short, long, allow_negative_numbers = true)]
    days: Option<i32>,

    /// Step in weeks (reference mode only)
    #[arg(short, long, allow_negative_numbers = true)]
    weeks: Option<i32>,

    /// Weekday: sun, mon, tue, wed, thu, fri, sat
    #[arg(short = 'k', long)]
    weekday: Option<String>,

    /// Weekday ordinal, negative counts backward
    #[arg(long, allow_negative_numbers = true)]
    kn: Option<i32>,

    /// Months per repetition (monthly mode only)
    #[arg(short = 'i', long, default_value = "1")]
    interval: u32,

    /// What to do when a month lacks the requested day (monthly mode only)
    #[arg(long, value_enum, default_value = "skip")]
    overflow: OverflowArg,

    /// Human readable output (YYYY-MM-DD Www)
    #[arg(short = 'H', long)]
    human: bool,

    /// Output ISO dates (YYYY-MM-DD)
    #[arg(long, conflicts_with = "human")]
    iso: bool,

    /// Output as a JSON array of ISO dates
    #[arg(long)]
    json: bool,

    /// Print the validated configuration as JSON and exit
    #[arg(long)]
    show_config: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum OverflowArg {
    Skip,
    Clamp,
}

impl From<OverflowArg> for OverflowPolicy {
    fn from(arg: OverflowArg) -> Self {
        match arg {
            OverflowArg::Skip => OverflowPolicy::Skip,
            OverflowArg::Clamp => OverflowPolicy::Clamp,
        }
    }
}

impl SeriesArgs {
    fn unit_flags(&self) -> usize {
        [self.days.is_some(), self.weeks.is_some(), self.weekday.is_some()]
            .into_iter()
            .filter(|set| *set)
            .count()
    }

    fn end_flags(&self) -> usize {
        [self.end.is_some(), self.count.is_some()]
            .into_iter()
            .filter(|set| *set)
            .count()
    }

    fn output_format(&self) -> OutputFormat {
        if self.human {
            OutputFormat::Human
        } else if self.iso {
            OutputFormat::Iso
        } else {
            OutputFormat::Unix
        }
    }

    fn start_and_bound(&self) -> Result<(jiff::civil::Date, Bound), RecurrenceError> {
        let start = match &self.start {
            Some(s) => parse_date(s)?,
            None => Zoned::now().date(),
        };
        let bound = match (&self.end, self.count) {
            (Some(end), _) => Bound::Until(parse_date(end)?),
            (None, Some(n)) => Bound::Count(n),
            (None, None) => return Err(RecurrenceError::config("One of -e or -n must be used.")),
        };
        Ok((start, bound))
    }

    fn weekday(&self) -> Result<Option<getdates::Weekday>, RecurrenceError> {
        match &self.weekday {
            Some(name) => parse_weekday(name).map(Some).ok_or_else(|| {
                RecurrenceError::parse(
                    "unknown weekday, expected one of sun, mon, tue, wed, thu, fri, sat",
                    name.as_str(),
                )
            }),
            None => Ok(None),
        }
    }

    fn reference_config(&self) -> Result<RecurrenceConfig, RecurrenceError> {
        let (start, bound) = self.start_and_bound()?;
        let interval = match (self.days, self.weeks, self.weekday()?) {
            (Some(days), _, _) => Interval::Days(days),
            (_, Some(weeks), _) => Interval::weeks(weeks)?,
            (_, _, Some(weekday)) => Interval::Weekday {
                weekday,
                ordinal: self.kn.unwrap_or(1),
            },
            _ => {
                return Err(RecurrenceError::config(
                    "One of -d, -w, or -k must be used.",
                ))
            }
        };
        RecurrenceConfig::reference(start, bound, interval)
    }

    fn monthly_config(&self) -> Result<RecurrenceConfig, RecurrenceError> {
        if self.weeks.is_some() {
            return Err(RecurrenceError::config(
                "-w is not supported in monthly mode, use -d or -k",
            ));
        }
        let (start, bound) = self.start_and_bound()?;
        let target = match (self.days, self.weekday()?) {
            (Some(day), _) => MonthlyTarget::day_of_month(day)?,
            (_, Some(weekday)) => {
                let ordinal = self.kn.ok_or_else(|| {
                    RecurrenceError::config("--kn is required with -k in monthly mode")
                })?;
                MonthlyTarget::weekday_of_month(ordinal, weekday)?
            }
            _ => return Err(RecurrenceError::config("One of -d or -k must be used.")),
        };
        Ok(RecurrenceConfig::monthly(start, bound, target)?
            .with_months_per_step(self.interval)?
            .with_overflow(self.overflow.into()))
    }
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let args = match &cli.mode {
        Mode::Reference(args) | Mode::Monthly(args) => args,
    };

    if let Err(e) = check_flags(args) {
        // Flag misuse is reported bare, on stdout.
        println!("{e}");
        process::exit(1);
    }

    let result = match &cli.mode {
        Mode::Reference(args) => args.reference_config(),
        Mode::Monthly(args) => args.monthly_config(),
    };
    let config = match result {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}", e.display_rich());
            process::exit(1);
        }
    };

    debug!("generating {config}");

    if args.show_config {
        match config.to_json() {
            Ok(json) => {
                println!("{json}");
                process::exit(0);
            }
            Err(e) => {
                eprintln!("error: failed to serialize: {e}");
                process::exit(1);
            }
        }
    }

    let dates = match config.generate() {
        Ok(d) => d,
        Err(e) => {
            eprintln!("{}", e.display_rich());
            process::exit(1);
        }
    };
    info!("generated {} dates", dates.len());

    if args.json {
        let iso_strings: Vec<String> = dates.iter().map(|d| d.to_string()).collect();
        match serde_json::to_string(&iso_strings) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("error: failed to serialize: {e}");
                process::exit(1);
            }
        }
        return;
    }

    let format = args.output_format();
    let tz = TimeZone::system();
    for date in dates {
        match format.format(date, &tz) {
            Ok(line) => println!("{line}"),
            Err(e) => {
                eprintln!("{}", e.display_rich());
                process::exit(1);
            }
        }
    }
}

/// Exactly one unit flag and exactly one bound flag must be given.
fn check_flags(args: &SeriesArgs) -> Result<(), RecurrenceError> {
    if args.unit_flags() != 1 {
        return Err(RecurrenceError::config(
            "One of -d, -w, or -k must be used.",
        ));
    }
    if args.end_flags() != 1 {
        return Err(RecurrenceError::config("One of -e or -n must be used."));
    }
    Ok(())
}
