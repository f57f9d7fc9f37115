/// TripStats interactive CLI
///
/// Prompts for a city, month and day, prints the four statistic groups for
/// that selection, offers to page through the city's raw rows, and asks
/// whether to start over. `--city` runs a single non-interactive query.

use anyhow::{Context, Result};
use clap::Parser;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tripstats::config::{Config, DATA_DIR_ENV};
use tripstats::{
    run_query, City, DayFilter, DurationStats, FieldStat, FrequencyResult, Mode, MonthFilter, PageResponse,
    Paginator, QueryReport, Row, Selection, StationStats, Table, TimeStats, Timed, UserStats,
};

const RULE_WIDTH: usize = 40;

#[derive(Parser, Debug)]
#[command(name = "tripstats", version, about = "Explore US bike-share trip data")]
struct Cli {
    /// Directory holding chicago.csv, new_york_city.csv and washington.csv [default: .]
    #[arg(long, env = DATA_DIR_ENV)]
    data_dir: Option<PathBuf>,

    /// Run one query for this city and exit
    #[arg(long)]
    city: Option<String>,

    /// Month filter for --city (january..june or all)
    #[arg(long, default_value = "all", requires = "city")]
    month: String,

    /// Day filter for --city (weekday name or all)
    #[arg(long, default_value = "all", requires = "city")]
    day: String,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("warn"));

    let cli = Cli::parse();
    let config = cli.data_dir.clone().map(Config::new).unwrap_or_else(Config::from_env);

    match &cli.city {
        Some(city) => {
            let selection = Selection::parse(city, &cli.month, &cli.day)?;
            let cycle = run_query(&config.record_store(), &selection)
                .with_context(|| format!("query for {} failed", selection.city))?;
            let mut out = io::stdout().lock();
            print_report(&mut out, &cycle.report, cli.json)?;
            Ok(())
        }
        None => {
            let stdin = io::stdin();
            let mut console = Console {
                input: stdin.lock(),
                out: io::stdout().lock(),
            };
            interactive(&mut console, &config, cli.json)
        }
    }
}

struct Console<R, W> {
    input: R,
    out: W,
}

impl<R: BufRead, W: Write> Console<R, W> {
    /// Print `prompt` and read one lower-cased line. `None` on end of input.
    fn ask(&mut self, prompt: &str) -> Result<Option<String>> {
        write!(self.out, "{}", prompt)?;
        self.out.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_lowercase()))
    }

    /// Re-prompt until `parse` accepts the answer.
    fn ask_until<T>(
        &mut self,
        prompt: &str,
        error_message: &str,
        parse: impl Fn(&str) -> Option<T>,
    ) -> Result<Option<T>> {
        loop {
            let Some(answer) = self.ask(prompt)? else {
                return Ok(None);
            };
            match parse(&answer) {
                Some(value) => return Ok(Some(value)),
                None => writeln!(self.out, "{}", error_message)?,
            }
        }
    }
}

fn interactive<R: BufRead, W: Write>(console: &mut Console<R, W>, config: &Config, json: bool) -> Result<()> {
    let store = config.record_store();

    loop {
        let Some(selection) = get_filters(console)? else {
            break;
        };

        match run_query(&store, &selection) {
            Ok(cycle) => {
                print_report(&mut console.out, &cycle.report, json)?;
                if !browse_raw_data(console, &cycle.table)? {
                    break;
                }
            }
            Err(e) => writeln!(console.out, "\nCould not analyze {}: {}", selection.city, e)?,
        }

        let restart = console.ask("\nWould you like to restart? Enter yes or no.\n")?;
        if restart.as_deref() != Some("yes") {
            writeln!(console.out, "   THANK YOU   ")?;
            break;
        }
    }
    Ok(())
}

fn get_filters<R: BufRead, W: Write>(console: &mut Console<R, W>) -> Result<Option<Selection>> {
    writeln!(console.out, "Hello! Let's explore some US bikeshare data!")?;

    let Some(city) = console.ask_until(
        "Which city do you want to explore? Choose one:\nChicago\nNew York City\nWashington\n  ",
        "Invalid input! Please choose from: Chicago, New York City, or Washington",
        |s| s.parse::<City>().ok(),
    )?
    else {
        return Ok(None);
    };

    let Some(month) = console.ask_until(
        &format!("\nFilter {}'s data by month?\nJanuary, February, March, April, May, June, or 'all': ", city),
        "Invalid input! Please choose a valid month or 'all'",
        |s| s.parse::<MonthFilter>().ok(),
    )?
    else {
        return Ok(None);
    };

    let Some(day) = console.ask_until(
        &format!("\nFilter {}'s data by day?\nEnter day name or 'all': ", city),
        "Invalid input! Please enter a valid day or 'all'",
        |s| s.parse::<DayFilter>().ok(),
    )?
    else {
        return Ok(None);
    };

    writeln!(console.out, "{}", "-".repeat(RULE_WIDTH))?;
    Ok(Some(Selection::new(city, month, day)))
}

/// Page through the unfiltered table. Returns false when input ran out.
fn browse_raw_data<R: BufRead, W: Write>(console: &mut Console<R, W>, table: &Table) -> Result<bool> {
    writeln!(console.out, "\nRaw data is available to check...")?;
    let mut pages = Paginator::new(table);

    loop {
        let Some(answer) = console.ask("Would you like to see 5 rows of raw data? (yes/no): ")? else {
            pages.stop();
            return Ok(false);
        };

        match answer.as_str() {
            "yes" => match pages.next_page()? {
                PageResponse::Page(page) => {
                    print_rows(&mut console.out, table, page.start, &page.rows)?;
                    if page.is_last {
                        writeln!(console.out, "No more data to display.")?;
                        return Ok(true);
                    }
                }
                PageResponse::Exhausted | PageResponse::Stopped => {
                    writeln!(console.out, "No more data to display.")?;
                    return Ok(true);
                }
            },
            "no" => {
                pages.stop();
                writeln!(console.out, "\nThank you!")?;
                return Ok(true);
            }
            _ => writeln!(console.out, "Invalid input. Please enter \"yes\" or \"no\".")?,
        }
    }
}

fn print_rows(out: &mut dyn Write, table: &Table, start: usize, rows: &[Row]) -> io::Result<()> {
    writeln!(out, "\t{}", table.schema().get_column_names().join("\t"))?;
    for (offset, row) in rows.iter().enumerate() {
        let values: Vec<String> = row.iter().map(|(_, v)| v.to_string()).collect();
        writeln!(out, "{}\t{}", start + offset, values.join("\t"))?;
    }
    Ok(())
}

// ============================================================================
// Report rendering
// ============================================================================

fn print_report(out: &mut dyn Write, report: &QueryReport, json: bool) -> Result<()> {
    if json {
        let text = serde_json::to_string_pretty(report).context("failed to serialize report")?;
        writeln!(out, "{}", text)?;
        return Ok(());
    }

    let city = report.selection.city;
    section(out, "Calculating The Most Frequent Times of Travel...", &report.time, print_time)?;
    section(out, "Calculating The Most Popular Stations and Trip...", &report.stations, print_stations)?;
    section(out, "Calculating Trip Duration...", &report.durations, print_durations)?;
    section(out, "Calculating User Stats...", &report.users, |out, users| print_users(out, users, city))?;
    Ok(())
}

fn section<T>(
    out: &mut dyn Write,
    title: &str,
    group: &tripstats::Result<Timed<T>>,
    render: impl FnOnce(&mut dyn Write, &T) -> io::Result<()>,
) -> io::Result<()> {
    writeln!(out, "\n{}\n", title)?;
    match group {
        Ok(timed) => {
            render(out, &timed.result)?;
            writeln!(out, "\nThis took {} seconds.", timed.elapsed.as_secs_f64())?;
        }
        Err(e) => writeln!(out, "Could not compute this group: {}", e)?,
    }
    writeln!(out, "{}", "-".repeat(RULE_WIDTH))
}

fn mode_text<T: std::fmt::Display>(stat: &FieldStat<Mode<T>>) -> String {
    match stat {
        FieldStat::Available(mode) => mode.value.to_string(),
        FieldStat::Unavailable => "unavailable".to_string(),
        FieldStat::NoData => "no data".to_string(),
    }
}

fn print_time(out: &mut dyn Write, time: &TimeStats) -> io::Result<()> {
    if let Some(month) = &time.month {
        writeln!(out, "The most common month: {}", mode_text(month))?;
    }
    if let Some(day) = &time.day {
        writeln!(out, "The most common day: {}", mode_text(day))?;
    }
    writeln!(out, "The most common hour: {}", mode_text(&time.hour))
}

fn print_stations(out: &mut dyn Write, stations: &StationStats) -> io::Result<()> {
    writeln!(out, "The most commonly used start station: {}", mode_text(&stations.start_station))?;
    writeln!(out, "The most commonly used end station: {}", mode_text(&stations.end_station))?;
    writeln!(out, "The most frequent trip is: {}", mode_text(&stations.trip))
}

fn print_durations(out: &mut dyn Write, durations: &DurationStats) -> io::Result<()> {
    writeln!(out, "The total travel time is: {}", durations.total_seconds)?;
    match durations.mean_seconds {
        Some(mean) => writeln!(out, "The average travel time is: {}", mean)?,
        None => writeln!(out, "The average travel time is: no data")?,
    }
    if durations.excluded() > 0 {
        writeln!(
            out,
            "({} trip(s) with missing or invalid durations were left out)",
            durations.excluded()
        )?;
    }
    Ok(())
}

fn print_counts(out: &mut dyn Write, label: &str, counts: &FrequencyResult<String>) -> io::Result<()> {
    writeln!(out, "{}:", label)?;
    for (value, count) in counts.by_count() {
        writeln!(out, "  {:<12} {}", value, count)?;
    }
    Ok(())
}

fn print_users(out: &mut dyn Write, users: &UserStats, city: City) -> io::Result<()> {
    print_counts(out, "The counts of user types", &users.user_types)?;

    match &users.gender {
        FieldStat::Available(counts) => print_counts(out, "Counts of gender", counts)?,
        FieldStat::Unavailable => writeln!(out, "No available data for gender in {}!", city)?,
        FieldStat::NoData => writeln!(out, "No gender recorded for this selection.")?,
    }

    match &users.birth_year {
        FieldStat::Available(years) => {
            writeln!(out, "The earliest birth year: {}", years.earliest)?;
            writeln!(out, "The most recent birth year: {}", years.most_recent)?;
            writeln!(out, "The most common year of birth: {}", years.most_common)?;
        }
        FieldStat::Unavailable => writeln!(out, "No available data for birth year in {}!", city)?,
        FieldStat::NoData => writeln!(out, "No birth year recorded for this selection.")?,
    }
    Ok(())
}
