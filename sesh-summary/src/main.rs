//! sesh-summary - Streaming history in review
//!
//! Reads a directory of streaming-history export files, computes the full
//! report and prints a Wrapped-style summary. The report itself is written
//! as JSON for the summary page assembler.
//!
//! Uses XDG Base Directory specification for file locations:
//! - Logs: $XDG_STATE_HOME/sesh/sesh.log (~/.local/state/sesh/sesh.log)
//! - Config: $XDG_CONFIG_HOME/sesh/config.toml (~/.config/sesh/config.toml)

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use sesh_core::analytics::seasonal_echoes;
use sesh_core::format::{format_count, format_date, format_duration_hms, month_name};
use sesh_core::{Config, Dimension, Report, ReportContext, ReportOutcome, Scope};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "sesh-summary")]
#[command(about = "Streaming history summary - your listening in review")]
#[command(version)]
struct Args {
    /// Directory holding the `*.json` export files (default: input.dir from config)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Only count plays longer than this many milliseconds
    #[arg(long)]
    min_ms: Option<i64>,

    /// Ignore plays before this year
    #[arg(long)]
    min_year: Option<i32>,

    /// Reference date for streaks (format: YYYY-MM-DD, default: today)
    #[arg(long)]
    as_of: Option<String>,

    /// Write the full report as JSON to this file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Pretty-print the JSON report
    #[arg(long)]
    pretty: bool,

    /// Show repeats for one calendar day (format: MM-DD)
    #[arg(long)]
    on_this_day: Option<String>,

    /// Re-rank Seasonal Echoes for this month (1-12) as a viewer would
    #[arg(long)]
    seasonal_month: Option<u32>,

    /// Print a JSON summary instead of the terminal view
    #[arg(long)]
    json: bool,

    /// Disable fun mode (no emoji, no personality blurb)
    #[arg(long)]
    serious: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration and initialize logging
    let mut config = Config::load().context("failed to load configuration")?;
    let _log_guard =
        sesh_core::logging::init(&config.logging).context("failed to initialize logging")?;

    // Command-line overrides go through the same validation as the file
    if let Some(min_ms) = args.min_ms {
        config.filters.min_ms_played = min_ms;
    }
    if let Some(min_year) = args.min_year {
        config.filters.min_year = Some(min_year);
    }
    let config = config.validate();

    let input = args
        .input
        .clone()
        .or_else(|| config.input.dir.clone())
        .context("no input directory: pass --input or set input.dir in config.toml")?;

    let on_this_day = args
        .on_this_day
        .as_deref()
        .map(parse_month_day)
        .transpose()?;
    if let Some(month) = args.seasonal_month {
        if !(1..=12).contains(&month) {
            anyhow::bail!("Seasonal month must be between 1 and 12");
        }
    }

    let cancel = Arc::new(AtomicBool::new(false));
    let flag = cancel.clone();
    ctrlc::set_handler(move || {
        eprintln!("\nCancelling after the current file...");
        flag.store(true, Ordering::SeqCst);
    })
    .context("failed to set Ctrl+C handler")?;

    let mut context = ReportContext::new(config).with_cancel(cancel);
    if let Some(as_of) = &args.as_of {
        let as_of = NaiveDate::parse_from_str(as_of, "%Y-%m-%d")
            .context("Invalid --as-of date. Use YYYY-MM-DD (e.g., 2024-12-31)")?;
        context = context.with_as_of(as_of);
    }

    tracing::info!(input = %input.display(), run_id = %context.run_id(), "sesh-summary starting");

    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .context("invalid progress template")?
            .progress_chars("#>-"),
    );

    let outcome = context
        .generate(&input, |current, total, path| {
            if current == 0 {
                pb.set_length(total as u64);
            }
            pb.set_position(current as u64);
            pb.set_message(
                path.file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or("...")
                    .to_string(),
            );
        })
        .with_context(|| format!("failed to read {}", input.display()))?;

    pb.finish_and_clear();

    let report = match outcome {
        ReportOutcome::Ready(report) => report,
        ReportOutcome::Empty { load_stats } => {
            println!(
                "No qualifying plays found ({} files read, {} records filtered by duration).",
                load_stats.files_read, load_stats.filtered_by_duration
            );
            return Ok(());
        }
        ReportOutcome::Cancelled { load_stats } => {
            println!("Cancelled after {} files.", load_stats.files_read);
            return Ok(());
        }
    };

    if let Some(path) = &args.output {
        report
            .write_json(path, args.pretty)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
    }

    if args.json {
        print_json(&report)?;
    } else {
        print_terminal(&report, !args.serious);
    }

    if let Some((month, day)) = on_this_day {
        print_on_this_day(&mut context, month, day, !args.serious);
    }

    if let Some(month) = args.seasonal_month {
        print_seasonal(&report, month, !args.serious);
    }

    if let Some(path) = &args.output {
        println!("Report written to {}", path.display());
    }

    tracing::info!(
        plays = report.stats.tracks.total_plays,
        files_read = report.load_stats.files_read,
        "sesh-summary complete"
    );

    Ok(())
}

/// Parse `MM-DD`, accepting Feb 29.
fn parse_month_day(value: &str) -> Result<(u32, u32)> {
    let (month, day) = value
        .split_once('-')
        .context("Invalid day format. Use MM-DD (e.g., 03-15)")?;
    let month: u32 = month.parse().context("Invalid month")?;
    let day: u32 = day.parse().context("Invalid day")?;
    if NaiveDate::from_ymd_opt(2000, month, day).is_none() {
        anyhow::bail!("{}-{} is not a calendar day", month, day);
    }
    Ok((month, day))
}

fn section(title: &str, emoji: &str, fun_mode: bool) {
    if fun_mode {
        println!("{} {}", emoji, title);
    } else {
        println!("{}", title);
    }
}

fn print_terminal(report: &Report, fun_mode: bool) {
    let stats = &report.stats;
    let title = if fun_mode {
        "🎧 YOUR LISTENING IN REVIEW 🎧"
    } else {
        "Listening Summary"
    };

    // Header
    println!();
    println!("╭{}╮", "─".repeat(60));
    println!("│{:^60}│", title);
    println!("╰{}╯", "─".repeat(60));
    println!();

    // The Numbers
    section("THE NUMBERS", "📊", fun_mode);
    println!(
        "   Time:     {:<14} Plays:  {}",
        stats.tracks.total_time_display(),
        format_count(stats.tracks.total_plays)
    );
    println!(
        "   Artists:  {:<14} Tracks: {}",
        format_count(stats.library.artists_count),
        format_count(stats.library.tracks_count)
    );
    println!(
        "   Albums:   {:<14} Days:   {} of {} ({:.0}%)",
        format_count(stats.library.albums_count),
        stats.overview.days_played,
        stats.overview.days_since_first,
        stats.overview.pct_days_played
    );
    if let Some(first) = &stats.overview.first_play {
        println!("   First:    {}", first.description);
    }
    println!();

    // Top artists and tracks
    for (dimension, heading, emoji) in [
        (Dimension::Artist, "TOP ARTISTS", "🏆"),
        (Dimension::Track, "TOP TRACKS", "🎵"),
    ] {
        let Some(rows) = report.table(dimension, Scope::All) else {
            continue;
        };
        if rows.is_empty() {
            continue;
        }
        section(heading, emoji, fun_mode);
        let names = report.names.get(dimension);
        for (i, row) in rows.iter().take(5).enumerate() {
            let rank = match i {
                0 if fun_mode => "🥇".to_string(),
                1 if fun_mode => "🥈".to_string(),
                2 if fun_mode => "🥉".to_string(),
                _ => format!("{}.", i + 1),
            };
            let name = names
                .get(row.id.index())
                .map(String::as_str)
                .unwrap_or(dimension.unknown_label());
            println!(
                "   {} {:<36} {:>10}  {:>6} plays",
                rank,
                truncate(name, 36),
                format_duration_hms(row.ms_played),
                row.play_count
            );
        }
        println!();
    }

    // Time Patterns
    section("TIME PATTERNS", "⏰", fun_mode);
    println!("   Peak hour:    {}", stats.patterns.peak_hour_display());
    println!("   Busiest day:  {}", stats.patterns.busiest_weekday_name());
    if let Some(day) = &stats.milestones.day {
        println!("   Biggest day:  {} ({} plays)", day.label, day.plays);
    }
    println!("   Offline:      {}", stats.ratios.offline_online_display());
    println!();

    // Streaks
    section("STREAKS", "🔥", fun_mode);
    println!(
        "   Current:  {} day{}",
        stats.streaks.current_streak_days,
        plural(stats.streaks.current_streak_days)
    );
    if stats.streaks.longest_streak_days > 0 {
        let streak_dates = match (
            stats.streaks.longest_streak_start,
            stats.streaks.longest_streak_end,
        ) {
            (Some(start), Some(end)) => format!(" ({} - {})", format_date(start), format_date(end)),
            _ => String::new(),
        };
        println!(
            "   Longest:  {} day{}{}",
            stats.streaks.longest_streak_days,
            plural(stats.streaks.longest_streak_days),
            streak_dates
        );
    }
    if stats.hiatus.longest_days > 0 {
        println!(
            "   Hiatus:   {} day{}",
            stats.hiatus.longest_days,
            plural(stats.hiatus.longest_days)
        );
    }
    println!(
        "   Sessions: {} (longest {})",
        stats.sessions.count,
        format_duration_hms(stats.sessions.longest_length_secs * 1000)
    );
    println!();

    // Smart playlists
    let playlists = &report.playlists.playlists;
    if !playlists.is_empty() {
        section("SMART PLAYLISTS", "📀", fun_mode);
        for playlist in playlists {
            println!(
                "   {:<32} {:>3} track{}",
                playlist.definition.name,
                playlist.items.len(),
                plural(playlist.items.len() as u64)
            );
        }
        println!();
    }

    // Personality
    let personality = &report.personality;
    if fun_mode {
        println!(
            "{} YOUR PERSONALITY: {}",
            personality.primary.emoji(),
            personality.name
        );
        println!("   \"{}\"", personality.description);
    } else {
        println!("PERSONALITY: {}", personality.name);
    }
    println!();
}

fn print_on_this_day(context: &mut ReportContext, month: u32, day: u32, fun_mode: bool) {
    let title = format!("ON THIS DAY: {} {}", month_name(month), day);
    section(&title, "📅", fun_mode);
    let entries = context.on_this_day(month, day);
    if entries.is_empty() {
        println!("   No repeats on this day.");
    }
    for entry in entries.iter().take(10) {
        println!(
            "   {}  {:<40} {:>3}x",
            format_date(entry.date),
            truncate(&entry.label, 40),
            entry.play_count
        );
    }
    println!();
}

fn print_seasonal(report: &Report, month: u32, fun_mode: bool) {
    let title = format!("SEASONAL ECHOES: {}", month_name(month));
    section(&title, "🍂", fun_mode);
    let picks = seasonal_echoes(
        &report.playlists.seasonal_index,
        month,
        report.presentation.items_per_page,
    );
    if picks.is_empty() {
        println!("   Nothing echoes from past {}s.", month_name(month));
    }
    for pick in picks {
        let name = report
            .names
            .track
            .get(pick.track.index())
            .map(String::as_str)
            .unwrap_or(Dimension::Track.unknown_label());
        println!("   {:<44} {:>10}", truncate(name, 44), format_duration_hms(pick.score));
    }
    println!();
}

fn print_json(report: &Report) -> Result<()> {
    let stats = &report.stats;
    let top = |dimension: Dimension| {
        report
            .table(dimension, Scope::All)
            .unwrap_or_default()
            .iter()
            .take(5)
            .map(|row| {
                serde_json::json!({
                    "name": report.names.get(dimension).get(row.id.index()),
                    "ms_played": row.ms_played,
                    "plays": row.play_count,
                })
            })
            .collect::<Vec<_>>()
    };

    let json = serde_json::json!({
        "run_id": report.run_id.to_string(),
        "as_of": report.as_of.to_string(),
        "totals": {
            "ms_played": stats.tracks.total_ms,
            "plays": stats.tracks.total_plays,
            "artists": stats.library.artists_count,
            "tracks": stats.library.tracks_count,
            "albums": stats.library.albums_count,
            "days_played": stats.overview.days_played,
        },
        "top_artists": top(Dimension::Artist),
        "top_tracks": top(Dimension::Track),
        "streaks": {
            "current": stats.streaks.current_streak_days,
            "longest": stats.streaks.longest_streak_days,
            "longest_hiatus": stats.hiatus.longest_days,
        },
        "personality": report.personality.name,
        "playlists": report.playlists.playlists.iter().map(|p| serde_json::json!({
            "name": p.definition.name,
            "tracks": p.items.len(),
        })).collect::<Vec<_>>(),
    });

    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}

fn plural(count: u64) -> &'static str {
    if count == 1 {
        ""
    } else {
        "s"
    }
}

fn truncate(value: &str, max: usize) -> String {
    if value.chars().count() <= max {
        value.to_string()
    } else {
        let mut out: String = value.chars().take(max.saturating_sub(1)).collect();
        out.push('…');
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_month_day() {
        assert_eq!(parse_month_day("03-15").unwrap(), (3, 15));
        assert_eq!(parse_month_day("02-29").unwrap(), (2, 29));
        assert!(parse_month_day("02-30").is_err());
        assert!(parse_month_day("315").is_err());
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghij", 5), "abcd…");
    }
}
