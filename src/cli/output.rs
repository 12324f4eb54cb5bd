use ansi_term::{Colour, Style};
use chrono::{Duration, Local};

use crate::{
    monitor::{
        processing::recorder::SessionView,
        session::{
            entities::{FocusLevel, Sample},
            report::SessionReport,
        },
    },
    suggestion::Suggestion,
};

/// Prints every sample and suggestion change as it happens.
pub struct ConsoleView;

impl SessionView for ConsoleView {
    fn sample_recorded(&mut self, sample: &Sample) {
        println!(
            "{}\t{}\t{}",
            sample.timestamp.with_timezone(&Local).format("%H:%M:%S"),
            sample.mood,
            paint_focus(sample.focus)
        );
    }

    fn suggestion_changed(&mut self, suggestion: Suggestion) {
        println!("{} {suggestion}", Style::new().bold().paint("Suggestion:"));
    }
}

fn level_colour(level: FocusLevel) -> Colour {
    match level {
        FocusLevel::High => Colour::Green,
        FocusLevel::Medium => Colour::Yellow,
        FocusLevel::Low => Colour::Red,
    }
}

pub fn paint_focus(focus: f64) -> String {
    let level = FocusLevel::from_focus(focus);
    level_colour(level)
        .paint(format!("{focus:.2} ({level})"))
        .to_string()
}

pub fn format_duration(v: Duration) -> String {
    if v.num_hours() > 0 {
        format!(
            "{}h{}m{}s",
            v.num_hours(),
            v.num_minutes() % 60,
            v.num_seconds() % 60
        )
    } else if v.num_minutes() > 0 {
        format!("{}m{}s", v.num_minutes() % 60, v.num_seconds() % 60)
    } else {
        format!("{}s", v.num_seconds() % 60)
    }
}

fn heading(text: &str) {
    println!();
    println!("{}", Style::new().bold().underline().paint(text));
}

/// Text rendition of the dashboard, mood analysis, focus tracking and recommendation views.
pub fn print_report(report: &SessionReport) {
    println!(
        "Session started {} ({}, {} samples)",
        report.started_at.with_timezone(&Local).format("%x %H:%M:%S"),
        format_duration(report.duration()),
        report.total_samples
    );

    let Some(latest) = &report.latest else {
        println!("No samples were recorded.");
        return;
    };

    heading("Dashboard");
    println!("Current mood\t{}", latest.mood);
    println!("Current focus\t{}", paint_focus(latest.focus));

    heading("Mood analysis");
    for entry in &report.mood_counts {
        println!("{}\t{}\t{:.2}%", entry.mood, entry.count, entry.share);
    }
    if let Some(mood) = report.most_common_mood {
        println!("Most common\t{mood}");
    }

    heading("Focus tracking");
    if let (Some(average), Some(peak)) = (report.average_focus, report.peak_focus) {
        println!("Average\t{}", paint_focus(average));
        println!("Peak\t{peak:.2}");
    }
    for point in &report.focus_trend {
        println!(
            "{}\t{:.2}\t{} samples",
            point.start.with_timezone(&Local).format("%H:%M:%S"),
            point.average,
            point.samples
        );
    }

    heading("Recommendations");
    match report.suggestion {
        Some(suggestion) => println!("{suggestion}"),
        None => println!("Not enough data yet, the first suggestion comes after two minutes."),
    }
}
