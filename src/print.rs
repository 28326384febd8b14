// Terminal presentation of trips, scores and badges

use chrono::DateTime;
use colored::{Color, ColoredString, Colorize};

use crate::model::{Badge, BadgeType, ScoreEntry, Scores, Trip};

pub fn print_trip(trip: &Trip) {
    println!("Trip ID:             {}", trip.trip_id);
    println!(
        "Startzeit:           {}",
        format_timestamp(trip.trip_start_timestamp_local, "%Y-%m-%d %H:%M:%S")
    );
    if let Some(start) = &trip.start_point_string {
        println!("Startort:            {start}");
    }
    println!(
        "Endzeit:             {}",
        format_timestamp(trip.trip_end_timestamp_local, "%Y-%m-%d %H:%M:%S")
    );
    if let Some(end) = &trip.end_point_string {
        println!("Endort:              {end}");
    }
    println!("Distanz (km):        {:.2}", trip.kilometers);
    println!("Durchschnitt (km/h): {:.2}", trip.avg_kilometers_per_hour);
    println!("Fahrzeit:            {}", format_duration(trip.seconds));
    println!("Standzeit:           {}", format_duration(trip.seconds_of_idling));
    println!("Scores:");
    print_scores(&trip.trip_scores.scores);
}

pub fn print_scores(scores: &Scores) {
    println!("Gesamtscore:           {}", colored_score(scores.overall));
    println!("Bremsverhalten:        {}", colored_score(scores.harsh_braking));
    println!("Beschleunigung:        {}", colored_score(scores.harsh_acceleration));
    println!("Kurvenfahrverhalten:   {}", colored_score(scores.harsh_cornering));
    println!("Geschwindigkeit:       {}", colored_score(scores.speeding));
    println!("Tag, Zeit, Straßenart: {}", colored_score(scores.payd));
}

pub fn print_score_entry(entry: &ScoreEntry) {
    println!("Datum: {}", format_timestamp(entry.date, "%Y-%m-%d"));
    print_scores(&entry.scores);
}

pub fn print_badge(badge: &Badge) {
    let rank = badge_rank(badge.level).on_color(badge_color(badge.level));
    match badge.badge_type {
        BadgeType::Month => println!("{}: {rank}", format_timestamp(badge.date, "%B %Y")),
        BadgeType::Day => println!("{}: {rank}", format_timestamp(badge.date, "%Y-%m-%d")),
    }
}

pub fn print_separator() {
    println!("{}", "-".repeat(20));
}

fn colored_score(score: f64) -> ColoredString {
    score.to_string().on_color(score_color(score))
}

fn score_color(score: f64) -> Color {
    if score >= 90.0 {
        Color::Yellow
    } else if score >= 80.0 {
        Color::BrightWhite
    } else if score >= 70.0 {
        Color::BrightRed
    } else if score >= 50.0 {
        Color::BrightBlue
    } else {
        Color::Red
    }
}

fn badge_rank(level: u32) -> &'static str {
    match level {
        1 => "GOLD",
        2 => "SILBER",
        3 => "BRONZE",
        5 => "ROT",
        _ => "BLAU",
    }
}

fn badge_color(level: u32) -> Color {
    match level {
        1 => Color::Yellow,
        2 => Color::BrightWhite,
        3 => Color::BrightRed,
        5 => Color::Red,
        _ => Color::Blue,
    }
}

// The local timestamps arrive pre-shifted to wall-clock time, so they are
// formatted as if they were UTC.
fn format_timestamp(epoch_millis: i64, format: &str) -> String {
    DateTime::from_timestamp_millis(epoch_millis)
        .map(|dt| dt.format(format).to_string())
        .unwrap_or_else(|| epoch_millis.to_string())
}

fn format_duration(total_seconds: i64) -> String {
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    format!("{hours}:{minutes:02}:{seconds:02}")
}
