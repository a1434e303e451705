//! Notification text for one (encounter, subscriber) pair.

use std::fmt::{Display, Write as _};

use chrono::{Local, TimeZone};

use crate::geo::{format_distance, haversine};
use crate::lookup::NameTable;
use crate::model::{Encounter, Subscriber};

const MISSING: &str = "?";

/// Rendered notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Markdown title line.
    pub title: String,
    /// Distance, expiry and moves, one per line.
    pub body: String,
}

impl Notification {
    /// Text message form: title and body on separate lines.
    pub fn text(&self) -> String {
        format!("{}\n{}", self.title, self.body)
    }
}

/// Render with the host's local time zone for the expiry clock.
pub fn render(
    names: &NameTable,
    subscriber: &Subscriber,
    encounter: &Encounter,
    now: i64,
) -> Notification {
    render_in(names, subscriber, encounter, now, &Local)
}

pub fn render_in<Tz>(
    names: &NameTable,
    subscriber: &Subscriber,
    encounter: &Encounter,
    now: i64,
    tz: &Tz,
) -> Notification
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    Notification {
        title: title(names, subscriber, encounter),
        body: body(names, subscriber, encounter, now, tz),
    }
}

fn title(names: &NameTable, subscriber: &Subscriber, encounter: &Encounter) -> String {
    let language = subscriber.language.as_str();
    let name = names.entity_name(encounter.entity_id, language);

    let form = match names.form(encounter.entity_id, encounter.form) {
        Some(form) => {
            let costume = if form.is_costume { "👕 " } else { "" };
            format!(" ({}{})", costume, names.translate(&form.name, language))
        }
        None => String::new(),
    };

    let cp_label = if language == "en" { "CP" } else { "WP" };

    format!(
        "*🔔 {}{} {} {:.1}% {}|{}|{} {}{} L{}*{}{}",
        name,
        form,
        gender_glyph(encounter.gender),
        encounter.quality,
        or_missing(encounter.attack),
        or_missing(encounter.defense),
        or_missing(encounter.stamina),
        or_missing(encounter.cp),
        cp_label,
        or_missing(encounter.level),
        size_marker(encounter.size),
        weather_marker(encounter.weather),
    )
}

fn body<Tz>(
    names: &NameTable,
    subscriber: &Subscriber,
    encounter: &Encounter,
    now: i64,
    tz: &Tz,
) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let mut body = String::new();

    if let Some(home) = subscriber.location() {
        let distance = haversine(home, encounter.location());
        let _ = writeln!(body, "📍 {}", format_distance(distance));
    }

    let clock = match tz.timestamp_opt(encounter.expires_at, 0).single() {
        Some(at) => at.format("%H:%M:%S").to_string(),
        None => MISSING.to_string(),
    };
    let _ = write!(
        body,
        "💨 {} ⏳ {}",
        clock,
        format_countdown(encounter.expires_at - now)
    );

    if let (Some(move_1), Some(move_2)) = (encounter.move_1, encounter.move_2) {
        let language = subscriber.language.as_str();
        let _ = write!(
            body,
            "\n💥 {} / {}",
            names.move_name(move_1, language),
            names.move_name(move_2, language)
        );
    }

    body
}

/// Media URL for the encounter's entity, with a form suffix for non-default
/// forms.
pub fn sticker_url(base_url: &str, names: &NameTable, encounter: &Encounter) -> String {
    let suffix = match names.form(encounter.entity_id, encounter.form) {
        Some(form) => format!("_f{}", form.id),
        None => String::new(),
    };
    format!(
        "{}/pokemon/{}{}.webp",
        base_url.trim_end_matches('/'),
        encounter.entity_id,
        suffix
    )
}

/// Remaining time as hours, minutes and seconds (`1h2m3s`, `4m5s`, `9s`).
/// Negative durations render as `0s`.
pub fn format_countdown(seconds: i64) -> String {
    let seconds = seconds.max(0);
    let (hours, minutes, secs) = (seconds / 3600, (seconds % 3600) / 60, seconds % 60);
    if hours > 0 {
        format!("{}h{}m{}s", hours, minutes, secs)
    } else if minutes > 0 {
        format!("{}m{}s", minutes, secs)
    } else {
        format!("{}s", secs)
    }
}

fn or_missing<T: Display>(value: Option<T>) -> String {
    value.map_or_else(|| MISSING.to_string(), |v| v.to_string())
}

fn gender_glyph(gender: Option<u8>) -> &'static str {
    match gender {
        Some(1) => "♂",
        Some(2) => "♀",
        Some(3) => "⚲",
        Some(_) => "",
        None => MISSING,
    }
}

fn size_marker(size: Option<u8>) -> &'static str {
    match size {
        Some(1) => " 🔹",
        Some(5) => " 🔶",
        _ => "",
    }
}

fn weather_marker(weather: Option<u8>) -> &'static str {
    match weather {
        Some(1) => " ☀️",
        Some(2) => " ☔️",
        Some(3) => " ⛅",
        Some(4) => " ☁️",
        Some(5) => " 💨",
        Some(6) => " ⛄️",
        Some(7) => " 🌁",
        _ => "",
    }
}
