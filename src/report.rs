// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: (C) 2025 Cranky Kernel <crankykernel@proton.me>

use crate::digest::Digest;
use crate::expiry::{ExpiringProgramme, parse_expiry};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::cmp::Ordering;

#[derive(Debug, Clone, Serialize)]
pub struct ReportRow {
    pub time_left: String,
    #[serde(flatten)]
    pub programme: ExpiringProgramme,
}

fn plural(n: i64, unit: &str) -> String {
    if n == 1 {
        format!("{} {}", n, unit)
    } else {
        format!("{} {}s", n, unit)
    }
}

/// "EXPIRED" once past, otherwise days and hours left rounded to the nearest hour.
pub fn time_left(expiry: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let remaining = expiry - now;
    if remaining < chrono::Duration::zero() {
        return "EXPIRED".to_string();
    }

    let total_hours = (remaining.num_milliseconds() as f64 / 3_600_000.0).round() as i64;
    let days = total_hours / 24;
    let hours = total_hours % 24;

    let mut parts = Vec::new();
    if days > 0 {
        parts.push(plural(days, "day"));
    }
    if hours > 0 {
        parts.push(plural(hours, "hour"));
    }
    if parts.is_empty() {
        return "0 hours".to_string();
    }
    parts.join(", ")
}

fn expiry_of(programme: &ExpiringProgramme) -> Option<DateTime<Utc>> {
    parse_expiry(&programme.expired_at)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

/// Soonest first; entries whose date cannot be read go last.
pub fn sort_by_expiry(progs: &mut [ExpiringProgramme]) {
    progs.sort_by(|a, b| match (expiry_of(a), expiry_of(b)) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}

pub fn build_rows(digest: &Digest, now: DateTime<Utc>) -> Vec<ReportRow> {
    let mut progs = digest.progs.clone();
    sort_by_expiry(&mut progs);

    progs
        .into_iter()
        .map(|programme| ReportRow {
            time_left: expiry_of(&programme)
                .map(|t| time_left(t, now))
                .unwrap_or_else(|| "?".to_string()),
            programme,
        })
        .collect()
}

pub fn render_text(digest: &Digest, rows: &[ReportRow]) -> String {
    let left_width = rows
        .iter()
        .map(|r| r.time_left.chars().count())
        .chain(std::iter::once("Time left".len()))
        .max()
        .unwrap_or(0);
    let prog_width = rows
        .iter()
        .map(|r| r.programme.prog_name.chars().count())
        .chain(std::iter::once("Programme".len()))
        .max()
        .unwrap_or(0);

    let mut out = String::new();
    out.push_str(&format!(
        "{:<lw$}  {:<pw$}  {}\n",
        "Time left",
        "Programme",
        "Episode",
        lw = left_width,
        pw = prog_width
    ));
    for row in rows {
        out.push_str(&format!(
            "{:<lw$}  {:<pw$}  {}\n",
            row.time_left,
            row.programme.prog_name,
            row.programme.ep_name,
            lw = left_width,
            pw = prog_width
        ));
    }
    out.push_str(&format!("\nLast updated: {}\n", digest.last_updated));
    out
}
