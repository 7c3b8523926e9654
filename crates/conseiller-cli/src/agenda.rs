//! `conseiller agenda`: render dated items as a day-by-day agenda.

use std::path::Path;

use anyhow::Context;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, TimeZone};
use conseiller_core::{AgendaData, Identified, Period, build_agenda_data, build_agenda_data_strict};
use serde::{Deserialize, Serialize};

/// An appointment, action, or session as read from the items file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgendaItem {
    pub id: String,
    #[serde(default)]
    pub label: String,
    pub date: DateTime<FixedOffset>,
}

impl Identified for AgendaItem {
    fn id(&self) -> &str {
        &self.id
    }
}

pub fn run(
    items_path: &Path,
    start: NaiveDate,
    end: NaiveDate,
    utc_offset: i32,
    strict: bool,
    json: bool,
) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(items_path)
        .with_context(|| format!("reading {}", items_path.display()))?;
    let items: Vec<AgendaItem> =
        serde_json::from_str(&raw).with_context(|| format!("parsing {}", items_path.display()))?;

    let period = period(start, end, utc_offset)?;
    tracing::info!(items = items.len(), %start, %end, strict, "building agenda");

    let data = if strict {
        build_agenda_data_strict(items, &period, |item| item.date)?
    } else {
        build_agenda_data(items, &period, |item| item.date)
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&data)?);
    } else {
        print!("{}", render(&data));
    }
    Ok(())
}

fn period(start: NaiveDate, end: NaiveDate, utc_offset: i32) -> anyhow::Result<Period<FixedOffset>> {
    let offset = utc_offset
        .checked_mul(3600)
        .and_then(FixedOffset::east_opt)
        .with_context(|| format!("invalid UTC offset: {utc_offset}h"))?;
    let at_midnight = |day: NaiveDate| {
        offset
            .from_local_datetime(&day.and_time(NaiveTime::MIN))
            .single()
            .with_context(|| format!("no local midnight for {day}"))
    };
    Ok(Period::new(at_midnight(start)?, at_midnight(end)?))
}

// ── Text rendering ──

fn render(data: &AgendaData<AgendaItem>) -> String {
    let mut out = String::new();
    for (day, entry) in data.iter() {
        match entry {
            None => out.push_str(&format!("{day}  -\n")),
            Some(bucket) => {
                out.push_str(&format!("{day}  ({} items)\n", bucket.len()));
                render_half(&mut out, "morning", &bucket.morning);
                render_half(&mut out, "afternoon", &bucket.afternoon);
            }
        }
    }
    out
}

fn render_half(out: &mut String, header: &str, items: &[AgendaItem]) {
    if items.is_empty() {
        return;
    }
    out.push_str(&format!("  {header}\n"));
    for item in items {
        out.push_str(&format!(
            "    {}  {:<12} {}\n",
            item.date.format("%H:%M"),
            item.id,
            item.label
        ));
    }
}
