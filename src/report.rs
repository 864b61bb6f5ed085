//! Terminal rendering for the CLI: aligned tables via tabwriter, or JSON.

use std::collections::BTreeMap;
use std::io::{self, Write};

use serde::Serialize;
use tabwriter::TabWriter;

use crate::aggregate::summarize;
use crate::directory::{category_label, CountryDirectory, NO_DATA_MESSAGE};
use crate::extract::display_time_value;
use crate::types::{CategorySeries, InCanadaServices, ProcessingRow};

pub fn write_json<W: Write, T: Serialize + ?Sized>(out: W, value: &T) -> io::Result<()> {
    let mut out = out;
    serde_json::to_writer_pretty(&mut out, value).map_err(io::Error::other)?;
    writeln!(out)
}

pub fn write_countries<W: Write>(out: W, directory: &CountryDirectory) -> io::Result<()> {
    let mut tw = TabWriter::new(out);
    writeln!(tw, "CODE\tCOUNTRY")?;
    for (code, name) in directory.sorted_by_name() {
        writeln!(tw, "{}\t{}", code, name)?;
    }
    tw.flush()
}

/// The country table, or the no-data message when there are no rows.
pub fn write_rows<W: Write>(
    out: W,
    country: &str,
    rows: &[ProcessingRow],
    last_updated: Option<&str>,
) -> io::Result<()> {
    let mut tw = TabWriter::new(out);
    if rows.is_empty() {
        writeln!(tw, "{}", NO_DATA_MESSAGE)?;
        return tw.flush();
    }

    writeln!(tw, "{}", country)?;
    writeln!(tw, "CATEGORY\tPROCESSING TIME")?;
    for row in rows {
        writeln!(tw, "{}\t{}", row.label, row.display_value)?;
    }
    if let Some(updated) = last_updated {
        writeln!(tw, "Last updated: {}", updated)?;
    }
    tw.flush()
}

pub fn write_history<W: Write>(
    out: W,
    series: &BTreeMap<String, CategorySeries>,
    unit: &str,
) -> io::Result<()> {
    let mut tw = TabWriter::new(out);
    if series.is_empty() {
        writeln!(tw, "{}", NO_DATA_MESSAGE)?;
        return tw.flush();
    }

    for s in series.values() {
        let summary = summarize(s);
        writeln!(
            tw,
            "{} ({} points, trend: {}, change: {}%)",
            category_label(&s.category),
            summary.points,
            summary.trend.trend.as_str(),
            summary.trend.change
        )?;
        writeln!(tw, "WEEK\tDATE\t{}\tRAW", unit.to_uppercase())?;
        for p in &s.points {
            writeln!(
                tw,
                "{}\t{}\t{:.2}\t{}",
                p.week_label,
                p.date,
                p.value,
                display_time_value(&p.raw)
            )?;
        }
        writeln!(tw)?;
    }
    tw.flush()
}

pub fn write_weeks<W: Write>(out: W, files: &[String]) -> io::Result<()> {
    let mut out = out;
    for file in files {
        writeln!(out, "{}", file)?;
    }
    Ok(())
}

pub fn write_services<W: Write>(out: W, services: &InCanadaServices) -> io::Result<()> {
    let mut tw = TabWriter::new(out);
    if services.entries.is_empty() {
        writeln!(tw, "{}", NO_DATA_MESSAGE)?;
        return tw.flush();
    }

    writeln!(tw, "GROUP\tSERVICE\tPROCESSING TIME")?;
    for entry in &services.entries {
        writeln!(
            tw,
            "{}\t{}\t{}",
            entry.group.as_deref().map(category_label).unwrap_or_default(),
            entry.service,
            display_time_value(&entry.time)
        )?;
    }
    if let Some(updated) = &services.last_updated {
        writeln!(tw, "Last updated: {}", updated)?;
    }
    writeln!(tw, "Source: {}", services.source_file)?;
    tw.flush()
}
