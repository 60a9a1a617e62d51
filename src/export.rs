//! Spreadsheet export of action records as CSV.

use std::collections::HashMap;
use std::io::Write;

use chrono::NaiveDate;

use crate::action::{ActionRecord, User};
use crate::error::Result;

pub const COLUMNS: [&str; 11] = [
    "Folio",
    "Creation Date",
    "Commitment Date",
    "Close Date",
    "Source",
    "Description",
    "Plan",
    "Type",
    "Status",
    "Responsible",
    "Verification Notes",
];

const UNKNOWN_USER: &str = "Unknown";

/// Writes a header row plus one row per record, in the order given.
pub fn write_csv<W: Write>(records: &[ActionRecord], users: &[User], mut out: W) -> Result<()> {
    let names: HashMap<&str, &str> = users
        .iter()
        .map(|u| (u.id.as_str(), u.name.as_str()))
        .collect();

    write_row(&mut out, COLUMNS.iter().map(|c| c.to_string()))?;
    for r in records {
        let responsible = names
            .get(r.responsible_user_id.as_str())
            .copied()
            .unwrap_or(UNKNOWN_USER);
        write_row(
            &mut out,
            [
                r.folio.clone(),
                fmt_date(Some(r.creation_date)),
                fmt_date(Some(r.commitment_date)),
                fmt_date(r.close_date),
                r.source.clone(),
                r.description.clone(),
                r.plan.clone(),
                r.action_type.to_string(),
                r.status.to_string(),
                responsible.to_string(),
                r.verification_notes.clone().unwrap_or_default(),
            ],
        )?;
    }
    out.flush()?;
    Ok(())
}

fn fmt_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

fn write_row<W: Write>(out: &mut W, fields: impl IntoIterator<Item = String>) -> Result<()> {
    let line = fields
        .into_iter()
        .map(|f| escape(&f))
        .collect::<Vec<_>>()
        .join(",");
    out.write_all(line.as_bytes())?;
    out.write_all(b"\r\n")?;
    Ok(())
}

// RFC 4180 quoting.
fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
