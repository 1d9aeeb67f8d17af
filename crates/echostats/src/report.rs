//! Plain-text rendering of session summaries.

use echostats_store::SessionSummary;

const HEADERS: [&str; 7] = [
    "Nonce",
    "IP Addr",
    "First Packet (UTC)",
    "Last Packet (UTC)",
    "Packets Expected",
    "Unique Packets Received",
    "Received Incl. Duplicates",
];

/// Year, month and day of a count of days since 1970-01-01 (proleptic
/// Gregorian calendar).
fn civil_from_days(days: i64) -> (i64, i64, i64) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1_460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = doy - (153 * mp + 2) / 5 + 1;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = yoe + era * 400 + i64::from(month <= 2);
    (year, month, day)
}

/// Render Unix milliseconds as `YYYY-MM-DD HH:MM:SS.mmm` in UTC.
pub fn format_millis(ms: i64) -> String {
    let secs = ms.div_euclid(1_000);
    let millis = ms.rem_euclid(1_000);
    let (year, month, day) = civil_from_days(secs.div_euclid(86_400));
    let of_day = secs.rem_euclid(86_400);
    format!(
        "{year:04}-{month:02}-{day:02} {:02}:{:02}:{:02}.{millis:03}",
        of_day / 3_600,
        of_day % 3_600 / 60,
        of_day % 60
    )
}

fn cells(summary: &SessionSummary) -> [String; 7] {
    let time = |v: Option<i64>| v.map_or_else(String::new, format_millis);
    [
        summary.nonce.clone(),
        summary.address.clone().unwrap_or_default(),
        time(summary.first_packet),
        time(summary.last_packet),
        summary
            .packets_expected
            .map_or_else(String::new, |v| v.to_string()),
        summary.unique_received.to_string(),
        summary.received_including_duplicates.to_string(),
    ]
}

/// Render summaries as an aligned text table, one session per line.
pub fn render_table(summaries: &[SessionSummary]) -> String {
    let rows: Vec<[String; 7]> = summaries.iter().map(cells).collect();

    let mut widths = HEADERS.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.len());
        }
    }

    let line = |cells: &[&str]| {
        cells
            .iter()
            .zip(widths)
            .map(|(cell, width)| format!("{cell:<width$}"))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut out = vec![
        line(&HEADERS),
        widths.map(|w| "-".repeat(w)).join("  "),
    ];
    for row in &rows {
        let refs: Vec<&str> = row.iter().map(String::as_str).collect();
        out.push(line(&refs));
    }
    out.join("\n")
}
