use super::{ScratchRecord, TableName};
use itertools::Itertools;
use std::fmt;

/// Longest error message passed on unchanged, rejected statements can carry megabytes of SQL
pub const MAX_MESSAGE_LENGTH: usize = 256;

pub fn drop_statement(table: &TableName) -> String {
    format!("drop table if exists {}", table.quoted())
}

/// multi-row insert with one `(?, ?)` group per row
pub fn insert_statement(table: &TableName, rows: usize) -> String {
    format!(
        "insert into {} (time, text) values {}",
        table.quoted(),
        std::iter::repeat("(?, ?)").take(rows).join(", ")
    )
}

/// Render the timestamps of `records`, these have to outlive the bound parameters
pub fn time_strings(records: &[ScratchRecord]) -> Vec<String> {
    records.iter().map(ScratchRecord::time_string).collect()
}

/// Flatten `records` into bind values, in the column order of `insert_statement`
pub fn bind_values<'a>(
    times: &'a [String],
    records: &'a [ScratchRecord],
) -> impl Iterator<Item = &'a str> {
    times
        .iter()
        .zip(records)
        .flat_map(|(time, record)| [time.as_str(), record.text.as_str()])
}

/// Render `message`, cutting it off after `MAX_MESSAGE_LENGTH` characters
pub fn shorten(message: impl fmt::Display) -> String {
    let mut message = message.to_string();

    if let Some((end, _)) = message.char_indices().nth(MAX_MESSAGE_LENGTH) {
        let omitted = message[end..].chars().count();
        message.truncate(end);
        message.push_str(&format!("... ({omitted} characters omitted)"));
    }

    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn insert_statement_has_one_group_per_row() {
        let table = TableName::default();

        assert_eq!(
            insert_statement(&table, 1),
            "insert into \"performance\" (time, text) values (?, ?)"
        );
        assert_eq!(
            insert_statement(&table, 3),
            "insert into \"performance\" (time, text) values (?, ?), (?, ?), (?, ?)"
        );
    }

    #[test]
    fn bind_values_interleave_time_and_text() {
        let timestamp = NaiveDate::from_ymd_opt(2023, 12, 24)
            .unwrap()
            .and_hms_opt(18, 0, 1)
            .unwrap();
        let records = vec![
            ScratchRecord::new(timestamp, "a".to_owned()).unwrap(),
            ScratchRecord::new(timestamp, "b".to_owned()).unwrap(),
        ];
        let times = time_strings(&records);

        assert_eq!(
            bind_values(&times, &records).collect::<Vec<_>>(),
            [
                "2023-12-24 18:00:01",
                "a",
                "2023-12-24 18:00:01",
                "b"
            ]
        );
    }

    #[test]
    fn shorten_keeps_short_messages() {
        assert_eq!(shorten("no such table: performance"), "no such table: performance");
        assert_eq!(shorten("x".repeat(MAX_MESSAGE_LENGTH)), "x".repeat(MAX_MESSAGE_LENGTH));
    }

    #[test]
    fn shorten_cuts_long_messages() {
        let message = format!("{}{}", "ä".repeat(MAX_MESSAGE_LENGTH), "b".repeat(10));

        assert_eq!(
            shorten(message),
            format!("{}... (10 characters omitted)", "ä".repeat(MAX_MESSAGE_LENGTH))
        );
    }
}
