use chrono::{NaiveDate, Utc};

use crate::error::CheckerError;
use crate::models::check_result::CheckResult;

pub const CSV_HEADER: &str = "username,post_date";

/// Renders results as CSV, every field quoted, rows in processing order.
pub fn export_csv(results: &[CheckResult]) -> Result<String, CheckerError> {
    if results.is_empty() {
        return Err(CheckerError::NoResults);
    }
    let mut rows = Vec::with_capacity(results.len() + 1);
    rows.push(CSV_HEADER.to_string());
    for result in results {
        rows.push(format!("{},{}", quote(&result.username), quote(&result.post_date)));
    }
    Ok(rows.join("\n"))
}

pub fn export_file_name(date: NaiveDate) -> String {
    format!("results_{}.csv", date.format("%Y-%m-%d"))
}

// Dated in UTC for both the CLI and the server.
pub fn todays_file_name() -> String {
    export_file_name(Utc::now().date_naive())
}

fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Reads an exported file back into `(username, post_date)` pairs.
    fn parse_csv(text: &str) -> Vec<(String, String)> {
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some(CSV_HEADER));
        lines.map(|line| {
            let mut fields = split_row(line);
            assert_eq!(fields.len(), 2, "bad row {line}");
            let post_date = fields.pop().unwrap();
            (fields.pop().unwrap(), post_date)
        }).collect()
    }

    fn split_row(line: &str) -> Vec<String> {
        let mut fields = Vec::new();
        let mut chars = line.chars().peekable();
        while chars.peek().is_some() {
            let mut field = String::new();
            assert_eq!(chars.next(), Some('"'), "fields are always quoted");
            loop {
                match chars.next() {
                    Some('"') if chars.peek() == Some(&'"') => {
                        chars.next();
                        field.push('"');
                    }
                    Some('"') => break,
                    Some(c) => field.push(c),
                    None => panic!("unterminated field in {line}"),
                }
            }
            fields.push(field);
            if chars.peek() == Some(&',') {
                chars.next();
            }
        }
        fields
    }

    fn sample() -> Vec<CheckResult> {
        vec![
            CheckResult::dated("a", "2023-11-14".into()),
            CheckResult::failed("notfound_x", "Error: User not found".into()),
            CheckResult::dated("quoted\"name", "No posts found or private account.".into()),
            CheckResult::failed("comma", "Error: a, b".into()),
        ]
    }

    #[test]
    fn writes_header_and_quoted_rows() {
        let csv = export_csv(&sample()[..2]).unwrap();
        assert_eq!(
            csv,
            "username,post_date\n\"a\",\"2023-11-14\"\n\"notfound_x\",\"Error: User not found\""
        );
    }

    #[test]
    fn exported_rows_parse_back_to_the_same_pairs() {
        let results = sample();
        let pairs = parse_csv(&export_csv(&results).unwrap());
        let expected: Vec<(String, String)> =
            results.into_iter().map(|r| (r.username, r.post_date)).collect();
        assert_eq!(pairs, expected);
    }

    #[test]
    fn refuses_to_export_nothing() {
        assert!(matches!(export_csv(&[]), Err(CheckerError::NoResults)));
    }

    #[test]
    fn file_name_carries_the_date() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(export_file_name(date), "results_2024-03-09.csv");
    }

    #[test]
    fn todays_file_name_uses_the_utc_date() {
        let before = Utc::now().date_naive();
        let name = todays_file_name();
        let after = Utc::now().date_naive();
        assert!(name == export_file_name(before) || name == export_file_name(after), "{name}");
    }
}
