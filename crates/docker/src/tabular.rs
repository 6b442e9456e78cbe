//! psql tabular output → [`QueryResult`]
//!
//! ```text
//!  id | status | stable_id      <- line 0: header
//! ----+--------+-----------     <- line 1: separator (ignored)
//!   1 | READY  | EGAF00001      <- line 2..: data
//! (1 row)                       <- footer (ignored)
//! ```
//!
//! Fields are split on `|` and trimmed. Output with fewer than two lines
//! yields an empty result rather than an error, so "nothing recorded yet"
//! never looks like a broken transport.

use ingestprobe_core::types::QueryResult;

/// Column delimiter used by psql's aligned format.
pub const COLUMN_SEPARATOR: char = '|';

/// Parses aligned psql output.
pub fn parse(output: &str) -> QueryResult {
    let lines: Vec<&str> = output
        .lines()
        .map(|line| line.trim_end_matches('\r'))
        .collect();

    if lines.len() < 2 || lines[0].trim().is_empty() {
        return QueryResult::default();
    }

    let columns = split_fields(lines[0]);
    let rows = lines[2..]
        .iter()
        .take_while(|line| !line.trim().is_empty() && !is_footer(line))
        .map(|line| split_fields(line))
        .collect();

    QueryResult::new(columns, rows)
}

fn split_fields(line: &str) -> Vec<String> {
    line.split(COLUMN_SEPARATOR)
        .map(|field| field.trim().to_owned())
        .collect()
}

/// `(0 rows)`, `(1 row)`, `(42 rows)`
fn is_footer(line: &str) -> bool {
    let line = line.trim();
    line.starts_with('(') && (line.ends_with(" rows)") || line.ends_with(" row)"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_column_status() {
        let result = parse(" status \n--------\n COMPLETED\n(1 row)\n\n");
        assert_eq!(result.columns, vec!["status"]);
        assert_eq!(result.first_value(), Some("COMPLETED"));
        assert_eq!(result.row_count(), 1);
    }

    #[test]
    fn parses_multi_column_rows_in_order() {
        let output = " id | status | stable_id \n----+--------+-----------\n  1 | READY  | EGAF0001\n  2 | ERROR  | \n(2 rows)\n";
        let result = parse(output);
        assert_eq!(result.columns, vec!["id", "status", "stable_id"]);
        assert_eq!(result.rows[0], vec!["1", "READY", "EGAF0001"]);
        assert_eq!(result.rows[1], vec!["2", "ERROR", ""]);
    }

    #[test]
    fn header_and_separator_without_rows_is_empty() {
        let result = parse(" status \n--------\n(0 rows)\n");
        assert_eq!(result.columns, vec!["status"]);
        assert!(result.is_empty());
    }

    #[test]
    fn fewer_than_two_lines_is_empty() {
        assert_eq!(parse(""), QueryResult::default());
        assert_eq!(parse(" status \n"), QueryResult::default());
    }

    #[test]
    fn tolerates_crlf() {
        let result = parse(" status \r\n--------\r\n IN_INGESTION\r\n(1 row)\r\n");
        assert_eq!(result.first_value(), Some("IN_INGESTION"));
    }

    #[test]
    fn row_without_footer_is_kept() {
        let result = parse("status\n------\nARCHIVED");
        assert_eq!(result.first_value(), Some("ARCHIVED"));
    }
}
