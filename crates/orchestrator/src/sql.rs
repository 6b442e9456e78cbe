//! Query text for the status store.
//!
//! Table and column names are validated identifiers (see
//! `ProbeConfig::validate`); only the filename is user data and it is
//! always rendered as a quoted literal.

/// Renders `value` as a single-quoted SQL literal, doubling embedded quotes.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// `SELECT status FROM <table> WHERE <column> = '<filename>'`
pub fn status_query(table: &str, lookup_column: &str, filename: &str) -> String {
    format!(
        "SELECT status FROM {table} WHERE {lookup_column} = {}",
        quote_literal(filename)
    )
}

/// `SELECT * FROM <table> WHERE <column> = '<filename>'`
pub fn record_query(table: &str, lookup_column: &str, filename: &str) -> String {
    format!(
        "SELECT * FROM {table} WHERE {lookup_column} = {}",
        quote_literal(filename)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_query_shape() {
        assert_eq!(
            status_query("local_ega.files", "inbox_path", "sample.c4gh"),
            "SELECT status FROM local_ega.files WHERE inbox_path = 'sample.c4gh'"
        );
    }

    #[test]
    fn quotes_are_doubled() {
        assert_eq!(quote_literal("o'brien.c4gh"), "'o''brien.c4gh'");
        assert_eq!(
            record_query("t", "c", "x'; DROP TABLE t; --"),
            "SELECT * FROM t WHERE c = 'x''; DROP TABLE t; --'"
        );
    }
}
