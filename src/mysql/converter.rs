// ABOUTME: MySQL value to SQL literal conversion
// ABOUTME: Delegates escaping to the driver and keeps NULL unquoted

use mysql_async::Value;

/// Render a MySQL value as a SQL literal suitable for an INSERT statement
///
/// - NULL → `NULL` (never quoted)
/// - Text → quoted and escaped by the driver (`Value::as_sql`)
/// - Non-UTF-8 bytes → hex literal (`0x...`)
/// - Numbers, dates, times → driver formatting
///
/// Literals always use backslash escapes. The dump preamble resets
/// `SQL_MODE`, so the replaying session never has `NO_BACKSLASH_ESCAPES`
/// set, whatever the source server runs with.
///
/// # Examples
///
/// ```
/// # use mysql_async::Value;
/// # use mysql_backup::mysql::converter::value_to_sql_literal;
/// assert_eq!(value_to_sql_literal(&Value::NULL), "NULL");
/// assert_eq!(value_to_sql_literal(&Value::Bytes(b"42".to_vec())), "'42'");
/// ```
pub fn value_to_sql_literal(value: &Value) -> String {
    match value {
        Value::NULL => "NULL".to_string(),
        other => other.as_sql(false),
    }
}

/// Append a parenthesised value tuple to `buf`: `(v1, v2, ...)`
pub fn push_row_tuple(buf: &mut String, row: &[Value]) {
    buf.push('(');
    for (idx, value) in row.iter().enumerate() {
        if idx > 0 {
            buf.push_str(", ");
        }
        buf.push_str(&value_to_sql_literal(value));
    }
    buf.push(')');
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Value {
        Value::Bytes(s.as_bytes().to_vec())
    }

    #[test]
    fn test_null_is_unquoted() {
        assert_eq!(value_to_sql_literal(&Value::NULL), "NULL");
    }

    #[test]
    fn test_null_text_is_quoted() {
        assert_eq!(value_to_sql_literal(&text("NULL")), "'NULL'");
    }

    #[test]
    fn test_text_protocol_numbers_are_quoted() {
        assert_eq!(value_to_sql_literal(&text("42")), "'42'");
        assert_eq!(value_to_sql_literal(&text("-7.50")), "'-7.50'");
    }

    #[test]
    fn test_binary_protocol_integers() {
        assert_eq!(value_to_sql_literal(&Value::Int(-7)), "-7");
        assert_eq!(value_to_sql_literal(&Value::UInt(42)), "42");
    }

    #[test]
    fn test_text_is_quoted() {
        assert_eq!(value_to_sql_literal(&text("Hello World")), "'Hello World'");
    }

    #[test]
    fn test_embedded_quote_uses_backslash() {
        assert_eq!(value_to_sql_literal(&text("O'Brien")), "'O\\'Brien'");
    }

    #[test]
    fn test_trailing_backslash_is_escaped() {
        assert_eq!(value_to_sql_literal(&text("C:\\")), "'C:\\\\'");
    }

    #[test]
    fn test_control_bytes_are_escaped() {
        let literal = value_to_sql_literal(&text("line1\nline2\0"));
        assert!(!literal.contains('\n'));
        assert!(!literal.contains('\0'));
        assert!(literal.starts_with('\'') && literal.ends_with('\''));
    }

    #[test]
    fn test_binary_bytes_render_as_hex() {
        let value = Value::Bytes(vec![0xFF, 0xFE, 0x00]);
        let literal = value_to_sql_literal(&value);
        assert!(literal.starts_with("0x"), "got {}", literal);
        assert!(!literal.contains('\''));
    }

    #[test]
    fn test_push_row_tuple() {
        let row = vec![text("1"), text("Alice"), Value::NULL];
        let mut buf = String::new();
        push_row_tuple(&mut buf, &row);
        assert_eq!(buf, "('1', 'Alice', NULL)");
    }
}
