//! Oracle SQL classification for span naming.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::driver::CommandType;

/// SQL operation types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlOperation {
    Select,
    Insert,
    Update,
    Delete,
    Merge,
    Create,
    Drop,
    Alter,
    Truncate,
    Call,
    /// Anonymous PL/SQL block (`BEGIN ... END;` or `DECLARE ...`).
    Block,
    Commit,
    Rollback,
    Set,
    Other,
}

impl SqlOperation {
    /// Returns the operation as a string suitable for span names.
    pub fn as_str(&self) -> &'static str {
        match self {
            SqlOperation::Select => "SELECT",
            SqlOperation::Insert => "INSERT",
            SqlOperation::Update => "UPDATE",
            SqlOperation::Delete => "DELETE",
            SqlOperation::Merge => "MERGE",
            SqlOperation::Create => "CREATE",
            SqlOperation::Drop => "DROP",
            SqlOperation::Alter => "ALTER",
            SqlOperation::Truncate => "TRUNCATE",
            SqlOperation::Call => "CALL",
            SqlOperation::Block => "BLOCK",
            SqlOperation::Commit => "COMMIT",
            SqlOperation::Rollback => "ROLLBACK",
            SqlOperation::Set => "SET",
            SqlOperation::Other => "QUERY",
        }
    }
}

impl std::fmt::Display for SqlOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// Oracle identifiers: optionally double-quoted, optionally schema-qualified,
// and may contain `$` and `#`. Group 1 is always the object name.
macro_rules! object_regex {
    ($prefix:literal) => {
        Lazy::new(|| {
            Regex::new(concat!(
                $prefix,
                r#"\s+(?:"?[\w$#]+"?\.)?"?([\w$#]+)"?"#
            ))
            .unwrap()
        })
    };
}

static SELECT_TABLE_REGEX: Lazy<Regex> = object_regex!(r#"(?i)\bFROM"#);

static INSERT_TABLE_REGEX: Lazy<Regex> = object_regex!(r#"(?i)\bINSERT\s+INTO"#);

static UPDATE_TABLE_REGEX: Lazy<Regex> = object_regex!(r#"(?i)\bUPDATE"#);

static DELETE_TABLE_REGEX: Lazy<Regex> = object_regex!(r#"(?i)\bDELETE(?:\s+FROM)?"#);

static MERGE_TABLE_REGEX: Lazy<Regex> = object_regex!(r#"(?i)\bMERGE\s+INTO"#);

static CREATE_TABLE_REGEX: Lazy<Regex> =
    object_regex!(r#"(?i)\bCREATE\s+(?:GLOBAL\s+TEMPORARY\s+|PRIVATE\s+TEMPORARY\s+)?TABLE"#);

static DROP_TABLE_REGEX: Lazy<Regex> = object_regex!(r#"(?i)\bDROP\s+TABLE"#);

static ALTER_TABLE_REGEX: Lazy<Regex> = object_regex!(r#"(?i)\bALTER\s+TABLE"#);

static TRUNCATE_TABLE_REGEX: Lazy<Regex> = object_regex!(r#"(?i)\bTRUNCATE\s+TABLE"#);

/// Parse the SQL operation type from a query string.
pub fn parse_operation(sql: &str) -> SqlOperation {
    let trimmed = sql.trim_start().trim_start_matches('(').trim_start();
    let upper_start: String = trimmed.chars().take(15).collect::<String>().to_uppercase();

    if upper_start.starts_with("SELECT") || upper_start.starts_with("WITH") {
        SqlOperation::Select
    } else if upper_start.starts_with("INSERT") {
        SqlOperation::Insert
    } else if upper_start.starts_with("UPDATE") {
        SqlOperation::Update
    } else if upper_start.starts_with("DELETE") {
        SqlOperation::Delete
    } else if upper_start.starts_with("MERGE") {
        SqlOperation::Merge
    } else if upper_start.starts_with("CREATE") {
        SqlOperation::Create
    } else if upper_start.starts_with("DROP") {
        SqlOperation::Drop
    } else if upper_start.starts_with("ALTER") {
        SqlOperation::Alter
    } else if upper_start.starts_with("TRUNCATE") {
        SqlOperation::Truncate
    } else if upper_start.starts_with("CALL") || upper_start.starts_with("EXEC") {
        SqlOperation::Call
    } else if upper_start.starts_with("BEGIN") || upper_start.starts_with("DECLARE") {
        SqlOperation::Block
    } else if upper_start.starts_with("COMMIT") {
        SqlOperation::Commit
    } else if upper_start.starts_with("ROLLBACK") {
        SqlOperation::Rollback
    } else if upper_start.starts_with("SET") {
        SqlOperation::Set
    } else {
        SqlOperation::Other
    }
}

/// Extract the primary table name from a SQL query.
///
/// Returns `None` if the table cannot be determined. The schema qualifier is dropped.
pub fn extract_table(sql: &str) -> Option<String> {
    let operation = parse_operation(sql);

    let regex = match operation {
        SqlOperation::Select => &*SELECT_TABLE_REGEX,
        SqlOperation::Insert => &*INSERT_TABLE_REGEX,
        SqlOperation::Update => &*UPDATE_TABLE_REGEX,
        SqlOperation::Delete => &*DELETE_TABLE_REGEX,
        SqlOperation::Merge => &*MERGE_TABLE_REGEX,
        SqlOperation::Create => &*CREATE_TABLE_REGEX,
        SqlOperation::Drop => &*DROP_TABLE_REGEX,
        SqlOperation::Alter => &*ALTER_TABLE_REGEX,
        SqlOperation::Truncate => &*TRUNCATE_TABLE_REGEX,
        _ => return None,
    };

    regex
        .captures(sql)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_lowercase())
}

/// Parsed SQL information for span creation.
#[derive(Debug)]
pub struct ParsedSql {
    pub operation: SqlOperation,
    pub table: Option<String>,
}

impl ParsedSql {
    /// Parse a SQL statement and extract operation and table information.
    pub fn parse(sql: &str) -> Self {
        let operation = parse_operation(sql);
        let table = extract_table(sql);
        Self { operation, table }
    }

    /// Classify command text according to how the driver interprets it.
    ///
    /// Stored procedure and table-direct commands carry an object name rather
    /// than a statement.
    pub fn for_command(text: &str, command_type: CommandType) -> Self {
        let object = || {
            let name = text.trim().trim_matches('"').to_lowercase();
            (!name.is_empty()).then_some(name)
        };

        match command_type {
            CommandType::Text => Self::parse(text),
            CommandType::StoredProcedure => Self {
                operation: SqlOperation::Call,
                table: object(),
            },
            CommandType::TableDirect => Self {
                operation: SqlOperation::Select,
                table: object(),
            },
        }
    }

    /// Generate a span name from the parsed SQL.
    ///
    /// Format: "{OPERATION} {table}" or "{OPERATION}"
    pub fn span_name(&self) -> String {
        match &self.table {
            Some(table) => format!("{} {}", self.operation.as_str(), table),
            None => self.operation.as_str().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_select() {
        assert_eq!(parse_operation("SELECT 1 FROM DUAL"), SqlOperation::Select);
        assert_eq!(parse_operation("select id from orders"), SqlOperation::Select);
        assert_eq!(
            parse_operation("WITH cte AS (SELECT 1 FROM dual) SELECT * FROM cte"),
            SqlOperation::Select
        );
        assert_eq!(
            parse_operation("(SELECT a FROM t1) UNION (SELECT a FROM t2)"),
            SqlOperation::Select
        );
    }

    #[test]
    fn test_parse_dml() {
        assert_eq!(
            parse_operation("INSERT INTO users (name) VALUES (:name)"),
            SqlOperation::Insert
        );
        assert_eq!(
            parse_operation("UPDATE users SET name = :name WHERE id = :id"),
            SqlOperation::Update
        );
        assert_eq!(
            parse_operation("DELETE FROM users WHERE id = :id"),
            SqlOperation::Delete
        );
        assert_eq!(
            parse_operation("MERGE INTO stock s USING deliveries d ON (s.id = d.id)"),
            SqlOperation::Merge
        );
    }

    #[test]
    fn test_parse_plsql() {
        assert_eq!(
            parse_operation("BEGIN pkg_orders.close(:id); END;"),
            SqlOperation::Block
        );
        assert_eq!(
            parse_operation("DECLARE v NUMBER; BEGIN NULL; END;"),
            SqlOperation::Block
        );
        assert_eq!(parse_operation("CALL pkg.proc(:a)"), SqlOperation::Call);
        assert_eq!(parse_operation("EXECUTE pkg.proc"), SqlOperation::Call);
    }

    #[test]
    fn test_transaction_operations() {
        assert_eq!(parse_operation("COMMIT"), SqlOperation::Commit);
        assert_eq!(parse_operation("ROLLBACK"), SqlOperation::Rollback);
        assert_eq!(
            parse_operation("SET TRANSACTION READ ONLY"),
            SqlOperation::Set
        );
        assert_eq!(parse_operation("LOCK TABLE t IN EXCLUSIVE MODE"), SqlOperation::Other);
    }

    #[test]
    fn test_extract_table_select() {
        assert_eq!(extract_table("SELECT 1 FROM DUAL"), Some("dual".to_string()));
        assert_eq!(
            extract_table(r#"SELECT * FROM "Users" WHERE id = 1"#),
            Some("users".to_string())
        );
        assert_eq!(
            extract_table("select u.* from hr.employees u join hr.jobs j on u.job_id = j.id"),
            Some("employees".to_string())
        );
        assert_eq!(
            extract_table(r#"SELECT * FROM "HR"."EMP$HIST" WHERE 1 = 1"#),
            Some("emp$hist".to_string())
        );
    }

    #[test]
    fn test_extract_table_dml() {
        assert_eq!(
            extract_table("INSERT INTO grades (student_id, score) VALUES (:1, :2)"),
            Some("grades".to_string())
        );
        assert_eq!(
            extract_table("UPDATE app.students SET name = :1 WHERE id = :2"),
            Some("students".to_string())
        );
        assert_eq!(
            extract_table("DELETE assignments WHERE id = :1"),
            Some("assignments".to_string())
        );
        assert_eq!(
            extract_table("MERGE INTO stock s USING deliveries d ON (s.id = d.id)"),
            Some("stock".to_string())
        );
    }

    #[test]
    fn test_extract_table_ddl() {
        assert_eq!(
            extract_table("CREATE GLOBAL TEMPORARY TABLE tmp_ids (id NUMBER)"),
            Some("tmp_ids".to_string())
        );
        assert_eq!(extract_table("TRUNCATE TABLE audit#log"), Some("audit#log".to_string()));
        assert_eq!(extract_table("BEGIN NULL; END;"), None);
    }

    #[test]
    fn test_for_command() {
        let parsed = ParsedSql::for_command("PKG_ORDERS.CLOSE_ORDER", CommandType::StoredProcedure);
        assert_eq!(parsed.operation, SqlOperation::Call);
        assert_eq!(parsed.span_name(), "CALL pkg_orders.close_order");

        let parsed = ParsedSql::for_command("EMPLOYEES", CommandType::TableDirect);
        assert_eq!(parsed.span_name(), "SELECT employees");

        let parsed = ParsedSql::for_command("   ", CommandType::StoredProcedure);
        assert_eq!(parsed.span_name(), "CALL");
    }

    #[test]
    fn test_parsed_sql_span_name() {
        let parsed = ParsedSql::parse("SELECT * FROM users WHERE id = 1");
        assert_eq!(parsed.span_name(), "SELECT users");

        let parsed = ParsedSql::parse("COMMIT");
        assert_eq!(parsed.span_name(), "COMMIT");
    }
}
