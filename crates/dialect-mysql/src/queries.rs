//! Catalog queries issued by the inspector. Placeholders are positional
//! (`?`) and bound through the `ExecQuerier` capability.

pub const SELECT_VERSION: &str = "SELECT VERSION() AS version";

pub const SELECT_VARIABLES: &str =
    "SELECT @@explicit_defaults_for_timestamp AS explicit_defaults, @@lower_case_table_names AS lower_case";

pub const SELECT_SCHEMAS: &str = "\
SELECT SCHEMA_NAME AS schema_name, DEFAULT_CHARACTER_SET_NAME AS charset, DEFAULT_COLLATION_NAME AS collation
FROM INFORMATION_SCHEMA.SCHEMATA
WHERE SCHEMA_NAME NOT IN ('mysql', 'information_schema', 'performance_schema', 'sys')
ORDER BY SCHEMA_NAME";

pub const SELECT_SCHEMA: &str = "\
SELECT SCHEMA_NAME AS schema_name, DEFAULT_CHARACTER_SET_NAME AS charset, DEFAULT_COLLATION_NAME AS collation
FROM INFORMATION_SCHEMA.SCHEMATA
WHERE SCHEMA_NAME = ?";

pub const SELECT_CURRENT_SCHEMA: &str = "SELECT DATABASE() AS schema_name";

pub const SELECT_TABLES: &str = "\
SELECT TABLE_NAME AS table_name, ENGINE AS engine, TABLE_COLLATION AS collation,
       TABLE_COMMENT AS comment, AUTO_INCREMENT AS auto_increment, CREATE_OPTIONS AS create_options
FROM INFORMATION_SCHEMA.TABLES
WHERE TABLE_SCHEMA = ? AND TABLE_TYPE = 'BASE TABLE'
ORDER BY TABLE_NAME";

pub const SELECT_COLUMNS: &str = "\
SELECT COLUMN_NAME AS column_name, COLUMN_TYPE AS column_type, IS_NULLABLE AS is_nullable,
       COLUMN_DEFAULT AS column_default, EXTRA AS extra, COLUMN_COMMENT AS comment,
       CHARACTER_SET_NAME AS charset, COLLATION_NAME AS collation,
       GENERATION_EXPRESSION AS generation_expression, COLUMN_KEY AS column_key
FROM INFORMATION_SCHEMA.COLUMNS
WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ?
ORDER BY ORDINAL_POSITION";

pub const SELECT_INDEXES: &str = "\
SELECT INDEX_NAME AS index_name, NON_UNIQUE AS non_unique, SEQ_IN_INDEX AS seq_in_index,
       COLUMN_NAME AS column_name, SUB_PART AS sub_part, EXPRESSION AS expression,
       COLLATION AS collation, INDEX_TYPE AS index_type, INDEX_COMMENT AS comment
FROM INFORMATION_SCHEMA.STATISTICS
WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ?
ORDER BY INDEX_NAME, SEQ_IN_INDEX";

pub const SELECT_FOREIGN_KEYS: &str = "\
SELECT kcu.CONSTRAINT_NAME AS constraint_name, kcu.COLUMN_NAME AS column_name,
       kcu.REFERENCED_TABLE_SCHEMA AS ref_schema, kcu.REFERENCED_TABLE_NAME AS ref_table,
       kcu.REFERENCED_COLUMN_NAME AS ref_column,
       rc.UPDATE_RULE AS update_rule, rc.DELETE_RULE AS delete_rule
FROM INFORMATION_SCHEMA.KEY_COLUMN_USAGE AS kcu
JOIN INFORMATION_SCHEMA.REFERENTIAL_CONSTRAINTS AS rc
  ON rc.CONSTRAINT_SCHEMA = kcu.CONSTRAINT_SCHEMA AND rc.CONSTRAINT_NAME = kcu.CONSTRAINT_NAME
WHERE kcu.TABLE_SCHEMA = ? AND kcu.TABLE_NAME = ? AND kcu.REFERENCED_TABLE_NAME IS NOT NULL
ORDER BY kcu.CONSTRAINT_NAME, kcu.ORDINAL_POSITION";

/// CHECK constraints live in their own catalog since MySQL 8.0.16 and
/// MariaDB 10.2.1; earlier servers simply return no rows elsewhere.
pub const SELECT_CHECKS: &str = "\
SELECT tc.CONSTRAINT_NAME AS constraint_name, cc.CHECK_CLAUSE AS check_clause, tc.ENFORCED AS enforced
FROM INFORMATION_SCHEMA.TABLE_CONSTRAINTS AS tc
JOIN INFORMATION_SCHEMA.CHECK_CONSTRAINTS AS cc
  ON cc.CONSTRAINT_SCHEMA = tc.CONSTRAINT_SCHEMA AND cc.CONSTRAINT_NAME = tc.CONSTRAINT_NAME
WHERE tc.TABLE_SCHEMA = ? AND tc.TABLE_NAME = ? AND tc.CONSTRAINT_TYPE = 'CHECK'
ORDER BY tc.CONSTRAINT_NAME";

pub const SELECT_VIEWS: &str = "\
SELECT TABLE_NAME AS view_name, VIEW_DEFINITION AS definition
FROM INFORMATION_SCHEMA.VIEWS
WHERE TABLE_SCHEMA = ?
ORDER BY TABLE_NAME";

pub const SELECT_ROUTINES: &str = "\
SELECT ROUTINE_NAME AS routine_name, ROUTINE_TYPE AS routine_type, ROUTINE_DEFINITION AS definition
FROM INFORMATION_SCHEMA.ROUTINES
WHERE ROUTINE_SCHEMA = ?
ORDER BY ROUTINE_NAME";

pub const SELECT_TRIGGERS: &str = "\
SELECT TRIGGER_NAME AS trigger_name, EVENT_OBJECT_TABLE AS table_name, ACTION_STATEMENT AS definition
FROM INFORMATION_SCHEMA.TRIGGERS
WHERE TRIGGER_SCHEMA = ?
ORDER BY TRIGGER_NAME";

/// `SHOW CREATE TABLE` supplies what the catalogs escape or omit: the
/// AUTO_INCREMENT high-water mark, CHECK clauses on older servers,
/// functional index expressions, and TiDB's AUTO_RANDOM sentinel comment.
pub fn show_create_table(schema: &str, table: &str) -> String {
    format!("SHOW CREATE TABLE `{schema}`.`{table}`")
}
