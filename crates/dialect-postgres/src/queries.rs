//! Catalog queries issued by the inspector, positional `$n` placeholders.

pub const SELECT_VERSION: &str = "SHOW server_version";

pub const SELECT_CURRENT_SCHEMA: &str = "SELECT current_schema() AS schema_name";

pub const SELECT_SCHEMAS: &str = "\
SELECT nspname AS schema_name
FROM pg_catalog.pg_namespace
WHERE nspname NOT IN ('pg_catalog', 'information_schema', 'pg_toast')
  AND nspname NOT LIKE 'pg_temp_%'
ORDER BY nspname";

pub const SELECT_SCHEMA: &str = "\
SELECT nspname AS schema_name
FROM pg_catalog.pg_namespace
WHERE nspname = $1";

pub const SELECT_TABLES: &str = "\
SELECT c.relname AS table_name, obj_description(c.oid, 'pg_class') AS comment
FROM pg_catalog.pg_class AS c
JOIN pg_catalog.pg_namespace AS n ON n.oid = c.relnamespace
WHERE n.nspname = $1 AND c.relkind = 'r'
ORDER BY c.relname";

pub const SELECT_COLUMNS: &str = "\
SELECT a.attname AS column_name,
       pg_catalog.format_type(a.atttypid, a.atttypmod) AS data_type,
       NOT a.attnotnull AS nullable,
       pg_get_expr(d.adbin, d.adrelid) AS default_expr,
       a.attidentity AS identity,
       a.attgenerated AS generated,
       t.typtype AS type_kind,
       t.typname AS type_name,
       tn.nspname AS type_schema,
       col_description(a.attrelid, a.attnum) AS comment,
       co.collname AS collation,
       s.seqstart AS seq_start, s.seqincrement AS seq_increment, s.seqcache AS seq_cache,
       s.seqmin AS seq_min, s.seqmax AS seq_max, s.seqcycle AS seq_cycle
FROM pg_catalog.pg_attribute AS a
JOIN pg_catalog.pg_class AS c ON c.oid = a.attrelid
JOIN pg_catalog.pg_namespace AS n ON n.oid = c.relnamespace
JOIN pg_catalog.pg_type AS t ON t.oid = a.atttypid
JOIN pg_catalog.pg_namespace AS tn ON tn.oid = t.typnamespace
LEFT JOIN pg_catalog.pg_attrdef AS d ON d.adrelid = a.attrelid AND d.adnum = a.attnum
LEFT JOIN pg_catalog.pg_collation AS co ON co.oid = a.attcollation AND co.collname <> 'default'
LEFT JOIN pg_catalog.pg_sequence AS s
  ON s.seqrelid = pg_get_serial_sequence(format('%I.%I', n.nspname, c.relname), a.attname)::regclass
WHERE n.nspname = $1 AND c.relname = $2 AND a.attnum > 0 AND NOT a.attisdropped
ORDER BY a.attnum";

pub const SELECT_INDEXES: &str = "\
SELECT i.relname AS index_name, ix.indisunique AS is_unique, ix.indisprimary AS is_primary,
       am.amname AS method,
       pg_get_expr(ix.indpred, ix.indrelid) AS predicate,
       obj_description(i.oid, 'pg_class') AS comment,
       generate_subscripts(ix.indkey, 1) AS ord,
       ix.indkey[generate_subscripts(ix.indkey, 1)] AS attnum,
       pg_get_indexdef(ix.indexrelid, generate_subscripts(ix.indkey, 1) + 1, true) AS part_expr,
       ix.indoption[generate_subscripts(ix.indkey, 1)] & 1 AS descending
FROM pg_catalog.pg_index AS ix
JOIN pg_catalog.pg_class AS i ON i.oid = ix.indexrelid
JOIN pg_catalog.pg_class AS c ON c.oid = ix.indrelid
JOIN pg_catalog.pg_namespace AS n ON n.oid = c.relnamespace
JOIN pg_catalog.pg_am AS am ON am.oid = i.relam
WHERE n.nspname = $1 AND c.relname = $2
ORDER BY i.relname, ord";

pub const SELECT_FOREIGN_KEYS: &str = "\
SELECT con.conname AS constraint_name,
       src.attname AS column_name,
       rn.nspname AS ref_schema, rc.relname AS ref_table, dst.attname AS ref_column,
       con.confupdtype AS update_rule, con.confdeltype AS delete_rule,
       ord.n AS ordinal
FROM pg_catalog.pg_constraint AS con
JOIN pg_catalog.pg_class AS c ON c.oid = con.conrelid
JOIN pg_catalog.pg_namespace AS n ON n.oid = c.relnamespace
JOIN pg_catalog.pg_class AS rc ON rc.oid = con.confrelid
JOIN pg_catalog.pg_namespace AS rn ON rn.oid = rc.relnamespace
JOIN LATERAL generate_subscripts(con.conkey, 1) AS ord(n) ON true
JOIN pg_catalog.pg_attribute AS src ON src.attrelid = con.conrelid AND src.attnum = con.conkey[ord.n]
JOIN pg_catalog.pg_attribute AS dst ON dst.attrelid = con.confrelid AND dst.attnum = con.confkey[ord.n]
WHERE n.nspname = $1 AND c.relname = $2 AND con.contype = 'f'
ORDER BY con.conname, ord.n";

pub const SELECT_CHECKS: &str = "\
SELECT con.conname AS constraint_name,
       pg_get_expr(con.conbin, con.conrelid) AS expression
FROM pg_catalog.pg_constraint AS con
JOIN pg_catalog.pg_class AS c ON c.oid = con.conrelid
JOIN pg_catalog.pg_namespace AS n ON n.oid = c.relnamespace
WHERE n.nspname = $1 AND c.relname = $2 AND con.contype = 'c'
ORDER BY con.conname";

pub const SELECT_ENUMS: &str = "\
SELECT t.typname AS enum_name, e.enumlabel AS label
FROM pg_catalog.pg_type AS t
JOIN pg_catalog.pg_namespace AS n ON n.oid = t.typnamespace
JOIN pg_catalog.pg_enum AS e ON e.enumtypid = t.oid
WHERE n.nspname = $1 AND t.typtype = 'e'
ORDER BY t.typname, e.enumsortorder";

pub const SELECT_VIEWS: &str = "\
SELECT c.relname AS view_name, pg_get_viewdef(c.oid, true) AS definition
FROM pg_catalog.pg_class AS c
JOIN pg_catalog.pg_namespace AS n ON n.oid = c.relnamespace
WHERE n.nspname = $1 AND c.relkind = 'v'
ORDER BY c.relname";

pub const SELECT_FUNCTIONS: &str = "\
SELECT p.proname AS function_name, pg_get_functiondef(p.oid) AS definition, p.prokind AS kind
FROM pg_catalog.pg_proc AS p
JOIN pg_catalog.pg_namespace AS n ON n.oid = p.pronamespace
WHERE n.nspname = $1 AND p.prokind IN ('f', 'p')
ORDER BY p.proname";

pub const SELECT_TRIGGERS: &str = "\
SELECT t.tgname AS trigger_name, c.relname AS table_name, pg_get_triggerdef(t.oid, true) AS definition
FROM pg_catalog.pg_trigger AS t
JOIN pg_catalog.pg_class AS c ON c.oid = t.tgrelid
JOIN pg_catalog.pg_namespace AS n ON n.oid = c.relnamespace
WHERE n.nspname = $1 AND NOT t.tgisinternal
ORDER BY t.tgname";
