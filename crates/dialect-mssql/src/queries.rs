//! Catalog queries issued by the inspector, `@PN` placeholders.

pub const SELECT_VERSION: &str =
    "SELECT CAST(SERVERPROPERTY('productversion') AS nvarchar(128)) AS version";

pub const SELECT_CURRENT_SCHEMA: &str = "SELECT SCHEMA_NAME() AS schema_name";

pub const SELECT_SCHEMAS: &str = "\
SELECT name AS schema_name FROM sys.schemas
WHERE name NOT IN ('sys', 'guest', 'INFORMATION_SCHEMA')
  AND name NOT LIKE 'db[_]%'
ORDER BY name";

pub const SELECT_TABLES: &str = "\
SELECT t.name AS table_name
FROM sys.tables AS t
JOIN sys.schemas AS s ON s.schema_id = t.schema_id
WHERE s.name = @P1
ORDER BY t.name";

pub const SELECT_COLUMNS: &str = "\
SELECT c.COLUMN_NAME AS column_name, c.DATA_TYPE AS data_type,
       c.CHARACTER_MAXIMUM_LENGTH AS char_length, c.NUMERIC_PRECISION AS num_precision,
       c.NUMERIC_SCALE AS num_scale, c.DATETIME_PRECISION AS dt_precision,
       c.IS_NULLABLE AS is_nullable, c.COLUMN_DEFAULT AS column_default,
       COLUMNPROPERTY(OBJECT_ID(c.TABLE_SCHEMA + '.' + c.TABLE_NAME), c.COLUMN_NAME, 'IsIdentity') AS is_identity,
       c.COLLATION_NAME AS collation
FROM INFORMATION_SCHEMA.COLUMNS AS c
WHERE c.TABLE_SCHEMA = @P1 AND c.TABLE_NAME = @P2
ORDER BY c.ORDINAL_POSITION";

pub const SELECT_INDEXES: &str = "\
SELECT i.name AS index_name, i.is_unique AS is_unique, i.is_primary_key AS is_primary,
       i.type_desc AS type_desc, ic.key_ordinal AS key_ordinal,
       col.name AS column_name, ic.is_descending_key AS is_descending,
       i.filter_definition AS predicate
FROM sys.indexes AS i
JOIN sys.tables AS t ON t.object_id = i.object_id
JOIN sys.schemas AS s ON s.schema_id = t.schema_id
JOIN sys.index_columns AS ic ON ic.object_id = i.object_id AND ic.index_id = i.index_id
JOIN sys.columns AS col ON col.object_id = ic.object_id AND col.column_id = ic.column_id
WHERE s.name = @P1 AND t.name = @P2 AND i.name IS NOT NULL AND ic.key_ordinal > 0
ORDER BY i.name, ic.key_ordinal";

pub const SELECT_FOREIGN_KEYS: &str = "\
SELECT fk.name AS constraint_name,
       pc.name AS column_name,
       rs.name AS ref_schema, rt.name AS ref_table, rc.name AS ref_column,
       fk.update_referential_action_desc AS update_rule,
       fk.delete_referential_action_desc AS delete_rule
FROM sys.foreign_keys AS fk
JOIN sys.tables AS t ON t.object_id = fk.parent_object_id
JOIN sys.schemas AS s ON s.schema_id = t.schema_id
JOIN sys.tables AS rt ON rt.object_id = fk.referenced_object_id
JOIN sys.schemas AS rs ON rs.schema_id = rt.schema_id
JOIN sys.foreign_key_columns AS fkc ON fkc.constraint_object_id = fk.object_id
JOIN sys.columns AS pc ON pc.object_id = fkc.parent_object_id AND pc.column_id = fkc.parent_column_id
JOIN sys.columns AS rc ON rc.object_id = fkc.referenced_object_id AND rc.column_id = fkc.referenced_column_id
WHERE s.name = @P1 AND t.name = @P2
ORDER BY fk.name, fkc.constraint_column_id";

pub const SELECT_CHECKS: &str = "\
SELECT cc.name AS constraint_name, cc.definition AS definition
FROM sys.check_constraints AS cc
JOIN sys.tables AS t ON t.object_id = cc.parent_object_id
JOIN sys.schemas AS s ON s.schema_id = t.schema_id
WHERE s.name = @P1 AND t.name = @P2
ORDER BY cc.name";

pub const SELECT_VIEWS: &str = "\
SELECT v.name AS view_name, m.definition AS definition
FROM sys.views AS v
JOIN sys.schemas AS s ON s.schema_id = v.schema_id
JOIN sys.sql_modules AS m ON m.object_id = v.object_id
WHERE s.name = @P1
ORDER BY v.name";
