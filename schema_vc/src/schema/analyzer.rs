//! Database schema analyzer
//!
//! Reads the live schema of a database into a [`Schema`] snapshot. Native column
//! types are mapped back onto the logical types the dialects render, so a schema
//! applied by this crate reads back without spurious differences.

use async_trait::async_trait;
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use sqlx::{FromRow, MySql, Pool, Postgres, Sqlite};
use tracing::debug;

use crate::db::connection::DatabaseConnection;
use crate::error::{Error, Result};
use crate::schema::types::{Column, ColumnType, ForeignKey, Index, Schema, Table, TypeKind};

/// Source of the current schema
#[async_trait]
pub trait Introspector: Send + Sync {
    /// Read the complete schema. Any failure is an [`Error::IntrospectionError`].
    async fn introspect(&self) -> Result<Schema>;
}

/// Schema analyzer for database schema introspection
pub struct SchemaAnalyzer {
    connection: DatabaseConnection,
    schema_name: Option<String>,
}

impl SchemaAnalyzer {
    /// Create a new schema analyzer. `schema_name` selects the PostgreSQL schema or
    /// MySQL database; it defaults to `public` and the connection's database.
    pub fn new(connection: DatabaseConnection, schema_name: Option<String>) -> Self {
        Self {
            connection,
            schema_name,
        }
    }

    /// Analyze the current database schema
    pub async fn analyze(&self) -> Result<Schema> {
        let schema_name = self.schema_name.as_deref();
        match &self.connection {
            DatabaseConnection::Postgres(pool) => {
                PostgresAnalyzer {
                    pool,
                    schema_name: schema_name.unwrap_or("public"),
                }
                .analyze()
                .await
            }
            DatabaseConnection::MySql(pool) => MySqlAnalyzer { pool, schema_name }.analyze().await,
            DatabaseConnection::Sqlite(pool) => SqliteAnalyzer { pool }.analyze().await,
        }
    }
}

#[async_trait]
impl Introspector for SchemaAnalyzer {
    async fn introspect(&self) -> Result<Schema> {
        let schema = self.analyze().await.map_err(|e| match e {
            Error::IntrospectionError(_) => e,
            other => Error::introspection(other),
        })?;
        debug!(tables = schema.tables.len(), "Introspected live schema");
        Ok(schema)
    }
}

/// Matches `name`, `name(size)`, `name(precision, scale)` with trailing modifiers.
/// A time zone suffix may follow the size, as in `timestamp(6) without time zone`.
static NATIVE_TYPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^\s*([a-z][a-z0-9_ ]*?)\s*(?:\(\s*(\d+)\s*(?:,\s*(\d+)\s*)?\))?\s*((?:with|without)\s+time\s+zone)?((?:\s+(?:unsigned|signed|zerofill))*)\s*$",
    )
    .expect("valid native type pattern")
});

/// A quoted literal, optionally followed by a PostgreSQL cast
static QUOTED_DEFAULT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)^'((?:[^']|'')*)'(?:::[a-z][a-z0-9_ ]*(?:\(\d+(?:,\d+)?\))?(?:\[\])?)?$")
        .expect("valid default literal pattern")
});

/// `CONSTRAINT <name> FOREIGN KEY (<columns>)` inside a SQLite `CREATE TABLE`
static SQLITE_FOREIGN_KEY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)CONSTRAINT\s+["`\[]?([^"`\]\s]+)["`\]]?\s+FOREIGN\s+KEY\s*\(([^)]*)\)"#)
        .expect("valid foreign key pattern")
});

/// Database whose catalog is being read; some type names mean different things
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flavor {
    MySql,
    Postgres,
    Sqlite,
}

/// Map a native type string such as `varchar(64)` or `int(10) unsigned` onto a logical type
pub fn parse_native_type(flavor: Flavor, native: &str) -> ColumnType {
    // Enum and set members are case-sensitive, so the text is kept as written
    let Some(captures) = NATIVE_TYPE.captures(native) else {
        return ColumnType::new(TypeKind::Other(native.trim().to_string()));
    };

    let base = captures[1]
        .split_whitespace()
        .chain(captures.get(4).map(|m| m.as_str()).into_iter().flat_map(str::split_whitespace))
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    let size: Option<u32> = captures.get(2).and_then(|m| m.as_str().parse().ok());
    let scale: Option<u32> = captures.get(3).and_then(|m| m.as_str().parse().ok());
    let unsigned = captures
        .get(5)
        .map(|m| m.as_str().to_lowercase().contains("unsigned"))
        .unwrap_or(false);

    let kind = match base.as_str() {
        "tinyint" if flavor == Flavor::MySql && size == Some(1) => TypeKind::Boolean,
        "smallint" | "int2" => TypeKind::SmallInt,
        "int" | "integer" | "int4" | "mediumint" => TypeKind::Integer,
        "bigint" | "int8" => TypeKind::BigInt,
        "decimal" | "numeric" => TypeKind::Decimal,
        "float" | "real" | "float4" => TypeKind::Float,
        "double" | "double precision" | "float8" => TypeKind::Double,
        "boolean" | "bool" => TypeKind::Boolean,
        "varchar" | "character varying" => TypeKind::String,
        "char" | "character" | "bpchar" => TypeKind::Char,
        "text" => TypeKind::Text,
        "varbinary" => TypeKind::Binary,
        "blob" | "bytea" => TypeKind::Blob,
        "date" => TypeKind::Date,
        "datetime" => TypeKind::DateTime,
        "timestamp" | "timestamp without time zone" if flavor == Flavor::Postgres => TypeKind::DateTime,
        "timestamp" | "timestamptz" | "timestamp with time zone" => TypeKind::Timestamp,
        "time" | "time without time zone" => TypeKind::Time,
        "json" | "jsonb" => TypeKind::Json,
        "uuid" => TypeKind::Uuid,
        other => TypeKind::Other(other.to_string()),
    };

    let mut column_type = ColumnType::new(kind);
    column_type.unsigned = unsigned;
    match column_type.kind {
        TypeKind::String | TypeKind::Char | TypeKind::Binary => column_type.length = size,
        TypeKind::Decimal => {
            column_type.precision = size;
            column_type.scale = scale.or(size.map(|_| 0));
        }
        // Integer display widths carry no meaning
        TypeKind::Other(ref name) if !name.ends_with("int") => column_type.length = size,
        _ => {}
    }
    column_type
}

/// Normalize a catalog default expression to the raw value the model stores
pub fn parse_native_default(raw: Option<&str>) -> Option<String> {
    let raw = raw?.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("null") || raw.to_uppercase().starts_with("NULL::") {
        return None;
    }
    match QUOTED_DEFAULT.captures(raw) {
        Some(captures) => Some(captures[1].replace("''", "'")),
        None => Some(raw.to_string()),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.is_empty())
}

/// Columns of one index or foreign key, gathered from one row per column
struct KeyColumns<T> {
    meta: T,
    columns: Vec<String>,
    ref_columns: Vec<String>,
}

fn group_rows<T>(
    groups: &mut IndexMap<String, KeyColumns<T>>,
    name: String,
    column: String,
    ref_column: Option<String>,
    meta: impl FnOnce() -> T,
) {
    let group = groups.entry(name).or_insert_with(|| KeyColumns {
        meta: meta(),
        columns: Vec::new(),
        ref_columns: Vec::new(),
    });
    group.columns.push(column);
    group.ref_columns.extend(ref_column);
}

// Row types for PostgreSQL queries
#[derive(FromRow)]
struct PgTableRow {
    table_name: String,
    table_comment: Option<String>,
}

#[derive(FromRow)]
struct PgColumnRow {
    column_name: String,
    column_type: String,
    nullable: bool,
    column_default: Option<String>,
    is_identity: bool,
    column_comment: Option<String>,
}

#[derive(FromRow)]
struct PgIndexRow {
    index_name: String,
    column_name: String,
    is_unique: bool,
    is_primary: bool,
}

#[derive(FromRow)]
struct PgForeignKeyRow {
    constraint_name: String,
    column_name: String,
    ref_table: String,
    ref_column: String,
    delete_rule: String,
    update_rule: String,
}

/// PostgreSQL schema analyzer
struct PostgresAnalyzer<'a> {
    pool: &'a Pool<Postgres>,
    schema_name: &'a str,
}

impl<'a> PostgresAnalyzer<'a> {
    async fn analyze(&self) -> Result<Schema> {
        let sql = r#"
            SELECT c.relname::text AS table_name, obj_description(c.oid, 'pg_class') AS table_comment
            FROM pg_class c
            JOIN pg_namespace n ON n.oid = c.relnamespace
            WHERE c.relkind = 'r' AND n.nspname = $1
            ORDER BY c.relname
        "#;
        let table_rows = sqlx::query_as::<_, PgTableRow>(sql)
            .bind(self.schema_name)
            .fetch_all(self.pool)
            .await?;

        let mut schema = Schema::new();
        for row in table_rows {
            let mut table = Table::new(&row.table_name);
            self.analyze_columns(&mut table).await?;
            self.analyze_indexes(&mut table).await?;
            self.analyze_foreign_keys(&mut table).await?;
            if let Some(comment) = non_empty(row.table_comment) {
                table.set_option("comment", &comment);
            }
            schema.add_table(table)?;
        }
        Ok(schema)
    }

    async fn analyze_columns(&self, table: &mut Table) -> Result<()> {
        let sql = r#"
            SELECT
                a.attname::text AS column_name,
                format_type(a.atttypid, a.atttypmod) AS column_type,
                NOT a.attnotnull AS nullable,
                pg_get_expr(d.adbin, d.adrelid) AS column_default,
                a.attidentity IN ('a', 'd') AS is_identity,
                col_description(c.oid, a.attnum) AS column_comment
            FROM pg_attribute a
            JOIN pg_class c ON c.oid = a.attrelid
            JOIN pg_namespace n ON n.oid = c.relnamespace
            LEFT JOIN pg_attrdef d ON d.adrelid = a.attrelid AND d.adnum = a.attnum
            WHERE n.nspname = $1 AND c.relname = $2 AND a.attnum > 0 AND NOT a.attisdropped
            ORDER BY a.attnum
        "#;
        let rows = sqlx::query_as::<_, PgColumnRow>(sql)
            .bind(self.schema_name)
            .bind(&table.name)
            .fetch_all(self.pool)
            .await?;

        for row in rows {
            let serial = row
                .column_default
                .as_deref()
                .map(|default| default.starts_with("nextval("))
                .unwrap_or(false);
            let mut column = Column::new(&row.column_name, parse_native_type(Flavor::Postgres, &row.column_type))
                .nullable(row.nullable)
                .autoincrement(row.is_identity || serial);
            if !serial {
                column.default = parse_native_default(row.column_default.as_deref());
            }
            column.comment = non_empty(row.column_comment);
            table.add_column(column)?;
        }
        Ok(())
    }

    async fn analyze_indexes(&self, table: &mut Table) -> Result<()> {
        let sql = r#"
            SELECT
                i.relname::text AS index_name,
                a.attname::text AS column_name,
                ix.indisunique AS is_unique,
                ix.indisprimary AS is_primary
            FROM pg_index ix
            JOIN pg_class i ON i.oid = ix.indexrelid
            JOIN pg_class t ON t.oid = ix.indrelid
            JOIN pg_namespace n ON n.oid = t.relnamespace
            JOIN LATERAL unnest(ix.indkey::int2[]) WITH ORDINALITY AS k(attnum, ord) ON true
            JOIN pg_attribute a ON a.attrelid = t.oid AND a.attnum = k.attnum
            WHERE n.nspname = $1 AND t.relname = $2
            ORDER BY i.relname, k.ord
        "#;
        let rows = sqlx::query_as::<_, PgIndexRow>(sql)
            .bind(self.schema_name)
            .bind(&table.name)
            .fetch_all(self.pool)
            .await?;

        let mut groups = IndexMap::new();
        for row in rows {
            let (unique, primary) = (row.is_unique, row.is_primary);
            group_rows(&mut groups, row.index_name, row.column_name, None, || (unique, primary));
        }
        add_indexes(table, groups)
    }

    async fn analyze_foreign_keys(&self, table: &mut Table) -> Result<()> {
        let sql = r#"
            SELECT
                con.conname::text AS constraint_name,
                a.attname::text AS column_name,
                rt.relname::text AS ref_table,
                ra.attname::text AS ref_column,
                con.confdeltype::text AS delete_rule,
                con.confupdtype::text AS update_rule
            FROM pg_constraint con
            JOIN pg_class t ON t.oid = con.conrelid
            JOIN pg_namespace n ON n.oid = t.relnamespace
            JOIN pg_class rt ON rt.oid = con.confrelid
            JOIN LATERAL unnest(con.conkey, con.confkey) WITH ORDINALITY AS k(attnum, refnum, ord) ON true
            JOIN pg_attribute a ON a.attrelid = con.conrelid AND a.attnum = k.attnum
            JOIN pg_attribute ra ON ra.attrelid = con.confrelid AND ra.attnum = k.refnum
            WHERE con.contype = 'f' AND n.nspname = $1 AND t.relname = $2
            ORDER BY con.conname, k.ord
        "#;
        let rows = sqlx::query_as::<_, PgForeignKeyRow>(sql)
            .bind(self.schema_name)
            .bind(&table.name)
            .fetch_all(self.pool)
            .await?;

        let mut groups = IndexMap::new();
        for row in rows {
            let meta = (
                row.ref_table,
                postgres_action(&row.update_rule),
                postgres_action(&row.delete_rule),
            );
            group_rows(&mut groups, row.constraint_name, row.column_name, Some(row.ref_column), || meta);
        }
        add_foreign_keys(table, groups)
    }
}

/// Decode `pg_constraint` action codes
fn postgres_action(code: &str) -> &'static str {
    match code {
        "c" => "CASCADE",
        "n" => "SET NULL",
        "d" => "SET DEFAULT",
        "r" => "RESTRICT",
        _ => "NO ACTION",
    }
}

// Row types for MySQL queries. information_schema columns are cast to CHAR so they
// decode as strings on every server version.
#[derive(FromRow)]
struct MySqlTableRow {
    table_name: String,
    engine: Option<String>,
    table_collation: Option<String>,
    table_comment: Option<String>,
}

#[derive(FromRow)]
struct MySqlColumnRow {
    column_name: String,
    column_type: String,
    is_nullable: String,
    column_default: Option<String>,
    extra: Option<String>,
    column_comment: Option<String>,
}

#[derive(FromRow)]
struct MySqlIndexRow {
    index_name: String,
    column_name: String,
    non_unique: i64,
}

#[derive(FromRow)]
struct MySqlForeignKeyRow {
    constraint_name: String,
    column_name: String,
    ref_table: String,
    ref_column: String,
    delete_rule: String,
    update_rule: String,
}

/// MySQL schema analyzer
struct MySqlAnalyzer<'a> {
    pool: &'a Pool<MySql>,
    /// `None` reads the connection's current database
    schema_name: Option<&'a str>,
}

impl<'a> MySqlAnalyzer<'a> {
    async fn analyze(&self) -> Result<Schema> {
        let sql = r#"
            SELECT
                CAST(TABLE_NAME AS CHAR) AS table_name,
                CAST(ENGINE AS CHAR) AS engine,
                CAST(TABLE_COLLATION AS CHAR) AS table_collation,
                CAST(TABLE_COMMENT AS CHAR) AS table_comment
            FROM information_schema.TABLES
            WHERE TABLE_SCHEMA = COALESCE(?, DATABASE()) AND TABLE_TYPE = 'BASE TABLE'
            ORDER BY TABLE_NAME
        "#;
        let table_rows = sqlx::query_as::<_, MySqlTableRow>(sql)
            .bind(self.schema_name)
            .fetch_all(self.pool)
            .await?;

        let mut schema = Schema::new();
        for row in table_rows {
            let mut table = Table::new(&row.table_name);
            self.analyze_columns(&mut table).await?;
            self.analyze_indexes(&mut table).await?;
            self.analyze_foreign_keys(&mut table).await?;

            if let Some(engine) = non_empty(row.engine) {
                table.set_option("engine", &engine);
            }
            if let Some(collation) = non_empty(row.table_collation) {
                if let Some((charset, _)) = collation.split_once('_') {
                    table.set_option("charset", charset);
                }
                table.set_option("collation", &collation);
            }
            if let Some(comment) = non_empty(row.table_comment) {
                table.set_option("comment", &comment);
            }
            schema.add_table(table)?;
        }
        Ok(schema)
    }

    async fn analyze_columns(&self, table: &mut Table) -> Result<()> {
        let sql = r#"
            SELECT
                CAST(COLUMN_NAME AS CHAR) AS column_name,
                CAST(COLUMN_TYPE AS CHAR) AS column_type,
                CAST(IS_NULLABLE AS CHAR) AS is_nullable,
                CAST(COLUMN_DEFAULT AS CHAR) AS column_default,
                CAST(EXTRA AS CHAR) AS extra,
                CAST(COLUMN_COMMENT AS CHAR) AS column_comment
            FROM information_schema.COLUMNS
            WHERE TABLE_SCHEMA = COALESCE(?, DATABASE()) AND TABLE_NAME = ?
            ORDER BY ORDINAL_POSITION
        "#;
        let rows = sqlx::query_as::<_, MySqlColumnRow>(sql)
            .bind(self.schema_name)
            .bind(&table.name)
            .fetch_all(self.pool)
            .await?;

        for row in rows {
            let autoincrement = row
                .extra
                .as_deref()
                .map(|extra| extra.to_lowercase().contains("auto_increment"))
                .unwrap_or(false);
            let mut column = Column::new(&row.column_name, parse_native_type(Flavor::MySql, &row.column_type))
                .nullable(row.is_nullable == "YES")
                .autoincrement(autoincrement);
            column.default = parse_native_default(row.column_default.as_deref());
            column.comment = non_empty(row.column_comment);
            table.add_column(column)?;
        }
        Ok(())
    }

    async fn analyze_indexes(&self, table: &mut Table) -> Result<()> {
        let sql = r#"
            SELECT
                CAST(INDEX_NAME AS CHAR) AS index_name,
                CAST(COLUMN_NAME AS CHAR) AS column_name,
                CAST(NON_UNIQUE AS SIGNED) AS non_unique
            FROM information_schema.STATISTICS
            WHERE TABLE_SCHEMA = COALESCE(?, DATABASE()) AND TABLE_NAME = ?
            ORDER BY INDEX_NAME, SEQ_IN_INDEX
        "#;
        let rows = sqlx::query_as::<_, MySqlIndexRow>(sql)
            .bind(self.schema_name)
            .bind(&table.name)
            .fetch_all(self.pool)
            .await?;

        let mut groups = IndexMap::new();
        for row in rows {
            let primary = row.index_name == "PRIMARY";
            let unique = row.non_unique == 0;
            group_rows(&mut groups, row.index_name, row.column_name, None, || (unique, primary));
        }
        add_indexes(table, groups)
    }

    async fn analyze_foreign_keys(&self, table: &mut Table) -> Result<()> {
        let sql = r#"
            SELECT
                CAST(k.CONSTRAINT_NAME AS CHAR) AS constraint_name,
                CAST(k.COLUMN_NAME AS CHAR) AS column_name,
                CAST(k.REFERENCED_TABLE_NAME AS CHAR) AS ref_table,
                CAST(k.REFERENCED_COLUMN_NAME AS CHAR) AS ref_column,
                CAST(r.DELETE_RULE AS CHAR) AS delete_rule,
                CAST(r.UPDATE_RULE AS CHAR) AS update_rule
            FROM information_schema.KEY_COLUMN_USAGE k
            JOIN information_schema.REFERENTIAL_CONSTRAINTS r
                ON r.CONSTRAINT_SCHEMA = k.CONSTRAINT_SCHEMA
                AND r.CONSTRAINT_NAME = k.CONSTRAINT_NAME
                AND r.TABLE_NAME = k.TABLE_NAME
            WHERE k.TABLE_SCHEMA = COALESCE(?, DATABASE())
                AND k.TABLE_NAME = ?
                AND k.REFERENCED_TABLE_NAME IS NOT NULL
            ORDER BY k.CONSTRAINT_NAME, k.ORDINAL_POSITION
        "#;
        let rows = sqlx::query_as::<_, MySqlForeignKeyRow>(sql)
            .bind(self.schema_name)
            .bind(&table.name)
            .fetch_all(self.pool)
            .await?;

        let mut groups = IndexMap::new();
        for row in rows {
            let meta = (row.ref_table, row.update_rule, row.delete_rule);
            group_rows(&mut groups, row.constraint_name, row.column_name, Some(row.ref_column), || meta);
        }
        add_foreign_keys(table, groups)
    }
}

// Row types for SQLite queries
#[derive(FromRow)]
struct SqliteTableRow {
    table_name: String,
    table_sql: Option<String>,
}

#[derive(FromRow)]
struct SqliteColumnRow {
    column_name: String,
    column_type: String,
    not_null: i64,
    column_default: Option<String>,
    pk: i64,
}

#[derive(FromRow)]
struct SqliteIndexRow {
    index_name: String,
    column_name: Option<String>,
    is_unique: i64,
}

#[derive(FromRow)]
struct SqliteForeignKeyRow {
    id: i64,
    column_name: String,
    ref_table: String,
    ref_column: Option<String>,
    on_update: String,
    on_delete: String,
}

/// SQLite schema analyzer
struct SqliteAnalyzer<'a> {
    pool: &'a Pool<Sqlite>,
}

impl<'a> SqliteAnalyzer<'a> {
    async fn analyze(&self) -> Result<Schema> {
        let sql = r#"
            SELECT name AS table_name, sql AS table_sql
            FROM sqlite_master
            WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
            ORDER BY name
        "#;
        let table_rows = sqlx::query_as::<_, SqliteTableRow>(sql)
            .fetch_all(self.pool)
            .await?;

        let mut schema = Schema::new();
        for row in table_rows {
            let table_sql = row.table_sql.unwrap_or_default();
            let mut table = Table::new(&row.table_name);
            self.analyze_columns(&mut table, &table_sql).await?;
            self.analyze_indexes(&mut table).await?;
            self.analyze_foreign_keys(&mut table, &table_sql).await?;
            schema.add_table(table)?;
        }
        Ok(schema)
    }

    async fn analyze_columns(&self, table: &mut Table, table_sql: &str) -> Result<()> {
        let sql = r#"
            SELECT name AS column_name, type AS column_type, "notnull" AS not_null,
                   dflt_value AS column_default, pk
            FROM pragma_table_info(?)
            ORDER BY cid
        "#;
        let rows = sqlx::query_as::<_, SqliteColumnRow>(sql)
            .bind(&table.name)
            .fetch_all(self.pool)
            .await?;

        let mut primary: Vec<(i64, String)> = rows
            .iter()
            .filter(|row| row.pk > 0)
            .map(|row| (row.pk, row.column_name.clone()))
            .collect();
        primary.sort();
        // Only a lone INTEGER PRIMARY KEY can autoincrement
        let autoincrement = table_sql.to_uppercase().contains("AUTOINCREMENT") && primary.len() == 1;

        for row in rows {
            let column_type = parse_native_type(Flavor::Sqlite, &row.column_type);
            let column = Column {
                name: row.column_name,
                autoincrement: autoincrement && row.pk == 1 && column_type.kind == TypeKind::Integer,
                column_type,
                nullable: row.not_null == 0 && row.pk == 0,
                default: parse_native_default(row.column_default.as_deref()),
                comment: None,
            };
            table.add_column(column)?;
        }
        if !primary.is_empty() {
            table.set_primary_key(primary.into_iter().map(|(_, name)| name).collect())?;
        }
        Ok(())
    }

    async fn analyze_indexes(&self, table: &mut Table) -> Result<()> {
        // Only explicitly created indexes; constraint autoindexes belong to their constraint
        let sql = r#"
            SELECT il.name AS index_name, ii.name AS column_name, il."unique" AS is_unique
            FROM pragma_index_list(?) AS il
            JOIN pragma_index_info(il.name) AS ii
            WHERE il.origin = 'c'
            ORDER BY il.name, ii.seqno
        "#;
        let rows = sqlx::query_as::<_, SqliteIndexRow>(sql)
            .bind(&table.name)
            .fetch_all(self.pool)
            .await?;

        let mut groups = IndexMap::new();
        for row in rows {
            // Expression indexes have no column name
            let Some(column_name) = row.column_name else { continue };
            let unique = row.is_unique != 0;
            group_rows(&mut groups, row.index_name, column_name, None, || (unique, false));
        }
        add_indexes(table, groups)
    }

    async fn analyze_foreign_keys(&self, table: &mut Table, table_sql: &str) -> Result<()> {
        let sql = r#"
            SELECT id, "from" AS column_name, "table" AS ref_table, "to" AS ref_column, on_update, on_delete
            FROM pragma_foreign_key_list(?)
            ORDER BY id, seq
        "#;
        let rows = sqlx::query_as::<_, SqliteForeignKeyRow>(sql)
            .bind(&table.name)
            .fetch_all(self.pool)
            .await?;

        let names = sqlite_foreign_key_names(table_sql);
        let mut groups: IndexMap<i64, KeyColumns<(String, String, String)>> = IndexMap::new();
        for row in rows {
            let group = groups.entry(row.id).or_insert_with(|| KeyColumns {
                meta: (row.ref_table, row.on_update, row.on_delete),
                columns: Vec::new(),
                ref_columns: Vec::new(),
            });
            group.columns.push(row.column_name);
            group.ref_columns.extend(row.ref_column);
        }

        let mut named = IndexMap::new();
        for (id, group) in groups {
            let name = names
                .get(&group.columns)
                .cloned()
                .unwrap_or_else(|| format!("{}_fk{}", table.name, id));
            named.insert(name, group);
        }
        add_foreign_keys(table, named)
    }
}

/// Constraint names by their column list, recovered from a `CREATE TABLE` statement
fn sqlite_foreign_key_names(table_sql: &str) -> IndexMap<Vec<String>, String> {
    SQLITE_FOREIGN_KEY
        .captures_iter(table_sql)
        .map(|captures| {
            let columns = captures[2]
                .split(',')
                .map(|column| column.trim().trim_matches(|c| matches!(c, '"' | '`' | '[' | ']')).to_string())
                .collect();
            (columns, captures[1].to_string())
        })
        .collect()
}

fn add_indexes(table: &mut Table, groups: IndexMap<String, KeyColumns<(bool, bool)>>) -> Result<()> {
    for (name, group) in groups {
        let (unique, primary) = group.meta;
        if primary {
            table.set_primary_key(group.columns)?;
        } else {
            table.add_index(Index::new(&name, group.columns).unique(unique))?;
        }
    }
    Ok(())
}

fn add_foreign_keys<A: AsRef<str>>(
    table: &mut Table,
    groups: IndexMap<String, KeyColumns<(String, A, A)>>,
) -> Result<()> {
    for (name, group) in groups {
        let (ref_table, on_update, on_delete) = group.meta;
        let fk = ForeignKey::new(&name, group.columns, &ref_table, group.ref_columns)
            .on_update(on_update.as_ref())
            .on_delete(on_delete.as_ref());
        table.add_foreign_key(fk)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn sized(kind: TypeKind, length: u32) -> ColumnType {
        let mut column_type = ColumnType::new(kind);
        column_type.length = Some(length);
        column_type
    }

    #[rstest]
    #[case(Flavor::MySql, "int(11)", ColumnType::new(TypeKind::Integer))]
    #[case(Flavor::MySql, "tinyint(1)", ColumnType::new(TypeKind::Boolean))]
    #[case(Flavor::MySql, "tinyint(4)", ColumnType::new(TypeKind::Other("tinyint".to_string())))]
    #[case(Flavor::MySql, "varchar(64)", sized(TypeKind::String, 64))]
    #[case(Flavor::MySql, "timestamp", ColumnType::new(TypeKind::Timestamp))]
    #[case(Flavor::Postgres, "character varying(255)", sized(TypeKind::String, 255))]
    #[case(Flavor::Postgres, "character(36)", sized(TypeKind::Char, 36))]
    #[case(Flavor::Postgres, "timestamp without time zone", ColumnType::new(TypeKind::DateTime))]
    #[case(Flavor::Postgres, "timestamp with time zone", ColumnType::new(TypeKind::Timestamp))]
    #[case(Flavor::Postgres, "timestamp(6) without time zone", ColumnType::new(TypeKind::DateTime))]
    #[case(Flavor::Postgres, "timestamp(3) with time zone", ColumnType::new(TypeKind::Timestamp))]
    #[case(Flavor::Postgres, "time(0) without time zone", ColumnType::new(TypeKind::Time))]
    #[case(Flavor::Postgres, "double precision", ColumnType::new(TypeKind::Double))]
    #[case(Flavor::Postgres, "jsonb", ColumnType::new(TypeKind::Json))]
    #[case(Flavor::Sqlite, "INTEGER", ColumnType::new(TypeKind::Integer))]
    #[case(Flavor::Sqlite, "BOOLEAN", ColumnType::new(TypeKind::Boolean))]
    fn native_types_map_to_logical_types(#[case] flavor: Flavor, #[case] native: &str, #[case] expected: ColumnType) {
        assert_eq!(parse_native_type(flavor, native), expected);
    }

    #[test]
    fn unsigned_and_decimal_parameters_are_kept() {
        let id = parse_native_type(Flavor::MySql, "int(10) unsigned");
        assert_eq!(id.kind, TypeKind::Integer);
        assert!(id.unsigned);

        let amount = parse_native_type(Flavor::Postgres, "numeric(12,2)");
        assert_eq!((amount.precision, amount.scale), (Some(12), Some(2)));
    }

    #[test]
    fn unparseable_types_are_kept_verbatim() {
        assert_eq!(
            parse_native_type(Flavor::MySql, "enum('a','b')").kind,
            TypeKind::Other("enum('a','b')".to_string())
        );
        assert_eq!(
            parse_native_type(Flavor::MySql, "enum('Active','Inactive')").kind,
            TypeKind::Other("enum('Active','Inactive')".to_string())
        );
    }

    #[rstest]
    #[case(None, None)]
    #[case(Some("NULL"), None)]
    #[case(Some("0"), Some("0"))]
    #[case(Some("'active'::character varying"), Some("active"))]
    #[case(Some("'it''s'"), Some("it's"))]
    #[case(Some("CURRENT_TIMESTAMP"), Some("CURRENT_TIMESTAMP"))]
    #[case(Some("active"), Some("active"))]
    fn catalog_defaults_are_unquoted(#[case] raw: Option<&str>, #[case] expected: Option<&str>) {
        assert_eq!(parse_native_default(raw).as_deref(), expected);
    }

    #[test]
    fn sqlite_constraint_names_are_recovered() {
        let sql = r#"CREATE TABLE "users" (
  "id" INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
  "country_id" INTEGER NOT NULL,
  CONSTRAINT "fk_users_country" FOREIGN KEY ("country_id") REFERENCES "country" ("id")
)"#;

        let names = sqlite_foreign_key_names(sql);

        assert_eq!(names.get(&vec!["country_id".to_string()]).map(String::as_str), Some("fk_users_country"));
    }

    #[test]
    fn grouped_rows_become_keys_and_indexes() {
        let mut table = Table::new("t");
        for name in ["a", "b", "c"] {
            table.add_column(Column::new(name, TypeKind::Integer)).unwrap();
        }

        let mut indexes = IndexMap::new();
        group_rows(&mut indexes, "PRIMARY".to_string(), "a".to_string(), None, || (true, true));
        group_rows(&mut indexes, "t_bc".to_string(), "b".to_string(), None, || (false, false));
        group_rows(&mut indexes, "t_bc".to_string(), "c".to_string(), None, || (false, false));
        add_indexes(&mut table, indexes).unwrap();

        let mut fks = IndexMap::new();
        let meta = || ("other".to_string(), "NO ACTION".to_string(), "CASCADE".to_string());
        group_rows(&mut fks, "fk".to_string(), "b".to_string(), Some("x".to_string()), meta);
        group_rows(&mut fks, "fk".to_string(), "c".to_string(), Some("y".to_string()), meta);
        add_foreign_keys(&mut table, fks).unwrap();

        assert_eq!(table.primary_key().unwrap().columns, vec!["a".to_string()]);
        assert_eq!(table.indexes["t_bc"].columns, vec!["b".to_string(), "c".to_string()]);
        let fk = &table.foreign_keys["fk"];
        assert_eq!(fk.ref_columns, vec!["x".to_string(), "y".to_string()]);
        assert_eq!((fk.on_update.as_deref(), fk.on_delete.as_deref()), (None, Some("CASCADE")));
    }
}
