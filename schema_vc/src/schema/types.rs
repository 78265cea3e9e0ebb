//! Type definitions for database schema objects
//!
//! Snapshots are assembled once (by the YAML loader or the introspector) and then only
//! read. Every container is an [`IndexMap`] keyed by object name, so lookups are by
//! identity while iteration follows declaration order.

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Name given to the index backing a table's primary key
pub const PRIMARY_KEY_NAME: &str = "primary";

/// Length of `string` and `binary` columns declared without one
pub const DEFAULT_STRING_LENGTH: u32 = 255;

/// Represents a complete database schema
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Schema {
    pub tables: IndexMap<String, Table>,
}

impl Schema {
    /// Create a new empty schema
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a table to the schema
    pub fn add_table(&mut self, table: Table) -> Result<()> {
        if self.tables.contains_key(&table.name) {
            return Err(Error::ValidationError(format!(
                "Duplicate table `{}`",
                table.name
            )));
        }
        self.tables.insert(table.name.clone(), table);
        Ok(())
    }

    /// Look up a table by name
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    pub fn has_table(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

/// Represents a database table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    pub name: String,
    /// Columns in physical order
    pub columns: IndexMap<String, Column>,
    /// Indexes, including the primary key index
    pub indexes: IndexMap<String, Index>,
    pub foreign_keys: IndexMap<String, ForeignKey>,
    /// Free-form options such as `comment`, `engine`, `charset` or `collation`
    pub options: IndexMap<String, String>,
}

impl Table {
    /// Create a new table with the given name
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            columns: IndexMap::new(),
            indexes: IndexMap::new(),
            foreign_keys: IndexMap::new(),
            options: IndexMap::new(),
        }
    }

    /// Append a column to the table
    pub fn add_column(&mut self, column: Column) -> Result<()> {
        if self.columns.contains_key(&column.name) {
            return Err(Error::ValidationError(format!(
                "Duplicate column `{}` in table `{}`",
                column.name, self.name
            )));
        }
        self.columns.insert(column.name.clone(), column);
        Ok(())
    }

    /// Add an index to the table. Its columns must already exist.
    pub fn add_index(&mut self, index: Index) -> Result<()> {
        if self.indexes.contains_key(&index.name) {
            return Err(Error::ValidationError(format!(
                "Duplicate index `{}` in table `{}`",
                index.name, self.name
            )));
        }
        if index.primary && self.primary_key().is_some() {
            return Err(Error::ValidationError(format!(
                "Table `{}` already has a primary key",
                self.name
            )));
        }
        if index.columns.is_empty() {
            return Err(Error::ValidationError(format!(
                "Index `{}` in table `{}` has no columns",
                index.name, self.name
            )));
        }
        self.check_columns_exist(&index.columns, "index", &index.name)?;
        self.indexes.insert(index.name.clone(), index);
        Ok(())
    }

    /// Set the primary key for the table
    pub fn set_primary_key(&mut self, columns: Vec<String>) -> Result<()> {
        self.add_index(Index::primary(columns))
    }

    /// Add a foreign key to the table. Its local columns must already exist.
    pub fn add_foreign_key(&mut self, fk: ForeignKey) -> Result<()> {
        if self.foreign_keys.contains_key(&fk.name) {
            return Err(Error::ValidationError(format!(
                "Duplicate foreign key `{}` in table `{}`",
                fk.name, self.name
            )));
        }
        if fk.columns.is_empty() || fk.columns.len() != fk.ref_columns.len() {
            return Err(Error::ValidationError(format!(
                "Foreign key `{}` in table `{}` must reference as many columns as it declares",
                fk.name, self.name
            )));
        }
        self.check_columns_exist(&fk.columns, "foreign key", &fk.name)?;
        self.foreign_keys.insert(fk.name.clone(), fk);
        Ok(())
    }

    /// Set a table option
    pub fn set_option(&mut self, key: &str, value: &str) {
        self.options.insert(key.to_string(), value.to_string());
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.get(name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// Column names in physical order
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    /// Add the index MySQL creates for a foreign key when no index starts with its
    /// columns. The index takes the foreign key's name.
    pub fn add_foreign_key_indexes(&mut self) {
        let fks: Vec<ForeignKey> = self.foreign_keys.values().cloned().collect();
        for fk in fks {
            let covered = self
                .indexes
                .values()
                .any(|index| index.columns.starts_with(&fk.columns));
            if !covered && !self.indexes.contains_key(&fk.name) {
                self.indexes.insert(fk.name.clone(), Index::new(&fk.name, fk.columns));
            }
        }
    }

    pub fn primary_key(&self) -> Option<&Index> {
        self.indexes.values().find(|index| index.primary)
    }

    pub fn comment(&self) -> Option<&str> {
        self.options.get("comment").map(String::as_str)
    }

    fn check_columns_exist(&self, columns: &[String], kind: &str, name: &str) -> Result<()> {
        match columns.iter().find(|column| !self.has_column(column)) {
            Some(missing) => Err(Error::ValidationError(format!(
                "{} `{}` in table `{}` references unknown column `{}`",
                kind, name, self.name, missing
            ))),
            None => Ok(()),
        }
    }
}

/// Logical column type family
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TypeKind {
    SmallInt,
    Integer,
    BigInt,
    Decimal,
    Float,
    Double,
    Boolean,
    /// Variable-length character string
    String,
    /// Fixed-length character string
    Char,
    Text,
    Binary,
    Blob,
    Date,
    DateTime,
    Timestamp,
    Time,
    Json,
    Uuid,
    /// Any native type without a logical equivalent, rendered verbatim
    Other(String),
}

impl TypeKind {
    pub fn as_str(&self) -> &str {
        match self {
            TypeKind::SmallInt => "smallint",
            TypeKind::Integer => "integer",
            TypeKind::BigInt => "bigint",
            TypeKind::Decimal => "decimal",
            TypeKind::Float => "float",
            TypeKind::Double => "double",
            TypeKind::Boolean => "boolean",
            TypeKind::String => "string",
            TypeKind::Char => "char",
            TypeKind::Text => "text",
            TypeKind::Binary => "binary",
            TypeKind::Blob => "blob",
            TypeKind::Date => "date",
            TypeKind::DateTime => "datetime",
            TypeKind::Timestamp => "timestamp",
            TypeKind::Time => "time",
            TypeKind::Json => "json",
            TypeKind::Uuid => "uuid",
            TypeKind::Other(name) => name,
        }
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, TypeKind::SmallInt | TypeKind::Integer | TypeKind::BigInt)
    }

    pub fn is_numeric(&self) -> bool {
        self.is_integer() || matches!(self, TypeKind::Decimal | TypeKind::Float | TypeKind::Double)
    }

    /// Equality as the database sees it: native type keywords are case-insensitive,
    /// quoted enum or set members are not
    pub fn same_kind(&self, other: &TypeKind) -> bool {
        match (self, other) {
            (TypeKind::Other(a), TypeKind::Other(b)) => native_type_key(a) == native_type_key(b),
            _ => self == other,
        }
    }
}

/// Lowercase outside quoted literals, with whitespace collapsed and dropped around `(`, `)` and `,`
fn native_type_key(name: &str) -> String {
    let mut key = String::with_capacity(name.len());
    let mut quoted = false;
    let mut space = false;
    for c in name.trim().chars() {
        if quoted {
            key.push(c);
            quoted = c != '\'';
            continue;
        }
        if c.is_whitespace() {
            space = true;
            continue;
        }
        if space && !matches!(c, '(' | ')' | ',') && !key.ends_with(|last: char| matches!(last, '(' | ',')) {
            key.push(' ');
        }
        space = false;
        quoted = c == '\'';
        key.push(c.to_ascii_lowercase());
    }
    key
}

/// Form of a default value under which equivalent spellings compare equal,
/// e.g. `false` and `0` for booleans or `0` and `0.00` for decimals
fn default_key(kind: &TypeKind, value: &str) -> String {
    let trimmed = value.trim();
    if *kind == TypeKind::Boolean {
        match trimmed.to_lowercase().as_str() {
            "true" | "1" | "b'1'" => return "1".to_string(),
            "false" | "0" | "b'0'" => return "0".to_string(),
            _ => {}
        }
    }
    if kind.is_numeric() {
        if let Ok(number) = trimmed.parse::<f64>() {
            // Normalizes -0 as well
            return (number + 0.0).to_string();
        }
    }
    value.to_string()
}

impl FromStr for TypeKind {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let kind = match s.trim().to_lowercase().as_str() {
            "smallint" => TypeKind::SmallInt,
            "integer" | "int" => TypeKind::Integer,
            "bigint" => TypeKind::BigInt,
            "decimal" | "numeric" => TypeKind::Decimal,
            "float" => TypeKind::Float,
            "double" => TypeKind::Double,
            "boolean" | "bool" => TypeKind::Boolean,
            "string" | "varchar" => TypeKind::String,
            "char" => TypeKind::Char,
            "text" => TypeKind::Text,
            "binary" | "varbinary" => TypeKind::Binary,
            "blob" => TypeKind::Blob,
            "date" => TypeKind::Date,
            "datetime" => TypeKind::DateTime,
            "timestamp" => TypeKind::Timestamp,
            "time" => TypeKind::Time,
            "json" => TypeKind::Json,
            "uuid" => TypeKind::Uuid,
            _ => TypeKind::Other(s.trim().to_string()),
        };
        Ok(kind)
    }
}

impl From<String> for TypeKind {
    fn from(value: String) -> Self {
        match value.parse() {
            Ok(kind) => kind,
            Err(never) => match never {},
        }
    }
}

impl From<TypeKind> for String {
    fn from(kind: TypeKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Logical type of a column: a type family plus its size parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnType {
    pub kind: TypeKind,
    pub length: Option<u32>,
    pub precision: Option<u32>,
    pub scale: Option<u32>,
    pub unsigned: bool,
}

impl ColumnType {
    pub fn new(kind: TypeKind) -> Self {
        Self {
            kind,
            length: None,
            precision: None,
            scale: None,
            unsigned: false,
        }
    }

    /// Declared length, or the length databases apply when none is declared
    pub fn effective_length(&self) -> Option<u32> {
        self.length.or(match self.kind {
            TypeKind::String | TypeKind::Binary => Some(DEFAULT_STRING_LENGTH),
            TypeKind::Char => Some(1),
            _ => None,
        })
    }

    pub fn effective_precision(&self) -> Option<u32> {
        self.precision.or((self.kind == TypeKind::Decimal).then_some(10))
    }

    pub fn effective_scale(&self) -> Option<u32> {
        self.scale.or((self.kind == TypeKind::Decimal).then_some(0))
    }
}

impl From<TypeKind> for ColumnType {
    fn from(kind: TypeKind) -> Self {
        Self::new(kind)
    }
}

/// A column property that can differ between two versions of the same column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnProperty {
    Type,
    Length,
    Precision,
    Scale,
    Unsigned,
    Nullable,
    Default,
    Autoincrement,
    Comment,
}

/// Represents a database column
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    pub name: String,
    pub column_type: ColumnType,
    pub nullable: bool,
    /// Raw default value; dialects decide how to quote it
    pub default: Option<String>,
    pub autoincrement: bool,
    pub comment: Option<String>,
}

impl Column {
    /// Create a new NOT NULL column with the given name and type
    pub fn new(name: &str, column_type: impl Into<ColumnType>) -> Self {
        Self {
            name: name.to_string(),
            column_type: column_type.into(),
            nullable: false,
            default: None,
            autoincrement: false,
            comment: None,
        }
    }

    pub fn length(mut self, length: u32) -> Self {
        self.column_type.length = Some(length);
        self
    }

    pub fn precision(mut self, precision: u32, scale: u32) -> Self {
        self.column_type.precision = Some(precision);
        self.column_type.scale = Some(scale);
        self
    }

    pub fn unsigned(mut self, unsigned: bool) -> Self {
        self.column_type.unsigned = unsigned;
        self
    }

    /// Set whether the column is nullable
    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    /// Set a default value for the column
    pub fn default(mut self, default: &str) -> Self {
        self.default = Some(default.to_string());
        self
    }

    pub fn autoincrement(mut self, autoincrement: bool) -> Self {
        self.autoincrement = autoincrement;
        self
    }

    pub fn comment(mut self, comment: &str) -> Self {
        self.comment = Some(comment.to_string());
        self
    }

    /// Properties whose value differs in `other`. The name is not a property.
    pub fn changed_properties(&self, other: &Column) -> Vec<ColumnProperty> {
        let (a, b) = (&self.column_type, &other.column_type);
        [
            (ColumnProperty::Type, !a.kind.same_kind(&b.kind)),
            (ColumnProperty::Length, a.effective_length() != b.effective_length()),
            (ColumnProperty::Precision, a.effective_precision() != b.effective_precision()),
            (ColumnProperty::Scale, a.effective_scale() != b.effective_scale()),
            (ColumnProperty::Unsigned, a.unsigned != b.unsigned),
            (ColumnProperty::Nullable, self.nullable != other.nullable),
            (ColumnProperty::Default, !self.same_default(other)),
            (ColumnProperty::Autoincrement, self.autoincrement != other.autoincrement),
            (ColumnProperty::Comment, self.comment != other.comment),
        ]
        .into_iter()
        .filter_map(|(property, changed)| changed.then_some(property))
        .collect()
    }

    fn same_default(&self, other: &Column) -> bool {
        match (self.default.as_deref(), other.default.as_deref()) {
            (Some(a), Some(b)) => {
                default_key(&self.column_type.kind, a) == default_key(&other.column_type.kind, b)
            }
            (a, b) => a == b,
        }
    }

    /// Whether both columns have the same definition, ignoring their names
    pub fn same_definition(&self, other: &Column) -> bool {
        self.changed_properties(other).is_empty()
    }
}

/// Represents an index
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Index {
    pub name: String,
    pub columns: Vec<String>,
    pub unique: bool,
    pub primary: bool,
}

impl Index {
    pub fn new(name: &str, columns: Vec<String>) -> Self {
        Self {
            name: name.to_string(),
            columns,
            unique: false,
            primary: false,
        }
    }

    /// The primary key index over `columns`
    pub fn primary(columns: Vec<String>) -> Self {
        Self {
            name: PRIMARY_KEY_NAME.to_string(),
            columns,
            unique: true,
            primary: true,
        }
    }

    pub fn unique(mut self, unique: bool) -> Self {
        self.unique = unique;
        self
    }

    /// Whether both indexes cover the same columns with the same flags, ignoring names
    pub fn same_definition(&self, other: &Index) -> bool {
        self.columns == other.columns && self.unique == other.unique && self.primary == other.primary
    }
}

/// Represents a foreign key constraint
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ForeignKey {
    pub name: String,
    pub columns: Vec<String>,
    pub ref_table: String,
    pub ref_columns: Vec<String>,
    pub on_update: Option<String>,
    pub on_delete: Option<String>,
}

impl ForeignKey {
    pub fn new(name: &str, columns: Vec<String>, ref_table: &str, ref_columns: Vec<String>) -> Self {
        Self {
            name: name.to_string(),
            columns,
            ref_table: ref_table.to_string(),
            ref_columns,
            on_update: None,
            on_delete: None,
        }
    }

    pub fn on_update(mut self, action: &str) -> Self {
        self.on_update = Self::normalize_action(action);
        self
    }

    pub fn on_delete(mut self, action: &str) -> Self {
        self.on_delete = Self::normalize_action(action);
        self
    }

    /// Upper-cases a referential action. `RESTRICT` and `NO ACTION` are what every
    /// supported database does when no action is declared, so both map to `None`.
    pub fn normalize_action(action: &str) -> Option<String> {
        let action = action.trim().to_uppercase();
        match action.as_str() {
            "" | "RESTRICT" | "NO ACTION" => None,
            _ => Some(action),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn users() -> Table {
        let mut table = Table::new("users");
        table.add_column(Column::new("id", TypeKind::Integer).autoincrement(true)).unwrap();
        table.add_column(Column::new("login", TypeKind::String).length(255)).unwrap();
        table.set_primary_key(vec!["id".to_string()]).unwrap();
        table
    }

    #[test]
    fn columns_keep_declaration_order() {
        let mut table = users();
        table.add_column(Column::new("age", TypeKind::Integer)).unwrap();

        assert_eq!(table.column_names().collect::<Vec<_>>(), vec!["id", "login", "age"]);
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut table = users();
        assert!(table.add_column(Column::new("login", TypeKind::Text)).is_err());

        let mut schema = Schema::new();
        schema.add_table(users()).unwrap();
        assert!(matches!(schema.add_table(users()), Err(Error::ValidationError(_))));
    }

    #[test]
    fn foreign_key_columns_must_exist() {
        let mut table = users();
        let fk = ForeignKey::new("fk_country", vec!["country_id".to_string()], "country", vec!["id".to_string()]);

        let err = table.add_foreign_key(fk).unwrap_err();
        assert!(err.to_string().contains("country_id"));
    }

    #[test]
    fn foreign_key_arity_must_match() {
        let mut table = users();
        let fk = ForeignKey::new(
            "fk_pair",
            vec!["id".to_string(), "login".to_string()],
            "other",
            vec!["id".to_string()],
        );

        assert!(table.add_foreign_key(fk).is_err());
    }

    #[test]
    fn only_one_primary_key() {
        let mut table = users();
        assert!(table.set_primary_key(vec!["login".to_string()]).is_err());
        assert_eq!(table.primary_key().unwrap().columns, vec!["id".to_string()]);
    }

    #[test]
    fn changed_properties_ignore_name() {
        let a = Column::new("a", TypeKind::String).length(10);
        let b = Column::new("b", TypeKind::String).length(20).nullable(true);

        assert_eq!(
            a.changed_properties(&b),
            vec![ColumnProperty::Length, ColumnProperty::Nullable]
        );
        assert!(a.same_definition(&Column::new("c", TypeKind::String).length(10)));

        let flag = Column::new("active", TypeKind::Boolean).default("false");
        assert!(flag.same_definition(&Column::new("active", TypeKind::Boolean).default("0")));
        assert_eq!(
            flag.changed_properties(&Column::new("active", TypeKind::Boolean).default("1")),
            vec![ColumnProperty::Default]
        );

        let score = Column::new("score", TypeKind::Decimal).precision(8, 2).default("0");
        assert!(score.same_definition(&Column::new("score", TypeKind::Decimal).precision(8, 2).default("0.00")));
        assert!(!score.same_definition(&Column::new("score", TypeKind::Decimal).precision(8, 2).default("0.5")));

        // Text defaults stay exact
        let code = Column::new("code", TypeKind::String).default("007");
        assert!(!code.same_definition(&Column::new("code", TypeKind::String).default("7")));
    }

    #[test]
    fn native_type_keywords_compare_case_insensitively() {
        let written = Column::new("body", TypeKind::Other("MEDIUMTEXT".to_string()));
        assert!(written.same_definition(&Column::new("body", TypeKind::Other("mediumtext".to_string()))));

        let status = Column::new("status", TypeKind::Other("ENUM('Active', 'Inactive')".to_string()));
        assert!(status.same_definition(&Column::new("status", TypeKind::Other("enum('Active','Inactive')".to_string()))));
        assert_eq!(
            status.changed_properties(&Column::new("status", TypeKind::Other("enum('ACTIVE','INACTIVE')".to_string()))),
            vec![ColumnProperty::Type]
        );
    }

    #[test]
    fn implicit_lengths_match_their_explicit_form() {
        let implicit = Column::new("name", TypeKind::String);
        let explicit = Column::new("name", TypeKind::String).length(DEFAULT_STRING_LENGTH);
        assert!(implicit.same_definition(&explicit));

        let money = Column::new("amount", TypeKind::Decimal);
        assert!(money.same_definition(&Column::new("amount", TypeKind::Decimal).precision(10, 0)));
        assert!(!money.same_definition(&Column::new("amount", TypeKind::Decimal).precision(8, 2)));
    }

    #[test]
    fn foreign_keys_without_covering_index_get_one() {
        let mut table = users();
        table.add_column(Column::new("country_id", TypeKind::Integer)).unwrap();
        table.add_column(Column::new("team_id", TypeKind::Integer)).unwrap();
        table
            .add_index(Index::new("users_team_login", vec!["team_id".to_string(), "login".to_string()]))
            .unwrap();
        for (name, column, target) in [("fk_country", "country_id", "country"), ("fk_team", "team_id", "team")] {
            table
                .add_foreign_key(ForeignKey::new(name, vec![column.to_string()], target, vec!["id".to_string()]))
                .unwrap();
        }

        table.add_foreign_key_indexes();

        assert_eq!(table.indexes["fk_country"], Index::new("fk_country", vec!["country_id".to_string()]));
        assert!(!table.indexes.contains_key("fk_team"));
    }

    #[test]
    fn type_kind_parses_aliases_and_keeps_unknown_names() {
        assert_eq!("INT".parse::<TypeKind>().unwrap(), TypeKind::Integer);
        assert_eq!("varchar".parse::<TypeKind>().unwrap(), TypeKind::String);
        assert_eq!(
            "geometry".parse::<TypeKind>().unwrap(),
            TypeKind::Other("geometry".to_string())
        );
        assert_eq!(TypeKind::DateTime.to_string(), "datetime");
    }

    #[test]
    fn default_referential_actions_normalize_to_none() {
        assert_eq!(ForeignKey::normalize_action("restrict"), None);
        assert_eq!(ForeignKey::normalize_action("NO ACTION"), None);
        assert_eq!(ForeignKey::normalize_action("cascade"), Some("CASCADE".to_string()));
    }
}
