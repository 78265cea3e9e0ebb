//! Declarative schema file
//!
//! Reads and writes the YAML description of a schema. The document has a single
//! top-level `schema` key mapping table names to their definitions:
//!
//! ```yaml
//! schema:
//!   users:
//!     columns:
//!       id: { type: integer, autoincrement: true }
//!       login: { type: string, length: 255 }
//!       age: integer
//!     primary_key: [id]
//!     indexes:
//!       users_login_idx: { columns: [login], unique: true }
//!     foreign_keys:
//!       fk_users_country:
//!         columns: [country_id]
//!         references: { table: country, columns: [id] }
//!         on_delete: CASCADE
//!     options:
//!       comment: user accounts
//! ```
//!
//! [`parse`] and [`to_yaml`] are inverses: parsing the YAML written for a schema
//! gives back the same schema, in the same order.

use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use crate::error::{Error, Result};
use crate::schema::types::{Column, ColumnType, ForeignKey, Index, Schema, Table, TypeKind};

/// Top-level YAML document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaDocument {
    pub schema: IndexMap<String, TableDocument>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TableDocument {
    #[serde(default)]
    pub columns: IndexMap<String, ColumnDocument>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub primary_key: Vec<String>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub indexes: IndexMap<String, IndexDocument>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub foreign_keys: IndexMap<String, ForeignKeyDocument>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub options: IndexMap<String, String>,
}

/// A column is either just its type name or a full definition
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnDocument {
    Type(TypeKind),
    Definition(ColumnDefinition),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ColumnDefinition {
    #[serde(rename = "type")]
    pub kind: TypeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precision: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<u32>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub unsigned: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub nullable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<DefaultValue>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub autoincrement: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// Defaults may be written as plain YAML scalars
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DefaultValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
}

impl DefaultValue {
    fn into_raw(self) -> String {
        match self {
            DefaultValue::Text(value) => value,
            DefaultValue::Integer(value) => value.to_string(),
            DefaultValue::Float(value) => value.to_string(),
            DefaultValue::Bool(value) => value.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IndexDocument {
    pub columns: Vec<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub unique: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ForeignKeyDocument {
    pub columns: Vec<String>,
    pub references: ReferenceDocument,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_update: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_delete: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReferenceDocument {
    pub table: String,
    pub columns: Vec<String>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Parse a schema description. Blank or `null` documents describe an empty schema.
pub fn parse(text: &str) -> Result<Schema> {
    if text.trim().is_empty() {
        return Ok(Schema::new());
    }

    let value: Value = serde_yaml::from_str(text)
        .map_err(|e| Error::ConfigError(format!("Malformed schema file: {}", e)))?;
    let tables = match value {
        Value::Null => return Ok(Schema::new()),
        Value::Mapping(mapping) => match mapping.get("schema") {
            None => {
                return Err(Error::ConfigError(
                    "Schema file is missing the top-level `schema` key".to_string(),
                ))
            }
            Some(Value::Null) => return Ok(Schema::new()),
            Some(tables) => serde_yaml::from_value::<IndexMap<String, TableDocument>>(tables.clone())
                .map_err(|e| Error::ConfigError(format!("Malformed schema file: {}", e)))?,
        },
        _ => {
            return Err(Error::ConfigError(
                "Schema file must contain a mapping".to_string(),
            ))
        }
    };

    build(SchemaDocument { schema: tables })
}

/// Build a schema from its document form
pub fn build(document: SchemaDocument) -> Result<Schema> {
    let mut schema = Schema::new();
    for (name, table) in document.schema {
        schema.add_table(build_table(&name, table)?)?;
    }
    Ok(schema)
}

fn build_table(name: &str, document: TableDocument) -> Result<Table> {
    let mut table = Table::new(name);

    for (column_name, column) in document.columns {
        table.add_column(build_column(&column_name, column))?;
    }
    if !document.primary_key.is_empty() {
        table.set_primary_key(document.primary_key)?;
    }
    for (index_name, index) in document.indexes {
        table.add_index(Index::new(&index_name, index.columns).unique(index.unique))?;
    }
    for (fk_name, fk) in document.foreign_keys {
        let mut foreign_key = ForeignKey::new(&fk_name, fk.columns, &fk.references.table, fk.references.columns);
        if let Some(action) = &fk.on_update {
            foreign_key = foreign_key.on_update(action);
        }
        if let Some(action) = &fk.on_delete {
            foreign_key = foreign_key.on_delete(action);
        }
        table.add_foreign_key(foreign_key)?;
    }
    for (key, value) in document.options {
        table.set_option(&key, &value);
    }

    Ok(table)
}

fn build_column(name: &str, document: ColumnDocument) -> Column {
    match document {
        ColumnDocument::Type(kind) => Column::new(name, kind),
        ColumnDocument::Definition(definition) => Column {
            name: name.to_string(),
            column_type: ColumnType {
                kind: definition.kind,
                length: definition.length,
                precision: definition.precision,
                scale: definition.scale,
                unsigned: definition.unsigned,
            },
            nullable: definition.nullable,
            default: definition.default.map(DefaultValue::into_raw),
            autoincrement: definition.autoincrement,
            comment: definition.comment,
        },
    }
}

/// Describe a schema in document form
pub fn normalize(schema: &Schema) -> SchemaDocument {
    SchemaDocument {
        schema: schema
            .tables
            .values()
            .map(|table| (table.name.clone(), describe_table(table)))
            .collect(),
    }
}

fn describe_table(table: &Table) -> TableDocument {
    TableDocument {
        columns: table
            .columns
            .values()
            .map(|column| (column.name.clone(), describe_column(column)))
            .collect(),
        primary_key: table
            .primary_key()
            .map(|pk| pk.columns.clone())
            .unwrap_or_default(),
        indexes: table
            .indexes
            .values()
            .filter(|index| !index.primary)
            .map(|index| {
                (
                    index.name.clone(),
                    IndexDocument {
                        columns: index.columns.clone(),
                        unique: index.unique,
                    },
                )
            })
            .collect(),
        foreign_keys: table
            .foreign_keys
            .values()
            .map(|fk| {
                (
                    fk.name.clone(),
                    ForeignKeyDocument {
                        columns: fk.columns.clone(),
                        references: ReferenceDocument {
                            table: fk.ref_table.clone(),
                            columns: fk.ref_columns.clone(),
                        },
                        on_update: fk.on_update.clone(),
                        on_delete: fk.on_delete.clone(),
                    },
                )
            })
            .collect(),
        options: table.options.clone(),
    }
}

fn describe_column(column: &Column) -> ColumnDocument {
    if *column == Column::new(&column.name, column.column_type.kind.clone()) {
        return ColumnDocument::Type(column.column_type.kind.clone());
    }
    ColumnDocument::Definition(ColumnDefinition {
        kind: column.column_type.kind.clone(),
        length: column.column_type.length,
        precision: column.column_type.precision,
        scale: column.column_type.scale,
        unsigned: column.column_type.unsigned,
        nullable: column.nullable,
        default: column.default.clone().map(DefaultValue::Text),
        autoincrement: column.autoincrement,
        comment: column.comment.clone(),
    })
}

/// Serialize a schema to its YAML description
pub fn to_yaml(schema: &Schema) -> Result<String> {
    Ok(serde_yaml::to_string(&normalize(schema))?)
}

/// Load a schema file. A missing file describes an empty schema.
pub fn load_file(path: &Path) -> Result<Schema> {
    if !path.exists() {
        return Ok(Schema::new());
    }
    let text = fs::read_to_string(path).map_err(|e| {
        Error::ConfigError(format!("Failed to read schema file {}: {}", path.display(), e))
    })?;
    parse(&text)
}

/// Write a schema file, creating its directory when needed
pub fn write_file(path: &Path, schema: &Schema) -> Result<()> {
    let yaml = to_yaml(schema)?;
    if let Some(directory) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(directory).map_err(|source| Error::WriteError {
            path: directory.to_path_buf(),
            source,
        })?;
    }
    fs::write(path, yaml).map_err(|source| Error::WriteError {
        path: path.to_path_buf(),
        source,
    })
}
