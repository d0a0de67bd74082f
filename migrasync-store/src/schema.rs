//! Declarative description of the artifact log table and the DDL derived
//! from it.
//!
//! The column list is the single place the table shape is written down;
//! [`create_table_sql`] and [`create_index_sql`] render it for SQLite.

/// One column of the log table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: &'static str,
    pub sql_type: &'static str,
    pub nullable: bool,
    pub primary_key: bool,
    pub unique: bool,
    pub default: Option<&'static str>,
}

/// One secondary index. The rendered name is `<table>_<suffix>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexDef {
    pub suffix: &'static str,
    pub columns: &'static [&'static str],
    pub unique: bool,
}

const fn column(name: &'static str, sql_type: &'static str) -> ColumnDef {
    ColumnDef {
        name,
        sql_type,
        nullable: false,
        primary_key: false,
        unique: false,
        default: None,
    }
}

/// Columns in declaration order.
pub const LOG_COLUMNS: &[ColumnDef] = &[
    ColumnDef {
        primary_key: true,
        ..column("id", "INTEGER")
    },
    column("namespace", "VARCHAR(255)"),
    column("name", "VARCHAR(255)"),
    column("content", "TEXT"),
    column("published_at", "TEXT"),
];

/// `(namespace, name)` identity plus a lookup index on `name`.
pub const LOG_INDEXES: &[IndexDef] = &[
    IndexDef {
        suffix: "namespace_name_uniq",
        columns: &["namespace", "name"],
        unique: true,
    },
    IndexDef {
        suffix: "name_idx",
        columns: &["name"],
        unique: false,
    },
];

fn column_sql(col: &ColumnDef) -> String {
    let mut sql = format!("{} {}", col.name, col.sql_type);
    if !col.nullable {
        sql.push_str(" NOT NULL");
    }
    if col.primary_key {
        sql.push_str(" PRIMARY KEY AUTOINCREMENT");
    }
    if col.unique {
        sql.push_str(" UNIQUE");
    }
    if let Some(default) = col.default {
        sql.push_str(&format!(" DEFAULT '{}'", default.replace('\'', "''")));
    }
    sql
}

/// `CREATE TABLE <table> (...)` for [`LOG_COLUMNS`].
pub fn create_table_sql(table: &str) -> String {
    let columns: Vec<String> = LOG_COLUMNS.iter().map(column_sql).collect();
    format!("CREATE TABLE {table} (\n    {}\n)", columns.join(",\n    "))
}

/// One `CREATE [UNIQUE] INDEX` statement per entry of [`LOG_INDEXES`].
pub fn create_index_sql(table: &str) -> Vec<String> {
    LOG_INDEXES
        .iter()
        .map(|idx| {
            let unique = if idx.unique { "UNIQUE " } else { "" };
            format!(
                "CREATE {unique}INDEX {table}_{} ON {table} ({})",
                idx.suffix,
                idx.columns.join(", ")
            )
        })
        .collect()
}
