use duckdb::{params, Connection};
use r2d2::Pool;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info};

use crate::db::db_pool::DuckDBConnectionManager;
use crate::db::DbError;

pub const SCHEMA_HEADER: &str = "# Database Schema\n";

const TABLES_QUERY: &str = "
    SELECT table_name
    FROM information_schema.tables
    WHERE table_catalog = current_database() AND table_schema = ?
    ORDER BY table_name
";

const COLUMNS_QUERY: &str = "
    SELECT column_name, data_type, is_nullable, column_default
    FROM information_schema.columns
    WHERE table_catalog = current_database() AND table_schema = ? AND table_name = ?
    ORDER BY ordinal_position
";

// Referencing columns come from the foreign key constraint, referenced columns
// from the unique/primary key it points at, matched by position.
const FOREIGN_KEYS_QUERY: &str = "
    SELECT
        kcu.column_name,
        uc.table_name AS foreign_table_name,
        uc.column_name AS foreign_column_name
    FROM information_schema.referential_constraints AS rc
    JOIN information_schema.key_column_usage AS kcu
        ON kcu.constraint_name = rc.constraint_name
        AND kcu.constraint_schema = rc.constraint_schema
    JOIN information_schema.key_column_usage AS uc
        ON uc.constraint_name = rc.unique_constraint_name
        AND uc.constraint_schema = rc.unique_constraint_schema
        AND uc.ordinal_position = kcu.ordinal_position
    WHERE kcu.table_schema = ?
        AND kcu.table_name = ?
    ORDER BY kcu.ordinal_position
";

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSchema {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
    pub default: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForeignKey {
    pub column: String,
    pub foreign_table: String,
    pub foreign_column: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<ColumnSchema>,
    pub foreign_keys: Vec<ForeignKey>,
}

/// The schema description currently handed to the LLM, replaced wholesale on
/// every load.
#[derive(Debug, Clone, Default)]
pub struct SchemaSnapshot {
    pub description: Arc<String>,
    pub table_count: usize,
    pub loaded_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Loads and holds the textual schema description used as LLM context
pub struct SchemaManager {
    schema_name: String,
    snapshot: RwLock<SchemaSnapshot>,
}

impl SchemaManager {
    pub fn new(schema_name: impl Into<String>) -> Self {
        Self {
            schema_name: schema_name.into(),
            snapshot: RwLock::new(SchemaSnapshot::default()),
        }
    }

    pub async fn snapshot(&self) -> SchemaSnapshot {
        self.snapshot.read().await.clone()
    }

    pub async fn description(&self) -> Arc<String> {
        Arc::clone(&self.snapshot.read().await.description)
    }

    /// Re-reads the catalog and swaps in a freshly rendered description.
    ///
    /// Any catalog error leaves the description empty and is returned to the
    /// caller after being logged.
    pub async fn reload(&self, pool: &Pool<DuckDBConnectionManager>) -> Result<usize, DbError> {
        info!("Loading database schema for '{}'", self.schema_name);

        let pool = pool.clone();
        let schema_name = self.schema_name.clone();
        let loaded = tokio::task::spawn_blocking(move || -> Result<Vec<TableSchema>, DbError> {
            let conn = pool.get()?;
            Ok(load_tables(&conn, &schema_name)?)
        })
        .await
        .map_err(DbError::from)
        .and_then(|result| result);

        let mut snapshot = self.snapshot.write().await;
        match loaded {
            Ok(tables) => {
                for table in &tables {
                    debug!("Loaded schema for: {}", table.name);
                }
                *snapshot = SchemaSnapshot {
                    description: Arc::new(render_schema(&tables)),
                    table_count: tables.len(),
                    loaded_at: Some(chrono::Utc::now()),
                };
                info!("Database schema loaded: {} tables", tables.len());
                Ok(tables.len())
            }
            Err(e) => {
                error!("Error loading schema: {}", e);
                *snapshot = SchemaSnapshot::default();
                Err(e)
            }
        }
    }
}

/// Reads tables, columns and foreign keys of one schema from the catalog
pub fn load_tables(conn: &Connection, schema_name: &str) -> Result<Vec<TableSchema>, duckdb::Error> {
    let mut tables_stmt = conn.prepare(TABLES_QUERY)?;
    let table_names = tables_stmt
        .query_map(params![schema_name], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<String>, _>>()?;

    info!("Loading schema for {} tables", table_names.len());

    let mut columns_stmt = conn.prepare(COLUMNS_QUERY)?;
    let mut fkeys_stmt = conn.prepare(FOREIGN_KEYS_QUERY)?;

    let mut tables = Vec::with_capacity(table_names.len());
    for name in table_names {
        let columns = columns_stmt
            .query_map(params![schema_name, name], |row| {
                Ok(ColumnSchema {
                    name: row.get(0)?,
                    data_type: row.get(1)?,
                    nullable: row.get::<_, String>(2)? != "NO",
                    default: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let foreign_keys = fkeys_stmt
            .query_map(params![schema_name, name], |row| {
                Ok(ForeignKey {
                    column: row.get(0)?,
                    foreign_table: row.get(1)?,
                    foreign_column: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        tables.push(TableSchema {
            name,
            columns,
            foreign_keys,
        });
    }

    Ok(tables)
}

/// Renders catalog records into the DDL-like document given to the LLM
pub fn render_schema(tables: &[TableSchema]) -> String {
    let mut parts = vec![SCHEMA_HEADER.to_string()];
    parts.extend(tables.iter().map(render_table));
    parts.join("\n")
}

fn render_table(table: &TableSchema) -> String {
    let columns = table
        .columns
        .iter()
        .map(|col| {
            let mut def = format!("  {} {}", col.name, col.data_type);
            if !col.nullable {
                def.push_str(" NOT NULL");
            }
            if let Some(default) = col.default.as_deref().filter(|d| !d.is_empty()) {
                def.push_str(&format!(" DEFAULT {}", default));
            }
            def
        })
        .collect::<Vec<_>>()
        .join(",\n");

    let mut ddl = format!(
        "\n## Table: {name}\n```sql\nCREATE TABLE {name} (\n{columns}\n);\n```\n",
        name = table.name,
    );

    if !table.foreign_keys.is_empty() {
        ddl.push_str("\n**Foreign Keys:**\n");
        for fk in &table.foreign_keys {
            ddl.push_str(&format!(
                "- {} → {}.{}\n",
                fk.column, fk.foreign_table, fk.foreign_column
            ));
        }
    }

    ddl
}
