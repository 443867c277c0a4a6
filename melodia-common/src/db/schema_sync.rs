//! Column synchronization
//!
//! Each table declares the columns it expects through [`TableSchema`]. On
//! startup the declared columns are compared with `PRAGMA table_info` and any
//! missing column is added with `ALTER TABLE ... ADD COLUMN`. Type and
//! constraint differences are reported but never changed automatically; those
//! need a versioned migration.
//!
//! ```rust,ignore
//! pub struct SongsTableSchema;
//!
//! impl TableSchema for SongsTableSchema {
//!     fn table_name() -> &'static str { "songs" }
//!
//!     fn expected_columns() -> Vec<ColumnDefinition> {
//!         vec![
//!             ColumnDefinition::new("id", "INTEGER").primary_key(),
//!             ColumnDefinition::new("image_url", "TEXT"),
//!         ]
//!     }
//! }
//!
//! SchemaSync::sync_table::<SongsTableSchema>(&pool).await?;
//! ```

use crate::Result;
use sqlx::{Row, SqlitePool};
use tracing::{debug, info, warn};

/// Declared column
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDefinition {
    pub name: String,
    /// SQL type (`TEXT`, `INTEGER`, `REAL`, `TIMESTAMP`)
    pub sql_type: String,
    pub not_null: bool,
    pub primary_key: bool,
    pub unique: bool,
    pub default_value: Option<String>,
    /// Foreign key clause, e.g. `albums(id) ON DELETE SET NULL`
    pub references: Option<String>,
}

impl ColumnDefinition {
    pub fn new(name: impl Into<String>, sql_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql_type: sql_type.into(),
            not_null: false,
            primary_key: false,
            unique: false,
            default_value: None,
            references: None,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// DEFAULT expression, written as SQL (quote string literals)
    pub fn default(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn references(mut self, target: impl Into<String>) -> Self {
        self.references = Some(target.into());
        self
    }

    /// `ALTER TABLE ... ADD COLUMN` statement for this column
    ///
    /// SQLite cannot add PRIMARY KEY or UNIQUE columns, nor NOT NULL columns
    /// without a default. Those constraints are dropped with a warning.
    fn add_column_sql(&self, table: &str) -> String {
        let mut sql = format!(
            "ALTER TABLE {} ADD COLUMN {} {}",
            table, self.name, self.sql_type
        );

        if self.primary_key || self.unique {
            warn!(
                "Cannot add {} constraint on {}.{} via ALTER TABLE; column added without it",
                if self.primary_key { "PRIMARY KEY" } else { "UNIQUE" },
                table,
                self.name
            );
        }

        match (&self.default_value, self.not_null) {
            (Some(default), true) => sql.push_str(&format!(" NOT NULL DEFAULT {}", default)),
            (Some(default), false) => sql.push_str(&format!(" DEFAULT {}", default)),
            (None, true) => warn!(
                "Cannot add NOT NULL column {}.{} without a DEFAULT; column will be nullable",
                table, self.name
            ),
            (None, false) => {}
        }

        if let Some(target) = &self.references {
            sql.push_str(&format!(" REFERENCES {}", target));
        }

        sql
    }
}

/// Column as reported by `PRAGMA table_info`
#[derive(Debug, Clone)]
pub struct ActualColumn {
    pub cid: i32,
    pub name: String,
    pub type_name: String,
    pub not_null: bool,
    pub default_value: Option<String>,
    pub pk: bool,
}

/// Difference between declared and actual schema
#[derive(Debug, Clone)]
pub enum SchemaDrift {
    MissingColumn {
        table: String,
        column: ColumnDefinition,
    },
    TypeMismatch {
        table: String,
        column: String,
        expected: String,
        actual: String,
    },
    ConstraintMismatch {
        table: String,
        column: String,
        constraint: String,
    },
}

/// Declared schema of one table
pub trait TableSchema {
    fn table_name() -> &'static str;

    /// Columns in creation order
    fn expected_columns() -> Vec<ColumnDefinition>;
}

/// Reads the live schema
pub struct SchemaIntrospector;

impl SchemaIntrospector {
    /// Columns of `table_name` ordered by position
    pub async fn introspect_table(pool: &SqlitePool, table_name: &str) -> Result<Vec<ActualColumn>> {
        let query = format!("PRAGMA table_info({})", table_name);
        let rows = sqlx::query(&query).fetch_all(pool).await?;

        let mut columns: Vec<ActualColumn> = rows
            .iter()
            .map(|row| ActualColumn {
                cid: row.get("cid"),
                name: row.get("name"),
                type_name: row.get("type"),
                not_null: row.get::<i32, _>("notnull") != 0,
                default_value: row.get("dflt_value"),
                pk: row.get::<i32, _>("pk") != 0,
            })
            .collect();

        columns.sort_by_key(|c| c.cid);
        Ok(columns)
    }

    pub async fn table_exists(pool: &SqlitePool, table_name: &str) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?)",
        )
        .bind(table_name)
        .fetch_one(pool)
        .await?;

        Ok(exists)
    }
}

/// Compares declared and live columns
pub struct SchemaDiff;

impl SchemaDiff {
    pub fn compare(table_name: &str, expected: &[ColumnDefinition], actual: &[ActualColumn]) -> Vec<SchemaDrift> {
        let mut drift = Vec::new();

        for expected_col in expected {
            let Some(actual_col) = actual.iter().find(|c| c.name == expected_col.name) else {
                drift.push(SchemaDrift::MissingColumn {
                    table: table_name.to_string(),
                    column: expected_col.clone(),
                });
                continue;
            };

            if !Self::types_compatible(&expected_col.sql_type, &actual_col.type_name) {
                drift.push(SchemaDrift::TypeMismatch {
                    table: table_name.to_string(),
                    column: expected_col.name.clone(),
                    expected: expected_col.sql_type.clone(),
                    actual: actual_col.type_name.clone(),
                });
            }

            if expected_col.not_null && !actual_col.not_null && !actual_col.pk {
                drift.push(SchemaDrift::ConstraintMismatch {
                    table: table_name.to_string(),
                    column: expected_col.name.clone(),
                    constraint: "NOT NULL".to_string(),
                });
            }

            if expected_col.primary_key && !actual_col.pk {
                drift.push(SchemaDrift::ConstraintMismatch {
                    table: table_name.to_string(),
                    column: expected_col.name.clone(),
                    constraint: "PRIMARY KEY".to_string(),
                });
            }
        }

        drift
    }

    /// SQLite type affinity comparison
    fn types_compatible(expected: &str, actual: &str) -> bool {
        let exp = expected.to_uppercase();
        let act = actual.to_uppercase();

        if exp == act {
            return true;
        }

        let integer = |t: &str| t.contains("INT");
        let text = |t: &str| t.contains("TEXT") || t.contains("CHAR") || t.contains("CLOB");
        let real = |t: &str| t.contains("REAL") || t.contains("FLOA") || t.contains("DOUB");

        (integer(&exp) && integer(&act)) || (text(&exp) && text(&act)) || (real(&exp) && real(&act))
    }
}

/// Applies missing columns
pub struct SchemaSync;

impl SchemaSync {
    /// Add missing columns to one table and report anything else that differs
    ///
    /// Returns the number of columns added.
    pub async fn sync_table<T: TableSchema>(pool: &SqlitePool) -> Result<usize> {
        let table_name = T::table_name();

        if !SchemaIntrospector::table_exists(pool, table_name).await? {
            warn!("Schema sync: table '{}' does not exist, skipping", table_name);
            return Ok(0);
        }

        let actual = SchemaIntrospector::introspect_table(pool, table_name).await?;
        let drift = SchemaDiff::compare(table_name, &T::expected_columns(), &actual);

        if drift.is_empty() {
            debug!("Schema sync: '{}' up to date", table_name);
            return Ok(0);
        }

        let mut added = 0;
        for change in drift {
            match change {
                SchemaDrift::MissingColumn { table, column } => {
                    Self::add_column(pool, &table, &column).await?;
                    added += 1;
                }
                SchemaDrift::TypeMismatch { table, column, expected, actual } => {
                    warn!(
                        "Type mismatch in {}.{}: expected '{}', found '{}'. Manual migration required.",
                        table, column, expected, actual
                    );
                }
                SchemaDrift::ConstraintMismatch { table, column, constraint } => {
                    warn!(
                        "Constraint mismatch in {}.{}: missing '{}'. Manual migration required.",
                        table, column, constraint
                    );
                }
            }
        }

        Ok(added)
    }

    async fn add_column(pool: &SqlitePool, table: &str, column: &ColumnDefinition) -> Result<()> {
        let sql = column.add_column_sql(table);
        info!("✓ Adding column: {}.{} ({})", table, column.name, column.sql_type);

        match sqlx::query(&sql).execute(pool).await {
            Ok(_) => Ok(()),
            // Another process added it between introspection and ALTER
            Err(sqlx::Error::Database(db_err)) if db_err.message().contains("duplicate column") => {
                debug!("Column {}.{} already present", table, column.name);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn setup_test_db() -> SqlitePool {
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap()
    }

    struct LegacySongs;

    impl TableSchema for LegacySongs {
        fn table_name() -> &'static str {
            "legacy_songs"
        }

        fn expected_columns() -> Vec<ColumnDefinition> {
            vec![
                ColumnDefinition::new("id", "INTEGER").primary_key(),
                ColumnDefinition::new("title", "TEXT").not_null(),
                ColumnDefinition::new("image_url", "TEXT"),
                ColumnDefinition::new("duration", "REAL").not_null().default("0"),
                ColumnDefinition::new("album_id", "INTEGER")
                    .references("legacy_albums(id) ON DELETE SET NULL"),
            ]
        }
    }

    #[test]
    fn test_add_column_sql() {
        let col = ColumnDefinition::new("album_id", "INTEGER")
            .references("albums(id) ON DELETE SET NULL");
        assert_eq!(
            col.add_column_sql("songs"),
            "ALTER TABLE songs ADD COLUMN album_id INTEGER REFERENCES albums(id) ON DELETE SET NULL"
        );

        let col = ColumnDefinition::new("duration", "REAL").not_null().default("0");
        assert_eq!(
            col.add_column_sql("songs"),
            "ALTER TABLE songs ADD COLUMN duration REAL NOT NULL DEFAULT 0"
        );

        // NOT NULL without DEFAULT is dropped
        let col = ColumnDefinition::new("genre", "TEXT").not_null();
        assert_eq!(col.add_column_sql("songs"), "ALTER TABLE songs ADD COLUMN genre TEXT");
    }

    #[test]
    fn test_types_compatible() {
        assert!(SchemaDiff::types_compatible("TEXT", "TEXT"));
        assert!(SchemaDiff::types_compatible("text", "TEXT"));
        assert!(SchemaDiff::types_compatible("INTEGER", "INT"));
        assert!(SchemaDiff::types_compatible("TEXT", "VARCHAR(255)"));
        assert!(SchemaDiff::types_compatible("REAL", "DOUBLE PRECISION"));
        assert!(SchemaDiff::types_compatible("REAL", "FLOAT"));

        assert!(!SchemaDiff::types_compatible("TEXT", "INTEGER"));
        assert!(!SchemaDiff::types_compatible("REAL", "TEXT"));
    }

    #[tokio::test]
    async fn test_sync_adds_missing_columns() {
        let pool = setup_test_db().await;

        sqlx::query("CREATE TABLE legacy_albums (id INTEGER PRIMARY KEY)")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("CREATE TABLE legacy_songs (id INTEGER PRIMARY KEY, title TEXT NOT NULL)")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO legacy_songs (title) VALUES ('Old')")
            .execute(&pool)
            .await
            .unwrap();

        let added = SchemaSync::sync_table::<LegacySongs>(&pool).await.unwrap();
        assert_eq!(added, 3);

        let columns = SchemaIntrospector::introspect_table(&pool, "legacy_songs")
            .await
            .unwrap();
        let names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["id", "title", "image_url", "duration", "album_id"]);

        // Existing rows keep their data and get the default
        let (title, duration): (String, f64) =
            sqlx::query_as("SELECT title, duration FROM legacy_songs")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(title, "Old");
        assert_eq!(duration, 0.0);

        // Second run is a no-op
        let added = SchemaSync::sync_table::<LegacySongs>(&pool).await.unwrap();
        assert_eq!(added, 0);
    }

    #[tokio::test]
    async fn test_sync_missing_table_is_skipped() {
        let pool = setup_test_db().await;
        let added = SchemaSync::sync_table::<LegacySongs>(&pool).await.unwrap();
        assert_eq!(added, 0);
    }

    #[tokio::test]
    async fn test_compare_reports_type_mismatch() {
        let pool = setup_test_db().await;
        sqlx::query("CREATE TABLE legacy_songs (id INTEGER PRIMARY KEY, title INTEGER NOT NULL)")
            .execute(&pool)
            .await
            .unwrap();

        let actual = SchemaIntrospector::introspect_table(&pool, "legacy_songs")
            .await
            .unwrap();
        let drift = SchemaDiff::compare("legacy_songs", &LegacySongs::expected_columns(), &actual);

        assert!(drift.iter().any(|d| matches!(
            d,
            SchemaDrift::TypeMismatch { column, .. } if column == "title"
        )));
        assert_eq!(
            drift
                .iter()
                .filter(|d| matches!(d, SchemaDrift::MissingColumn { .. }))
                .count(),
            3
        );
    }
}
