//! # Database Error Types
//!
//! Error types for database operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbError (this module) ← constraint failures recognised here           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ServiceError (backoffice)                                             │
//! │       ├── UniqueViolation → Conflict                                   │
//! │       ├── NotFound        → NotFound                                   │
//! │       └── everything else → Store (logged, detail hidden)              │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

/// Database operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found in database.
    ///
    /// ## When This Occurs
    /// - UPDATE/DELETE touched zero rows
    /// - A lookup that must succeed returned nothing
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation.
    ///
    /// ## When This Occurs
    /// - Coupon code already used in the same outlet
    /// - Invoice number already used anywhere
    /// - Coupon already attached to the sale
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Foreign key constraint violation.
    ///
    /// ## When This Occurs
    /// - Sale item or sale-coupon link pointing at a missing sale or coupon
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// CHECK constraint violation (e.g. `end_date >= start_date`).
    ///
    /// `field` is the first column the failed expression names.
    #[error("Check constraint violation: {message}")]
    CheckViolation { field: String, message: String },

    /// Database connection failed.
    ///
    /// ## When This Occurs
    /// - Database file can't be created or opened
    /// - Pool was closed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates a UniqueViolation error.
    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Fills in the offending value on a unique violation; other errors pass
    /// through untouched.
    pub fn with_value(self, value: impl Into<String>) -> Self {
        match self {
            DbError::UniqueViolation { field, .. } => DbError::UniqueViolation {
                field,
                value: value.into(),
            },
            other => other,
        }
    }
}

/// Columns named in a SQLite constraint message, table prefixes removed.
///
/// `"UNIQUE constraint failed: coupons.outlet_id, coupons.code"` → `"outlet_id, code"`
fn constraint_columns(msg: &str, marker: &str) -> String {
    msg.split(marker)
        .nth(1)
        .map(|cols| {
            cols.split(',')
                .map(|c| c.trim().rsplit('.').next().unwrap_or(c).to_string())
                .collect::<Vec<_>>()
                .join(", ")
        })
        .unwrap_or_else(|| "unknown".to_string())
}

/// Leading column of a failed CHECK expression.
///
/// `"CHECK constraint failed: end_date >= start_date"` → `"end_date"`
fn check_column(msg: &str) -> String {
    let column: String = msg
        .split("CHECK constraint failed: ")
        .nth(1)
        .unwrap_or("")
        .trim_start_matches(|c: char| c == '(' || c.is_whitespace())
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();
    if column.is_empty() {
        "unknown".to_string()
    } else {
        column
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → DbError::NotFound
/// sqlx::Error::Database       → inspect message for constraint type
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// Other                       → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Record", "unknown"),

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                if msg.contains("UNIQUE constraint failed") {
                    DbError::UniqueViolation {
                        field: constraint_columns(msg, "UNIQUE constraint failed: "),
                        value: "unknown".to_string(),
                    }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else if msg.contains("CHECK constraint failed") {
                    DbError::CheckViolation {
                        field: check_column(msg),
                        message: msg.to_string(),
                    }
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constraint_columns_strips_tables() {
        assert_eq!(
            constraint_columns(
                "UNIQUE constraint failed: coupons.outlet_id, coupons.code",
                "UNIQUE constraint failed: "
            ),
            "outlet_id, code"
        );
        assert_eq!(
            constraint_columns("UNIQUE constraint failed: sales.invoice_number", "UNIQUE constraint failed: "),
            "invoice_number"
        );
        assert_eq!(constraint_columns("garbage", "UNIQUE constraint failed: "), "unknown");
    }

    #[test]
    fn test_check_column() {
        assert_eq!(
            check_column("CHECK constraint failed: end_date >= start_date"),
            "end_date"
        );
        assert_eq!(
            check_column("CHECK constraint failed: discount_value <= 10000 OR discount_type = 'fixed'"),
            "discount_value"
        );
        assert_eq!(check_column("CHECK constraint failed: "), "unknown");
    }

    #[test]
    fn test_with_value_only_touches_unique() {
        let err = DbError::duplicate("invoice_number", "unknown").with_value("INV-001");
        assert_eq!(err.to_string(), "Duplicate invoice_number: 'INV-001' already exists");

        let err = DbError::not_found("Sale", "x").with_value("ignored");
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[test]
    fn test_pool_errors() {
        assert!(matches!(DbError::from(sqlx::Error::PoolTimedOut), DbError::PoolExhausted));
        assert!(matches!(
            DbError::from(sqlx::Error::PoolClosed),
            DbError::ConnectionFailed(_)
        ));
    }
}
