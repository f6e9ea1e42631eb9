use agro_core::RepositoryError;
use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, TypeInfo, ValueRef};

/// Read a decimal column stored as TEXT, INTEGER or REAL.
pub fn get_decimal(
    row: &SqliteRow,
    column: &str,
) -> Result<Decimal, RepositoryError> {
    get_optional_decimal(row, column)?
        .ok_or_else(|| RepositoryError::Database(format!("Column '{column}' is NULL")))
}

/// Read a nullable decimal column; NULL becomes `None`.
pub fn get_optional_decimal(
    row: &SqliteRow,
    column: &str,
) -> Result<Option<Decimal>, RepositoryError> {
    let value_ref = row
        .try_get_raw(column)
        .map_err(|e| RepositoryError::Database(format!("Column '{column}' not found: {e}")))?;

    if value_ref.is_null() {
        return Ok(None);
    }

    let type_name = value_ref.type_info().name().to_string();
    let value = match type_name.as_str() {
        "TEXT" => {
            let text: String = row.try_get(column).map_err(|e| {
                RepositoryError::Database(format!("Failed to get TEXT from '{column}': {e}"))
            })?;
            text.trim().parse::<Decimal>().map_err(|e| {
                RepositoryError::Database(format!("Invalid decimal '{text}' in '{column}': {e}"))
            })?
        }
        "INTEGER" => {
            let value: i64 = row.try_get(column).map_err(|e| {
                RepositoryError::Database(format!("Failed to get INTEGER from '{column}': {e}"))
            })?;
            Decimal::from(value)
        }
        "REAL" => {
            let value: f64 = row.try_get(column).map_err(|e| {
                RepositoryError::Database(format!("Failed to get REAL from '{column}': {e}"))
            })?;
            Decimal::try_from(value).map_err(|e| {
                RepositoryError::Database(format!("Failed to convert {value} to Decimal: {e}"))
            })?
        }
        other => {
            return Err(RepositoryError::Database(format!(
                "Unexpected type '{other}' for column '{column}'"
            )));
        }
    };

    Ok(Some(value))
}

/// Canonical TEXT form for storage.
pub fn decimal_to_text(value: Decimal) -> String {
    value.normalize().to_string()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;
    use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

    use super::*;

    async fn setup_test_db() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .connect("sqlite::memory:")
            .await
            .expect("Failed to create in-memory database");
        sqlx::query(
            "CREATE TABLE samples (
                id INTEGER PRIMARY KEY,
                text_value TEXT,
                int_value INTEGER,
                real_value REAL,
                blob_value BLOB
            )",
        )
        .execute(&pool)
        .await
        .expect("Failed to create test table");
        pool
    }

    async fn fetch(
        pool: &SqlitePool,
        insert: &str,
        column: &str,
    ) -> SqliteRow {
        sqlx::query(insert)
            .execute(pool)
            .await
            .expect("Failed to insert test data");
        sqlx::query(&format!("SELECT {column} FROM samples WHERE id = 1"))
            .fetch_one(pool)
            .await
            .expect("Failed to fetch row")
    }

    #[tokio::test]
    async fn test_get_decimal_from_text_keeps_precision() {
        let pool = setup_test_db().await;
        let row = fetch(
            &pool,
            "INSERT INTO samples (id, text_value) VALUES (1, '116204.047906')",
            "text_value",
        )
        .await;

        assert_eq!(get_decimal(&row, "text_value"), Ok(dec!(116204.047906)));
    }

    #[tokio::test]
    async fn test_get_decimal_from_negative_integer() {
        let pool = setup_test_db().await;
        let row = fetch(
            &pool,
            "INSERT INTO samples (id, int_value) VALUES (1, -177607)",
            "int_value",
        )
        .await;

        assert_eq!(get_decimal(&row, "int_value"), Ok(dec!(-177607)));
    }

    #[tokio::test]
    async fn test_get_decimal_from_real() {
        let pool = setup_test_db().await;
        let row = fetch(
            &pool,
            "INSERT INTO samples (id, real_value) VALUES (1, 9.5)",
            "real_value",
        )
        .await;

        assert_eq!(get_decimal(&row, "real_value"), Ok(dec!(9.5)));
    }

    #[tokio::test]
    async fn test_get_decimal_rejects_null() {
        let pool = setup_test_db().await;
        let row = fetch(&pool, "INSERT INTO samples (id) VALUES (1)", "text_value").await;

        assert_eq!(
            get_decimal(&row, "text_value"),
            Err(RepositoryError::Database(
                "Column 'text_value' is NULL".to_string()
            ))
        );
    }

    #[tokio::test]
    async fn test_get_optional_decimal_from_null_returns_none() {
        let pool = setup_test_db().await;
        let row = fetch(&pool, "INSERT INTO samples (id) VALUES (1)", "text_value").await;

        assert_eq!(get_optional_decimal(&row, "text_value"), Ok(None));
    }

    #[tokio::test]
    async fn test_get_decimal_invalid_text() {
        let pool = setup_test_db().await;
        let row = fetch(
            &pool,
            "INSERT INTO samples (id, text_value) VALUES (1, 'diez')",
            "text_value",
        )
        .await;

        assert!(matches!(
            get_decimal(&row, "text_value"),
            Err(RepositoryError::Database(msg)) if msg.starts_with("Invalid decimal 'diez'")
        ));
    }

    #[tokio::test]
    async fn test_get_decimal_unexpected_type() {
        let pool = setup_test_db().await;
        let row = fetch(
            &pool,
            "INSERT INTO samples (id, blob_value) VALUES (1, x'0102')",
            "blob_value",
        )
        .await;

        assert_eq!(
            get_decimal(&row, "blob_value"),
            Err(RepositoryError::Database(
                "Unexpected type 'BLOB' for column 'blob_value'".to_string()
            ))
        );
    }

    #[tokio::test]
    async fn test_get_decimal_column_not_found() {
        let pool = setup_test_db().await;
        let row = fetch(&pool, "INSERT INTO samples (id) VALUES (1)", "id").await;

        assert!(matches!(
            get_decimal(&row, "missing"),
            Err(RepositoryError::Database(msg)) if msg.starts_with("Column 'missing' not found:")
        ));
    }

    #[test]
    fn test_decimal_to_text_strips_trailing_zeros() {
        assert_eq!(decimal_to_text(dec!(1200000.00)), "1200000");
        assert_eq!(decimal_to_text(dec!(9.50)), "9.5");
        assert_eq!(decimal_to_text(dec!(-177607)), "-177607");
    }
}
