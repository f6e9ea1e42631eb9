use std::collections::BTreeMap;
use std::path::Path;

use agro_core::{
    AgroRepository, CropProfile, CropReference, DiagnosticResponse, Plan, ReferenceDataset,
    RepositoryError,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::SecondsFormat;
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::Row;
use tracing::{debug, info};

use crate::decimal::{decimal_to_text, get_decimal, get_optional_decimal};

pub struct SqliteRepository {
    pool: SqlitePool,
}

/// Maps a bare path or `:memory:` to a sqlx connection URL; sqlx URLs pass
/// through unchanged.
pub fn connection_url(connection_string: &str) -> String {
    match connection_string {
        ":memory:" => "sqlite::memory:".to_string(),
        s if s.starts_with("sqlite:") => s.to_string(),
        path => format!("sqlite:{path}?mode=rwc"),
    }
}

impl SqliteRepository {
    pub async fn new(database_url: &str) -> Result<Self> {
        let url = connection_url(database_url);
        let pool = SqlitePool::connect(&url)
            .await
            .with_context(|| format!("Failed to connect to database: {database_url}"))?;
        Ok(Self { pool })
    }

    pub async fn new_with_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run database migrations")?;
        Ok(())
    }

    /// Execute every `.sql` file in `seeds_dir`, in file name order.
    /// Seed files must be idempotent; they run on every open.
    pub async fn run_seeds(
        &self,
        seeds_dir: &Path,
    ) -> Result<()> {
        let mut entries: Vec<_> = std::fs::read_dir(seeds_dir)
            .with_context(|| format!("Failed to read seeds directory '{}'", seeds_dir.display()))?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "sql"))
            .collect();

        entries.sort_by_key(|entry| entry.file_name());

        for entry in entries {
            let path = entry.path();
            let sql = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read seed file '{}'", path.display()))?;

            sqlx::raw_sql(&sql)
                .execute(&self.pool)
                .await
                .with_context(|| format!("Failed to execute seed file '{}'", path.display()))?;
            debug!(file = %path.display(), "seed applied");
        }

        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn db_error(err: sqlx::Error) -> RepositoryError {
    RepositoryError::Database(err.to_string())
}

fn get_text(
    row: &SqliteRow,
    column: &str,
) -> Result<String, RepositoryError> {
    row.try_get(column)
        .map_err(|e| RepositoryError::Database(format!("Failed to get {column}: {e}")))
}

fn row_to_crop_profile(row: &SqliteRow) -> Result<CropProfile, RepositoryError> {
    Ok(CropProfile {
        code: get_text(row, "code")?,
        label: get_text(row, "label")?,
        savings_pct: get_decimal(row, "savings_pct")?,
        productivity_pct: get_decimal(row, "productivity_pct")?,
        net_margin_per_hectare: get_optional_decimal(row, "net_margin_per_hectare")?,
    })
}

fn row_to_plan(row: &SqliteRow) -> Result<Plan, RepositoryError> {
    Ok(Plan {
        id: get_text(row, "id")?,
        display_name: get_text(row, "display_name")?,
        fixed_amount: get_decimal(row, "fixed_amount")?,
    })
}

fn row_to_diagnostic(row: &SqliteRow) -> Result<DiagnosticResponse, RepositoryError> {
    let payload = get_text(row, "payload")?;
    serde_json::from_str(&payload)
        .map_err(|e| RepositoryError::Database(format!("Corrupt diagnostic payload: {e}")))
}

#[async_trait]
impl AgroRepository for SqliteRepository {
    async fn list_crop_profiles(&self) -> Result<Vec<CropProfile>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT code, label, savings_pct, productivity_pct, net_margin_per_hectare
             FROM crop_profiles ORDER BY position, code",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        rows.iter().map(row_to_crop_profile).collect()
    }

    async fn get_crop_profile(
        &self,
        code: &str,
    ) -> Result<CropProfile, RepositoryError> {
        let row = sqlx::query(
            "SELECT code, label, savings_pct, productivity_pct, net_margin_per_hectare
             FROM crop_profiles WHERE code = ?",
        )
        .bind(CropProfile::normalize_code(code))
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?
        .ok_or(RepositoryError::NotFound)?;

        row_to_crop_profile(&row)
    }

    async fn upsert_crop_profile(
        &self,
        profile: &CropProfile,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO crop_profiles
                (code, label, savings_pct, productivity_pct, net_margin_per_hectare, position)
             VALUES (?, ?, ?, ?, ?, (SELECT COALESCE(MAX(position), 0) + 1 FROM crop_profiles))
             ON CONFLICT(code) DO UPDATE SET
                label = excluded.label,
                savings_pct = excluded.savings_pct,
                productivity_pct = excluded.productivity_pct,
                net_margin_per_hectare = excluded.net_margin_per_hectare",
        )
        .bind(CropProfile::normalize_code(&profile.code))
        .bind(&profile.label)
        .bind(decimal_to_text(profile.savings_pct))
        .bind(decimal_to_text(profile.productivity_pct))
        .bind(profile.net_margin_per_hectare.map(decimal_to_text))
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(())
    }

    async fn list_plans(&self) -> Result<Vec<Plan>, RepositoryError> {
        let rows = sqlx::query("SELECT id, display_name, fixed_amount FROM plans ORDER BY position, id")
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;

        rows.iter().map(row_to_plan).collect()
    }

    async fn get_plan(
        &self,
        id: &str,
    ) -> Result<Plan, RepositoryError> {
        let row = sqlx::query("SELECT id, display_name, fixed_amount FROM plans WHERE id = ?")
            .bind(id.trim())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?
            .ok_or(RepositoryError::NotFound)?;

        row_to_plan(&row)
    }

    async fn upsert_plan(
        &self,
        plan: &Plan,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO plans (id, display_name, fixed_amount, position)
             VALUES (?, ?, ?, (SELECT COALESCE(MAX(position), 0) + 1 FROM plans))
             ON CONFLICT(id) DO UPDATE SET
                display_name = excluded.display_name,
                fixed_amount = excluded.fixed_amount",
        )
        .bind(plan.id.trim())
        .bind(&plan.display_name)
        .bind(decimal_to_text(plan.fixed_amount))
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(())
    }

    async fn get_reference_dataset(&self) -> Result<ReferenceDataset, RepositoryError> {
        let rows = sqlx::query(
            "SELECT code, cost_per_hectare, revenue_per_hectare, cost_breakdown
             FROM crop_references ORDER BY code",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        let mut entries = BTreeMap::new();
        for row in &rows {
            let breakdown = get_text(row, "cost_breakdown")?;
            let cost_breakdown = serde_json::from_str(&breakdown).map_err(|e| {
                RepositoryError::Database(format!("Corrupt cost breakdown: {e}"))
            })?;
            entries.insert(
                get_text(row, "code")?,
                CropReference {
                    cost_per_hectare: get_decimal(row, "cost_per_hectare")?,
                    revenue_per_hectare: get_decimal(row, "revenue_per_hectare")?,
                    cost_breakdown,
                },
            );
        }

        Ok(ReferenceDataset::new(entries))
    }

    async fn upsert_crop_reference(
        &self,
        code: &str,
        reference: &CropReference,
    ) -> Result<(), RepositoryError> {
        let breakdown = serde_json::to_string(&reference.cost_breakdown)
            .map_err(|e| RepositoryError::Database(e.to_string()))?;

        sqlx::query(
            "INSERT INTO crop_references (code, cost_per_hectare, revenue_per_hectare, cost_breakdown)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(code) DO UPDATE SET
                cost_per_hectare = excluded.cost_per_hectare,
                revenue_per_hectare = excluded.revenue_per_hectare,
                cost_breakdown = excluded.cost_breakdown",
        )
        .bind(CropProfile::normalize_code(code))
        .bind(decimal_to_text(reference.cost_per_hectare))
        .bind(decimal_to_text(reference.revenue_per_hectare))
        .bind(breakdown)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(())
    }

    async fn save_diagnostic(
        &self,
        record: &DiagnosticResponse,
    ) -> Result<String, RepositoryError> {
        let payload =
            serde_json::to_string(record).map_err(|e| RepositoryError::Database(e.to_string()))?;

        sqlx::query(
            "INSERT INTO diagnostics (key, submitted_at, phone, level, pct, payload)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(key) DO UPDATE SET
                submitted_at = excluded.submitted_at,
                phone = excluded.phone,
                level = excluded.level,
                pct = excluded.pct,
                payload = excluded.payload",
        )
        .bind(&record.key)
        .bind(record.submitted_at.to_rfc3339_opts(SecondsFormat::Millis, true))
        .bind(&record.phone)
        .bind(record.level.id())
        .bind(i64::from(record.pct))
        .bind(payload)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        info!(key = %record.key, level = record.level.id(), pct = record.pct, "diagnostic stored");
        Ok(record.key.clone())
    }

    async fn get_diagnostic(
        &self,
        key: &str,
    ) -> Result<DiagnosticResponse, RepositoryError> {
        let row = sqlx::query("SELECT payload FROM diagnostics WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?
            .ok_or(RepositoryError::NotFound)?;

        row_to_diagnostic(&row)
    }

    async fn list_diagnostics(
        &self,
        prefix: &str,
        limit: usize,
    ) -> Result<Vec<DiagnosticResponse>, RepositoryError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = sqlx::query(
            "SELECT payload FROM diagnostics
             WHERE substr(key, 1, length(?)) = ?
             ORDER BY submitted_at DESC, key DESC
             LIMIT ?",
        )
        .bind(prefix)
        .bind(prefix)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        rows.iter().map(row_to_diagnostic).collect()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use agro_core::{DiagnosticLevel, SectionScore, load_reference_data};
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;
    use sqlx::sqlite::SqlitePoolOptions;

    use super::*;

    async fn setup_test_db() -> SqliteRepository {
        let pool = SqlitePoolOptions::new()
            .connect("sqlite::memory:")
            .await
            .expect("Failed to create in-memory database");

        let repo = SqliteRepository::new_with_pool(pool).await;
        repo.run_migrations()
            .await
            .expect("Failed to run migrations");
        repo
    }

    fn diagnostic(
        key: &str,
        minute: u32,
    ) -> DiagnosticResponse {
        DiagnosticResponse {
            key: key.to_string(),
            submitted_at: Utc.with_ymd_and_hms(2025, 5, 20, 10, minute, 0).unwrap(),
            name: "Ana Soto".to_string(),
            phone: "+56 9 8765 4321".to_string(),
            region: "Los Ríos".to_string(),
            sector: "Lechería".to_string(),
            score: 78,
            max: 130,
            pct: 60,
            level: DiagnosticLevel::Basic,
            sections: vec![SectionScore {
                id: "gestion".to_string(),
                title: "1.-Gestión y planificación".to_string(),
                pct: 60,
            }],
            answers: BTreeMap::from([("gestion-0".to_string(), 3)]),
            user_agent: "test".to_string(),
            client_ip: "127.0.0.1".to_string(),
            source: "diagnostico-digital-bdata".to_string(),
        }
    }

    #[test]
    fn test_connection_url() {
        assert_eq!(connection_url(":memory:"), "sqlite::memory:");
        assert_eq!(connection_url("agro.db"), "sqlite:agro.db?mode=rwc");
        assert_eq!(connection_url("sqlite:x.db"), "sqlite:x.db");
    }

    // crop profiles

    #[tokio::test]
    async fn test_upsert_and_get_crop_profile() {
        let repo = setup_test_db().await;
        let profile = CropProfile {
            code: "quinoa".to_string(),
            label: "Quínoa".to_string(),
            savings_pct: dec!(7.5),
            productivity_pct: dec!(6),
            net_margin_per_hectare: Some(dec!(125000)),
        };

        repo.upsert_crop_profile(&profile)
            .await
            .expect("Should upsert profile");
        let stored = repo
            .get_crop_profile("QUINOA")
            .await
            .expect("Should find profile");

        assert_eq!(stored.code, "QUINOA");
        assert_eq!(stored.savings_pct, dec!(7.5));
        assert_eq!(stored.net_margin_per_hectare, Some(dec!(125000)));
    }

    #[tokio::test]
    async fn test_upsert_crop_profile_replaces_and_keeps_position() {
        let repo = setup_test_db().await;
        let mut trigo = CropProfile::defaults().remove(0);
        let maiz = CropProfile::defaults().remove(1);
        repo.upsert_crop_profile(&trigo).await.unwrap();
        repo.upsert_crop_profile(&maiz).await.unwrap();

        trigo.savings_pct = dec!(12);
        trigo.net_margin_per_hectare = None;
        repo.upsert_crop_profile(&trigo).await.unwrap();

        let profiles = repo.list_crop_profiles().await.unwrap();
        let codes: Vec<&str> = profiles.iter().map(|p| p.code.as_str()).collect();
        assert_eq!(codes, vec!["TRIGO", "MAIZ"]);
        assert_eq!(profiles[0].savings_pct, dec!(12));
        assert_eq!(profiles[0].net_margin_per_hectare, None);
    }

    #[tokio::test]
    async fn test_get_crop_profile_not_found() {
        let repo = setup_test_db().await;

        let result = repo.get_crop_profile("CAFE").await;

        assert_eq!(result, Err(RepositoryError::NotFound));
    }

    // plans

    #[tokio::test]
    async fn test_plans_keep_catalog_order() {
        let repo = setup_test_db().await;
        for plan in Plan::defaults() {
            repo.upsert_plan(&plan).await.unwrap();
        }

        let plans = repo.list_plans().await.unwrap();

        assert_eq!(plans, Plan::defaults());
        assert_eq!(
            repo.get_plan("cosecha").await.map(|p| p.fixed_amount),
            Ok(dec!(2400000))
        );
        assert_eq!(repo.get_plan("oro").await, Err(RepositoryError::NotFound));
    }

    // reference dataset

    #[tokio::test]
    async fn test_reference_dataset_round_trip() {
        let repo = setup_test_db().await;
        let entry = CropReference {
            cost_per_hectare: dec!(1437607),
            revenue_per_hectare: dec!(1260000),
            cost_breakdown: BTreeMap::from([("semilla".to_string(), dec!(180000))]),
        };

        assert!(repo.get_reference_dataset().await.unwrap().is_empty());

        repo.upsert_crop_reference("trigo", &entry).await.unwrap();
        let dataset = repo.get_reference_dataset().await.unwrap();

        assert_eq!(dataset.len(), 1);
        assert_eq!(dataset.get("TRIGO"), Some(&entry));
    }

    // diagnostics

    #[tokio::test]
    async fn test_save_and_get_diagnostic() {
        let repo = setup_test_db().await;
        let record = diagnostic("diagnostico/2025-05-20T10:00:00.000Z_87654321", 0);

        let key = repo.save_diagnostic(&record).await.unwrap();
        let stored = repo.get_diagnostic(&key).await.unwrap();

        assert_eq!(stored, record);
    }

    #[tokio::test]
    async fn test_save_diagnostic_same_key_overwrites() {
        let repo = setup_test_db().await;
        let first = diagnostic("diagnostico/dup", 0);
        let mut second = diagnostic("diagnostico/dup", 0);
        second.name = "Segundo envío".to_string();
        second.pct = 85;
        repo.save_diagnostic(&first).await.unwrap();

        let key = repo.save_diagnostic(&second).await.unwrap();

        assert_eq!(repo.get_diagnostic(&key).await.unwrap(), second);
        assert_eq!(repo.list_diagnostics("diagnostico/", 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_get_diagnostic_not_found() {
        let repo = setup_test_db().await;

        assert_eq!(
            repo.get_diagnostic("diagnostico/none").await,
            Err(RepositoryError::NotFound)
        );
    }

    #[tokio::test]
    async fn test_list_diagnostics_newest_first_with_limit() {
        let repo = setup_test_db().await;
        for minute in [5, 1, 9, 3] {
            let key = format!("diagnostico/2025-05-20T10:{minute:02}:00.000Z_87654321");
            repo.save_diagnostic(&diagnostic(&key, minute)).await.unwrap();
        }
        repo.save_diagnostic(&diagnostic("otro/2025", 30)).await.unwrap();

        let items = repo.list_diagnostics("diagnostico/", 3).await.unwrap();
        let minutes: Vec<String> = items
            .iter()
            .map(|d| d.submitted_at.format("%M").to_string())
            .collect();

        assert_eq!(minutes, vec!["09", "05", "03"]);
        assert_eq!(repo.list_diagnostics("diagnostico/", 100).await.unwrap().len(), 4);
        assert_eq!(repo.list_diagnostics("otro/", 100).await.unwrap().len(), 1);
    }

    // seeds

    #[tokio::test]
    async fn test_run_seeds() {
        let repo = setup_test_db().await;

        repo.run_seeds(Path::new("./seeds"))
            .await
            .expect("Should run seeds successfully");

        let profiles = repo.list_crop_profiles().await.unwrap();
        assert_eq!(profiles, CropProfile::defaults());
        assert_eq!(repo.list_plans().await.unwrap(), Plan::defaults());
    }

    #[tokio::test]
    async fn test_run_seeds_twice_keeps_loaded_values() {
        let repo = setup_test_db().await;
        repo.run_seeds(Path::new("./seeds")).await.unwrap();
        let mut raiz = Plan::defaults().remove(0);
        raiz.fixed_amount = dec!(1350000);
        repo.upsert_plan(&raiz).await.unwrap();

        repo.run_seeds(Path::new("./seeds")).await.unwrap();

        assert_eq!(
            repo.get_plan("raiz").await.map(|p| p.fixed_amount),
            Ok(dec!(1350000))
        );
    }

    #[tokio::test]
    async fn test_run_seeds_nonexistent_directory() {
        let repo = setup_test_db().await;

        let result = repo.run_seeds(Path::new("./nonexistent")).await;

        let err = result.expect_err("Should fail for nonexistent directory");
        assert_eq!(
            err.to_string(),
            "Failed to read seeds directory './nonexistent'"
        );
    }

    #[tokio::test]
    async fn test_load_reference_data_from_seeded_store() {
        let repo = setup_test_db().await;
        repo.run_seeds(Path::new("./seeds")).await.unwrap();

        let reference = load_reference_data(&repo).await.unwrap();

        assert_eq!(reference.crops.len(), 5);
        assert_eq!(reference.plans.len(), 2);
        assert!(reference.dataset.is_none());
        assert_eq!(
            reference.crop("trigo").and_then(|c| c.net_margin_per_hectare),
            Some(dec!(-177607))
        );
    }
}
