//! Postgres repositories
//!
//! Field values and fee variables are stored as JSONB. The shallow merge of
//! field values is the JSONB `||` operator, which replaces top-level keys
//! wholesale. Schema: `migrations/0001_contracts.sql`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ime_types::{
    Contract, ContractData, FeeStructure, FeeVariable, FieldValues, Namespace, Scalar, ScalarMap,
    TemplateVersion,
};
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::PgPool;
use std::collections::HashMap;
use tracing::info;
use uuid::Uuid;

use super::{
    ContractRepository, FeeStructureRepository, RenderSnapshot, RepositoryError, TemplateRepository,
    VariableStore, SIGNATURE_FIELD,
};
use crate::config::DatabaseConfig;

const CONTRACT_COLUMNS: &str = r#"
    id, template_version_id, fee_structure_id, field_values, signed_at,
    rendered_html, unsigned_html_key, last_rendered_at, created_at, updated_at
"#;

#[derive(sqlx::FromRow)]
struct ContractRow {
    id: Uuid,
    template_version_id: Uuid,
    fee_structure_id: Uuid,
    field_values: Json<FieldValues>,
    signed_at: Option<DateTime<Utc>>,
    rendered_html: Option<String>,
    unsigned_html_key: Option<String>,
    last_rendered_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ContractRow> for Contract {
    fn from(row: ContractRow) -> Self {
        Contract {
            id: row.id,
            template_version_id: row.template_version_id,
            fee_structure_id: row.fee_structure_id,
            field_values: row.field_values.0,
            signed_at: row.signed_at,
            data: ContractData {
                rendered_html: row.rendered_html,
                unsigned_html_key: row.unsigned_html_key,
                last_rendered_at: row.last_rendered_at,
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct TemplateVersionRow {
    id: Uuid,
    template_id: Uuid,
    version: i32,
    body_html: String,
}

#[derive(sqlx::FromRow)]
struct FeeStructureRow {
    id: Uuid,
    name: String,
    variables: Json<Vec<FeeVariable>>,
}

pub struct PgContractStore {
    pool: PgPool,
}

impl PgContractStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(config: &DatabaseConfig) -> Result<Self, RepositoryError> {
        info!("Connecting to contract database");
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.connection_timeout)
            .connect(&config.database_url)
            .await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl ContractRepository for PgContractStore {
    async fn get_contract(&self, id: Uuid) -> Result<Option<Contract>, RepositoryError> {
        let sql = format!("SELECT {} FROM contracts WHERE id = $1", CONTRACT_COLUMNS);
        let row = sqlx::query_as::<_, ContractRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Contract::from))
    }

    async fn insert_contract(&self, contract: &Contract) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r#"
            INSERT INTO contracts (
                id, template_version_id, fee_structure_id, field_values, signed_at,
                rendered_html, unsigned_html_key, last_rendered_at, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(contract.id)
        .bind(contract.template_version_id)
        .bind(contract.fee_structure_id)
        .bind(Json(&contract.field_values))
        .bind(contract.signed_at)
        .bind(&contract.data.rendered_html)
        .bind(&contract.data.unsigned_html_key)
        .bind(contract.data.last_rendered_at)
        .bind(contract.created_at)
        .bind(contract.updated_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(RepositoryError::Duplicate(contract.id))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn update_field_values(
        &self,
        id: Uuid,
        incoming: FieldValues,
    ) -> Result<Contract, RepositoryError> {
        let sql = format!(
            r#"
            UPDATE contracts
            SET field_values = field_values || $2, updated_at = now()
            WHERE id = $1
            RETURNING {}
            "#,
            CONTRACT_COLUMNS
        );
        let row = sqlx::query_as::<_, ContractRow>(&sql)
            .bind(id)
            .bind(Json(&incoming))
            .fetch_optional(&self.pool)
            .await?;
        row.map(Contract::from)
            .ok_or(RepositoryError::ContractNotFound(id))
    }

    async fn update_fee_structure(
        &self,
        id: Uuid,
        fee_structure_id: Uuid,
        fees_overrides: Option<ScalarMap>,
    ) -> Result<Contract, RepositoryError> {
        let sql = format!(
            r#"
            UPDATE contracts
            SET fee_structure_id = $2,
                field_values = CASE
                    WHEN $3::jsonb IS NULL THEN field_values - 'fees_overrides'
                    ELSE jsonb_set(field_values, '{{fees_overrides}}', $3::jsonb, true)
                END,
                updated_at = now()
            WHERE id = $1
            RETURNING {}
            "#,
            CONTRACT_COLUMNS
        );
        let row = sqlx::query_as::<_, ContractRow>(&sql)
            .bind(id)
            .bind(fee_structure_id)
            .bind(fees_overrides.map(Json))
            .fetch_optional(&self.pool)
            .await?;
        row.map(Contract::from)
            .ok_or(RepositoryError::ContractNotFound(id))
    }

    async fn record_snapshot(
        &self,
        id: Uuid,
        snapshot: &RenderSnapshot,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE contracts
            SET rendered_html = $2, unsigned_html_key = $3, last_rendered_at = $4,
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&snapshot.rendered_html)
        .bind(&snapshot.storage_key)
        .bind(snapshot.rendered_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::ContractNotFound(id));
        }
        Ok(())
    }

    async fn record_signature(
        &self,
        id: Uuid,
        signature: Scalar,
        signed_at: DateTime<Utc>,
    ) -> Result<Contract, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let field_values: Option<Json<FieldValues>> =
            sqlx::query_scalar("SELECT field_values FROM contracts WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        let mut field_values = field_values
            .ok_or(RepositoryError::ContractNotFound(id))?
            .0;
        field_values.set_value(Namespace::Examiner, SIGNATURE_FIELD, signature);

        let sql = format!(
            r#"
            UPDATE contracts
            SET field_values = $2, signed_at = $3, updated_at = now()
            WHERE id = $1
            RETURNING {}
            "#,
            CONTRACT_COLUMNS
        );
        let row = sqlx::query_as::<_, ContractRow>(&sql)
            .bind(id)
            .bind(Json(&field_values))
            .bind(signed_at)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(row.into())
    }
}

#[async_trait]
impl TemplateRepository for PgContractStore {
    async fn get_template_version(
        &self,
        id: Uuid,
    ) -> Result<Option<TemplateVersion>, RepositoryError> {
        let row = sqlx::query_as::<_, TemplateVersionRow>(
            "SELECT id, template_id, version, body_html FROM template_versions WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| {
            let version = u32::try_from(r.version).map_err(|_| {
                RepositoryError::Backend(format!("negative template version {}", r.version))
            })?;
            Ok(TemplateVersion {
                id: r.id,
                template_id: r.template_id,
                version,
                body_html: r.body_html,
            })
        })
        .transpose()
    }
}

#[async_trait]
impl FeeStructureRepository for PgContractStore {
    async fn get_fee_structure(&self, id: Uuid) -> Result<Option<FeeStructure>, RepositoryError> {
        let row = sqlx::query_as::<_, FeeStructureRow>(
            "SELECT id, name, variables FROM fee_structures WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| FeeStructure {
            id: r.id,
            name: r.name,
            variables: r.variables.0,
        }))
    }
}

#[async_trait]
impl VariableStore for PgContractStore {
    async fn all_variables_map(&self) -> Result<HashMap<String, String>, RepositoryError> {
        // System rows first so organization rows overwrite them
        let rows: Vec<(String, String)> = sqlx::query_as(
            "SELECT key, value FROM template_variables ORDER BY is_custom, key",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().collect())
    }
}
