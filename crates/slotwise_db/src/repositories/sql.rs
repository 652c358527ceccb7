//! SQL implementation of the datastore
//!
//! Ids and timestamps are stored as TEXT and booleans as INTEGER so the same
//! statements work through the `Any` driver. Timestamps use a fixed-width
//! RFC 3339 form, which keeps lexical and chronological order identical.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use slotwise_common::models::{
    ActivityLogEntry, AgentSettings, Appointment, FeatureFlag, Role, Service, Tenant, User,
};
use sqlx::any::AnyRow;
use sqlx::Row;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::datastore::Datastore;
use crate::error::DbError;
use crate::DbClient;

const SCHEMA: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS tenants (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        plan TEXT NOT NULL,
        credits INTEGER NOT NULL DEFAULT 0,
        google_calendar_sync_enabled INTEGER NOT NULL DEFAULT 0,
        google_calendar_token TEXT,
        created_at TEXT NOT NULL
    )"#,
    r#"CREATE TABLE IF NOT EXISTS roles (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        is_super_admin INTEGER NOT NULL DEFAULT 0
    )"#,
    r#"CREATE TABLE IF NOT EXISTS permissions (
        name TEXT PRIMARY KEY
    )"#,
    r#"CREATE TABLE IF NOT EXISTS role_permissions (
        role_id TEXT NOT NULL,
        permission_name TEXT NOT NULL,
        PRIMARY KEY (role_id, permission_name)
    )"#,
    r#"CREATE TABLE IF NOT EXISTS users (
        id TEXT PRIMARY KEY,
        email TEXT NOT NULL UNIQUE,
        display_name TEXT NOT NULL,
        tenant_id TEXT NOT NULL,
        role_id TEXT NOT NULL,
        active INTEGER NOT NULL DEFAULT 1,
        created_at TEXT NOT NULL
    )"#,
    r#"CREATE TABLE IF NOT EXISTS services (
        id TEXT PRIMARY KEY,
        tenant_id TEXT NOT NULL,
        name TEXT NOT NULL,
        price REAL NOT NULL,
        duration_minutes INTEGER NOT NULL
    )"#,
    r#"CREATE TABLE IF NOT EXISTS appointments (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        id TEXT NOT NULL UNIQUE,
        tenant_id TEXT NOT NULL,
        customer_name TEXT NOT NULL,
        customer_phone TEXT NOT NULL,
        service_id TEXT NOT NULL,
        service_name TEXT NOT NULL,
        date_time TEXT NOT NULL,
        status TEXT NOT NULL,
        value REAL NOT NULL,
        google_calendar_event_id TEXT,
        google_calendar_synced INTEGER NOT NULL DEFAULT 0,
        google_calendar_error TEXT,
        created_at TEXT NOT NULL
    )"#,
    r#"CREATE INDEX IF NOT EXISTS idx_appointments_tenant_time
        ON appointments (tenant_id, date_time)"#,
    r#"CREATE TABLE IF NOT EXISTS activity_log (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        tenant_id TEXT NOT NULL,
        user_id TEXT,
        action TEXT NOT NULL,
        resource_type TEXT,
        resource_id TEXT,
        details TEXT,
        ip_address TEXT,
        user_agent TEXT,
        created_at TEXT NOT NULL
    )"#,
    r#"CREATE TABLE IF NOT EXISTS agent_settings (
        tenant_id TEXT PRIMARY KEY,
        persona TEXT NOT NULL,
        bot_active INTEGER NOT NULL DEFAULT 1,
        promo_asset_url TEXT
    )"#,
    r#"CREATE TABLE IF NOT EXISTS tenant_feature_flags (
        tenant_id TEXT NOT NULL,
        flag TEXT NOT NULL,
        enabled INTEGER NOT NULL,
        PRIMARY KEY (tenant_id, flag)
    )"#,
];

/// SQL implementation of [`Datastore`].
#[derive(Debug, Clone)]
pub struct SqlDatastore {
    db_client: DbClient,
}

impl SqlDatastore {
    pub fn new(db_client: DbClient) -> Self {
        Self { db_client }
    }

    pub fn client(&self) -> &DbClient {
        &self.db_client
    }
}

fn ts(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn flag(value: bool) -> i64 {
    i64::from(value)
}

fn query_failed(context: &'static str) -> impl FnOnce(sqlx::Error) -> DbError {
    move |e| {
        error!("{}: {}", context, e);
        DbError::QueryError(format!("{context}: {e}"))
    }
}

fn get_string(row: &AnyRow, table: &'static str, column: &str) -> Result<String, DbError> {
    row.try_get::<String, _>(column).map_err(|e| DbError::DecodeError {
        table,
        message: format!("{column}: {e}"),
    })
}

fn get_opt_string(row: &AnyRow, table: &'static str, column: &str) -> Result<Option<String>, DbError> {
    row.try_get::<Option<String>, _>(column)
        .map_err(|e| DbError::DecodeError {
            table,
            message: format!("{column}: {e}"),
        })
}

fn get_i64(row: &AnyRow, table: &'static str, column: &str) -> Result<i64, DbError> {
    row.try_get::<i64, _>(column).map_err(|e| DbError::DecodeError {
        table,
        message: format!("{column}: {e}"),
    })
}

fn get_f64(row: &AnyRow, table: &'static str, column: &str) -> Result<f64, DbError> {
    row.try_get::<f64, _>(column).map_err(|e| DbError::DecodeError {
        table,
        message: format!("{column}: {e}"),
    })
}

fn get_bool(row: &AnyRow, table: &'static str, column: &str) -> Result<bool, DbError> {
    get_i64(row, table, column).map(|v| v != 0)
}

fn get_uuid(row: &AnyRow, table: &'static str, column: &str) -> Result<Uuid, DbError> {
    let raw = get_string(row, table, column)?;
    Uuid::parse_str(&raw).map_err(|e| DbError::DecodeError {
        table,
        message: format!("{column}: {e}"),
    })
}

fn get_opt_uuid(row: &AnyRow, table: &'static str, column: &str) -> Result<Option<Uuid>, DbError> {
    get_opt_string(row, table, column)?
        .map(|raw| {
            Uuid::parse_str(&raw).map_err(|e| DbError::DecodeError {
                table,
                message: format!("{column}: {e}"),
            })
        })
        .transpose()
}

fn get_ts(row: &AnyRow, table: &'static str, column: &str) -> Result<DateTime<Utc>, DbError> {
    let raw = get_string(row, table, column)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DbError::DecodeError {
            table,
            message: format!("{column}: {e}"),
        })
}

fn parse_enum<T: std::str::FromStr<Err = String>>(
    row: &AnyRow,
    table: &'static str,
    column: &str,
) -> Result<T, DbError> {
    get_string(row, table, column)?
        .parse()
        .map_err(|message| DbError::DecodeError { table, message })
}

fn tenant_from_row(row: &AnyRow) -> Result<Tenant, DbError> {
    const T: &str = "tenants";
    Ok(Tenant {
        id: get_uuid(row, T, "id")?,
        name: get_string(row, T, "name")?,
        plan: parse_enum(row, T, "plan")?,
        credits: get_i64(row, T, "credits")?,
        google_calendar_sync_enabled: get_bool(row, T, "google_calendar_sync_enabled")?,
        google_calendar_token: get_opt_string(row, T, "google_calendar_token")?,
        created_at: get_ts(row, T, "created_at")?,
    })
}

fn user_from_row(row: &AnyRow) -> Result<User, DbError> {
    const T: &str = "users";
    Ok(User {
        id: get_uuid(row, T, "id")?,
        email: get_string(row, T, "email")?,
        display_name: get_string(row, T, "display_name")?,
        tenant_id: get_uuid(row, T, "tenant_id")?,
        role_id: get_uuid(row, T, "role_id")?,
        active: get_bool(row, T, "active")?,
        created_at: get_ts(row, T, "created_at")?,
    })
}

fn service_from_row(row: &AnyRow) -> Result<Service, DbError> {
    const T: &str = "services";
    Ok(Service {
        id: get_uuid(row, T, "id")?,
        tenant_id: get_uuid(row, T, "tenant_id")?,
        name: get_string(row, T, "name")?,
        price: get_f64(row, T, "price")?,
        duration_minutes: get_i64(row, T, "duration_minutes")?,
    })
}

fn appointment_from_row(row: &AnyRow) -> Result<Appointment, DbError> {
    const T: &str = "appointments";
    Ok(Appointment {
        id: get_uuid(row, T, "id")?,
        tenant_id: get_uuid(row, T, "tenant_id")?,
        customer_name: get_string(row, T, "customer_name")?,
        customer_phone: get_string(row, T, "customer_phone")?,
        service_id: get_uuid(row, T, "service_id")?,
        service_name: get_string(row, T, "service_name")?,
        date_time: get_ts(row, T, "date_time")?,
        status: parse_enum(row, T, "status")?,
        value: get_f64(row, T, "value")?,
        google_calendar_event_id: get_opt_string(row, T, "google_calendar_event_id")?,
        google_calendar_synced: get_bool(row, T, "google_calendar_synced")?,
        google_calendar_error: get_opt_string(row, T, "google_calendar_error")?,
        created_at: get_ts(row, T, "created_at")?,
    })
}

fn activity_from_row(row: &AnyRow) -> Result<ActivityLogEntry, DbError> {
    const T: &str = "activity_log";
    let details = get_opt_string(row, T, "details")?
        .map(|raw| serde_json::from_str(&raw))
        .transpose()
        .map_err(|e| DbError::DecodeError {
            table: T,
            message: format!("details: {e}"),
        })?;
    Ok(ActivityLogEntry {
        tenant_id: get_uuid(row, T, "tenant_id")?,
        user_id: get_opt_uuid(row, T, "user_id")?,
        action: get_string(row, T, "action")?,
        resource_type: get_opt_string(row, T, "resource_type")?,
        resource_id: get_opt_string(row, T, "resource_id")?,
        details,
        ip_address: get_opt_string(row, T, "ip_address")?,
        user_agent: get_opt_string(row, T, "user_agent")?,
        created_at: get_ts(row, T, "created_at")?,
    })
}

const APPOINTMENT_COLUMNS: &str = "id, tenant_id, customer_name, customer_phone, service_id, \
    service_name, date_time, status, value, google_calendar_event_id, google_calendar_synced, \
    google_calendar_error, created_at";

#[async_trait]
impl Datastore for SqlDatastore {
    async fn init_schema(&self) -> Result<(), DbError> {
        debug!("Initializing datastore schema");
        for statement in SCHEMA {
            self.db_client.execute(statement).await?;
        }
        info!("Datastore schema initialized successfully");
        Ok(())
    }

    async fn ping(&self) -> Result<(), DbError> {
        self.db_client.execute("SELECT 1").await.map(|_| ())
    }

    async fn insert_tenant(&self, tenant: &Tenant) -> Result<(), DbError> {
        sqlx::query(
            r#"INSERT INTO tenants (id, name, plan, credits, google_calendar_sync_enabled,
                   google_calendar_token, created_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7)"#,
        )
        .bind(tenant.id.to_string())
        .bind(&tenant.name)
        .bind(tenant.plan.as_str())
        .bind(tenant.credits)
        .bind(flag(tenant.google_calendar_sync_enabled))
        .bind(tenant.google_calendar_token.clone())
        .bind(ts(tenant.created_at))
        .execute(self.db_client.pool())
        .await
        .map_err(query_failed("Failed to insert tenant"))?;
        Ok(())
    }

    async fn get_tenant(&self, tenant_id: Uuid) -> Result<Option<Tenant>, DbError> {
        let row = sqlx::query(
            r#"SELECT id, name, plan, credits, google_calendar_sync_enabled,
                      google_calendar_token, created_at
               FROM tenants WHERE id = $1"#,
        )
        .bind(tenant_id.to_string())
        .fetch_optional(self.db_client.pool())
        .await
        .map_err(query_failed("Failed to load tenant"))?;

        row.as_ref().map(tenant_from_row).transpose()
    }

    async fn set_calendar_token(
        &self,
        tenant_id: Uuid,
        token_blob: Option<&str>,
        sync_enabled: bool,
    ) -> Result<bool, DbError> {
        let result = sqlx::query(
            r#"UPDATE tenants
               SET google_calendar_token = $1, google_calendar_sync_enabled = $2
               WHERE id = $3"#,
        )
        .bind(token_blob.map(str::to_string))
        .bind(flag(sync_enabled))
        .bind(tenant_id.to_string())
        .execute(self.db_client.pool())
        .await
        .map_err(query_failed("Failed to update calendar token"))?;
        Ok(result.rows_affected() > 0)
    }

    async fn debit_credits(&self, tenant_id: Uuid, amount: i64) -> Result<Option<i64>, DbError> {
        let amount = amount.max(0);
        let result = sqlx::query(
            r#"UPDATE tenants
               SET credits = CASE WHEN credits > $1 THEN credits - $1 ELSE 0 END
               WHERE id = $2"#,
        )
        .bind(amount)
        .bind(tenant_id.to_string())
        .execute(self.db_client.pool())
        .await
        .map_err(query_failed("Failed to debit credits"))?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        Ok(self.get_tenant(tenant_id).await?.map(|t| t.credits))
    }

    async fn insert_role(&self, role: &Role) -> Result<(), DbError> {
        let mut tx = self.db_client.begin().await?;
        sqlx::query("INSERT INTO roles (id, name, is_super_admin) VALUES ($1, $2, $3)")
            .bind(role.id.to_string())
            .bind(&role.name)
            .bind(flag(role.is_super_admin))
            .execute(&mut *tx)
            .await
            .map_err(query_failed("Failed to insert role"))?;

        for permission in &role.permissions {
            sqlx::query("INSERT INTO permissions (name) VALUES ($1) ON CONFLICT (name) DO NOTHING")
                .bind(permission)
                .execute(&mut *tx)
                .await
                .map_err(query_failed("Failed to insert permission"))?;
            sqlx::query("INSERT INTO role_permissions (role_id, permission_name) VALUES ($1, $2)")
                .bind(role.id.to_string())
                .bind(permission)
                .execute(&mut *tx)
                .await
                .map_err(query_failed("Failed to link permission"))?;
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionError(e.to_string()))
    }

    async fn get_role(&self, role_id: Uuid) -> Result<Option<Role>, DbError> {
        let Some(row) = sqlx::query("SELECT id, name, is_super_admin FROM roles WHERE id = $1")
            .bind(role_id.to_string())
            .fetch_optional(self.db_client.pool())
            .await
            .map_err(query_failed("Failed to load role"))?
        else {
            return Ok(None);
        };

        let rows = sqlx::query(
            "SELECT permission_name FROM role_permissions WHERE role_id = $1",
        )
        .bind(role_id.to_string())
        .fetch_all(self.db_client.pool())
        .await
        .map_err(query_failed("Failed to load role permissions"))?;

        let permissions = rows
            .iter()
            .map(|r| get_string(r, "role_permissions", "permission_name"))
            .collect::<Result<BTreeSet<_>, _>>()?;

        Ok(Some(Role {
            id: get_uuid(&row, "roles", "id")?,
            name: get_string(&row, "roles", "name")?,
            is_super_admin: get_bool(&row, "roles", "is_super_admin")?,
            permissions,
        }))
    }

    async fn insert_user(&self, user: &User) -> Result<(), DbError> {
        sqlx::query(
            r#"INSERT INTO users (id, email, display_name, tenant_id, role_id, active, created_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7)"#,
        )
        .bind(user.id.to_string())
        .bind(&user.email)
        .bind(&user.display_name)
        .bind(user.tenant_id.to_string())
        .bind(user.role_id.to_string())
        .bind(flag(user.active))
        .bind(ts(user.created_at))
        .execute(self.db_client.pool())
        .await
        .map_err(query_failed("Failed to insert user"))?;
        Ok(())
    }

    async fn get_user(&self, user_id: Uuid) -> Result<Option<User>, DbError> {
        let row = sqlx::query(
            r#"SELECT id, email, display_name, tenant_id, role_id, active, created_at
               FROM users WHERE id = $1"#,
        )
        .bind(user_id.to_string())
        .fetch_optional(self.db_client.pool())
        .await
        .map_err(query_failed("Failed to load user"))?;

        row.as_ref().map(user_from_row).transpose()
    }

    async fn update_user_role(&self, user_id: Uuid, role_id: Uuid) -> Result<bool, DbError> {
        let result = sqlx::query("UPDATE users SET role_id = $1 WHERE id = $2")
            .bind(role_id.to_string())
            .bind(user_id.to_string())
            .execute(self.db_client.pool())
            .await
            .map_err(query_failed("Failed to update user role"))?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_user_active(&self, user_id: Uuid, active: bool) -> Result<bool, DbError> {
        let result = sqlx::query("UPDATE users SET active = $1 WHERE id = $2")
            .bind(flag(active))
            .bind(user_id.to_string())
            .execute(self.db_client.pool())
            .await
            .map_err(query_failed("Failed to update user status"))?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_service(&self, service: &Service) -> Result<(), DbError> {
        sqlx::query(
            r#"INSERT INTO services (id, tenant_id, name, price, duration_minutes)
               VALUES ($1, $2, $3, $4, $5)"#,
        )
        .bind(service.id.to_string())
        .bind(service.tenant_id.to_string())
        .bind(&service.name)
        .bind(service.price)
        .bind(service.duration_minutes)
        .execute(self.db_client.pool())
        .await
        .map_err(query_failed("Failed to insert service"))?;
        Ok(())
    }

    async fn get_service(
        &self,
        tenant_id: Uuid,
        service_id: Uuid,
    ) -> Result<Option<Service>, DbError> {
        let row = sqlx::query(
            r#"SELECT id, tenant_id, name, price, duration_minutes
               FROM services WHERE id = $1 AND tenant_id = $2"#,
        )
        .bind(service_id.to_string())
        .bind(tenant_id.to_string())
        .fetch_optional(self.db_client.pool())
        .await
        .map_err(query_failed("Failed to load service"))?;

        row.as_ref().map(service_from_row).transpose()
    }

    async fn list_services(&self, tenant_id: Uuid) -> Result<Vec<Service>, DbError> {
        let rows = sqlx::query(
            r#"SELECT id, tenant_id, name, price, duration_minutes
               FROM services WHERE tenant_id = $1 ORDER BY name ASC"#,
        )
        .bind(tenant_id.to_string())
        .fetch_all(self.db_client.pool())
        .await
        .map_err(query_failed("Failed to list services"))?;

        rows.iter().map(service_from_row).collect()
    }

    async fn insert_appointment(&self, appointment: &Appointment) -> Result<(), DbError> {
        let query = format!(
            "INSERT INTO appointments ({APPOINTMENT_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)"
        );
        sqlx::query(&query)
            .bind(appointment.id.to_string())
            .bind(appointment.tenant_id.to_string())
            .bind(&appointment.customer_name)
            .bind(&appointment.customer_phone)
            .bind(appointment.service_id.to_string())
            .bind(&appointment.service_name)
            .bind(ts(appointment.date_time))
            .bind(appointment.status.as_str())
            .bind(appointment.value)
            .bind(appointment.google_calendar_event_id.clone())
            .bind(flag(appointment.google_calendar_synced))
            .bind(appointment.google_calendar_error.clone())
            .bind(ts(appointment.created_at))
            .execute(self.db_client.pool())
            .await
            .map_err(query_failed("Failed to insert appointment"))?;
        Ok(())
    }

    async fn get_appointment(&self, appointment_id: Uuid) -> Result<Option<Appointment>, DbError> {
        let query = format!("SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE id = $1");
        let row = sqlx::query(&query)
            .bind(appointment_id.to_string())
            .fetch_optional(self.db_client.pool())
            .await
            .map_err(query_failed("Failed to load appointment"))?;

        row.as_ref().map(appointment_from_row).transpose()
    }

    async fn list_appointments(&self, tenant_id: Uuid) -> Result<Vec<Appointment>, DbError> {
        let query = format!(
            "SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE tenant_id = $1 \
             ORDER BY date_time ASC, seq ASC"
        );
        let rows = sqlx::query(&query)
            .bind(tenant_id.to_string())
            .fetch_all(self.db_client.pool())
            .await
            .map_err(query_failed("Failed to list appointments"))?;

        rows.iter().map(appointment_from_row).collect()
    }

    async fn delete_appointment(&self, appointment_id: Uuid) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM appointments WHERE id = $1")
            .bind(appointment_id.to_string())
            .execute(self.db_client.pool())
            .await
            .map_err(query_failed("Failed to delete appointment"))?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_activity(&self, entry: &ActivityLogEntry) -> Result<(), DbError> {
        let details = entry
            .details
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| DbError::QueryError(format!("activity details: {e}")))?;
        sqlx::query(
            r#"INSERT INTO activity_log (tenant_id, user_id, action, resource_type, resource_id,
                   details, ip_address, user_agent, created_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)"#,
        )
        .bind(entry.tenant_id.to_string())
        .bind(entry.user_id.map(|id| id.to_string()))
        .bind(&entry.action)
        .bind(entry.resource_type.clone())
        .bind(entry.resource_id.clone())
        .bind(details)
        .bind(entry.ip_address.clone())
        .bind(entry.user_agent.clone())
        .bind(ts(entry.created_at))
        .execute(self.db_client.pool())
        .await
        .map_err(query_failed("Failed to insert activity"))?;
        Ok(())
    }

    async fn list_activity(&self, tenant_id: Uuid) -> Result<Vec<ActivityLogEntry>, DbError> {
        let rows = sqlx::query(
            r#"SELECT tenant_id, user_id, action, resource_type, resource_id, details,
                      ip_address, user_agent, created_at
               FROM activity_log WHERE tenant_id = $1 ORDER BY seq ASC"#,
        )
        .bind(tenant_id.to_string())
        .fetch_all(self.db_client.pool())
        .await
        .map_err(query_failed("Failed to list activity"))?;

        rows.iter().map(activity_from_row).collect()
    }

    async fn get_agent_settings(&self, tenant_id: Uuid) -> Result<Option<AgentSettings>, DbError> {
        const T: &str = "agent_settings";
        let row = sqlx::query(
            "SELECT tenant_id, persona, bot_active, promo_asset_url FROM agent_settings WHERE tenant_id = $1",
        )
        .bind(tenant_id.to_string())
        .fetch_optional(self.db_client.pool())
        .await
        .map_err(query_failed("Failed to load agent settings"))?;

        row.map(|row| {
            Ok(AgentSettings {
                tenant_id: get_uuid(&row, T, "tenant_id")?,
                persona: get_string(&row, T, "persona")?,
                bot_active: get_bool(&row, T, "bot_active")?,
                promo_asset_url: get_opt_string(&row, T, "promo_asset_url")?,
            })
        })
        .transpose()
    }

    async fn upsert_agent_settings(&self, settings: &AgentSettings) -> Result<(), DbError> {
        sqlx::query(
            r#"INSERT INTO agent_settings (tenant_id, persona, bot_active, promo_asset_url)
               VALUES ($1, $2, $3, $4)
               ON CONFLICT (tenant_id) DO UPDATE SET
                   persona = excluded.persona,
                   bot_active = excluded.bot_active,
                   promo_asset_url = excluded.promo_asset_url"#,
        )
        .bind(settings.tenant_id.to_string())
        .bind(&settings.persona)
        .bind(flag(settings.bot_active))
        .bind(settings.promo_asset_url.clone())
        .execute(self.db_client.pool())
        .await
        .map_err(query_failed("Failed to save agent settings"))?;
        Ok(())
    }

    async fn feature_overrides(
        &self,
        tenant_id: Uuid,
    ) -> Result<BTreeMap<FeatureFlag, bool>, DbError> {
        const T: &str = "tenant_feature_flags";
        let rows = sqlx::query("SELECT flag, enabled FROM tenant_feature_flags WHERE tenant_id = $1")
            .bind(tenant_id.to_string())
            .fetch_all(self.db_client.pool())
            .await
            .map_err(query_failed("Failed to load feature flags"))?;

        let mut overrides = BTreeMap::new();
        for row in &rows {
            let name = get_string(row, T, "flag")?;
            match name.parse::<FeatureFlag>() {
                Ok(feature) => {
                    overrides.insert(feature, get_bool(row, T, "enabled")?);
                }
                Err(e) => warn!("ignoring stored feature flag: {}", e),
            }
        }
        Ok(overrides)
    }

    async fn set_feature_override(
        &self,
        tenant_id: Uuid,
        feature: FeatureFlag,
        enabled: bool,
    ) -> Result<(), DbError> {
        sqlx::query(
            r#"INSERT INTO tenant_feature_flags (tenant_id, flag, enabled)
               VALUES ($1, $2, $3)
               ON CONFLICT (tenant_id, flag) DO UPDATE SET enabled = excluded.enabled"#,
        )
        .bind(tenant_id.to_string())
        .bind(feature.as_str())
        .bind(flag(enabled))
        .execute(self.db_client.pool())
        .await
        .map_err(query_failed("Failed to save feature flag"))?;
        Ok(())
    }
}
