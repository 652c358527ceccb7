//! Permission and tenant-isolation checks
//!
//! Every check fails closed: a missing or inactive user, or a datastore
//! error, yields a denial. Errors are logged here and never surfaced to the
//! caller of a check.

use serde::{Deserialize, Serialize};
use slotwise_common::models::{
    permission_name, permissions, Action, ActivityLogEntry, User, UserWithPermissions,
};
use slotwise_db::Datastore;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::audit::AuditLogger;

/// Input for [`AccessGate::create_user`].
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub email: String,
    pub display_name: String,
    pub tenant_id: Uuid,
    pub role_id: Uuid,
}

#[derive(Clone)]
pub struct AccessGate {
    store: Arc<dyn Datastore>,
    audit: AuditLogger,
}

impl std::fmt::Debug for AccessGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessGate").finish_non_exhaustive()
    }
}

impl AccessGate {
    pub fn new(store: Arc<dyn Datastore>, audit: AuditLogger) -> Self {
        Self { store, audit }
    }

    pub fn store(&self) -> &Arc<dyn Datastore> {
        &self.store
    }

    /// The user with role and permissions resolved, or `None` when either is
    /// missing or the lookup failed.
    pub async fn get_user_with_permissions(&self, user_id: Uuid) -> Option<UserWithPermissions> {
        let user = match self.store.get_user(user_id).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                debug!(%user_id, "User not found");
                return None;
            }
            Err(e) => {
                error!(%user_id, "User lookup failed: {}", e);
                return None;
            }
        };

        match self.store.get_role(user.role_id).await {
            Ok(Some(role)) => Some(UserWithPermissions { user, role }),
            Ok(None) => {
                warn!(%user_id, role_id = %user.role_id, "User references a missing role");
                None
            }
            Err(e) => {
                error!(%user_id, "Role lookup failed: {}", e);
                None
            }
        }
    }

    async fn active_user(&self, user_id: Uuid) -> Option<UserWithPermissions> {
        self.get_user_with_permissions(user_id)
            .await
            .filter(|u| u.user.active)
    }

    pub async fn has_permission(&self, user_id: Uuid, permission: &str) -> bool {
        match self.active_user(user_id).await {
            Some(u) => u.is_super_admin() || u.permissions().contains(permission),
            None => false,
        }
    }

    pub async fn can_access(&self, user_id: Uuid, resource: &str, action: Action) -> bool {
        self.has_permission(user_id, &permission_name(resource, action))
            .await
    }

    /// `true` iff the user may touch data owned by `tenant_id`.
    pub async fn verify_tenant_access(&self, user_id: Uuid, tenant_id: Uuid) -> bool {
        match self.active_user(user_id).await {
            Some(u) => u.is_super_admin() || u.user.tenant_id == tenant_id,
            None => false,
        }
    }

    /// Permission plus tenant scope. Super-admins pass both.
    pub async fn authorize(&self, user_id: Uuid, permission: &str, tenant_id: Uuid) -> bool {
        let Some(u) = self.active_user(user_id).await else {
            return false;
        };
        u.is_super_admin()
            || (u.permissions().contains(permission) && u.user.tenant_id == tenant_id)
    }

    /// Creates a user. Non-admin callers may only create users in their own tenant.
    pub async fn create_user(&self, caller_id: Uuid, input: NewUser) -> Option<User> {
        if !self
            .authorize(caller_id, permissions::USERS_CREATE, input.tenant_id)
            .await
        {
            info!(%caller_id, tenant_id = %input.tenant_id, "create_user denied");
            return None;
        }

        let user = User::new(input.email, input.display_name, input.tenant_id, input.role_id);
        if let Err(e) = self.store.insert_user(&user).await {
            error!(%caller_id, "Failed to create user: {}", e);
            return None;
        }

        self.log_activity(
            ActivityLogEntry::new(user.tenant_id, Some(caller_id), "user.created")
                .resource("user", user.id),
        );
        Some(user)
    }

    pub async fn update_user_role(&self, caller_id: Uuid, user_id: Uuid, role_id: Uuid) -> bool {
        let Some(target) = self.target_user(user_id).await else {
            return false;
        };
        if !self
            .authorize(caller_id, permissions::USERS_UPDATE, target.tenant_id)
            .await
        {
            info!(%caller_id, %user_id, "update_user_role denied");
            return false;
        }

        match self.store.update_user_role(user_id, role_id).await {
            Ok(true) => {
                self.log_activity(
                    ActivityLogEntry::new(target.tenant_id, Some(caller_id), "user.role_updated")
                        .resource("user", user_id)
                        .details(serde_json::json!({ "roleId": role_id })),
                );
                true
            }
            Ok(false) => false,
            Err(e) => {
                error!(%caller_id, %user_id, "Failed to update user role: {}", e);
                false
            }
        }
    }

    /// Soft delete: the user stays stored but fails every check.
    pub async fn deactivate_user(&self, caller_id: Uuid, user_id: Uuid) -> bool {
        let Some(target) = self.target_user(user_id).await else {
            return false;
        };
        if !self
            .authorize(caller_id, permissions::USERS_DELETE, target.tenant_id)
            .await
        {
            info!(%caller_id, %user_id, "deactivate_user denied");
            return false;
        }

        match self.store.set_user_active(user_id, false).await {
            Ok(true) => {
                self.log_activity(
                    ActivityLogEntry::new(target.tenant_id, Some(caller_id), "user.deactivated")
                        .resource("user", user_id),
                );
                true
            }
            Ok(false) => false,
            Err(e) => {
                error!(%caller_id, %user_id, "Failed to deactivate user: {}", e);
                false
            }
        }
    }

    async fn target_user(&self, user_id: Uuid) -> Option<User> {
        match self.store.get_user(user_id).await {
            Ok(user) => user,
            Err(e) => {
                error!(%user_id, "User lookup failed: {}", e);
                None
            }
        }
    }

    /// Queues an audit entry. Never blocks and never fails the caller.
    pub fn log_activity(&self, entry: ActivityLogEntry) {
        self.audit.log(entry);
    }
}
