// crates/hireflow-store-sqlite/src/catalog.rs
// ============================================================================
// Module: Status Catalog and Capability Resolver
// Description: Tenant status definitions and role capability lookups.
// Purpose: Answer catalog and authorization questions from persisted state.
// Dependencies: hireflow-core, rusqlite
// ============================================================================

//! ## Overview
//! The status catalog enumerates a tenant's application statuses; the
//! capability resolver maps a user to capabilities through the role stored
//! on their tenant membership. Roles supplied by callers are never trusted:
//! every resolution starts from the persisted membership row and fails
//! closed when the user is absent or inactive.

// ============================================================================
// SECTION: Imports
// ============================================================================

use hireflow_core::Capability;
use hireflow_core::OutcomeType;
use hireflow_core::RoleName;
use hireflow_core::StatusCatalog;
use hireflow_core::StatusDefinition;
use hireflow_core::TenantId;
use hireflow_core::UserId;
use rusqlite::Connection;
use rusqlite::OptionalExtension;
use rusqlite::params;

use crate::store::HireflowStore;
use crate::store::SqliteStoreError;
use crate::store::StoreResult;

// ============================================================================
// SECTION: Status Catalog
// ============================================================================

/// Loads a tenant's status catalog from persisted definitions.
pub(crate) fn load_status_catalog(
    conn: &Connection,
    tenant_id: TenantId,
) -> StoreResult<StatusCatalog> {
    let mut stmt = conn
        .prepare(
            "SELECT status_code, display_name, action_code, is_terminal, outcome_type, \
             sort_order, is_active
             FROM tenant_statuses WHERE tenant_id = ?1",
        )
        .map_err(SqliteStoreError::from_sqlite)?;
    let rows = stmt
        .query_map(params![tenant_id.get() as i64], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, bool>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, i64>(5)?,
                row.get::<_, bool>(6)?,
            ))
        })
        .map_err(SqliteStoreError::from_sqlite)?;
    let mut definitions = Vec::new();
    for row in rows {
        let (code, display, action, terminal, outcome, sort, active) =
            row.map_err(SqliteStoreError::from_sqlite)?;
        definitions.push(StatusDefinition {
            tenant_id,
            status_code: code.into(),
            display_name: display,
            action_code: action.into(),
            is_terminal: terminal,
            outcome_type: parse_outcome(&outcome)?,
            sort_order: sort,
            is_active: active,
        });
    }
    Ok(StatusCatalog::new(definitions))
}

/// Parses a persisted outcome label, failing as corruption when unknown.
pub(crate) fn parse_outcome(label: &str) -> StoreResult<OutcomeType> {
    OutcomeType::parse(label)
        .ok_or_else(|| SqliteStoreError::Corrupt(format!("unknown outcome type: {label}")))
}

// ============================================================================
// SECTION: Capability Resolver
// ============================================================================

/// Resolves the role persisted on an active tenant membership.
pub(crate) fn member_role(
    conn: &Connection,
    tenant_id: TenantId,
    user_id: UserId,
) -> StoreResult<Option<RoleName>> {
    conn.query_row(
        "SELECT role_name FROM tenant_members
         WHERE tenant_id = ?1 AND user_id = ?2 AND is_active = 1",
        params![tenant_id.get() as i64, user_id.get() as i64],
        |row| row.get::<_, String>(0),
    )
    .optional()
    .map_err(SqliteStoreError::from_sqlite)
    .map(|role| role.map(RoleName::new))
}

/// Returns the capabilities granted to a role within a tenant.
pub(crate) fn role_capabilities(
    conn: &Connection,
    tenant_id: TenantId,
    role: &RoleName,
) -> StoreResult<Vec<Capability>> {
    let mut stmt = conn
        .prepare(
            "SELECT capability FROM role_capabilities
             WHERE tenant_id = ?1 AND role_name = ?2",
        )
        .map_err(SqliteStoreError::from_sqlite)?;
    let rows = stmt
        .query_map(params![tenant_id.get() as i64, role.as_str()], |row| row.get::<_, String>(0))
        .map_err(SqliteStoreError::from_sqlite)?;
    let mut capabilities = Vec::new();
    for row in rows {
        let label = row.map_err(SqliteStoreError::from_sqlite)?;
        let capability = Capability::parse(&label)
            .ok_or_else(|| SqliteStoreError::Corrupt(format!("unknown capability: {label}")))?;
        capabilities.push(capability);
    }
    Ok(capabilities)
}

/// Resolves a user's capability set from the persisted membership role.
///
/// Absent or inactive members resolve to the empty set (fail closed).
pub(crate) fn capabilities_for_user(
    conn: &Connection,
    tenant_id: TenantId,
    user_id: UserId,
) -> StoreResult<Vec<Capability>> {
    match member_role(conn, tenant_id, user_id)? {
        Some(role) => role_capabilities(conn, tenant_id, &role),
        None => Ok(Vec::new()),
    }
}

/// Returns whether a user holds a capability, resolved from persisted state.
pub(crate) fn user_has_capability(
    conn: &Connection,
    tenant_id: TenantId,
    user_id: UserId,
    capability: Capability,
) -> StoreResult<bool> {
    Ok(capabilities_for_user(conn, tenant_id, user_id)?.contains(&capability))
}

// ============================================================================
// SECTION: Public Reads
// ============================================================================

impl HireflowStore {
    /// Lists a tenant's status catalog in resolution order.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the query fails or persisted labels
    /// do not parse.
    pub fn list_statuses(&self, tenant_id: TenantId) -> StoreResult<Vec<StatusDefinition>> {
        let guard = self.lock_connection()?;
        let catalog = load_status_catalog(&guard, tenant_id)?;
        Ok(catalog.definitions().to_vec())
    }

    /// Returns whether a user holds a capability within a tenant.
    ///
    /// The role is resolved from the persisted membership row; a role passed
    /// in by a caller is never trusted.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the lookup fails.
    pub fn has_capability(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
        capability: Capability,
    ) -> StoreResult<bool> {
        let guard = self.lock_connection()?;
        user_has_capability(&guard, tenant_id, user_id, capability)
    }
}
