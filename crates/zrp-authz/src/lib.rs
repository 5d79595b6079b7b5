//! Role-based access control (C4): a (role, module, action) capability
//! table with three seeded defaults, consulted by the RBAC middleware stage
//! in `zrp-server`.

use std::collections::HashSet;

use anyhow::Result;
use sqlx::SqlitePool;
use zrp_schemas::{Action, AuthMethod, Module, Role};

/// Builds the default capability set for a fresh database (§4.4):
/// `admin` gets every (module, action) pair, `user` gets every pair except
/// the `admin` module, `readonly` gets `view` on every module.
pub fn default_permissions() -> Vec<(Role, Module, Action)> {
    let mut rows = Vec::new();
    for &module in Module::ALL {
        for &action in Action::ALL {
            rows.push((Role::Admin, module, action));
            if module != Module::Admin {
                rows.push((Role::User, module, action));
            }
        }
        rows.push((Role::Readonly, module, Action::View));
    }
    rows
}

pub async fn seed_default_permissions(pool: &SqlitePool) -> Result<()> {
    let existing = zrp_db::identity::fetch_role_permissions(pool).await?;
    if !existing.is_empty() {
        return Ok(());
    }
    let entries = default_permissions()
        .into_iter()
        .map(|(role, module, action)| (role.to_string(), module.to_string(), action.to_string()))
        .collect();
    zrp_db::identity::replace_role_permissions(pool, entries).await
}

/// Loads the full capability table into a lookup set. Cheap enough to
/// rebuild per request at this scale; callers that need to check many
/// requests in a tight loop can hold onto the returned `Capabilities`.
pub struct Capabilities {
    allowed: HashSet<(Role, Module, Action)>,
}

impl Capabilities {
    pub async fn load(pool: &SqlitePool) -> Result<Self> {
        let rows = zrp_db::identity::fetch_role_permissions(pool).await?;
        let mut allowed = HashSet::with_capacity(rows.len());
        for row in rows {
            let role: Role = row.role.parse()?;
            let module: Module = row.module.parse()?;
            let action: Action = row.action.parse()?;
            allowed.insert((role, module, action));
        }
        Ok(Self { allowed })
    }

    /// §4.4: bearer-token requests are treated as a trusted service
    /// principal with implicit full capability, bypassing the table.
    pub fn check(&self, auth_method: AuthMethod, role: Role, module: Module, action: Action) -> bool {
        if auth_method == AuthMethod::Bearer {
            return true;
        }
        self.allowed.contains(&(role, module, action))
    }
}

/// Admin-only mutation: replaces every row for `role` in one transaction
/// (delete then insert, deduped) per §4.4.
pub async fn replace_permissions_for_role(
    pool: &SqlitePool,
    role: Role,
    pairs: Vec<(Module, Action)>,
) -> Result<()> {
    let mut existing = zrp_db::identity::fetch_role_permissions(pool).await?;
    existing.retain(|row| row.role != role.to_string());

    let mut deduped: HashSet<(Module, Action)> = HashSet::new();
    let mut entries: Vec<(String, String, String)> = existing
        .into_iter()
        .map(|row| (row.role, row.module, row.action))
        .collect();
    for (module, action) in pairs {
        if deduped.insert((module, action)) {
            entries.push((role.to_string(), module.to_string(), action.to_string()));
        }
    }

    zrp_db::identity::replace_role_permissions(pool, entries).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn seeded_defaults_match_role_shape() {
        let pool = zrp_db::connect_in_memory().await.unwrap();
        zrp_db::migrate(&pool).await.unwrap();
        seed_default_permissions(&pool).await.unwrap();

        let caps = Capabilities::load(&pool).await.unwrap();
        assert!(caps.check(AuthMethod::Cookie, Role::Admin, Module::Admin, Action::Edit));
        assert!(!caps.check(AuthMethod::Cookie, Role::User, Module::Admin, Action::View));
        assert!(caps.check(AuthMethod::Cookie, Role::Readonly, Module::Inventory, Action::View));
        assert!(!caps.check(AuthMethod::Cookie, Role::Readonly, Module::Inventory, Action::Edit));
    }

    #[tokio::test]
    async fn bearer_auth_bypasses_the_table() {
        let pool = zrp_db::connect_in_memory().await.unwrap();
        zrp_db::migrate(&pool).await.unwrap();
        // No seeding at all — bearer auth must still pass.
        let caps = Capabilities::load(&pool).await.unwrap();
        assert!(caps.check(AuthMethod::Bearer, Role::Readonly, Module::Admin, Action::Delete));
    }

    #[tokio::test]
    async fn replace_is_scoped_to_one_role() {
        let pool = zrp_db::connect_in_memory().await.unwrap();
        zrp_db::migrate(&pool).await.unwrap();
        seed_default_permissions(&pool).await.unwrap();

        replace_permissions_for_role(&pool, Role::Readonly, vec![(Module::Parts, Action::View)])
            .await
            .unwrap();

        let caps = Capabilities::load(&pool).await.unwrap();
        assert!(caps.check(AuthMethod::Cookie, Role::Readonly, Module::Parts, Action::View));
        assert!(!caps.check(AuthMethod::Cookie, Role::Readonly, Module::Inventory, Action::View));
        // Admin role untouched by a readonly-scoped replace.
        assert!(caps.check(AuthMethod::Cookie, Role::Admin, Module::Inventory, Action::Edit));
    }
}
