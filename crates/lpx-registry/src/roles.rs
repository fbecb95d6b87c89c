//! Role registry.
//!
//! Two privileged roles exist: controllers create and cancel requests
//! (and run simulations); keepers execute them. Role checks happen at the
//! entry of every public operation, before any state is touched.

use parking_lot::RwLock;
use std::collections::HashSet;
use tracing::info;

use lpx_core::AccountId;

/// Holds the controller and keeper account sets.
#[derive(Debug, Default)]
pub struct RoleRegistry {
    controllers: RwLock<HashSet<AccountId>>,
    keepers: RwLock<HashSet<AccountId>>,
}

impl RoleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant_controller(&self, account: AccountId) {
        info!(%account, "Controller role granted");
        self.controllers.write().insert(account);
    }

    pub fn revoke_controller(&self, account: &AccountId) {
        info!(%account, "Controller role revoked");
        self.controllers.write().remove(account);
    }

    pub fn grant_keeper(&self, account: AccountId) {
        info!(%account, "Keeper role granted");
        self.keepers.write().insert(account);
    }

    pub fn revoke_keeper(&self, account: &AccountId) {
        info!(%account, "Keeper role revoked");
        self.keepers.write().remove(account);
    }

    pub fn is_controller(&self, account: &AccountId) -> bool {
        self.controllers.read().contains(account)
    }

    pub fn is_keeper(&self, account: &AccountId) -> bool {
        self.keepers.read().contains(account)
    }
}
