use crate::accounts::{AccountStore, Permission};
use crate::error::{DashboardError, DashboardResult};
use std::collections::BTreeSet;

/// Who is logged in for the current interaction.
///
/// Administration goes through the session so the acting user is always
/// the authenticated one and must be an administrator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    user: Option<String>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn login(&mut self, store: &AccountStore, username: &str, password: &str) -> DashboardResult<()> {
        match store.authenticate(username, password) {
            Ok(account) => {
                log::info!("User {} logged in", account.username);
                self.user = Some(account.username.clone());
                Ok(())
            }
            Err(e) => {
                log::warn!("Failed login attempt for {}", username);
                Err(e)
            }
        }
    }

    pub fn logout(&mut self) {
        if let Some(user) = self.user.take() {
            log::info!("User {} logged out", user);
        }
    }

    pub fn current_user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    pub fn is_admin(&self, store: &AccountStore) -> bool {
        self.current_user()
            .and_then(|u| store.get(u))
            .map(|a| a.is_admin())
            .unwrap_or(false)
    }

    /// Logged-in user, or `AuthenticationFailed`
    pub fn require_user(&self) -> DashboardResult<&str> {
        self.current_user().ok_or(DashboardError::AuthenticationFailed)
    }

    /// Logged-in administrator, or `NotAuthorized`
    pub fn require_admin(&self, store: &AccountStore) -> DashboardResult<&str> {
        let user = self.require_user()?;
        if self.is_admin(store) {
            Ok(user)
        } else {
            Err(DashboardError::NotAuthorized(user.to_string()))
        }
    }

    /// Logged-in user holding `permission` (administrators hold everything
    /// they need), or `NotAuthorized`
    pub fn require_permission(&self, store: &AccountStore, permission: Permission) -> DashboardResult<&str> {
        let user = self.require_user()?;
        let allowed = store
            .get(user)
            .map(|a| a.is_admin() || a.has_permission(permission))
            .unwrap_or(false);

        if allowed {
            Ok(user)
        } else {
            Err(DashboardError::NotAuthorized(user.to_string()))
        }
    }

    // ========================================================================
    // ADMINISTRATION
    // ========================================================================

    pub fn create_user(
        &self,
        store: &mut AccountStore,
        username: &str,
        password: &str,
        permissions: BTreeSet<Permission>,
    ) -> DashboardResult<()> {
        let actor = self.require_admin(store)?;
        store.create(actor, username, password, permissions)
    }

    pub fn reset_password(&self, store: &mut AccountStore, username: &str, new_password: &str) -> DashboardResult<()> {
        let actor = self.require_admin(store)?;
        store.update_password(actor, username, new_password)
    }

    pub fn set_permissions(
        &self,
        store: &mut AccountStore,
        username: &str,
        permissions: BTreeSet<Permission>,
    ) -> DashboardResult<()> {
        let actor = self.require_admin(store)?;
        store.update_permissions(actor, username, permissions)
    }

    pub fn delete_user(&self, store: &mut AccountStore, username: &str) -> DashboardResult<()> {
        let actor = self.require_admin(store)?;
        store.delete(actor, username)
    }

    /// Any user may change their own password after confirming the current one
    pub fn change_own_password(
        &self,
        store: &mut AccountStore,
        current_password: &str,
        new_password: &str,
    ) -> DashboardResult<()> {
        let user = self.require_user()?;
        store.authenticate(user, current_password)?;
        store.update_password(user, user, new_password)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::{DefaultAdmin, SessionAccounts};
    use crate::audit::MemoryAuditLog;

    fn store_with_ana() -> AccountStore {
        let mut store = AccountStore::open(
            Box::new(SessionAccounts::new()),
            Box::new(MemoryAuditLog::new()),
            &DefaultAdmin::default(),
        )
        .unwrap();
        store
            .create("admin", "ana", "clave", BTreeSet::from([Permission::ReportAccess]))
            .unwrap();
        store
    }

    #[test]
    fn test_login_logout() {
        let store = store_with_ana();
        let mut session = Session::new();

        assert!(matches!(
            session.login(&store, "ana", "mala"),
            Err(DashboardError::AuthenticationFailed)
        ));
        assert_eq!(session.current_user(), None);

        session.login(&store, "ana", "clave").unwrap();
        assert_eq!(session.current_user(), Some("ana"));
        assert!(!session.is_admin(&store));
        assert!(session.require_permission(&store, Permission::ReportAccess).is_ok());
        assert!(matches!(
            session.require_permission(&store, Permission::EditData),
            Err(DashboardError::NotAuthorized(_))
        ));

        session.logout();
        assert_eq!(session.current_user(), None);
    }

    #[test]
    fn test_administration_requires_admin() {
        let mut store = store_with_ana();
        let mut session = Session::new();

        assert!(matches!(
            session.create_user(&mut store, "juan", "x", BTreeSet::new()),
            Err(DashboardError::AuthenticationFailed)
        ));

        session.login(&store, "ana", "clave").unwrap();
        assert!(matches!(
            session.delete_user(&mut store, "admin"),
            Err(DashboardError::NotAuthorized(_))
        ));

        session.login(&store, "admin", "admin").unwrap();
        session.create_user(&mut store, "juan", "x", BTreeSet::new()).unwrap();
        assert!(matches!(
            session.delete_user(&mut store, "admin"),
            Err(DashboardError::CannotDeleteSelf(_))
        ));
        session.delete_user(&mut store, "juan").unwrap();

        let last = store.audit_entries().unwrap().pop().unwrap();
        assert_eq!(last.actor, "admin");
        assert_eq!(last.action, "Deleted user juan");
    }

    #[test]
    fn test_change_own_password() {
        let mut store = store_with_ana();
        let mut session = Session::new();
        session.login(&store, "ana", "clave").unwrap();

        assert!(session.change_own_password(&mut store, "mala", "nueva").is_err());
        session.change_own_password(&mut store, "clave", "nueva").unwrap();

        assert!(store.authenticate("ana", "nueva").is_ok());
    }
}
