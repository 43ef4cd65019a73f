// 👤 User Account Administration
//
// AccountStore owns the accounts for the lifetime of the process and is
// passed explicitly to whoever needs it. Every successful mutation is
// flushed to the backend and appended to the audit log right away.
//
// Known limitation: there is no locking. Two processes mutating the same
// account file race, and the last write wins.

use crate::audit::{AuditEntry, AuditLog};
use crate::error::{DashboardError, DashboardResult};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

// ============================================================================
// PERMISSIONS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Permission {
    EditData,
    CreateUsers,
    ModifyUsers,
    AssignPermissions,
    ReportAccess,
}

impl Permission {
    pub const ALL: [Permission; 5] = [
        Permission::EditData,
        Permission::CreateUsers,
        Permission::ModifyUsers,
        Permission::AssignPermissions,
        Permission::ReportAccess,
    ];

    /// Label stored in the accounts file and shown to users
    pub fn label(&self) -> &'static str {
        match self {
            Permission::EditData => "Editar Datos",
            Permission::CreateUsers => "Crear Usuarios",
            Permission::ModifyUsers => "Modificar Usuarios",
            Permission::AssignPermissions => "Asignar Permisos",
            Permission::ReportAccess => "Acceso Reportes",
        }
    }

    pub fn all() -> BTreeSet<Permission> {
        Permission::ALL.into_iter().collect()
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Permission {
    type Err = DashboardError;

    /// Accepts the stored label or the snake_case name ("report_access")
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Permission::ALL
            .into_iter()
            .find(|p| {
                p.label().eq_ignore_ascii_case(wanted)
                    || p.label().to_lowercase().replace(' ', "_") == wanted.to_lowercase()
                    || format!("{:?}", p).eq_ignore_ascii_case(&wanted.replace('_', ""))
            })
            .ok_or_else(|| DashboardError::UnknownPermission(wanted.to_string()))
    }
}

/// Parse a comma-joined permission list, skipping unknown entries
fn parse_permission_list(joined: &str) -> BTreeSet<Permission> {
    joined
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .filter_map(|p| match p.parse() {
            Ok(permission) => Some(permission),
            Err(e) => {
                log::warn!("Ignoring stored permission: {}", e);
                None
            }
        })
        .collect()
}

fn join_permissions(permissions: &BTreeSet<Permission>) -> String {
    permissions.iter().map(|p| p.label()).collect::<Vec<_>>().join(",")
}

// ============================================================================
// PASSWORDS
// ============================================================================

/// Salted SHA-256, stored as `<salt>$<hex digest>`
pub fn hash_password(password: &str) -> String {
    let salt = uuid::Uuid::new_v4().simple().to_string();
    format!("{}${}", salt, digest(&salt, password))
}

pub fn verify_password(password: &str, stored: &str) -> bool {
    match stored.split_once('$') {
        Some((salt, expected)) => {
            let actual = digest(salt, password);
            // compare every byte regardless of where the first mismatch is
            actual.len() == expected.len()
                && actual
                    .bytes()
                    .zip(expected.bytes())
                    .fold(0u8, |acc, (a, b)| acc | (a ^ b))
                    == 0
        }
        None => false,
    }
}

fn digest(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

// ============================================================================
// ACCOUNT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub username: String,
    pub password_hash: String,
    pub permissions: BTreeSet<Permission>,
}

impl Account {
    pub fn new(username: &str, password: &str, permissions: BTreeSet<Permission>) -> Self {
        Account {
            username: username.to_string(),
            password_hash: hash_password(password),
            permissions,
        }
    }

    /// Administrators hold every user-management permission
    pub fn is_admin(&self) -> bool {
        [
            Permission::CreateUsers,
            Permission::ModifyUsers,
            Permission::AssignPermissions,
        ]
        .iter()
        .all(|p| self.permissions.contains(p))
    }

    pub fn has_permission(&self, permission: Permission) -> bool {
        self.permissions.contains(&permission)
    }

    pub fn check_password(&self, password: &str) -> bool {
        verify_password(password, &self.password_hash)
    }
}

// ============================================================================
// BACKENDS
// ============================================================================

/// Where accounts live between runs
pub trait AccountBackend {
    fn describe(&self) -> String;

    /// `None` when nothing has been stored yet
    fn load(&self) -> DashboardResult<Option<Vec<Account>>>;

    fn save(&mut self, accounts: &[Account]) -> DashboardResult<()>;
}

/// Row layout of the accounts file
#[derive(Debug, Serialize, Deserialize)]
struct AccountRow {
    username: String,
    password_hash: String,
    #[serde(default)]
    permissions: String,
}

/// Tabular accounts file: `username,password_hash,permissions`
pub struct CsvAccountFile {
    path: PathBuf,
}

impl CsvAccountFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        CsvAccountFile { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AccountBackend for CsvAccountFile {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn load(&self) -> DashboardResult<Option<Vec<Account>>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let mut reader = csv::Reader::from_path(&self.path)?;
        let mut accounts = Vec::new();

        for result in reader.deserialize() {
            let row: AccountRow = result?;
            if row.username.trim().is_empty() {
                continue;
            }
            accounts.push(Account {
                username: row.username,
                password_hash: row.password_hash,
                permissions: parse_permission_list(&row.permissions),
            });
        }

        Ok(Some(accounts))
    }

    fn save(&mut self, accounts: &[Account]) -> DashboardResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let mut writer = csv::Writer::from_path(&self.path)?;
        for account in accounts {
            writer.serialize(AccountRow {
                username: account.username.clone(),
                password_hash: account.password_hash.clone(),
                permissions: join_permissions(&account.permissions),
            })?;
        }
        writer.flush()?;

        Ok(())
    }
}

/// Session-scoped accounts; gone when the process exits
#[derive(Debug, Default)]
pub struct SessionAccounts {
    saved: Option<Vec<Account>>,
}

impl SessionAccounts {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AccountBackend for SessionAccounts {
    fn describe(&self) -> String {
        "session".to_string()
    }

    fn load(&self) -> DashboardResult<Option<Vec<Account>>> {
        Ok(self.saved.clone())
    }

    fn save(&mut self, accounts: &[Account]) -> DashboardResult<()> {
        self.saved = Some(accounts.to_vec());
        Ok(())
    }
}

// ============================================================================
// STORE
// ============================================================================

/// Credentials of the administrator created when the store is empty
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultAdmin {
    pub username: String,
    pub password: String,
}

impl Default for DefaultAdmin {
    fn default() -> Self {
        DefaultAdmin {
            username: "admin".to_string(),
            password: "admin".to_string(),
        }
    }
}

pub struct AccountStore {
    backend: Box<dyn AccountBackend>,
    audit: Box<dyn AuditLog>,
    accounts: BTreeMap<String, Account>,
}

impl AccountStore {
    /// Load accounts from the backend. An empty or missing store is seeded
    /// with `default_admin` holding every permission, and flushed.
    pub fn open(
        backend: Box<dyn AccountBackend>,
        audit: Box<dyn AuditLog>,
        default_admin: &DefaultAdmin,
    ) -> DashboardResult<Self> {
        let loaded = backend.load()?.unwrap_or_default();

        let mut store = AccountStore {
            backend,
            audit,
            accounts: BTreeMap::new(),
        };

        for account in loaded {
            // last row wins for repeated usernames
            store.accounts.insert(account.username.clone(), account);
        }

        if store.accounts.is_empty() {
            log::warn!(
                "No accounts in {}; creating administrator '{}'",
                store.backend.describe(),
                default_admin.username
            );
            let admin = Account::new(&default_admin.username, &default_admin.password, Permission::all());
            let seeded = BTreeMap::from([(admin.username.clone(), admin)]);
            store.commit("system", format!("Seeded administrator {}", default_admin.username), seeded)?;
        }

        Ok(store)
    }

    pub fn get(&self, username: &str) -> Option<&Account> {
        self.accounts.get(username)
    }

    pub fn usernames(&self) -> Vec<&str> {
        self.accounts.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    pub fn audit_entries(&self) -> DashboardResult<Vec<AuditEntry>> {
        self.audit.entries()
    }

    /// `AuthenticationFailed` for unknown users and wrong passwords alike
    pub fn authenticate(&self, username: &str, password: &str) -> DashboardResult<&Account> {
        self.accounts
            .get(username)
            .filter(|account| account.check_password(password))
            .ok_or(DashboardError::AuthenticationFailed)
    }

    pub fn create(
        &mut self,
        actor: &str,
        username: &str,
        password: &str,
        permissions: BTreeSet<Permission>,
    ) -> DashboardResult<()> {
        let username = username.trim();
        if username.is_empty() {
            return Err(DashboardError::EmptyUsername);
        }
        if password.is_empty() {
            return Err(DashboardError::EmptyPassword);
        }
        if self.accounts.contains_key(username) {
            return Err(DashboardError::DuplicateUser(username.to_string()));
        }

        let mut next = self.accounts.clone();
        next.insert(username.to_string(), Account::new(username, password, permissions));
        self.commit(actor, format!("Created user {}", username), next)
    }

    pub fn update_password(&mut self, actor: &str, username: &str, new_password: &str) -> DashboardResult<()> {
        if new_password.is_empty() {
            return Err(DashboardError::EmptyPassword);
        }

        let mut next = self.accounts.clone();
        let account = next
            .get_mut(username)
            .ok_or_else(|| DashboardError::UnknownUser(username.to_string()))?;
        account.password_hash = hash_password(new_password);

        self.commit(actor, format!("Updated password for {}", username), next)
    }

    pub fn update_permissions(
        &mut self,
        actor: &str,
        username: &str,
        permissions: BTreeSet<Permission>,
    ) -> DashboardResult<()> {
        let mut next = self.accounts.clone();
        let account = next
            .get_mut(username)
            .ok_or_else(|| DashboardError::UnknownUser(username.to_string()))?;

        let description = format!(
            "Updated permissions for {}: [{}]",
            username,
            join_permissions(&permissions)
        );
        account.permissions = permissions;

        self.commit(actor, description, next)
    }

    /// `actor` is the authenticated account and can never delete itself
    pub fn delete(&mut self, actor: &str, username: &str) -> DashboardResult<()> {
        if !self.accounts.contains_key(username) {
            return Err(DashboardError::UnknownUser(username.to_string()));
        }
        if actor == username {
            return Err(DashboardError::CannotDeleteSelf(username.to_string()));
        }

        let mut next = self.accounts.clone();
        next.remove(username);
        self.commit(actor, format!("Deleted user {}", username), next)
    }

    /// Flush `next` to the backend and only then make it current, so a
    /// failed save leaves the store as it was. The action is then recorded.
    fn commit(&mut self, actor: &str, action: String, next: BTreeMap<String, Account>) -> DashboardResult<()> {
        let accounts: Vec<Account> = next.values().cloned().collect();
        self.backend.save(&accounts)?;
        self.accounts = next;

        log::info!("{} by {}", action, actor);
        self.audit.append(&AuditEntry::new(actor, action))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::MemoryAuditLog;

    fn store() -> AccountStore {
        AccountStore::open(
            Box::new(SessionAccounts::new()),
            Box::new(MemoryAuditLog::new()),
            &DefaultAdmin::default(),
        )
        .unwrap()
    }

    fn reports_only() -> BTreeSet<Permission> {
        BTreeSet::from([Permission::ReportAccess])
    }

    #[test]
    fn test_seeds_default_admin() {
        let store = store();

        assert_eq!(store.usernames(), vec!["admin"]);
        let admin = store.authenticate("admin", "admin").unwrap();
        assert!(admin.is_admin());
        assert_eq!(admin.permissions, Permission::all());
        assert_ne!(admin.password_hash, "admin", "never stored in plaintext");
        assert_eq!(store.audit_entries().unwrap().len(), 1);
    }

    #[test]
    fn test_authentication_failures() {
        let store = store();

        assert!(matches!(
            store.authenticate("admin", "wrong"),
            Err(DashboardError::AuthenticationFailed)
        ));
        assert!(matches!(
            store.authenticate("nobody", "admin"),
            Err(DashboardError::AuthenticationFailed)
        ));
    }

    #[test]
    fn test_duplicate_user_keeps_existing_hash() {
        let mut store = store();
        store.create("admin", "ana", "secreta", reports_only()).unwrap();
        let before = store.get("ana").unwrap().password_hash.clone();

        let result = store.create("admin", "ana", "otra", Permission::all());

        assert!(matches!(result, Err(DashboardError::DuplicateUser(ref u)) if u == "ana"));
        assert_eq!(store.get("ana").unwrap().password_hash, before);
        assert_eq!(store.get("ana").unwrap().permissions, reports_only());
        assert!(store.authenticate("ana", "secreta").is_ok());
    }

    #[test]
    fn test_update_password_and_permissions() {
        let mut store = store();
        store.create("admin", "ana", "vieja", reports_only()).unwrap();

        store.update_password("admin", "ana", "nueva").unwrap();
        assert!(store.authenticate("ana", "vieja").is_err());
        assert!(store.authenticate("ana", "nueva").is_ok());

        store
            .update_permissions("admin", "ana", BTreeSet::from([Permission::EditData]))
            .unwrap();
        assert!(store.get("ana").unwrap().has_permission(Permission::EditData));
        assert!(!store.get("ana").unwrap().has_permission(Permission::ReportAccess));

        assert!(matches!(
            store.update_password("admin", "juan", "x"),
            Err(DashboardError::UnknownUser(_))
        ));
        assert!(matches!(
            store.update_permissions("admin", "juan", reports_only()),
            Err(DashboardError::UnknownUser(_))
        ));
        assert!(matches!(
            store.update_password("admin", "ana", ""),
            Err(DashboardError::EmptyPassword)
        ));
    }

    #[test]
    fn test_delete() {
        let mut store = store();
        store.create("admin", "ana", "x", reports_only()).unwrap();

        assert!(matches!(store.delete("admin", "admin"), Err(DashboardError::CannotDeleteSelf(_))));
        assert!(matches!(store.delete("admin", "juan"), Err(DashboardError::UnknownUser(_))));

        store.delete("admin", "ana").unwrap();
        assert!(store.get("ana").is_none());
    }

    #[test]
    fn test_every_mutation_is_audited() {
        let mut store = store();
        store.create("admin", "ana", "x", reports_only()).unwrap();
        store.update_password("admin", "ana", "y").unwrap();
        store.update_permissions("admin", "ana", Permission::all()).unwrap();
        store.delete("admin", "ana").unwrap();
        let _ = store.delete("admin", "ana");

        let actions: Vec<String> = store.audit_entries().unwrap().into_iter().map(|e| e.action).collect();
        assert_eq!(actions.len(), 5, "seed + four successful mutations");
        assert_eq!(actions[1], "Created user ana");
        assert_eq!(actions[4], "Deleted user ana");
    }

    /// Backend whose saves start failing once `broken` is set
    struct FlakyBackend {
        broken: std::rc::Rc<std::cell::Cell<bool>>,
    }

    impl AccountBackend for FlakyBackend {
        fn describe(&self) -> String {
            "flaky".to_string()
        }

        fn load(&self) -> DashboardResult<Option<Vec<Account>>> {
            Ok(None)
        }

        fn save(&mut self, _accounts: &[Account]) -> DashboardResult<()> {
            if self.broken.get() {
                return Err(DashboardError::StoreUnavailable("disk full".to_string()));
            }
            Ok(())
        }
    }

    #[test]
    fn test_failed_save_leaves_accounts_unchanged() {
        let broken = std::rc::Rc::new(std::cell::Cell::new(false));
        let mut store = AccountStore::open(
            Box::new(FlakyBackend { broken: broken.clone() }),
            Box::new(MemoryAuditLog::new()),
            &DefaultAdmin::default(),
        )
        .unwrap();
        store.create("admin", "luis", "x", reports_only()).unwrap();
        let luis_hash = store.get("luis").unwrap().password_hash.clone();

        broken.set(true);
        assert!(matches!(
            store.create("admin", "ana", "clave", reports_only()),
            Err(DashboardError::StoreUnavailable(_))
        ));
        assert!(store.get("ana").is_none());
        assert!(store.authenticate("ana", "clave").is_err());

        assert!(store.update_password("admin", "luis", "y").is_err());
        assert_eq!(store.get("luis").unwrap().password_hash, luis_hash);
        assert!(store.update_permissions("admin", "luis", Permission::all()).is_err());
        assert_eq!(store.get("luis").unwrap().permissions, reports_only());
        assert!(store.delete("admin", "luis").is_err());
        assert!(store.get("luis").is_some());

        // Nothing unsaved was audited
        assert_eq!(store.audit_entries().unwrap().len(), 2);

        broken.set(false);
        store.create("admin", "ana", "clave", reports_only()).unwrap();
        assert!(store.authenticate("ana", "clave").is_ok());
    }

    #[test]
    fn test_csv_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("usuarios.csv");

        {
            let mut store = AccountStore::open(
                Box::new(CsvAccountFile::new(&path)),
                Box::new(MemoryAuditLog::new()),
                &DefaultAdmin::default(),
            )
            .unwrap();
            store
                .create(
                    "admin",
                    "ana",
                    "clave",
                    BTreeSet::from([Permission::ReportAccess, Permission::EditData]),
                )
                .unwrap();
        }

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("username,password_hash,permissions"));
        assert!(contents.contains("\"Editar Datos,Acceso Reportes\""));
        assert!(!contents.contains("clave"));

        let store = AccountStore::open(
            Box::new(CsvAccountFile::new(&path)),
            Box::new(MemoryAuditLog::new()),
            &DefaultAdmin::default(),
        )
        .unwrap();

        assert_eq!(store.len(), 2);
        let ana = store.authenticate("ana", "clave").unwrap();
        assert!(ana.has_permission(Permission::EditData));
        assert!(!ana.is_admin());
    }

    #[test]
    fn test_permission_parsing() {
        assert_eq!("Acceso Reportes".parse::<Permission>().unwrap(), Permission::ReportAccess);
        assert_eq!("report_access".parse::<Permission>().unwrap(), Permission::ReportAccess);
        assert_eq!("crear usuarios".parse::<Permission>().unwrap(), Permission::CreateUsers);
        assert!("Borrar Todo".parse::<Permission>().is_err());

        assert_eq!(
            parse_permission_list("Editar Datos, ,Desconocido,Acceso Reportes"),
            BTreeSet::from([Permission::EditData, Permission::ReportAccess])
        );
    }

    #[test]
    fn test_password_hashes_are_salted() {
        let a = hash_password("igual");
        let b = hash_password("igual");

        assert_ne!(a, b);
        assert!(verify_password("igual", &a));
        assert!(verify_password("igual", &b));
        assert!(!verify_password("otra", &a));
        assert!(!verify_password("igual", "plaintext"));
    }
}
