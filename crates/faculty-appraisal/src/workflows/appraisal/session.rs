//! Role claims and dashboard gating.
//!
//! The claim itself is owned by whoever authenticated the user; this module only
//! reads it back from an injected [`ClaimStore`] and maps it onto a surface.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

pub const AUTHENTICATED_KEY: &str = "isAuthenticated";
pub const ROLE_KEY: &str = "userType";
pub const FACULTY_ID_KEY: &str = "userId";
pub const ADMIN_ID_KEY: &str = "adminId";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Faculty,
    Admin,
    None,
}

impl Role {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Faculty => "faculty",
            Self::Admin => "admin",
            Self::None => "none",
        }
    }

    /// Unrecognised values are treated as unauthenticated.
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "faculty" => Self::Faculty,
            "admin" => Self::Admin,
            _ => Self::None,
        }
    }

    const fn id_key(self) -> Option<&'static str> {
        match self {
            Self::Faculty => Some(FACULTY_ID_KEY),
            Self::Admin => Some(ADMIN_ID_KEY),
            Self::None => None,
        }
    }
}

/// Authenticated role plus the identifier it was issued for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleClaim {
    role: Role,
    id: String,
}

impl RoleClaim {
    /// `None` for the unauthenticated role or a blank identifier.
    pub fn new(role: Role, id: impl Into<String>) -> Option<Self> {
        let id = id.into();
        if role == Role::None || id.trim().is_empty() {
            return None;
        }
        Some(Self { role, id })
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

/// Surfaces a client can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Surface {
    Login,
    Faculty,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DashboardTarget {
    Login,
    FacultyDashboard,
    AdminDashboard,
}

impl DashboardTarget {
    pub const fn path(self) -> &'static str {
        match self {
            Self::Login => "/",
            Self::FacultyDashboard => "/faculty",
            Self::AdminDashboard => "/admin",
        }
    }
}

/// Home surface for a role.
pub fn route(role: Role) -> DashboardTarget {
    match role {
        Role::Faculty => DashboardTarget::FacultyDashboard,
        Role::Admin => DashboardTarget::AdminDashboard,
        Role::None => DashboardTarget::Login,
    }
}

/// Resolve a request for `surface`. Protected surfaces fall back to the login
/// page for any other role; the login page forwards authenticated users home.
pub fn guard(role: Role, surface: Surface) -> DashboardTarget {
    match (surface, role) {
        (Surface::Login, role) => route(role),
        (Surface::Faculty, Role::Faculty) => DashboardTarget::FacultyDashboard,
        (Surface::Admin, Role::Admin) => DashboardTarget::AdminDashboard,
        (Surface::Faculty | Surface::Admin, _) => DashboardTarget::Login,
    }
}

/// Key-value storage holding the claim between requests or page loads.
pub trait ClaimStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: String);
    fn remove(&mut self, key: &str);
}

#[derive(Debug, Default, Clone)]
pub struct MemoryClaimStore {
    entries: HashMap<String, String>,
}

impl ClaimStore for MemoryClaimStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) {
        self.entries.insert(key.to_string(), value);
    }

    fn remove(&mut self, key: &str) {
        self.entries.remove(key);
    }
}

/// Session state passed explicitly to whatever needs the current role.
#[derive(Debug, Default)]
pub struct SessionContext<S> {
    store: S,
}

impl<S: ClaimStore> SessionContext<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Record a successful login. Any previous claim is cleared first.
    pub fn init(&mut self, claim: &RoleClaim) {
        self.teardown();
        self.store.set(AUTHENTICATED_KEY, "true".to_string());
        self.store
            .set(ROLE_KEY, claim.role().label().to_string());
        if let Some(key) = claim.role().id_key() {
            self.store.set(key, claim.id().to_string());
        }
    }

    /// Clear every claim key. Always succeeds.
    pub fn teardown(&mut self) {
        for key in [AUTHENTICATED_KEY, ROLE_KEY, FACULTY_ID_KEY, ADMIN_ID_KEY] {
            self.store.remove(key);
        }
    }

    pub fn claim(&self) -> Option<RoleClaim> {
        if self.store.get(AUTHENTICATED_KEY).as_deref() != Some("true") {
            return None;
        }
        let role = Role::parse(&self.store.get(ROLE_KEY)?);
        let id = self.store.get(role.id_key()?)?;
        RoleClaim::new(role, id)
    }

    pub fn role(&self) -> Role {
        self.claim().map_or(Role::None, |claim| claim.role())
    }

    pub fn resolve(&self, surface: Surface) -> DashboardTarget {
        guard(self.role(), surface)
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> SessionContext<MemoryClaimStore> {
        SessionContext::new(MemoryClaimStore::default())
    }

    #[test]
    fn unauthenticated_admin_request_routes_to_login() {
        assert_eq!(guard(Role::None, Surface::Admin), DashboardTarget::Login);
        assert_eq!(session().resolve(Surface::Admin), DashboardTarget::Login);
        assert_eq!(route(Role::None).path(), "/");
    }

    #[test]
    fn mismatched_roles_fall_back_to_login() {
        assert_eq!(guard(Role::Faculty, Surface::Admin), DashboardTarget::Login);
        assert_eq!(guard(Role::Admin, Surface::Faculty), DashboardTarget::Login);
        assert_eq!(
            guard(Role::Admin, Surface::Admin),
            DashboardTarget::AdminDashboard
        );
    }

    #[test]
    fn login_surface_forwards_authenticated_users() {
        assert_eq!(
            guard(Role::Faculty, Surface::Login),
            DashboardTarget::FacultyDashboard
        );
        assert_eq!(guard(Role::None, Surface::Login), DashboardTarget::Login);
    }

    #[test]
    fn init_and_teardown_manage_all_claim_keys() {
        let mut session = session();
        let claim = RoleClaim::new(Role::Faculty, "FAC-204").expect("valid claim");
        session.init(&claim);

        assert_eq!(session.claim(), Some(claim));
        assert_eq!(session.store().get(ROLE_KEY).as_deref(), Some("faculty"));
        assert_eq!(session.store().get(FACULTY_ID_KEY).as_deref(), Some("FAC-204"));
        assert_eq!(
            session.resolve(Surface::Faculty),
            DashboardTarget::FacultyDashboard
        );

        session.teardown();
        assert_eq!(session.role(), Role::None);
        assert!(session.store().get(AUTHENTICATED_KEY).is_none());
        assert!(session.store().get(FACULTY_ID_KEY).is_none());
        session.teardown();
    }

    #[test]
    fn switching_roles_drops_the_previous_identifier() {
        let mut session = session();
        session.init(&RoleClaim::new(Role::Faculty, "FAC-1").expect("valid"));
        session.init(&RoleClaim::new(Role::Admin, "ADM-1").expect("valid"));

        assert_eq!(session.role(), Role::Admin);
        assert!(session.store().get(FACULTY_ID_KEY).is_none());
    }

    #[test]
    fn partial_or_inconsistent_keys_mean_no_claim() {
        let mut store = MemoryClaimStore::default();
        store.set(AUTHENTICATED_KEY, "true".to_string());
        store.set(ROLE_KEY, "admin".to_string());
        store.set(FACULTY_ID_KEY, "FAC-1".to_string());
        let session = SessionContext::new(store);
        assert_eq!(session.role(), Role::None);

        let mut store = MemoryClaimStore::default();
        store.set(ROLE_KEY, "faculty".to_string());
        store.set(FACULTY_ID_KEY, "FAC-1".to_string());
        assert_eq!(SessionContext::new(store).role(), Role::None);
    }

    #[test]
    fn claims_require_an_authenticated_role_and_identifier() {
        assert!(RoleClaim::new(Role::None, "someone").is_none());
        assert!(RoleClaim::new(Role::Admin, "  ").is_none());
        assert_eq!(Role::parse("superuser"), Role::None);
    }
}
