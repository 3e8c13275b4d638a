//! Route admission control.
//!
//! Every navigation is decided from the credential store as it is right
//! now. Nothing is cached, so a session cleared by a failed refresh is
//! picked up on the very next check.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::models::Role;

use super::CredentialStore;

/// Who may open a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Public,
    Authenticated,
    Admin,
}

/// Client-side destinations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Welcome,
    Login,
    Register,
    Dashboard,
    InterviewForm,
    InterviewSession,
    Admin,
    NotFound,
}

impl Route {
    pub const ALL: [Route; 7] = [
        Route::Welcome,
        Route::Login,
        Route::Register,
        Route::Dashboard,
        Route::InterviewForm,
        Route::InterviewSession,
        Route::Admin,
    ];

    /// Match a path. Query strings, fragments and trailing slashes are
    /// ignored; anything unknown is `NotFound`.
    pub fn from_path(path: &str) -> Self {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let trimmed = path.trim_end_matches('/');
        match trimmed {
            "" => Route::Welcome,
            "/login" => Route::Login,
            "/register" => Route::Register,
            "/dashboard" => Route::Dashboard,
            "/interview-form" => Route::InterviewForm,
            "/interview-session" => Route::InterviewSession,
            "/admin" => Route::Admin,
            _ => Route::NotFound,
        }
    }

    pub fn path(self) -> &'static str {
        match self {
            Route::Welcome | Route::NotFound => "/",
            Route::Login => "/login",
            Route::Register => "/register",
            Route::Dashboard => "/dashboard",
            Route::InterviewForm => "/interview-form",
            Route::InterviewSession => "/interview-session",
            Route::Admin => "/admin",
        }
    }

    pub fn access(self) -> Access {
        match self {
            Route::Welcome | Route::Login | Route::Register | Route::NotFound => Access::Public,
            Route::Dashboard | Route::InterviewForm | Route::InterviewSession => {
                Access::Authenticated
            }
            Route::Admin => Access::Admin,
        }
    }

    /// Where a user lands after signing in.
    pub fn landing_for(role: Role) -> Self {
        match role {
            Role::Admin => Route::Admin,
            Role::Standard => Route::Dashboard,
        }
    }

    /// Landing page for signed-in users who lack the privilege for a route.
    pub fn default_landing() -> Self {
        Route::Dashboard
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardOutcome {
    Allow(Route),
    RedirectToLogin,
    /// Signed in but not privileged enough.
    RedirectToLanding(Route),
    /// Unknown destination, sent to the welcome page.
    RedirectToWelcome,
}

impl GuardOutcome {
    pub fn is_allowed(self) -> bool {
        matches!(self, GuardOutcome::Allow(_))
    }

    /// The route that will actually be rendered.
    pub fn destination(self) -> Route {
        match self {
            GuardOutcome::Allow(route) | GuardOutcome::RedirectToLanding(route) => route,
            GuardOutcome::RedirectToLogin => Route::Login,
            GuardOutcome::RedirectToWelcome => Route::Welcome,
        }
    }
}

#[derive(Clone)]
pub struct RouteGuard {
    store: Arc<CredentialStore>,
}

impl RouteGuard {
    pub fn new(store: Arc<CredentialStore>) -> Self {
        Self { store }
    }

    pub fn check(&self, route: Route) -> GuardOutcome {
        let outcome = match route.access() {
            Access::Public if route == Route::NotFound => GuardOutcome::RedirectToWelcome,
            Access::Public => GuardOutcome::Allow(route),
            _ if !self.store.is_authenticated() => GuardOutcome::RedirectToLogin,
            Access::Admin if !self.store.has_admin_role() => {
                GuardOutcome::RedirectToLanding(Route::default_landing())
            }
            _ => GuardOutcome::Allow(route),
        };
        debug!(route = %route, ?outcome, "Route checked");
        outcome
    }

    pub fn check_path(&self, path: &str) -> GuardOutcome {
        self.check(Route::from_path(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{Credential, MemoryBackend};
    use crate::models::User;

    fn guard_with(role: Option<Role>) -> (RouteGuard, Arc<CredentialStore>) {
        let store = Arc::new(CredentialStore::open(Box::new(MemoryBackend::new())).unwrap());
        if let Some(role) = role {
            let user = User {
                id: 1,
                name: "Sam".to_string(),
                email: "sam@example.com".to_string(),
                role,
            };
            store.save(Credential::new("a1", None, user)).unwrap();
        }
        (RouteGuard::new(store.clone()), store)
    }

    #[test]
    fn test_from_path() {
        assert_eq!(Route::from_path("/"), Route::Welcome);
        assert_eq!(Route::from_path(""), Route::Welcome);
        assert_eq!(Route::from_path("/admin"), Route::Admin);
        assert_eq!(Route::from_path("/admin/"), Route::Admin);
        assert_eq!(Route::from_path("/dashboard?tab=stats"), Route::Dashboard);
        assert_eq!(Route::from_path("/interview-session#video"), Route::InterviewSession);
        assert_eq!(Route::from_path("/nope"), Route::NotFound);
    }

    #[test]
    fn test_paths_round_trip() {
        for route in Route::ALL {
            assert_eq!(Route::from_path(route.path()), route);
        }
    }

    #[test]
    fn test_anonymous_admin_redirects_to_login() {
        let (guard, _) = guard_with(None);
        assert_eq!(guard.check_path("/admin"), GuardOutcome::RedirectToLogin);
    }

    #[test]
    fn test_standard_admin_redirects_to_landing() {
        let (guard, _) = guard_with(Some(Role::Standard));
        assert_eq!(
            guard.check_path("/admin"),
            GuardOutcome::RedirectToLanding(Route::Dashboard)
        );
    }

    #[test]
    fn test_admin_admin_allowed() {
        let (guard, _) = guard_with(Some(Role::Admin));
        assert_eq!(guard.check_path("/admin"), GuardOutcome::Allow(Route::Admin));
    }

    #[test]
    fn test_anonymous_protected_routes_redirect_to_login() {
        let (guard, _) = guard_with(None);
        for route in [Route::Dashboard, Route::InterviewForm, Route::InterviewSession] {
            assert_eq!(guard.check(route), GuardOutcome::RedirectToLogin);
        }
    }

    #[test]
    fn test_public_routes_always_allowed() {
        let (guard, _) = guard_with(None);
        for route in [Route::Welcome, Route::Login, Route::Register] {
            assert!(guard.check(route).is_allowed());
        }
    }

    #[test]
    fn test_unknown_path_goes_to_welcome() {
        let (guard, _) = guard_with(Some(Role::Admin));
        let outcome = guard.check_path("/settings");
        assert_eq!(outcome, GuardOutcome::RedirectToWelcome);
        assert_eq!(outcome.destination(), Route::Welcome);
    }

    #[test]
    fn test_clear_is_seen_on_next_check() {
        let (guard, store) = guard_with(Some(Role::Standard));
        assert!(guard.check(Route::Dashboard).is_allowed());

        store.clear().unwrap();

        assert_eq!(guard.check(Route::Dashboard), GuardOutcome::RedirectToLogin);
    }

    #[test]
    fn test_landing_for_role() {
        assert_eq!(Route::landing_for(Role::Admin), Route::Admin);
        assert_eq!(Route::landing_for(Role::Standard), Route::Dashboard);
    }
}
