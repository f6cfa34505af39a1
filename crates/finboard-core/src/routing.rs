//! Navigation and the authentication gate in front of every view.
//!
//! A [`Location`] is what the user asked for, a [`Route`] is the view it
//! resolves to. [`RouteGuard::decide`] is the pure gate; [`Router`] keeps the
//! current location and remembers where a redirected user was headed so a
//! successful login can take them back there.

use std::fmt;

use tracing::debug;

use crate::auth::{Session, SessionState};

/// Views of the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Login,
    Summary,
    Transactions,
    Categories,
    Budgets,
    Goals,
    Debts,
    Payments { debt: i64 },
    Transfers,
    Recurrings,
    Profile,
}

impl Route {
    /// Resolve a path (without query) to a route. Trailing slashes are ignored.
    pub fn from_path(path: &str) -> Option<Route> {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        match segments.as_slice() {
            [] => Some(Route::Summary),
            ["login"] => Some(Route::Login),
            ["summary"] => Some(Route::Summary),
            ["transactions"] => Some(Route::Transactions),
            ["categories"] => Some(Route::Categories),
            ["budgets"] => Some(Route::Budgets),
            ["goals"] => Some(Route::Goals),
            ["debts"] => Some(Route::Debts),
            ["debts", id, "payments"] => id.parse().ok().map(|debt| Route::Payments { debt }),
            ["transfers"] => Some(Route::Transfers),
            ["recurrings"] => Some(Route::Recurrings),
            ["me"] => Some(Route::Profile),
            _ => None,
        }
    }

    pub fn path(&self) -> String {
        match self {
            Route::Login => "/login".to_string(),
            Route::Summary => "/".to_string(),
            Route::Transactions => "/transactions".to_string(),
            Route::Categories => "/categories".to_string(),
            Route::Budgets => "/budgets".to_string(),
            Route::Goals => "/goals".to_string(),
            Route::Debts => "/debts".to_string(),
            Route::Payments { debt } => format!("/debts/{}/payments", debt),
            Route::Transfers => "/transfers".to_string(),
            Route::Recurrings => "/recurrings".to_string(),
            Route::Profile => "/me".to_string(),
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Route::Login => "Sign in",
            Route::Summary => "Summary",
            Route::Transactions => "Transactions",
            Route::Categories => "Categories",
            Route::Budgets => "Budgets",
            Route::Goals => "Goals",
            Route::Debts => "Debts",
            Route::Payments { .. } => "Payments",
            Route::Transfers => "Transfers",
            Route::Recurrings => "Recurring",
            Route::Profile => "Profile",
        }
    }

    /// Routes reachable without credentials.
    pub fn is_public(&self) -> bool {
        matches!(self, Route::Login)
    }
}

/// A requested location: path plus optional query string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub path: String,
    pub query: Option<String>,
}

impl Location {
    pub fn parse(s: &str) -> Self {
        match s.split_once('?') {
            Some((path, query)) if !query.is_empty() => Self {
                path: normalize_path(path),
                query: Some(query.to_string()),
            },
            Some((path, _)) => Self {
                path: normalize_path(path),
                query: None,
            },
            None => Self {
                path: normalize_path(s),
                query: None,
            },
        }
    }

    /// The default landing location.
    pub fn home() -> Self {
        Route::Summary.into()
    }

    pub fn route(&self) -> Option<Route> {
        Route::from_path(&self.path)
    }
}

fn normalize_path(path: &str) -> String {
    let trimmed = path.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}

impl From<Route> for Location {
    fn from(route: Route) -> Self {
        Self {
            path: route.path(),
            query: None,
        }
    }
}

impl From<&str> for Location {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.query {
            Some(query) => write!(f, "{}?{}", self.path, query),
            None => f.write_str(&self.path),
        }
    }
}

/// What to show for a requested location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Credentials not loaded yet; show nothing and decide nothing.
    Pending,
    Render(Route),
    /// Send the user to `to`, remembering the location they asked for.
    Redirect { to: Route, from: Location },
}

/// The authentication gate.
pub struct RouteGuard;

impl RouteGuard {
    pub fn decide(state: SessionState, location: &Location) -> GuardDecision {
        let route = location.route().unwrap_or(Route::Summary);
        if route.is_public() {
            return GuardDecision::Render(route);
        }
        if !state.hydrated {
            return GuardDecision::Pending;
        }
        if state.authenticated {
            GuardDecision::Render(route)
        } else {
            GuardDecision::Redirect {
                to: Route::Login,
                from: location.clone(),
            }
        }
    }
}

/// Current location plus the guard's verdict on it.
pub struct Router {
    session: Session,
    current: Location,
    decision: GuardDecision,
    return_to: Option<Location>,
}

impl Router {
    pub fn new(session: Session) -> Self {
        Self {
            session,
            current: Location::home(),
            decision: GuardDecision::Pending,
            return_to: None,
        }
    }

    pub fn current(&self) -> &Location {
        &self.current
    }

    pub fn decision(&self) -> &GuardDecision {
        &self.decision
    }

    /// Where a successful login will land.
    pub fn return_to(&self) -> Option<&Location> {
        self.return_to.as_ref()
    }

    /// Go to `target`. Unknown paths land on the home location.
    pub fn navigate(&mut self, target: impl Into<Location>) -> &GuardDecision {
        let mut location = target.into();
        if location.route().is_none() {
            debug!(path = %location.path, "Unknown route, going home");
            location = Location::home();
        }

        let state = self.session.state();
        if location.route() == Some(Route::Login) && state.hydrated && state.authenticated {
            // Already signed in: leave the login view for wherever the user was going
            let next = self.return_to.take().unwrap_or_else(Location::home);
            return self.navigate(next);
        }

        let decision = RouteGuard::decide(state, &location);
        match &decision {
            GuardDecision::Redirect { to, from } => {
                debug!(from = %from, "Not signed in, redirecting to login");
                self.return_to = Some(from.clone());
                self.current = (*to).into();
            }
            _ => self.current = location,
        }
        self.decision = decision;
        &self.decision
    }

    /// Re-run the guard on the current location after the session changed
    /// (hydration finished, logout, or credentials dropped after a failed
    /// refresh).
    pub fn on_session_change(&mut self) -> &GuardDecision {
        let current = self.current.clone();
        self.navigate(current)
    }

    /// Leave the login view after signing in.
    pub fn after_login(&mut self) -> &GuardDecision {
        let next = self.return_to.take().unwrap_or_else(Location::home);
        self.navigate(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{CredentialPair, MemoryTokenStore};
    use crate::config::ApiConfig;
    use std::sync::Arc;

    fn session_with(store: MemoryTokenStore) -> Session {
        Session::with_client(
            ApiConfig::with_base("http://unused"),
            Arc::new(store),
            reqwest::Client::new(),
        )
    }

    fn state(hydrated: bool, authenticated: bool) -> SessionState {
        SessionState {
            hydrated,
            authenticated,
        }
    }

    #[test]
    fn test_route_paths() {
        assert_eq!(Route::from_path("/"), Some(Route::Summary));
        assert_eq!(Route::from_path("/budgets/"), Some(Route::Budgets));
        assert_eq!(
            Route::from_path("/debts/12/payments"),
            Some(Route::Payments { debt: 12 })
        );
        assert_eq!(Route::from_path("/debts/x/payments"), None);
        assert_eq!(Route::from_path("/nowhere"), None);

        for route in [Route::Login, Route::Goals, Route::Payments { debt: 3 }] {
            assert_eq!(Route::from_path(&route.path()), Some(route));
        }
    }

    #[test]
    fn test_location_parse() {
        let location = Location::parse("transactions/?page=2");
        assert_eq!(location.path, "/transactions");
        assert_eq!(location.query.as_deref(), Some("page=2"));
        assert_eq!(location.to_string(), "/transactions?page=2");
        assert_eq!(Location::parse("/budgets?").query, None);
    }

    #[test]
    fn test_guard_states() {
        let loc = Location::parse("/goals");
        assert_eq!(RouteGuard::decide(state(false, false), &loc), GuardDecision::Pending);
        assert_eq!(
            RouteGuard::decide(state(true, true), &loc),
            GuardDecision::Render(Route::Goals)
        );
        assert_eq!(
            RouteGuard::decide(state(true, false), &loc),
            GuardDecision::Redirect {
                to: Route::Login,
                from: loc.clone()
            }
        );
        // The login view itself is never gated
        assert_eq!(
            RouteGuard::decide(state(false, false), &Route::Login.into()),
            GuardDecision::Render(Route::Login)
        );
    }

    #[test]
    fn test_no_decision_before_hydration() {
        let session = session_with(MemoryTokenStore::with_pair(CredentialPair::new("a", "r")));
        let mut router = Router::new(session.clone());

        assert_eq!(router.navigate("/budgets"), &GuardDecision::Pending);
        assert!(router.return_to().is_none());

        session.hydrate();
        assert_eq!(
            router.on_session_change(),
            &GuardDecision::Render(Route::Budgets)
        );
        assert_eq!(router.current().path, "/budgets");
    }

    #[test]
    fn test_logged_out_redirect_preserves_location() {
        let session = session_with(MemoryTokenStore::new());
        session.hydrate();
        let mut router = Router::new(session);

        let decision = router.navigate("/transactions?page=2").clone();
        assert_eq!(
            decision,
            GuardDecision::Redirect {
                to: Route::Login,
                from: Location::parse("/transactions?page=2"),
            }
        );
        assert_eq!(router.current(), &Location::from(Route::Login));
        assert_eq!(
            router.return_to().map(ToString::to_string).as_deref(),
            Some("/transactions?page=2")
        );
    }

    #[test]
    fn test_logout_sends_back_to_login() {
        let session = session_with(MemoryTokenStore::with_pair(CredentialPair::new("a", "r")));
        session.hydrate();
        let mut router = Router::new(session.clone());
        assert_eq!(router.navigate("/goals"), &GuardDecision::Render(Route::Goals));

        session.logout();
        assert_eq!(
            router.on_session_change(),
            &GuardDecision::Redirect {
                to: Route::Login,
                from: Location::parse("/goals"),
            }
        );
    }

    #[test]
    fn test_authenticated_login_visit_bounces_home() {
        let session = session_with(MemoryTokenStore::with_pair(CredentialPair::new("a", "r")));
        session.hydrate();
        let mut router = Router::new(session);

        assert_eq!(router.navigate("/login"), &GuardDecision::Render(Route::Summary));
        assert_eq!(router.current(), &Location::home());
    }

    #[test]
    fn test_unknown_path_goes_home() {
        let session = session_with(MemoryTokenStore::with_pair(CredentialPair::new("a", "r")));
        session.hydrate();
        let mut router = Router::new(session);
        assert_eq!(router.navigate("/admin"), &GuardDecision::Render(Route::Summary));
    }

    #[tokio::test]
    async fn test_after_login_returns_to_requested_location() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/token/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"access": "a", "refresh": "r"})),
            )
            .mount(&server)
            .await;

        let session = Session::with_client(
            ApiConfig::with_base(server.uri()),
            Arc::new(MemoryTokenStore::new()),
            reqwest::Client::new(),
        );
        session.hydrate();
        let mut router = Router::new(session.clone());
        router.navigate("/debts/4/payments");

        session.login("sam", "pw").await.unwrap();
        assert_eq!(
            router.after_login(),
            &GuardDecision::Render(Route::Payments { debt: 4 })
        );
        assert!(router.return_to().is_none());
    }
}
