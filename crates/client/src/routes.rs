//! Dashboard routes and the auth/admin guard in front of them.

use crate::session::SessionState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    // Auth routes
    Login,
    Register,

    // Dashboard
    Dashboard,
    WhatsApp,
    Groups,
    Messages,
    Events,
    Certificates,
    Broadcast,
    GroupSettings,
    Welcome,
    Agents,

    // Admin
    Admin,
    AdminUser { user_id: i64 },
}

/// Result of guarding a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Allowed,
    /// A stored token is still being resolved; show a loading state.
    Pending,
    Redirect(Route),
}

impl Route {
    pub fn path(&self) -> String {
        match self {
            Route::Login => "/login".into(),
            Route::Register => "/register".into(),
            Route::Dashboard => "/".into(),
            Route::WhatsApp => "/whatsapp".into(),
            Route::Groups => "/groups".into(),
            Route::Messages => "/messages".into(),
            Route::Events => "/events".into(),
            Route::Certificates => "/certificates".into(),
            Route::Broadcast => "/broadcast".into(),
            Route::GroupSettings => "/group-settings".into(),
            Route::Welcome => "/welcome".into(),
            Route::Agents => "/agents".into(),
            Route::Admin => "/admin".into(),
            Route::AdminUser { user_id } => format!("/admin/users/{user_id}"),
        }
    }

    pub fn parse(path: &str) -> Option<Route> {
        let path = path.split(['?', '#']).next().unwrap_or(path);
        let trimmed = path.trim_end_matches('/');
        let route = match trimmed {
            "" => Route::Dashboard,
            "/login" => Route::Login,
            "/register" => Route::Register,
            "/whatsapp" => Route::WhatsApp,
            "/groups" => Route::Groups,
            "/messages" => Route::Messages,
            "/events" => Route::Events,
            "/certificates" => Route::Certificates,
            "/broadcast" => Route::Broadcast,
            "/group-settings" => Route::GroupSettings,
            "/welcome" => Route::Welcome,
            "/agents" => Route::Agents,
            "/admin" => Route::Admin,
            other => {
                let user_id = other.strip_prefix("/admin/users/")?.parse().ok()?;
                Route::AdminUser { user_id }
            }
        };
        Some(route)
    }

    /// Reachable without logging in.
    pub fn is_public(&self) -> bool {
        matches!(self, Route::Login | Route::Register)
    }

    pub fn requires_admin(&self) -> bool {
        matches!(self, Route::Admin | Route::AdminUser { .. })
    }

    /// Decide whether the current session may view this route.
    pub fn guard(&self, session: &SessionState) -> Access {
        match session {
            SessionState::Resolving => Access::Pending,
            SessionState::Anonymous if self.is_public() => Access::Allowed,
            SessionState::Anonymous => Access::Redirect(Route::Login),
            SessionState::Authenticated(_) if self.is_public() => {
                Access::Redirect(Route::Dashboard)
            }
            SessionState::Authenticated(user) if self.requires_admin() && !user.is_admin => {
                Access::Redirect(Route::Dashboard)
            }
            SessionState::Authenticated(_) => Access::Allowed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use groupwatch_shared::User;

    fn user(is_admin: bool) -> SessionState {
        SessionState::Authenticated(User {
            id: 1,
            username: "njeri".into(),
            email: "njeri@example.com".into(),
            is_admin,
            is_active: true,
            created_at: None,
        })
    }

    #[test]
    fn paths_round_trip() {
        for route in [
            Route::Dashboard,
            Route::Login,
            Route::GroupSettings,
            Route::AdminUser { user_id: 42 },
        ] {
            assert_eq!(Route::parse(&route.path()), Some(route));
        }
        assert_eq!(Route::parse("/groups/?tab=all"), Some(Route::Groups));
        assert_eq!(Route::parse("/admin/users/abc"), None);
        assert_eq!(Route::parse("/nowhere"), None);
    }

    #[test]
    fn anonymous_users_are_sent_to_login() {
        let anon = SessionState::Anonymous;
        assert_eq!(Route::Messages.guard(&anon), Access::Redirect(Route::Login));
        assert_eq!(Route::Register.guard(&anon), Access::Allowed);
    }

    #[test]
    fn logged_in_users_skip_auth_pages() {
        assert_eq!(Route::Login.guard(&user(false)), Access::Redirect(Route::Dashboard));
        assert_eq!(Route::Broadcast.guard(&user(false)), Access::Allowed);
    }

    #[test]
    fn admin_routes_need_admin() {
        assert_eq!(Route::Admin.guard(&user(false)), Access::Redirect(Route::Dashboard));
        assert_eq!(Route::AdminUser { user_id: 3 }.guard(&user(true)), Access::Allowed);
    }

    #[test]
    fn resolving_sessions_wait() {
        assert_eq!(Route::Login.guard(&SessionState::Resolving), Access::Pending);
        assert_eq!(Route::Groups.guard(&SessionState::Resolving), Access::Pending);
    }
}
