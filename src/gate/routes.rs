//! Route gating: which screen a requested path resolves to for a given gate
//! state.
//!
//! The decision table mirrors the application shell: unverified users are
//! funneled to `/verify-email` from anywhere outside the auth pages, verified
//! users are bounced off the auth pages to `/dashboard`, and unmatched paths
//! land on `/dashboard` or `/login` depending on the gate.

use crate::gate::profile::GateState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Landing,
    Login,
    Signup,
    ForgotPassword,
    VerifyEmail,
    Dashboard,
    Profile,
    Settings,
    Gantt { team_id: i64 },
    WorkdayTracker,
    GetStarted,
    Unknown(String),
}

impl Route {
    pub fn parse(path: &str) -> Route {
        let trimmed = path.trim_end_matches('/');
        match trimmed {
            "" | "/" => Route::Landing,
            "/login" => Route::Login,
            "/signup" => Route::Signup,
            "/forgot-password" => Route::ForgotPassword,
            "/verify-email" => Route::VerifyEmail,
            "/dashboard" => Route::Dashboard,
            "/profile" => Route::Profile,
            "/settings" => Route::Settings,
            "/workday-tracker" => Route::WorkdayTracker,
            "/get-started" => Route::GetStarted,
            _ => match trimmed
                .strip_prefix("/gantt/")
                .and_then(|rest| rest.parse::<i64>().ok())
            {
                Some(team_id) => Route::Gantt { team_id },
                None => Route::Unknown(path.to_string()),
            },
        }
    }

    pub fn path(&self) -> String {
        match self {
            Route::Landing => "/".to_string(),
            Route::Login => "/login".to_string(),
            Route::Signup => "/signup".to_string(),
            Route::ForgotPassword => "/forgot-password".to_string(),
            Route::VerifyEmail => "/verify-email".to_string(),
            Route::Dashboard => "/dashboard".to_string(),
            Route::Profile => "/profile".to_string(),
            Route::Settings => "/settings".to_string(),
            Route::Gantt { team_id } => format!("/gantt/{}", team_id),
            Route::WorkdayTracker => "/workday-tracker".to_string(),
            Route::GetStarted => "/get-started".to_string(),
            Route::Unknown(path) => path.clone(),
        }
    }

    /// The pages an unverified (or signed-out) user may still reach.
    fn allowed_while_unverified(&self) -> bool {
        matches!(
            self,
            Route::Login | Route::Signup | Route::ForgotPassword | Route::VerifyEmail
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    /// Authentication state is still being checked; show the loading screen.
    Loading,
    Render(Route),
    Redirect(Route),
}

/// One gating step for a requested route. Redirect targets themselves resolve
/// further; use [`resolve_terminal`] to follow the chain.
pub fn resolve(gate: &GateState, route: &Route) -> RouteDecision {
    use RouteDecision::{Loading, Redirect, Render};

    if matches!(gate, GateState::CheckingAuth) {
        return Loading;
    }

    // A signed-in but unverified user is forced onto the verification page
    // from anywhere outside the auth pages.
    if matches!(gate, GateState::Unverified) && !route.allowed_while_unverified() {
        return Redirect(Route::VerifyEmail);
    }

    let verified = gate.is_verified();
    match route {
        Route::Login | Route::Signup | Route::GetStarted => {
            if verified {
                Redirect(Route::Dashboard)
            } else {
                Render(route.clone())
            }
        }
        Route::ForgotPassword => Render(Route::ForgotPassword),
        Route::VerifyEmail => {
            if matches!(gate, GateState::Unverified) {
                Render(Route::VerifyEmail)
            } else {
                Redirect(Route::Dashboard)
            }
        }
        Route::Dashboard
        | Route::Profile
        | Route::Settings
        | Route::Gantt { .. }
        | Route::WorkdayTracker => {
            if verified {
                Render(route.clone())
            } else {
                Redirect(Route::Login)
            }
        }
        Route::Landing => {
            if verified {
                Redirect(Route::Dashboard)
            } else {
                Render(Route::Landing)
            }
        }
        Route::Unknown(_) => {
            if verified {
                Redirect(Route::Dashboard)
            } else {
                Redirect(Route::Login)
            }
        }
    }
}

/// Follow redirects until a route renders. Bounded, since every redirect
/// target is itself resolvable and the table has no cycles.
pub fn resolve_terminal(gate: &GateState, route: &Route) -> RouteDecision {
    let mut current = route.clone();
    for _ in 0..5 {
        match resolve(gate, &current) {
            RouteDecision::Redirect(next) => current = next,
            terminal => return terminal,
        }
    }
    RouteDecision::Render(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::Role;

    fn verified() -> GateState {
        GateState::Verified {
            name: "Dana".to_string(),
            role: Some(Role::TeamMember),
            profile_id: Some(42),
        }
    }

    #[test]
    fn test_parse_known_paths() {
        assert_eq!(Route::parse("/"), Route::Landing);
        assert_eq!(Route::parse("/dashboard"), Route::Dashboard);
        assert_eq!(Route::parse("/workday-tracker"), Route::WorkdayTracker);
        assert_eq!(Route::parse("/gantt/17"), Route::Gantt { team_id: 17 });
    }

    #[test]
    fn test_parse_unknown_paths() {
        assert_eq!(
            Route::parse("/nope"),
            Route::Unknown("/nope".to_string())
        );
        assert_eq!(
            Route::parse("/gantt/abc"),
            Route::Unknown("/gantt/abc".to_string())
        );
    }

    #[test]
    fn test_parse_round_trips_path() {
        for path in ["/login", "/signup", "/gantt/3", "/settings"] {
            assert_eq!(Route::parse(path).path(), path);
        }
    }

    #[test]
    fn test_checking_auth_is_loading_everywhere() {
        for route in [Route::Landing, Route::Dashboard, Route::Login] {
            assert_eq!(
                resolve(&GateState::CheckingAuth, &route),
                RouteDecision::Loading
            );
        }
    }

    #[test]
    fn test_unverified_forced_to_verify_email() {
        let gate = GateState::Unverified;
        assert_eq!(
            resolve(&gate, &Route::Dashboard),
            RouteDecision::Redirect(Route::VerifyEmail)
        );
        assert_eq!(
            resolve(&gate, &Route::Landing),
            RouteDecision::Redirect(Route::VerifyEmail)
        );
        // the auth pages stay reachable
        assert_eq!(
            resolve(&gate, &Route::Login),
            RouteDecision::Render(Route::Login)
        );
        assert_eq!(
            resolve(&gate, &Route::VerifyEmail),
            RouteDecision::Render(Route::VerifyEmail)
        );
    }

    #[test]
    fn test_verified_bounced_off_auth_pages() {
        let gate = verified();
        for route in [Route::Login, Route::Signup, Route::GetStarted, Route::VerifyEmail] {
            assert_eq!(
                resolve(&gate, &route),
                RouteDecision::Redirect(Route::Dashboard)
            );
        }
        assert_eq!(
            resolve(&gate, &Route::Dashboard),
            RouteDecision::Render(Route::Dashboard)
        );
        assert_eq!(
            resolve(&gate, &Route::Gantt { team_id: 3 }),
            RouteDecision::Render(Route::Gantt { team_id: 3 })
        );
    }

    #[test]
    fn test_unauthenticated_protected_routes_redirect_to_login() {
        let gate = GateState::Unauthenticated;
        for route in [
            Route::Dashboard,
            Route::Profile,
            Route::Settings,
            Route::WorkdayTracker,
        ] {
            assert_eq!(resolve(&gate, &route), RouteDecision::Redirect(Route::Login));
        }
        assert_eq!(
            resolve(&gate, &Route::Landing),
            RouteDecision::Render(Route::Landing)
        );
    }

    #[test]
    fn test_catch_all_targets_depend_on_gate() {
        let unknown = Route::Unknown("/bogus".to_string());
        assert_eq!(
            resolve(&verified(), &unknown),
            RouteDecision::Redirect(Route::Dashboard)
        );
        assert_eq!(
            resolve(&GateState::Unauthenticated, &unknown),
            RouteDecision::Redirect(Route::Login)
        );
    }

    #[test]
    fn test_forgot_password_always_renders() {
        assert_eq!(
            resolve(&verified(), &Route::ForgotPassword),
            RouteDecision::Render(Route::ForgotPassword)
        );
        assert_eq!(
            resolve(&GateState::Unauthenticated, &Route::ForgotPassword),
            RouteDecision::Render(Route::ForgotPassword)
        );
    }

    #[test]
    fn test_resolve_terminal_follows_redirect_chain() {
        // Signed out, requesting /verify-email: → /dashboard → /login.
        let decision = resolve_terminal(&GateState::Unauthenticated, &Route::VerifyEmail);
        assert_eq!(decision, RouteDecision::Render(Route::Login));
    }
}
