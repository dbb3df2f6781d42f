use crate::session::Session;

pub const DEFAULT_SIGN_IN_ROUTE: &str = "/sign-in";
pub const DEFAULT_LANDING_ROUTE: &str = "/setup";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Unchecked,
    Authenticated,
    Unauthenticated,
}

impl GateState {
    #[must_use]
    pub fn from_session(checked: bool, session: &Session) -> Self {
        match (checked, session.is_authenticated()) {
            (false, _) => Self::Unchecked,
            (true, true) => Self::Authenticated,
            (true, false) => Self::Unauthenticated,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Public,
    Protected,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Loading,
    Render,
    /// Render nothing; navigation to the route has been requested.
    Redirect(String),
}

/// Host-side navigation. `replace` swaps the current history entry.
pub trait Navigator {
    fn replace(&mut self, route: &str);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessGate {
    public_prefixes: Vec<String>,
    sign_in_route: String,
    landing_route: String,
    last_redirect: Option<(String, String)>,
}

impl Default for AccessGate {
    fn default() -> Self {
        Self::new(
            vec![DEFAULT_SIGN_IN_ROUTE.to_string()],
            DEFAULT_SIGN_IN_ROUTE,
            DEFAULT_LANDING_ROUTE,
        )
    }
}

impl AccessGate {
    #[must_use]
    pub fn new(
        public_prefixes: Vec<String>,
        sign_in_route: impl Into<String>,
        landing_route: impl Into<String>,
    ) -> Self {
        Self {
            public_prefixes,
            sign_in_route: sign_in_route.into(),
            landing_route: landing_route.into(),
            last_redirect: None,
        }
    }

    #[must_use]
    pub fn visibility(&self, path: &str) -> Visibility {
        if self
            .public_prefixes
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
        {
            Visibility::Public
        } else {
            Visibility::Protected
        }
    }

    /// Pure policy: what to show for `path` in `state`.
    #[must_use]
    pub fn decide(&self, path: &str, state: GateState) -> GateDecision {
        match (state, self.visibility(path)) {
            (GateState::Unchecked, _) => GateDecision::Loading,
            (GateState::Authenticated, Visibility::Public) => {
                GateDecision::Redirect(self.landing_route.clone())
            }
            (GateState::Unauthenticated, Visibility::Protected) => {
                GateDecision::Redirect(self.sign_in_route.clone())
            }
            _ => GateDecision::Render,
        }
    }

    /// Applies [`Self::decide`] and requests navigation for a redirect. The same
    /// redirect from the same path is requested only once, so re-evaluating
    /// after unrelated state changes does not repeat the navigation.
    pub fn evaluate(
        &mut self,
        path: &str,
        state: GateState,
        navigator: &mut impl Navigator,
    ) -> GateDecision {
        let decision = self.decide(path, state);
        match &decision {
            GateDecision::Redirect(target) => {
                let key = (path.to_string(), target.clone());
                if self.last_redirect.as_ref() != Some(&key) {
                    tracing::debug!(from = path, to = %target, "access gate redirect");
                    navigator.replace(target.as_str());
                    self.last_redirect = Some(key);
                }
            }
            GateDecision::Render => self.last_redirect = None,
            GateDecision::Loading => {}
        }
        decision
    }
}
