//! Match criteria used to select hooks for a transition.
//!
//! A matcher is either a glob over dot separated state names or a pure
//! predicate over the state itself. Both are evaluated without side effects.

use super::state::{Environment, State};
use std::fmt;
use std::sync::Arc;

/// Pure predicate over a registered state.
pub type StatePredicate<Env> = Arc<dyn Fn(&State<Env>) -> bool + Send + Sync>;

/// Selects states by name pattern or by predicate.
///
/// Glob patterns match dot separated segments: `*` matches exactly one
/// segment and `**` matches any number of segments, including none.
///
/// # Example
///
/// ```rust
/// use waypoint::core::StateMatcher;
///
/// let matcher: StateMatcher = StateMatcher::glob("admin.**");
/// assert!(matcher.matches_name("admin"));
/// assert!(matcher.matches_name("admin.users.detail"));
/// assert!(!matcher.matches_name("public"));
/// ```
pub enum StateMatcher<Env: Environment = ()> {
    Glob(String),
    Predicate(StatePredicate<Env>),
}

impl<Env: Environment> StateMatcher<Env> {
    pub fn glob(pattern: impl Into<String>) -> Self {
        StateMatcher::Glob(pattern.into())
    }

    pub fn predicate<F>(predicate: F) -> Self
    where
        F: Fn(&State<Env>) -> bool + Send + Sync + 'static,
    {
        StateMatcher::Predicate(Arc::new(predicate))
    }

    /// Name-only check. Predicates cannot be evaluated without a state.
    pub fn matches_name(&self, name: &str) -> bool {
        match self {
            StateMatcher::Glob(pattern) => glob_matches(pattern, name),
            StateMatcher::Predicate(_) => false,
        }
    }

    pub fn matches(&self, state: &State<Env>) -> bool {
        match self {
            StateMatcher::Glob(pattern) => glob_matches(pattern, state.name()),
            StateMatcher::Predicate(predicate) => predicate(state),
        }
    }
}

impl<Env: Environment> Clone for StateMatcher<Env> {
    fn clone(&self) -> Self {
        match self {
            StateMatcher::Glob(pattern) => StateMatcher::Glob(pattern.clone()),
            StateMatcher::Predicate(predicate) => StateMatcher::Predicate(Arc::clone(predicate)),
        }
    }
}

impl<Env: Environment> fmt::Debug for StateMatcher<Env> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateMatcher::Glob(pattern) => f.debug_tuple("Glob").field(pattern).finish(),
            StateMatcher::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

impl<Env: Environment> From<&str> for StateMatcher<Env> {
    fn from(pattern: &str) -> Self {
        StateMatcher::glob(pattern)
    }
}

impl<Env: Environment> From<String> for StateMatcher<Env> {
    fn from(pattern: String) -> Self {
        StateMatcher::glob(pattern)
    }
}

fn glob_matches(pattern: &str, name: &str) -> bool {
    if !pattern.contains('*') {
        return pattern == name;
    }
    let pattern: Vec<&str> = pattern.split('.').collect();
    let name: Vec<&str> = if name.is_empty() {
        Vec::new()
    } else {
        name.split('.').collect()
    };
    segments_match(&pattern, &name)
}

fn segments_match(pattern: &[&str], name: &[&str]) -> bool {
    match pattern.split_first() {
        None => name.is_empty(),
        Some((&"**", rest)) => (0..=name.len()).any(|skip| segments_match(rest, &name[skip..])),
        Some((&segment, rest)) => match name.split_first() {
            Some((&head, tail)) => (segment == "*" || segment == head) && segments_match(rest, tail),
            None => false,
        },
    }
}

/// `{to, from}` criteria a hook registers with.
///
/// An absent side matches anything. A present side never matches a missing
/// state (e.g. the `from` side of the very first transition).
pub struct MatchCriteria<Env: Environment = ()> {
    pub to: Option<StateMatcher<Env>>,
    pub from: Option<StateMatcher<Env>>,
}

impl<Env: Environment> MatchCriteria<Env> {
    /// Criteria that match every transition.
    pub fn any() -> Self {
        Self { to: None, from: None }
    }

    pub fn to(mut self, matcher: impl Into<StateMatcher<Env>>) -> Self {
        self.to = Some(matcher.into());
        self
    }

    pub fn from(mut self, matcher: impl Into<StateMatcher<Env>>) -> Self {
        self.from = Some(matcher.into());
        self
    }

    pub fn matches(&self, to: Option<&State<Env>>, from: Option<&State<Env>>) -> bool {
        side_matches(self.to.as_ref(), to) && side_matches(self.from.as_ref(), from)
    }
}

fn side_matches<Env: Environment>(
    matcher: Option<&StateMatcher<Env>>,
    state: Option<&State<Env>>,
) -> bool {
    match (matcher, state) {
        (None, _) => true,
        (Some(matcher), Some(state)) => matcher.matches(state),
        (Some(_), None) => false,
    }
}

impl<Env: Environment> Default for MatchCriteria<Env> {
    fn default() -> Self {
        Self::any()
    }
}

impl<Env: Environment> Clone for MatchCriteria<Env> {
    fn clone(&self) -> Self {
        Self {
            to: self.to.clone(),
            from: self.from.clone(),
        }
    }
}

impl<Env: Environment> fmt::Debug for MatchCriteria<Env> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MatchCriteria")
            .field("to", &self.to)
            .field("from", &self.from)
            .finish()
    }
}
