//! Webhook subscription filters.

use gofer_core::events::WebhookEvent;
use gofer_core::{Error, Result};
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::LazyLock;

/// Action tag meaning "match any action".
pub const ANY_ACTION: &str = "any";

static REPOSITORY_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^/\s]+/[^/\s]+$").expect("repository pattern is valid"));

/// A repository full name in `owner/name` form.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Repository(String);

impl Repository {
    pub fn new(value: impl AsRef<str>) -> Result<Self> {
        let value = value.as_ref().trim();
        if !REPOSITORY_PATTERN.is_match(value) {
            return Err(Error::InvalidRepository(value.to_string()));
        }
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Repository {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

/// An event name plus the set of action tags it admits.
///
/// Actions are lowercased and never empty; an empty set is stored as
/// `{"any"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventFilter {
    pub event: WebhookEvent,
    pub actions: BTreeSet<String>,
}

impl EventFilter {
    pub fn new<I, S>(event: WebhookEvent, actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut actions: BTreeSet<String> = actions
            .into_iter()
            .map(|a| a.as_ref().trim().to_lowercase())
            .filter(|a| !a.is_empty())
            .collect();
        if actions.is_empty() {
            actions.insert(ANY_ACTION.to_string());
        }
        Self { event, actions }
    }

    /// True when `action` satisfies this filter.
    ///
    /// A missing or empty action matches on event and repository alone.
    pub fn admits(&self, action: Option<&str>) -> bool {
        let action = match action.map(str::trim) {
            Some(a) if !a.is_empty() => a.to_lowercase(),
            _ => return true,
        };
        self.actions.contains(ANY_ACTION) || self.actions.contains(&action)
    }

    pub fn matches_any_action(&self) -> bool {
        self.actions.contains(ANY_ACTION)
    }
}

impl fmt::Display for EventFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.matches_any_action() && self.actions.len() == 1 {
            return f.write_str(self.event.as_str());
        }
        let actions: Vec<&str> = self.actions.iter().map(String::as_str).collect();
        write!(f, "{}:{}", self.event, actions.join(","))
    }
}

/// Parse `<event>[:<action>[,<action>...]]`.
pub fn parse_event_filter(input: &str) -> Result<EventFilter> {
    let input = input.trim();
    let (event, actions) = match input.split_once(':') {
        Some((event, actions)) => (event, actions),
        None => (input, ""),
    };

    let event: WebhookEvent = event.trim().to_lowercase().parse()?;
    Ok(EventFilter::new(event, actions.split(',')))
}
