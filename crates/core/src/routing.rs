//! Routing collaborator.
//!
//! The dashboard has six top-level pages. Navigation is a plain side effect with no guards;
//! any unknown path resolves to the not-found page.

use crate::constants::NAVIGATION_HISTORY_CAPACITY;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Mutex;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Destination {
    Dashboard,
    FindTrial,
    Referrals,
    Microhub,
    ManageTrials,
    Settings,
}

impl Destination {
    pub const ALL: [Destination; 6] = [
        Destination::Dashboard,
        Destination::FindTrial,
        Destination::Referrals,
        Destination::Microhub,
        Destination::ManageTrials,
        Destination::Settings,
    ];

    pub fn path(&self) -> &'static str {
        match self {
            Destination::Dashboard => "/",
            Destination::FindTrial => "/find-trial",
            Destination::Referrals => "/referrals",
            Destination::Microhub => "/microhub",
            Destination::ManageTrials => "/manage-trials",
            Destination::Settings => "/settings",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Destination::Dashboard => "Dashboard",
            Destination::FindTrial => "Find a Trial",
            Destination::Referrals => "Referrals",
            Destination::Microhub => "Microhub",
            Destination::ManageTrials => "Manage Trials",
            Destination::Settings => "Settings",
        }
    }

    pub fn from_path(path: &str) -> Option<Destination> {
        let normalised = match path.trim() {
            "" | "/" => "/",
            other => other.trim_end_matches('/'),
        };
        Self::ALL.into_iter().find(|d| d.path() == normalised)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Route {
    Page { destination: Destination },
    NotFound { path: String },
}

/// Resolves a path to the page it shows.
pub fn resolve(path: &str) -> Route {
    match Destination::from_path(path) {
        Some(destination) => Route::Page { destination },
        None => Route::NotFound {
            path: path.to_string(),
        },
    }
}

pub trait Navigator: Send + Sync {
    fn navigate(&self, path: &str) -> Route;
    fn current(&self) -> Route;
}

/// Navigator that remembers recently visited routes, starting at the dashboard.
///
/// At most `capacity` routes are kept; the oldest is forgotten first.
#[derive(Debug)]
pub struct HistoryNavigator {
    history: Mutex<VecDeque<Route>>,
    capacity: usize,
}

impl Default for HistoryNavigator {
    fn default() -> Self {
        Self::with_capacity(NAVIGATION_HISTORY_CAPACITY)
    }
}

impl HistoryNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let mut history = VecDeque::with_capacity(capacity);
        history.push_back(Route::Page {
            destination: Destination::Dashboard,
        });
        Self {
            history: Mutex::new(history),
            capacity,
        }
    }

    pub fn history(&self) -> Vec<Route> {
        self.history
            .lock()
            .map(|h| h.iter().cloned().collect())
            .unwrap_or_default()
    }
}

impl Navigator for HistoryNavigator {
    fn navigate(&self, path: &str) -> Route {
        let route = resolve(path);
        tracing::debug!(?route, "navigate");
        if let Ok(mut history) = self.history.lock() {
            if history.len() == self.capacity {
                history.pop_front();
            }
            history.push_back(route.clone());
        }
        route
    }

    fn current(&self) -> Route {
        self.history
            .lock()
            .ok()
            .and_then(|h| h.back().cloned())
            .unwrap_or(Route::Page {
                destination: Destination::Dashboard,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_six_destinations_resolve() {
        for destination in Destination::ALL {
            assert_eq!(resolve(destination.path()), Route::Page { destination });
        }
    }

    #[test]
    fn test_trailing_slash_is_ignored() {
        assert_eq!(
            Destination::from_path("/find-trial/"),
            Some(Destination::FindTrial)
        );
        assert_eq!(Destination::from_path(""), Some(Destination::Dashboard));
    }

    #[test]
    fn test_unknown_path_is_not_found() {
        assert_eq!(
            resolve("/billing"),
            Route::NotFound {
                path: "/billing".into()
            }
        );
    }

    #[test]
    fn test_navigator_records_history() {
        let navigator = HistoryNavigator::new();
        navigator.navigate("/referrals");
        navigator.navigate("/nowhere");

        assert_eq!(navigator.history().len(), 3);
        assert!(matches!(navigator.current(), Route::NotFound { .. }));
    }

    #[test]
    fn test_history_is_capped() {
        let navigator = HistoryNavigator::with_capacity(2);
        navigator.navigate("/referrals");
        navigator.navigate("/settings");
        navigator.navigate("/microhub");

        assert_eq!(
            navigator.history(),
            vec![
                Route::Page {
                    destination: Destination::Settings
                },
                Route::Page {
                    destination: Destination::Microhub
                },
            ]
        );
        assert_eq!(
            navigator.current(),
            Route::Page {
                destination: Destination::Microhub
            }
        );
    }
}
