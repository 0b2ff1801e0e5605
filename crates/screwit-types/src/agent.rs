//! Capability toggles offered by the prompt box.
//!
//! A capability is one of the four optional external lookups the planner can
//! use. The UI sends an arbitrary list of [`AgentOption`]s; sessions persist
//! them as a fixed [`CapabilityFlags`] record.

use serde::{Deserialize, Serialize};

/// The fixed set of lookup capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Retail product search.
    Amazon,
    /// Grocery sourcing.
    Instacart,
    /// Restaurant and catering search.
    Restaurants,
    /// Historical campus events.
    Events,
}

impl Capability {
    pub const ALL: [Capability; 4] = [
        Capability::Amazon,
        Capability::Instacart,
        Capability::Restaurants,
        Capability::Events,
    ];

    /// Key used for option ids and the persisted flag record.
    pub fn key(&self) -> &'static str {
        match self {
            Capability::Amazon => "amazon",
            Capability::Instacart => "instacart",
            Capability::Restaurants => "restaurants",
            Capability::Events => "events",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|cap| cap.key() == key)
    }

    pub fn title(&self) -> &'static str {
        match self {
            Capability::Amazon => "Amazon Product Search",
            Capability::Instacart => "Instacart Grocery Delivery",
            Capability::Restaurants => "Local Restaurant Scanning",
            Capability::Events => "Dartmouth Event Inspiration",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Capability::Amazon => {
                "Searches Amazon's vast marketplace for event supplies, decorations, and equipment"
            }
            Capability::Instacart => {
                "Sources fresh groceries, snacks, and beverages from local stores near Dartmouth"
            }
            Capability::Restaurants => {
                "Analyzes menus from restaurants and catering services in the Dartmouth area"
            }
            Capability::Events => {
                "Draws insights from successful past events and traditions at Dartmouth College"
            }
        }
    }
}

/// Per-session record of which capabilities are enabled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CapabilityFlags {
    pub amazon: bool,
    pub instacart: bool,
    pub restaurants: bool,
    pub events: bool,
}

impl CapabilityFlags {
    pub fn get(&self, capability: Capability) -> bool {
        match capability {
            Capability::Amazon => self.amazon,
            Capability::Instacart => self.instacart,
            Capability::Restaurants => self.restaurants,
            Capability::Events => self.events,
        }
    }

    pub fn set(&mut self, capability: Capability, enabled: bool) {
        let slot = match capability {
            Capability::Amazon => &mut self.amazon,
            Capability::Instacart => &mut self.instacart,
            Capability::Restaurants => &mut self.restaurants,
            Capability::Events => &mut self.events,
        };
        *slot = enabled;
    }

    /// Enabled capabilities in catalogue order.
    pub fn enabled(&self) -> impl Iterator<Item = Capability> + '_ {
        Capability::ALL.into_iter().filter(|cap| self.get(*cap))
    }
}

/// A capability toggle as presented in the prompt box.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentOption {
    /// Capability key; unknown ids are carried but ignored by normalisation.
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub enabled: bool,
}

impl AgentOption {
    pub fn from_capability(capability: Capability, enabled: bool) -> Self {
        Self {
            id: capability.key().to_string(),
            title: capability.title().to_string(),
            description: capability.description().to_string(),
            enabled,
        }
    }

    pub fn capability(&self) -> Option<Capability> {
        Capability::from_key(&self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_keys_round_trip() {
        for cap in Capability::ALL {
            assert_eq!(Capability::from_key(cap.key()), Some(cap));
        }
        assert_eq!(Capability::from_key("uber"), None);
    }

    #[test]
    fn test_flags_set_and_enabled() {
        let mut flags = CapabilityFlags::default();
        flags.set(Capability::Events, true);
        flags.set(Capability::Amazon, true);

        let enabled: Vec<_> = flags.enabled().collect();
        assert_eq!(enabled, vec![Capability::Amazon, Capability::Events]);
        assert!(!flags.get(Capability::Instacart));
    }

    #[test]
    fn test_option_from_capability() {
        let option = AgentOption::from_capability(Capability::Restaurants, true);
        assert_eq!(option.id, "restaurants");
        assert_eq!(option.title, "Local Restaurant Scanning");
        assert_eq!(option.capability(), Some(Capability::Restaurants));
    }
}
