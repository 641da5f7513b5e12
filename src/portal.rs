//! Portal access resolution.
//!
//! Access rows come straight from the database with an untyped
//! `portal_type` column. Everything here treats them as untrusted: rows that
//! don't name a known portal are dropped without error, since the table holds
//! legacy and partially written records.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PortalType {
    Client,
    Team,
}

impl PortalType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PortalType::Client => "client",
            PortalType::Team => "team",
        }
    }

    // Exact, case-sensitive match only
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "client" => Some(PortalType::Client),
            "team" => Some(PortalType::Team),
            _ => None,
        }
    }
}

/// Keeps the rows whose `portal_type` is exactly `"client"` or `"team"`.
///
/// Order is preserved and duplicates are kept. `None` behaves like an empty
/// slice.
pub fn normalize_portal_types(rows: Option<&[Value]>) -> Vec<PortalType> {
    rows.unwrap_or_default()
        .iter()
        .filter_map(|row| row.get("portal_type")?.as_str())
        .filter_map(PortalType::parse)
        .collect()
}

pub fn has_client_portal(portals: &[PortalType]) -> bool {
    portals.contains(&PortalType::Client)
}

pub fn has_team_portal(portals: &[PortalType]) -> bool {
    portals.contains(&PortalType::Team)
}

/// Client access is granted explicitly, or by default when the identity has
/// no access rows at all yet.
pub fn can_access_client_portal(portals: &[PortalType]) -> bool {
    PortalPolicy::default().can_access(PortalType::Client, portals)
}

/// Which portal wins the landing page when an identity has both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LandingPreference {
    #[default]
    ClientFirst,
    TeamFirst,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortalPolicy {
    /// Portal an identity without any access rows may enter.
    pub default_portal_when_unset: PortalType,
    pub landing: LandingPreference,
}

impl Default for PortalPolicy {
    fn default() -> Self {
        Self {
            default_portal_when_unset: PortalType::Client,
            landing: LandingPreference::ClientFirst,
        }
    }
}

/// Typed access decision for one identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortalAccess {
    pub portals: Vec<PortalType>,
    pub client: bool,
    pub team: bool,
    pub landing: PortalType,
}

impl PortalPolicy {
    pub fn can_access(&self, portal: PortalType, portals: &[PortalType]) -> bool {
        if portals.is_empty() {
            return portal == self.default_portal_when_unset;
        }
        portals.contains(&portal)
    }

    pub fn landing_portal(&self, portals: &[PortalType]) -> PortalType {
        match (has_client_portal(portals), has_team_portal(portals)) {
            (false, false) => self.default_portal_when_unset,
            (true, false) => PortalType::Client,
            (false, true) => PortalType::Team,
            (true, true) => match self.landing {
                LandingPreference::ClientFirst => PortalType::Client,
                LandingPreference::TeamFirst => PortalType::Team,
            },
        }
    }

    pub fn resolve(&self, rows: Option<&[Value]>) -> PortalAccess {
        let portals = normalize_portal_types(rows);
        PortalAccess {
            client: self.can_access(PortalType::Client, &portals),
            team: self.can_access(PortalType::Team, &portals),
            landing: self.landing_portal(&portals),
            portals,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use super::PortalType::{Client, Team};

    #[test]
    fn keeps_only_valid_portal_types_in_order() {
        let rows = vec![
            json!({"portal_type": "client"}),
            json!({"portal_type": "bogus"}),
            json!({"portal_type": "team"}),
            json!({"portal_type": null}),
        ];
        assert_eq!(normalize_portal_types(Some(rows.as_slice())), vec![Client, Team]);
    }

    #[test]
    fn drops_malformed_rows() {
        let rows = vec![
            json!({"portal_type": "Client"}),
            json!({"portal_type": " team"}),
            json!({"portal_type": 1}),
            json!({"portal_type": ["client"]}),
            json!({"portal_type": {"kind": "team"}}),
            json!({"other": "client"}),
            json!("client"),
            json!(null),
            json!({"portal_type": "team", "extra": true}),
        ];
        assert_eq!(normalize_portal_types(Some(rows.as_slice())), vec![Team]);
    }

    #[test]
    fn missing_or_empty_rows_give_nothing() {
        assert!(normalize_portal_types(None).is_empty());
        assert!(normalize_portal_types(Some(&[][..])).is_empty());
    }

    #[test]
    fn duplicates_are_kept() {
        let rows = vec![
            json!({"portal_type": "team"}),
            json!({"portal_type": "client"}),
            json!({"portal_type": "team"}),
        ];
        assert_eq!(normalize_portal_types(Some(rows.as_slice())), vec![Team, Client, Team]);
    }

    #[test]
    fn normalizing_twice_gives_same_output() {
        let rows = vec![json!({"portal_type": "team"}), json!({"portal_type": 7})];
        assert_eq!(
            normalize_portal_types(Some(rows.as_slice())),
            normalize_portal_types(Some(rows.as_slice()))
        );
    }

    #[test]
    fn membership_helpers() {
        assert!(has_client_portal(&[Team, Client]));
        assert!(!has_client_portal(&[Team]));
        assert!(has_team_portal(&[Team]));
        assert!(!has_team_portal(&[]));
    }

    #[test]
    fn client_access_defaults_when_unset() {
        assert!(can_access_client_portal(&[]));
        assert!(!can_access_client_portal(&[Team]));
        assert!(can_access_client_portal(&[Client, Team]));
        assert!(can_access_client_portal(&[Client]));
    }

    #[test]
    fn team_is_never_granted_by_default() {
        let policy = PortalPolicy::default();
        assert!(!policy.can_access(Team, &[]));
        assert!(policy.can_access(Team, &[Client, Team]));
    }

    #[test]
    fn default_portal_is_configurable() {
        let policy = PortalPolicy {
            default_portal_when_unset: Team,
            ..PortalPolicy::default()
        };
        assert!(policy.can_access(Team, &[]));
        assert!(!policy.can_access(Client, &[]));
        assert_eq!(policy.landing_portal(&[]), Team);
    }

    #[test]
    fn landing_follows_preference_only_when_both_present() {
        let client_first = PortalPolicy::default();
        let team_first = PortalPolicy {
            landing: LandingPreference::TeamFirst,
            ..PortalPolicy::default()
        };

        assert_eq!(client_first.landing_portal(&[Team, Client]), Client);
        assert_eq!(team_first.landing_portal(&[Client, Team]), Team);
        assert_eq!(team_first.landing_portal(&[Client]), Client);
        assert_eq!(client_first.landing_portal(&[Team]), Team);
        assert_eq!(team_first.landing_portal(&[]), Client);
    }

    #[test]
    fn resolve_builds_full_decision() {
        let rows = vec![json!({"portal_type": "team"}), json!({"portal_type": "legacy"})];
        let access = PortalPolicy::default().resolve(Some(rows.as_slice()));
        assert_eq!(
            access,
            PortalAccess {
                portals: vec![Team],
                client: false,
                team: true,
                landing: Team,
            }
        );

        let fresh = PortalPolicy::default().resolve(None);
        assert!(fresh.client);
        assert!(!fresh.team);
        assert_eq!(fresh.landing, Client);
    }

    #[test]
    fn portal_type_wire_names() {
        assert_eq!(serde_json::to_value(Client).unwrap(), json!("client"));
        assert_eq!(Team.as_str(), "team");
        assert_eq!(PortalType::parse("TEAM"), None);
    }
}
