use crate::error::{Result, WagerError};
use nftango_core::{AssetRef, Identity};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Who may resolve the outcome of a game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RefereePolicy {
    Anyone,
    Creator,
    Designated(Identity),
}

impl RefereePolicy {
    pub fn permits(&self, caller: &Identity, creator: &Identity) -> bool {
        match self {
            RefereePolicy::Anyone => true,
            RefereePolicy::Creator => caller == creator,
            RefereePolicy::Designated(referee) => caller == referee,
        }
    }
}

/// Which collections an opponent's deposit may be drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollectionPolicy {
    /// Every deposit comes from the stake's collection.
    MatchStake,
    /// Every deposit comes from one collection, whichever it is.
    Uniform,
    Any,
}

impl CollectionPolicy {
    /// Number of distinct deposits that count towards a join requirement.
    /// Under `Uniform` only the largest single-collection group counts.
    pub fn eligible_count(&self, stake: &AssetRef, deposits: &[AssetRef]) -> usize {
        let distinct: HashSet<&AssetRef> = deposits.iter().collect();
        match self {
            CollectionPolicy::MatchStake => distinct
                .iter()
                .filter(|asset| asset.collection == stake.collection)
                .count(),
            CollectionPolicy::Uniform => {
                let mut per_collection: HashMap<&str, usize> = HashMap::new();
                for asset in &distinct {
                    *per_collection.entry(asset.collection.as_str()).or_default() += 1;
                }
                per_collection.into_values().max().unwrap_or(0)
            }
            CollectionPolicy::Any => distinct.len(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Identity the registry uses when pulling stakes into escrow. Players
    /// approve this identity on the custody service.
    pub operator: Identity,
    pub referee: RefereePolicy,
    pub collections: CollectionPolicy,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            operator: Identity::from("nftango:registry"),
            referee: RefereePolicy::Anyone,
            collections: CollectionPolicy::MatchStake,
        }
    }
}

impl RegistryConfig {
    pub fn new(operator: impl Into<Identity>) -> Self {
        Self {
            operator: operator.into(),
            ..Self::default()
        }
    }

    pub fn with_referee(mut self, referee: RefereePolicy) -> Self {
        self.referee = referee;
        self
    }

    pub fn with_collections(mut self, collections: CollectionPolicy) -> Self {
        self.collections = collections;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.operator.as_str().is_empty() {
            return Err(WagerError::config("Registry operator cannot be empty"));
        }

        if self.operator.as_str().starts_with("escrow:") {
            return Err(WagerError::config(
                "Registry operator cannot use the escrow namespace",
            ));
        }

        if let RefereePolicy::Designated(referee) = &self.referee {
            if referee.as_str().is_empty() {
                return Err(WagerError::config("Designated referee cannot be empty"));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = RegistryConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.referee, RefereePolicy::Anyone);
        assert_eq!(config.collections, CollectionPolicy::MatchStake);
    }

    #[test]
    fn test_invalid_operators() {
        assert!(RegistryConfig::new("").validate().is_err());
        assert!(RegistryConfig::new("escrow:1234").validate().is_err());
        assert!(RegistryConfig::default()
            .with_referee(RefereePolicy::Designated(Identity::from("")))
            .validate()
            .is_err());
    }

    #[test]
    fn test_referee_policy() {
        let creator = Identity::from("alice");
        let referee = Identity::from("ref");

        assert!(RefereePolicy::Anyone.permits(&referee, &creator));
        assert!(RefereePolicy::Creator.permits(&creator, &creator));
        assert!(!RefereePolicy::Creator.permits(&referee, &creator));

        let designated = RefereePolicy::Designated(referee.clone());
        assert!(designated.permits(&referee, &creator));
        assert!(!designated.permits(&creator, &creator));
    }

    #[test]
    fn test_collection_policy() {
        let stake = AssetRef::new("punks", 1);
        let same = vec![AssetRef::new("punks", 2), AssetRef::new("punks", 3)];
        let other = vec![AssetRef::new("apes", 2), AssetRef::new("apes", 3)];
        let mixed = vec![AssetRef::new("punks", 2), AssetRef::new("apes", 3)];

        let twice = vec![AssetRef::new("punks", 2), AssetRef::new("punks", 2)];

        assert_eq!(CollectionPolicy::MatchStake.eligible_count(&stake, &same), 2);
        assert_eq!(CollectionPolicy::MatchStake.eligible_count(&stake, &other), 0);
        assert_eq!(CollectionPolicy::MatchStake.eligible_count(&stake, &mixed), 1);
        assert_eq!(CollectionPolicy::Uniform.eligible_count(&stake, &other), 2);
        assert_eq!(CollectionPolicy::Uniform.eligible_count(&stake, &mixed), 1);
        assert_eq!(CollectionPolicy::Any.eligible_count(&stake, &mixed), 2);
        assert_eq!(CollectionPolicy::Any.eligible_count(&stake, &twice), 1);
        assert_eq!(CollectionPolicy::Uniform.eligible_count(&stake, &[]), 0);
    }

    #[test]
    fn test_config_roundtrips_through_json() {
        let config = RegistryConfig::new("house")
            .with_referee(RefereePolicy::Designated(Identity::from("ref")))
            .with_collections(CollectionPolicy::Uniform);

        let json = serde_json::to_string(&config).unwrap();
        let restored: RegistryConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.operator, Identity::from("house"));
        assert_eq!(restored.referee, config.referee);
        assert_eq!(restored.collections, CollectionPolicy::Uniform);
    }
}
