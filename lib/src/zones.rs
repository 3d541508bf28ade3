// Conflict-Zone Checker.
//
// Regions match by exact equality after trimming surrounding whitespace
// and Unicode lower-casing. There is no prefix, substring or locale
// aware matching, and the optional country is informational only.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

const COMMITMENT_DOMAIN: &[u8] = b"product-passport/conflict-zones/v1";

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ConflictZone {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    pub region: String,
}

/// Ordered list of disqualifying regions.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ConflictZoneList {
    pub zones: Vec<ConflictZone>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneStatus {
    Clear,
    Flagged,
}

impl ConflictZoneList {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_regions<I, S>(regions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            zones: regions
                .into_iter()
                .map(|region| ConflictZone {
                    country: None,
                    region: region.into(),
                })
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    /// `Clear` if `region` is absent from the list. Total: an empty list
    /// clears every region.
    pub fn check(&self, region: &str) -> ZoneStatus {
        let region = normalize_region(region);
        if self
            .zones
            .iter()
            .any(|zone| normalize_region(&zone.region) == region)
        {
            ZoneStatus::Flagged
        } else {
            ZoneStatus::Clear
        }
    }

    /// Normalized, sorted, de-duplicated region identifiers.
    pub fn normalized_regions(&self) -> BTreeSet<String> {
        self.zones
            .iter()
            .map(|zone| normalize_region(&zone.region))
            .collect()
    }

    /// Commitment to the normalized region set.
    pub fn commitment(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(COMMITMENT_DOMAIN);
        for region in self.normalized_regions() {
            hasher.update((region.len() as u64).to_le_bytes());
            hasher.update(region.as_bytes());
        }
        hasher.finalize().into()
    }
}

pub fn normalize_region(region: &str) -> String {
    region.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn normalization_ignores_case_and_padding() {
        let list = ConflictZoneList::from_regions(["Cornwall"]);
        assert_eq!(list.check(" cornwall "), ZoneStatus::Flagged);
        assert_eq!(list.check("CORNWALL\t"), ZoneStatus::Flagged);
    }

    #[test]
    fn no_substring_matching() {
        let list = ConflictZoneList::from_regions(["Darfur"]);
        assert_eq!(list.check("North Darfur"), ZoneStatus::Clear);
        assert_eq!(list.check("Darf"), ZoneStatus::Clear);
    }

    #[test]
    fn empty_list_clears_everything() {
        let list = ConflictZoneList::default();
        assert_eq!(list.check("Cornwall"), ZoneStatus::Clear);
        assert_eq!(list.check(""), ZoneStatus::Clear);
    }

    #[test]
    fn parses_zone_file() {
        let json = r#"{"zones":[{"country":"UA","region":"Donetsk"},{"region":"Darfur"}]}"#;
        let list = ConflictZoneList::from_json(json).unwrap();
        assert_eq!(list.zones.len(), 2);
        assert_eq!(list.zones[0].country.as_deref(), Some("UA"));
        assert_eq!(list.check("donetsk"), ZoneStatus::Flagged);
        assert_eq!(list.check("Cornwall"), ZoneStatus::Clear);

        assert!(ConflictZoneList::from_json(r#"{"zones":[{"area":"x"}]}"#).is_err());
    }

    #[test]
    fn commitment_depends_only_on_region_set() {
        let a = ConflictZoneList::from_regions(["Donetsk", "Darfur"]);
        let b = ConflictZoneList::from_regions([" darfur", "DONETSK", "Darfur"]);
        let c = ConflictZoneList::from_regions(["Donetsk"]);
        assert_eq!(a.commitment(), b.commitment());
        assert_ne!(a.commitment(), c.commitment());
        assert_ne!(
            ConflictZoneList::default().commitment(),
            ConflictZoneList::from_regions([""]).commitment()
        );
    }

    proptest! {
        #[test]
        fn padded_and_recased_regions_match(
            region in "[A-Za-z][A-Za-z -]{0,20}[A-Za-z]",
            left in "[ \t]{0,3}",
            right in "[ \t]{0,3}",
        ) {
            let list = ConflictZoneList::from_regions([region.clone()]);
            let candidate = format!("{left}{}{right}", region.to_uppercase());
            prop_assert_eq!(list.check(&candidate), ZoneStatus::Flagged);
        }

        #[test]
        fn commitment_ignores_order(regions in proptest::collection::vec("[a-z]{1,8}", 0..6)) {
            let mut reversed = regions.clone();
            reversed.reverse();
            prop_assert_eq!(
                ConflictZoneList::from_regions(regions).commitment(),
                ConflictZoneList::from_regions(reversed).commitment()
            );
        }
    }
}
