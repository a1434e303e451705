//! PvP ranking diagnostics. Purely informational; never affects matching.

use std::collections::BTreeMap;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::lookup::NameTable;
use crate::model::{Encounter, EntityId};

/// Highest rank that is reported.
pub const TOP_RANK: i32 = 10;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RankEntry {
    pub pokemon: EntityId,
    #[serde(default)]
    pub form: Option<u32>,
    #[serde(default)]
    pub cp: Option<u32>,
    pub rank: i32,
    #[serde(default)]
    pub percentage: f64,
    #[serde(default)]
    pub level: f64,
}

/// League name to ranking entries.
pub type Rankings = BTreeMap<String, Vec<RankEntry>>;

/// Entries ranked at or above [`TOP_RANK`], by league.
pub fn top_ranked(blob: &str) -> Result<Vec<(String, RankEntry)>, serde_json::Error> {
    let rankings: Rankings = serde_json::from_str(blob)?;
    Ok(rankings
        .into_iter()
        .flat_map(|(league, entries)| {
            entries
                .into_iter()
                .filter(|entry| entry.rank <= TOP_RANK)
                .map(move |entry| (league.clone(), entry))
        })
        .collect())
}

/// Emit a debug event per top-ranked entry. Malformed blobs are logged and
/// ignored.
pub(crate) fn log_top_ranks(names: &NameTable, encounter: &Encounter) {
    let Some(blob) = encounter.pvp.as_deref().filter(|b| !b.is_empty()) else {
        return;
    };

    match top_ranked(blob) {
        Ok(entries) => {
            for (league, entry) in entries {
                debug!(
                    encounter_id = %encounter.id,
                    league = %league,
                    pokemon = %names.entity_name(entry.pokemon, "en"),
                    cp = entry.cp.unwrap_or(0),
                    rank = entry.rank,
                    percentage = entry.percentage,
                    level = entry.level,
                    "Top ranked PvP encounter"
                );
            }
        }
        Err(e) => {
            warn!(encounter_id = %encounter.id, error = %e, "Failed to decode PvP data");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_only_top_ten() {
        let blob = r#"{
            "great": [
                {"pokemon": 16, "cp": 1480, "rank": 3, "percentage": 0.99, "level": 40.5},
                {"pokemon": 17, "cp": 1500, "rank": 11, "percentage": 0.97, "level": 30}
            ],
            "little": [
                {"pokemon": 16, "cp": 499, "rank": 10, "percentage": 0.98, "level": 12}
            ]
        }"#;

        let top = top_ranked(blob).unwrap();
        let summary: Vec<_> = top.iter().map(|(l, e)| (l.as_str(), e.rank)).collect();
        assert_eq!(summary, vec![("great", 3), ("little", 10)]);
    }

    #[test]
    fn malformed_blob_is_an_error() {
        assert!(top_ranked("{not json").is_err());
        assert!(top_ranked("{}").unwrap().is_empty());
    }
}
