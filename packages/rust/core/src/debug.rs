//! Read-only listing of custom collections against the legacy name pattern.

use std::fmt;

use cookido_gateway::{RecipeGateway, fetch_all_custom_collections};
use cookido_shared::taxonomy::LEGACY_NAME_RE;
use cookido_shared::{DishType, Result, Season};

/// A collection whose name matches the legacy two-level pattern.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchedCollection {
    pub name: String,
    pub id: String,
    pub season: String,
    pub dish_text: String,
    /// Set when the dish text is exactly a known dish type.
    pub dish_type: Option<DishType>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnmatchedCollection {
    pub name: String,
    pub id: String,
    /// The name mentions a season yet did not match.
    pub mentions_season: bool,
}

/// Outcome of matching one collection name.
#[derive(Debug, Clone, PartialEq)]
pub enum NameMatch {
    Matched(MatchedCollection),
    Unmatched(UnmatchedCollection),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectionReport {
    pub matched: Vec<MatchedCollection>,
    pub unmatched: Vec<UnmatchedCollection>,
}

impl CollectionReport {
    pub fn total(&self) -> usize {
        self.matched.len() + self.unmatched.len()
    }
}

/// Classify a collection name.
pub fn inspect_name(name: &str, id: &str) -> NameMatch {
    match LEGACY_NAME_RE.captures(name) {
        Some(caps) => NameMatch::Matched(MatchedCollection {
            name: name.to_string(),
            id: id.to_string(),
            season: caps[1].to_string(),
            dish_text: caps[2].to_string(),
            dish_type: caps[2].parse().ok(),
        }),
        None => NameMatch::Unmatched(UnmatchedCollection {
            name: name.to_string(),
            id: id.to_string(),
            mentions_season: Season::ALL.iter().any(|s| name.contains(s.label())),
        }),
    }
}

/// Log in and sort every custom collection into matched and unmatched.
pub async fn inspect_collections(gateway: &dyn RecipeGateway) -> Result<CollectionReport> {
    gateway.login().await?;
    let collections = fetch_all_custom_collections(gateway).await?;

    let mut report = CollectionReport::default();
    for collection in &collections {
        let name = collection.display_name().unwrap_or_default();
        let id = collection.id.as_deref().unwrap_or_default();
        match inspect_name(name, id) {
            NameMatch::Matched(matched) => report.matched.push(matched),
            NameMatch::Unmatched(unmatched) => report.unmatched.push(unmatched),
        }
    }
    Ok(report)
}

impl fmt::Display for CollectionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Found {} custom collections:", self.total())?;
        writeln!(f)?;

        writeln!(f, "=== MATCHED (two-level season collections) ===")?;
        for c in &self.matched {
            writeln!(f, "  '{}' -> ({:?}, {:?})", c.name, c.season, c.dish_text)?;
            writeln!(f, "    ID: {}", c.id)?;
            writeln!(f, "    Raw: {}", c.name.escape_unicode())?;
            if c.dish_type.is_none() {
                writeln!(f, "    *** UNKNOWN DISH TYPE, WILL NOT BE FLATTENED ***")?;
            }
        }

        writeln!(f)?;
        writeln!(f, "=== UNMATCHED ({} collections) ===", self.unmatched.len())?;
        for c in &self.unmatched {
            writeln!(f, "  '{}'", c.name)?;
            writeln!(f, "    ID: {}", c.id)?;
            if c.mentions_season {
                writeln!(f, "    *** CONTAINS SEASON WORD BUT DIDN'T MATCH ***")?;
                writeln!(f, "    Raw: {}", c.name.escape_unicode())?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use cookido_shared::collection_name;

    use super::*;
    use crate::testing::FakeGateway;

    fn matched(name: &str) -> MatchedCollection {
        match inspect_name(name, "c1") {
            NameMatch::Matched(m) => m,
            other => panic!("expected match for {name:?}, got {other:?}"),
        }
    }

    fn unmatched(name: &str) -> UnmatchedCollection {
        match inspect_name(name, "c1") {
            NameMatch::Unmatched(u) => u,
            other => panic!("expected no match for {name:?}, got {other:?}"),
        }
    }

    #[test]
    fn legacy_names_match() {
        let name = collection_name(Season::Summer, DishType::Pescados);
        let matched = matched(&name);
        assert_eq!(matched.season, "Verano");
        assert_eq!(matched.dish_text, "Pescados");
        assert_eq!(matched.dish_type, Some(DishType::Pescados));
    }

    #[test]
    fn pattern_match_with_unknown_dish_type() {
        assert_eq!(matched("x Invierno > Guisos").dish_type, None);
    }

    #[test]
    fn season_word_without_pattern_is_flagged() {
        assert!(unmatched("Recetas de Verano").mentions_season);
        assert!(!unmatched("Cenas").mentions_season);
        // No prefix before the season.
        assert!(unmatched("Otoño > Carnes").mentions_season);
    }

    #[tokio::test]
    async fn report_splits_collections() {
        let gateway = FakeGateway::new();
        gateway.seed_collection("c1", &collection_name(Season::Autumn, DishType::Carnes), &[]);
        gateway.seed_collection("c2", "Verano sin flecha", &[]);
        gateway.seed_collection("c3", "Cenas", &[]);

        let report = inspect_collections(&gateway).await.unwrap();
        assert_eq!(report.total(), 3);
        assert_eq!(report.matched.len(), 1);
        assert_eq!(report.unmatched.len(), 2);

        let text = report.to_string();
        assert!(text.contains("Found 3 custom collections"));
        assert!(text.contains("=== UNMATCHED (2 collections) ==="));
        assert_eq!(text.matches("CONTAINS SEASON WORD").count(), 1);
    }
}
