//! Fixed categorization scheme: seasons, dish types, and collection naming.
//!
//! Values serialize as their Spanish labels (`"Verano"`, `"Pescados"`), which
//! is also what the classifier prompt asks the model to answer with.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Season
// ---------------------------------------------------------------------------

/// Recipe seasonality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Season {
    #[serde(rename = "Primavera")]
    Spring,
    #[serde(rename = "Verano")]
    Summer,
    #[serde(rename = "Otoño")]
    Autumn,
    #[serde(rename = "Invierno")]
    Winter,
}

impl Season {
    pub const ALL: [Season; 4] = [Self::Spring, Self::Summer, Self::Autumn, Self::Winter];

    /// Display label used in prompts, state files and collection names.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Spring => "Primavera",
            Self::Summer => "Verano",
            Self::Autumn => "Otoño",
            Self::Winter => "Invierno",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Self::Spring => "\u{1F338}",
            Self::Summer => "\u{2600}\u{FE0F}",
            Self::Autumn => "\u{1F342}",
            Self::Winter => "\u{2744}\u{FE0F}",
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Season {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|season| season.label() == s)
            .ok_or_else(|| format!("unknown season '{s}'"))
    }
}

// ---------------------------------------------------------------------------
// DishType (Spanish source taxonomy)
// ---------------------------------------------------------------------------

/// Primary dish category, in the source (Spanish) locale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DishType {
    Sopas,
    Ensaladas,
    Carnes,
    Pescados,
    Pastas,
    Arroces,
    Postres,
    Panes,
    Salsas,
}

impl DishType {
    pub const ALL: [DishType; 9] = [
        Self::Sopas,
        Self::Ensaladas,
        Self::Carnes,
        Self::Pescados,
        Self::Pastas,
        Self::Arroces,
        Self::Postres,
        Self::Panes,
        Self::Salsas,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Sopas => "Sopas",
            Self::Ensaladas => "Ensaladas",
            Self::Carnes => "Carnes",
            Self::Pescados => "Pescados",
            Self::Pastas => "Pastas",
            Self::Arroces => "Arroces",
            Self::Postres => "Postres",
            Self::Panes => "Panes",
            Self::Salsas => "Salsas",
        }
    }

    /// Translate to the English culinary term used for flat collections.
    pub fn translate(&self) -> DishTypeEn {
        match self {
            Self::Sopas => DishTypeEn::Soups,
            Self::Ensaladas => DishTypeEn::Salads,
            Self::Carnes => DishTypeEn::Meats,
            Self::Pescados => DishTypeEn::Seafood,
            Self::Pastas => DishTypeEn::Pasta,
            Self::Arroces => DishTypeEn::RiceDishes,
            Self::Postres => DishTypeEn::Desserts,
            Self::Panes => DishTypeEn::Breads,
            Self::Salsas => DishTypeEn::Sauces,
        }
    }
}

impl fmt::Display for DishType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for DishType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|dish| dish.label() == s)
            .ok_or_else(|| format!("unknown dish type '{s}'"))
    }
}

// ---------------------------------------------------------------------------
// DishTypeEn (English target taxonomy)
// ---------------------------------------------------------------------------

/// Primary dish category, translated to English.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DishTypeEn {
    Soups,
    Salads,
    Meats,
    Seafood,
    Pasta,
    #[serde(rename = "Rice Dishes")]
    RiceDishes,
    Desserts,
    Breads,
    Sauces,
}

impl DishTypeEn {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Soups => "Soups",
            Self::Salads => "Salads",
            Self::Meats => "Meats",
            Self::Seafood => "Seafood",
            Self::Pasta => "Pasta",
            Self::RiceDishes => "Rice Dishes",
            Self::Desserts => "Desserts",
            Self::Breads => "Breads",
            Self::Sauces => "Sauces",
        }
    }
}

impl fmt::Display for DishTypeEn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Collection naming
// ---------------------------------------------------------------------------

/// Legacy two-level collection name, e.g. `"🌸 Primavera > Sopas"`.
pub fn collection_name(season: Season, dish_type: DishType) -> String {
    format!("{} {} > {}", season.emoji(), season.label(), dish_type.label())
}

/// Flat single-level collection name, e.g. `"Seafood"`.
pub fn flat_collection_name(dish_type: DishType) -> String {
    dish_type.translate().label().to_string()
}

/// A legacy collection name split into its season token and dish type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyName {
    pub season: String,
    pub dish_type: DishType,
}

/// Matches `"<anything> <Season> > <rest>"`.
pub static LEGACY_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^.+\s+(Primavera|Verano|Otoño|Invierno)\s+>\s+(.+)$").expect("valid regex")
});

/// Parse a two-level collection name.
///
/// Returns `None` when the name does not match the pattern or when the part
/// after `>` is not exactly one of the dish types.
pub fn parse_legacy_name(name: &str) -> Option<LegacyName> {
    let caps = LEGACY_NAME_RE.captures(name)?;
    let dish_type = caps[2].parse::<DishType>().ok()?;
    Some(LegacyName {
        season: caps[1].to_string(),
        dish_type,
    })
}
