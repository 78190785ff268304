//! Category counts shaped from the dish table.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::table::PipeTable;
use super::DataError;

pub const COL_DISH: &str = "NOMBRE DEL PLATILLO";
pub const COL_ORIGIN: &str = "ORIGEN_Platillo";
pub const COL_INGREDIENT: &str = "Ingrediente";
pub const COL_INGREDIENT_ERA: &str = "Epoca_Ingrediente";
pub const COL_CULTURE: &str = "Cultura_prehispánica_Ingrediente";

const PREHISPANIC_ERA: &str = "Prehispánico";

/// One bar's worth of data: a label and how many particles it gets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCount {
    pub label: String,
    pub count: u32,
}

impl CategoryCount {
    pub fn new(label: impl Into<String>, count: u32) -> Self {
        Self { label: label.into(), count }
    }
}

/// Unique prehispanic ingredients contributed by each culture, smallest first.
pub fn culture_counts(table: &PipeTable) -> Result<Vec<CategoryCount>, DataError> {
    let ingredient = table.column(COL_INGREDIENT)?;
    let era = table.column(COL_INGREDIENT_ERA)?;
    let culture = table.column(COL_CULTURE)?;

    let mut by_culture: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    let mut skipped = 0usize;
    for row in table.rows() {
        let (Some(era_value), Some(name), Some(item)) = (
            PipeTable::field(row, era),
            PipeTable::field(row, culture),
            PipeTable::field(row, ingredient),
        ) else {
            skipped += 1;
            continue;
        };
        if !era_value.contains(PREHISPANIC_ERA) || name == "NULL" {
            continue;
        }
        by_culture.entry(name).or_default().insert(item);
    }
    if skipped > 0 {
        log::debug!("culture counts: skipped {skipped} incomplete rows");
    }

    Ok(sorted_counts(by_culture, |a, b| a.count.cmp(&b.count).then_with(|| a.label.cmp(&b.label))))
}

/// How an ingredient key is compared against the ingredient column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngredientMatcher {
    /// Any ingredient mentioning maize, with or without the accent.
    Maize,
    /// Any ingredient mentioning chile.
    Chile,
    /// Case-insensitive equality.
    Exact(String),
}

impl IngredientMatcher {
    pub fn for_key(key: &str) -> Self {
        match key.trim().to_uppercase().as_str() {
            "MAIZ" => Self::Maize,
            "CHILE" => Self::Chile,
            other => Self::Exact(other.to_lowercase()),
        }
    }

    pub fn matches(&self, value: &str) -> bool {
        let value = value.trim().to_lowercase();
        match self {
            Self::Maize => value.contains("maiz") || value.contains("maíz"),
            Self::Chile => value.contains("chile"),
            Self::Exact(key) => value == *key,
        }
    }
}

/// Unique dishes per origin state for rows using `ingredient`, by state name.
pub fn dishes_by_state(table: &PipeTable, ingredient: &str) -> Result<Vec<CategoryCount>, DataError> {
    let dish = table.column(COL_DISH)?;
    let origin = table.column(COL_ORIGIN)?;
    let ingredient_col = table.column(COL_INGREDIENT)?;
    let matcher = IngredientMatcher::for_key(ingredient);

    let mut by_state: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for row in table.rows() {
        let Some(value) = PipeTable::field(row, ingredient_col) else { continue };
        if !matcher.matches(value) {
            continue;
        }
        if let (Some(state), Some(name)) = (PipeTable::field(row, origin), PipeTable::field(row, dish)) {
            by_state.entry(state).or_default().insert(name);
        }
    }

    Ok(sorted_counts(by_state, |a, b| a.label.cmp(&b.label)))
}

fn sorted_counts(
    groups: BTreeMap<&str, BTreeSet<&str>>,
    order: impl FnMut(&CategoryCount, &CategoryCount) -> std::cmp::Ordering,
) -> Vec<CategoryCount> {
    let mut counts: Vec<CategoryCount> = groups
        .into_iter()
        .map(|(label, items)| CategoryCount::new(label, items.len() as u32))
        .collect();
    counts.sort_by(order);
    counts
}
