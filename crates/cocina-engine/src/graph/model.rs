use std::collections::{BTreeSet, HashMap, HashSet};

use serde::Serialize;

use crate::data::DataError;

/// Fields a dish row must have to place it in the graph.
const MIN_FIELDS: usize = 14;
const FIELD_DISH: usize = 0;
const FIELD_ORIGIN: usize = 1;
const FIELD_DISH_TYPE: usize = 10;
const FIELD_ERA: usize = 11;
const FIELD_INGREDIENT: usize = 13;

/// Ring the node sits on, from the center out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeLevel {
    Era = 1,
    Origin = 2,
    Dish = 3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LinkKind {
    EraOrigin,
    OriginDish,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphNode {
    pub id: String,
    pub name: String,
    pub level: NodeLevel,
    /// Distinct links leaving the node toward the next ring.
    pub connections: u32,
    /// Origin of a dish.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    /// Era of a dish, from the first row naming it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub era: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dish_type: Option<String>,
    /// Upper-cased ingredients of a dish.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ingredients: Vec<String>,
}

impl GraphNode {
    fn new(id: String, name: String, level: NodeLevel) -> Self {
        Self {
            id,
            name,
            level,
            connections: 0,
            origin: None,
            era: None,
            dish_type: None,
            ingredients: Vec::new(),
        }
    }
}

/// Link between node indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GraphLink {
    pub source: usize,
    pub target: usize,
    pub kind: LinkKind,
}

/// Three-ring graph: eras in the center, origins around them, dishes outside.
#[derive(Debug, Clone, Default)]
pub struct GraphData {
    nodes: Vec<GraphNode>,
    links: Vec<GraphLink>,
    by_id: HashMap<(NodeLevel, String), usize>,
}

impl GraphData {
    /// Build from the dish CSV. The header row is skipped and columns are
    /// read by position.
    pub fn from_csv(text: &str) -> Result<Self, DataError> {
        let mut lines = text.lines().filter(|l| !l.trim().is_empty());
        lines.next().ok_or(DataError::Empty)?;

        let mut builder = GraphBuilder::default();
        let mut skipped = 0usize;
        for line in lines {
            let fields: Vec<&str> = line.trim_end_matches('\r').split('|').map(str::trim).collect();
            if fields.len() < MIN_FIELDS {
                skipped += 1;
                continue;
            }
            let (dish, origin, era) = (fields[FIELD_DISH], fields[FIELD_ORIGIN], fields[FIELD_ERA]);
            if dish.is_empty() || origin.is_empty() || era.is_empty() {
                skipped += 1;
                continue;
            }
            builder.add_row(DishRow {
                dish,
                origin,
                era,
                dish_type: fields[FIELD_DISH_TYPE],
                ingredient: fields[FIELD_INGREDIENT],
            });
        }
        if skipped > 0 {
            log::warn!("graph: skipped {skipped} incomplete rows");
        }

        let graph = builder.finish();
        log::info!("graph built: {} nodes, {} links", graph.nodes.len(), graph.links.len());
        Ok(graph)
    }

    /// Small demonstration graph for when the CSV cannot be loaded.
    pub fn fallback() -> Self {
        let era = "Prehispánica";
        let rows: [(&str, &str, &str, &[&str]); 4] = [
            ("Enchiladas", "Azteca", "Antojitos", &["MAÍZ", "CHILE"]),
            ("Tamales", "Maya", "Tamales", &["MAÍZ", "FRIJOL"]),
            ("Atole", "Zapoteca", "Bebidas", &["MAÍZ"]),
            ("Pozole", "Azteca", "Sopas", &["MAÍZ"]),
        ];
        let mut builder = GraphBuilder::default();
        for (dish, origin, dish_type, ingredients) in rows {
            for ingredient in ingredients {
                builder.add_row(DishRow { dish, origin, era, dish_type, ingredient });
            }
        }
        builder.finish()
    }

    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    pub fn links(&self) -> &[GraphLink] {
        &self.links
    }

    pub fn node(&self, index: usize) -> Option<&GraphNode> {
        self.nodes.get(index)
    }

    /// Index of the node with `id` on `level`.
    pub fn find(&self, level: NodeLevel, id: &str) -> Option<usize> {
        self.by_id.get(&(level, id.to_string())).copied()
    }

    /// Index of the first node with `id` on any ring, center first.
    pub fn find_any(&self, id: &str) -> Option<usize> {
        [NodeLevel::Era, NodeLevel::Origin, NodeLevel::Dish]
            .into_iter()
            .find_map(|level| self.find(level, id))
    }

    pub fn level(&self, index: usize) -> Option<NodeLevel> {
        self.nodes.get(index).map(|n| n.level)
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

struct DishRow<'a> {
    dish: &'a str,
    origin: &'a str,
    era: &'a str,
    dish_type: &'a str,
    ingredient: &'a str,
}

#[derive(Default)]
struct GraphBuilder {
    eras: Vec<GraphNode>,
    origins: Vec<GraphNode>,
    dishes: Vec<GraphNode>,
    era_index: HashMap<String, usize>,
    origin_index: HashMap<String, usize>,
    dish_index: HashMap<String, usize>,
    /// Eras seen per origin, in first-seen order.
    origin_eras: Vec<Vec<usize>>,
    dish_ingredients: Vec<BTreeSet<String>>,
    /// First non-empty dish type per dish name.
    types_by_name: HashMap<String, String>,
}

impl GraphBuilder {
    fn add_row(&mut self, row: DishRow<'_>) {
        let era = intern(&mut self.eras, &mut self.era_index, row.era, || {
            GraphNode::new(row.era.to_string(), row.era.to_string(), NodeLevel::Era)
        });

        let origin_count = self.origins.len();
        let origin = intern(&mut self.origins, &mut self.origin_index, row.origin, || {
            GraphNode::new(row.origin.to_string(), row.origin.to_string(), NodeLevel::Origin)
        });
        if origin == origin_count {
            self.origin_eras.push(Vec::new());
        }
        if !self.origin_eras[origin].contains(&era) {
            self.origin_eras[origin].push(era);
        }

        let key = format!("{}-{}", row.dish, row.origin);
        let dish_count = self.dishes.len();
        let dish = intern(&mut self.dishes, &mut self.dish_index, &key, || {
            let mut node = GraphNode::new(key.clone(), row.dish.to_string(), NodeLevel::Dish);
            node.origin = Some(row.origin.to_string());
            node.era = Some(row.era.to_string());
            node
        });
        if dish == dish_count {
            self.dish_ingredients.push(BTreeSet::new());
            self.origins[origin].connections += 1;
        }

        let ingredient = row.ingredient.to_uppercase();
        if !ingredient.is_empty() {
            self.dish_ingredients[dish].insert(ingredient);
        }
        if !row.dish_type.is_empty() {
            self.types_by_name
                .entry(row.dish.to_string())
                .or_insert_with(|| row.dish_type.to_string());
        }
    }

    fn finish(mut self) -> GraphData {
        let era_base = 0;
        let origin_base = self.eras.len();
        let dish_base = origin_base + self.origins.len();

        let mut links = Vec::new();
        let mut seen: HashSet<(usize, usize)> = HashSet::new();

        // Origin to dish links, one per dish, in dish order.
        for (d, dish) in self.dishes.iter().enumerate() {
            let origin = dish
                .origin
                .as_deref()
                .and_then(|o| self.origin_index.get(o))
                .copied();
            if let Some(o) = origin {
                if seen.insert((origin_base + o, dish_base + d)) {
                    links.push(GraphLink {
                        source: origin_base + o,
                        target: dish_base + d,
                        kind: LinkKind::OriginDish,
                    });
                }
            }
        }

        for (o, eras) in self.origin_eras.iter().enumerate() {
            for &e in eras {
                if seen.insert((era_base + e, origin_base + o)) {
                    links.push(GraphLink {
                        source: era_base + e,
                        target: origin_base + o,
                        kind: LinkKind::EraOrigin,
                    });
                    self.eras[e].connections += 1;
                }
            }
        }

        for (dish, ingredients) in self.dishes.iter_mut().zip(self.dish_ingredients) {
            dish.ingredients = ingredients.into_iter().collect();
            dish.dish_type = self.types_by_name.get(&dish.name).cloned();
        }

        let nodes: Vec<GraphNode> = self
            .eras
            .into_iter()
            .chain(self.origins)
            .chain(self.dishes)
            .collect();
        let by_id = nodes
            .iter()
            .enumerate()
            .map(|(i, n)| ((n.level, n.id.clone()), i))
            .collect();

        GraphData { nodes, links, by_id }
    }
}

fn intern(
    nodes: &mut Vec<GraphNode>,
    index: &mut HashMap<String, usize>,
    key: &str,
    make: impl FnOnce() -> GraphNode,
) -> usize {
    if let Some(&i) = index.get(key) {
        return i;
    }
    nodes.push(make());
    index.insert(key.to_string(), nodes.len() - 1);
    nodes.len() - 1
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const PREHISPANIC: &str = "México Prehispánico (Antes de 1521)";
    pub(crate) const COLONIAL: &str = "Conquista y Virreinato (1521 – 1821)";

    fn row(dish: &str, origin: &str, dish_type: &str, era: &str, ingredient: &str) -> String {
        let mut fields = vec![""; 14];
        fields[0] = dish;
        fields[1] = origin;
        fields[10] = dish_type;
        fields[11] = era;
        fields[13] = ingredient;
        fields.join("|")
    }

    pub(crate) fn sample_csv() -> String {
        let rows = [
            row("Pozole", "Jalisco", "Sopas", PREHISPANIC, "maíz"),
            row("Pozole", "Jalisco", "Sopas", PREHISPANIC, "chile"),
            row("Tamal", "Oaxaca", "Tamales", PREHISPANIC, "maíz"),
            row("Tamal", "Oaxaca", "Tamales", PREHISPANIC, "frijol"),
            row("Mole", "Oaxaca", "Moles", PREHISPANIC, "chile"),
            row("Mole", "Puebla", "Moles", COLONIAL, "chile"),
            row("Chiles en nogada", "Puebla", "Platos Principales", COLONIAL, "chile poblano"),
            row("Papadzules", "Yucatán", "Antojitos", PREHISPANIC, "huevo"),
            row("Buñuelos", "Puebla", "Postres", COLONIAL, "trigo"),
        ];
        let mut csv = String::from("header\n");
        for r in rows {
            csv.push_str(&r);
            csv.push('\n');
        }
        csv.push_str("Incompleto|Puebla\n");
        csv.push_str(&row("", "Puebla", "", COLONIAL, "x"));
        csv.push('\n');
        csv
    }

    pub(crate) fn sample() -> GraphData {
        GraphData::from_csv(&sample_csv()).unwrap()
    }

    #[test]
    fn nodes_are_grouped_by_ring() {
        let g = sample();
        let count = |level| g.nodes().iter().filter(|n| n.level == level).count();
        assert_eq!(count(NodeLevel::Era), 2);
        assert_eq!(count(NodeLevel::Origin), 4);
        assert_eq!(count(NodeLevel::Dish), 7);
        // Eras first, then origins, then dishes.
        let levels: Vec<NodeLevel> = g.nodes().iter().map(|n| n.level).collect();
        let mut sorted = levels.clone();
        sorted.sort();
        assert_eq!(levels, sorted);
    }

    #[test]
    fn dishes_are_keyed_by_name_and_origin() {
        let g = sample();
        assert!(g.find(NodeLevel::Dish, "Mole-Oaxaca").is_some());
        assert!(g.find(NodeLevel::Dish, "Mole-Puebla").is_some());
        let pozole = &g.nodes()[g.find(NodeLevel::Dish, "Pozole-Jalisco").unwrap()];
        assert_eq!(pozole.ingredients, vec!["CHILE", "MAÍZ"]);
        assert_eq!(pozole.dish_type.as_deref(), Some("Sopas"));
        assert_eq!(pozole.era.as_deref(), Some(PREHISPANIC));
    }

    #[test]
    fn links_are_deduplicated_with_connection_counts() {
        let g = sample();
        let era_origin = g.links().iter().filter(|l| l.kind == LinkKind::EraOrigin).count();
        let origin_dish = g.links().iter().filter(|l| l.kind == LinkKind::OriginDish).count();
        // Prehispanic: Jalisco, Oaxaca, Yucatán. Colonial: Puebla.
        assert_eq!(era_origin, 4);
        assert_eq!(origin_dish, 7);

        let puebla = &g.nodes()[g.find(NodeLevel::Origin, "Puebla").unwrap()];
        assert_eq!(puebla.connections, 3);
        let pre = &g.nodes()[g.find(NodeLevel::Era, PREHISPANIC).unwrap()];
        assert_eq!(pre.connections, 3);
    }

    #[test]
    fn incomplete_rows_are_skipped() {
        let g = sample();
        assert!(g.find_any("Incompleto-Puebla").is_none());
        assert!(g.nodes().iter().all(|n| !n.name.is_empty()));
    }

    #[test]
    fn empty_input_is_an_error() {
        assert!(matches!(GraphData::from_csv("\n"), Err(DataError::Empty)));
    }

    #[test]
    fn fallback_graph_shape() {
        let g = GraphData::fallback();
        assert_eq!(g.nodes().len(), 1 + 3 + 4);
        let enchiladas = &g.nodes()[g.find(NodeLevel::Dish, "Enchiladas-Azteca").unwrap()];
        assert_eq!(enchiladas.ingredients, vec!["CHILE", "MAÍZ"]);
        assert_eq!(enchiladas.dish_type.as_deref(), Some("Antojitos"));
        assert_eq!(g.nodes()[g.find_any("Azteca").unwrap()].connections, 2);
    }
}
