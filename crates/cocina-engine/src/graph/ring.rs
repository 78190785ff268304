//! Outer ring of the circular graph: dishes grouped by category.

use std::collections::BTreeSet;
use std::f32::consts::TAU;

use serde::Serialize;

use super::filter::{GraphView, Opacities};
use super::model::{GraphData, LinkKind, NodeLevel};

pub const SEGMENT_OPACITY: f32 = 0.85;
pub const SEGMENT_OPACITY_SELECTED: f32 = 1.0;
pub const SEGMENT_OPACITY_DIMMED: f32 = 0.3;

pub const DEFAULT_CATEGORY_COLOR: &str = "#996633";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DishCategory {
    pub id: &'static str,
    pub color: &'static str,
    /// Legend text.
    pub short: &'static str,
}

const fn category(id: &'static str, color: &'static str, short: &'static str) -> DishCategory {
    DishCategory { id, color, short }
}

/// Known dish categories in legend order. Dishes of any other type are not
/// drawn on the ring.
pub const CATEGORIES: [DishCategory; 13] = [
    category("Moles", "#8B4513", "Moles"),
    category("Carnes", "#A52A2A", "Carnes"),
    category("Antojitos", "#D2691E", "Antojitos"),
    category("Tamales", "#CD853F", "Tamales"),
    category("Especialidades Regionales", "#B8860B", "Esp. Regionales"),
    category("Desayunos y Entradas", "#DAA520", "Desayunos"),
    category("Sopas", "#BC8F8F", "Sopas"),
    category("Postres", "#DEB887", "Postres"),
    category("Mariscos", "#F4A460", "Mariscos"),
    category("Salsas", "#D2B48C", "Salsas"),
    category("Platos Principales", "#A0522D", "Platos Principales"),
    category("Pollo", "#B87333", "Pollo"),
    category("Bebidas", "#E6BE8A", "Bebidas"),
];

pub fn category_color(id: &str) -> &'static str {
    CATEGORIES
        .iter()
        .find(|c| c.id == id)
        .map_or(DEFAULT_CATEGORY_COLOR, |c| c.color)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RingSegment {
    pub id: String,
    pub label: String,
    pub color: String,
    pub count: u32,
    /// Dish node indices in this category.
    pub dishes: Vec<usize>,
    pub start_angle: f32,
    pub end_angle: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CategoryRing {
    pub segments: Vec<RingSegment>,
    pub total: u32,
}

impl CategoryRing {
    /// Ring over the dish nodes among `nodes`. Empty categories are dropped,
    /// the rest ordered by count, largest first.
    pub fn build(graph: &GraphData, nodes: impl IntoIterator<Item = usize>) -> Self {
        let mut dishes: Vec<Vec<usize>> = vec![Vec::new(); CATEGORIES.len()];
        for n in nodes {
            let Some(node) = graph.node(n) else { continue };
            if node.level != NodeLevel::Dish {
                continue;
            }
            let slot = node
                .dish_type
                .as_deref()
                .and_then(|t| CATEGORIES.iter().position(|c| c.id == t));
            if let Some(slot) = slot {
                dishes[slot].push(n);
            }
        }

        let mut segments: Vec<RingSegment> = CATEGORIES
            .iter()
            .zip(dishes)
            .filter(|(_, d)| !d.is_empty())
            .map(|(c, d)| RingSegment {
                id: c.id.to_string(),
                label: c.short.to_string(),
                color: c.color.to_string(),
                count: d.len() as u32,
                dishes: d,
                start_angle: 0.0,
                end_angle: 0.0,
            })
            .collect();
        // Stable, so equal counts keep legend order.
        segments.sort_by(|a, b| b.count.cmp(&a.count));

        let total: u32 = segments.iter().map(|s| s.count).sum();
        let mut angle = 0.0;
        for s in &mut segments {
            s.start_angle = angle;
            angle += s.count as f32 / total as f32 * TAU;
            s.end_angle = angle;
        }
        Self { segments, total }
    }

    /// Ring over the dishes visible in `view`.
    pub fn for_view(graph: &GraphData, view: &GraphView) -> Self {
        Self::build(graph, view.nodes.iter().copied())
    }

    /// Ring over the dishes of any of the given origins.
    pub fn for_origins(graph: &GraphData, origins: &[usize]) -> Self {
        let dishes: BTreeSet<usize> = graph
            .links()
            .iter()
            .filter(|l| l.kind == LinkKind::OriginDish && origins.contains(&l.source))
            .map(|l| l.target)
            .collect();
        Self::build(graph, dishes)
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segment(&self, id: &str) -> Option<&RingSegment> {
        self.segments.iter().find(|s| s.id == id)
    }

    pub fn segment_opacity(&self, selected: Option<&str>, id: &str) -> f32 {
        match selected {
            None => SEGMENT_OPACITY,
            Some(s) if s == id => SEGMENT_OPACITY_SELECTED,
            Some(_) => SEGMENT_OPACITY_DIMMED,
        }
    }
}

/// Categories a node belongs to: a dish its own type, an origin the types of
/// its dishes, an era the types of its origins' dishes. Legend order.
pub fn categories_of(graph: &GraphData, node: usize) -> Vec<&'static str> {
    let mut dishes = BTreeSet::new();
    match graph.level(node) {
        Some(NodeLevel::Dish) => {
            dishes.insert(node);
        }
        Some(NodeLevel::Origin) => {
            dishes.extend(dishes_of(graph, &[node]));
        }
        Some(NodeLevel::Era) => {
            let origins: Vec<usize> = graph
                .links()
                .iter()
                .filter(|l| l.kind == LinkKind::EraOrigin && l.source == node)
                .map(|l| l.target)
                .collect();
            dishes.extend(dishes_of(graph, &origins));
        }
        None => {}
    }
    let types: BTreeSet<&str> = dishes
        .iter()
        .filter_map(|&d| graph.node(d)?.dish_type.as_deref())
        .collect();
    CATEGORIES
        .iter()
        .filter(|c| types.contains(c.id))
        .map(|c| c.id)
        .collect()
}

fn dishes_of<'a>(graph: &'a GraphData, origins: &'a [usize]) -> impl Iterator<Item = usize> + 'a {
    graph
        .links()
        .iter()
        .filter(move |l| l.kind == LinkKind::OriginDish && origins.contains(&l.source))
        .map(|l| l.target)
}

/// Graph opacities while a ring segment is selected: its dishes at full
/// strength, their origins slightly dimmed, everything else faded.
pub fn category_opacities(graph: &GraphData, view: &GraphView, segment: &RingSegment) -> Opacities {
    let origins: BTreeSet<usize> = graph
        .links()
        .iter()
        .filter(|l| l.kind == LinkKind::OriginDish && segment.dishes.contains(&l.target))
        .map(|l| l.source)
        .collect();
    let nodes = (0..graph.nodes().len())
        .map(|n| {
            if !view.is_visible(n) {
                0.0
            } else if segment.dishes.contains(&n) {
                1.0
            } else if origins.contains(&n) {
                0.8
            } else {
                0.2
            }
        })
        .collect();
    let links = graph
        .links()
        .iter()
        .enumerate()
        .map(|(i, l)| {
            if !view.links.contains(&i) {
                0.0
            } else if segment.dishes.contains(&l.target) {
                0.8
            } else {
                0.1
            }
        })
        .collect();
    Opacities { nodes, links }
}

/// Select `id`, or clear the selection when it is already selected.
pub fn toggle_category(selected: &mut Option<String>, id: &str) {
    if selected.as_deref() == Some(id) {
        *selected = None;
    } else {
        *selected = Some(id.to_string());
    }
}
