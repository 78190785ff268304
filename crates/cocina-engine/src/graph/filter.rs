//! Which nodes and links of the circular graph are drawn, and how strongly.
//!
//! Everything here is a pure function of the graph and the current filter or
//! selection, so re-applying a filter reproduces the same view.

use std::collections::BTreeSet;

use serde::Serialize;

use super::model::{GraphData, LinkKind, NodeLevel};

/// Era shown when no ingredient is active.
pub const PREHISPANIC_ERA: &str = "México Prehispánico (Antes de 1521)";

/// Below either size an ingredient view switches to visual mode.
const MIN_STRICT_NODES: usize = 5;
const MIN_STRICT_LINKS: usize = 4;

pub const LINK_OPACITY_FILTERED: f32 = 0.6;
pub const LINK_OPACITY_DEFAULT: f32 = 0.4;
pub const LINK_OPACITY_HIGHLIGHTED: f32 = 0.8;
pub const LINK_OPACITY_DIMMED: f32 = 0.1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "key", rename_all = "lowercase")]
pub enum GraphFilter {
    All,
    Era(String),
    Ingredient(String),
}

impl GraphFilter {
    /// Filter for an ingredient picked on the page. Blank means the default
    /// prehispanic era view. Accent variants are folded onto the spelling
    /// used in the data.
    pub fn from_ingredient(key: Option<&str>) -> Self {
        let key = key.map(str::trim).unwrap_or_default();
        if key.is_empty() {
            return Self::Era(PREHISPANIC_ERA.to_string());
        }
        let key = match key.to_uppercase().as_str() {
            "MAIZ" => "MAÍZ".to_string(),
            "FRÍJOL" => "FRIJOL".to_string(),
            other => other.to_string(),
        };
        Self::Ingredient(key)
    }

    pub fn is_ingredient(&self) -> bool {
        matches!(self, Self::Ingredient(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterMode {
    /// Everything visible, everything relevant.
    All,
    /// Only the relevant subset is visible.
    Strict,
    /// Everything visible, relevance marks the matching subset.
    Visual,
}

/// Visible and relevant node/link indices under a filter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphView {
    pub filter: GraphFilter,
    pub mode: FilterMode,
    pub nodes: BTreeSet<usize>,
    pub links: BTreeSet<usize>,
    pub relevant_nodes: BTreeSet<usize>,
    pub relevant_links: BTreeSet<usize>,
}

impl GraphView {
    fn everything(graph: &GraphData, filter: GraphFilter) -> Self {
        let nodes: BTreeSet<usize> = (0..graph.nodes().len()).collect();
        let links: BTreeSet<usize> = (0..graph.links().len()).collect();
        Self {
            filter,
            mode: FilterMode::All,
            relevant_nodes: nodes.clone(),
            relevant_links: links.clone(),
            nodes,
            links,
        }
    }

    fn strict(filter: GraphFilter, nodes: BTreeSet<usize>, links: BTreeSet<usize>) -> Self {
        Self {
            filter,
            mode: FilterMode::Strict,
            relevant_nodes: nodes.clone(),
            relevant_links: links.clone(),
            nodes,
            links,
        }
    }

    pub fn is_visible(&self, node: usize) -> bool {
        self.nodes.contains(&node)
    }

    pub fn is_relevant(&self, node: usize) -> bool {
        self.relevant_nodes.contains(&node)
    }
}

pub fn apply_filter(graph: &GraphData, filter: &GraphFilter) -> GraphView {
    let view = match filter {
        GraphFilter::All => GraphView::everything(graph, filter.clone()),
        GraphFilter::Era(era) => era_view(graph, filter, era),
        GraphFilter::Ingredient(key) => ingredient_view(graph, filter, key),
    };
    log::debug!(
        "graph filter {:?}: {:?}, {} nodes, {} links",
        filter,
        view.mode,
        view.nodes.len(),
        view.links.len()
    );
    view
}

fn era_view(graph: &GraphData, filter: &GraphFilter, era: &str) -> GraphView {
    let Some(era_node) = graph.find(NodeLevel::Era, era) else {
        log::warn!("graph: era {era:?} not in data, showing everything");
        return GraphView::everything(graph, filter.clone());
    };

    let origins: BTreeSet<usize> = graph
        .links()
        .iter()
        .filter(|l| l.kind == LinkKind::EraOrigin && l.source == era_node)
        .map(|l| l.target)
        .collect();
    let dishes: BTreeSet<usize> = graph
        .links()
        .iter()
        .filter(|l| l.kind == LinkKind::OriginDish && origins.contains(&l.source))
        .map(|l| l.target)
        .collect();

    let links = graph
        .links()
        .iter()
        .enumerate()
        .filter(|(_, l)| match l.kind {
            LinkKind::EraOrigin => l.source == era_node && origins.contains(&l.target),
            LinkKind::OriginDish => origins.contains(&l.source) && dishes.contains(&l.target),
        })
        .map(|(i, _)| i)
        .collect();

    let mut nodes = BTreeSet::from([era_node]);
    nodes.extend(&origins);
    nodes.extend(&dishes);
    GraphView::strict(filter.clone(), nodes, links)
}

fn ingredient_view(graph: &GraphData, filter: &GraphFilter, key: &str) -> GraphView {
    let dishes: BTreeSet<usize> = graph
        .nodes()
        .iter()
        .enumerate()
        .filter(|(_, n)| n.level == NodeLevel::Dish && n.ingredients.iter().any(|i| i.contains(key)))
        .map(|(i, _)| i)
        .collect();

    let mut links = BTreeSet::new();
    let mut origins = BTreeSet::new();
    for (i, l) in graph.links().iter().enumerate() {
        if l.kind == LinkKind::OriginDish && dishes.contains(&l.target) {
            origins.insert(l.source);
            links.insert(i);
        }
    }
    let mut eras = BTreeSet::new();
    for (i, l) in graph.links().iter().enumerate() {
        if l.kind == LinkKind::EraOrigin && origins.contains(&l.target) {
            eras.insert(l.source);
            links.insert(i);
        }
    }

    let mut nodes = eras;
    nodes.extend(&origins);
    nodes.extend(&dishes);

    if nodes.len() >= MIN_STRICT_NODES && links.len() >= MIN_STRICT_LINKS {
        return GraphView::strict(filter.clone(), nodes, links);
    }

    log::debug!("graph: too few matches for {key:?}, switching to visual filtering");
    let mut view = GraphView::everything(graph, filter.clone());
    view.mode = FilterMode::Visual;
    view.relevant_nodes = nodes;
    view.relevant_links = links;
    view
}

/// Nodes and links emphasized by a multi-selection.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Highlight {
    pub nodes: BTreeSet<usize>,
    pub links: BTreeSet<usize>,
}

impl Highlight {
    pub fn union(mut self, other: Highlight) -> Self {
        self.nodes.extend(other.nodes);
        self.links.extend(other.links);
        self
    }
}

/// Union over the selection of each node, its direct neighbours over visible
/// links, and for an era the dishes of its origins.
pub fn highlight(graph: &GraphData, view: &GraphView, selection: &[usize]) -> Highlight {
    selection
        .iter()
        .map(|&node| highlight_one(graph, view, node))
        .fold(Highlight::default(), Highlight::union)
}

fn highlight_one(graph: &GraphData, view: &GraphView, node: usize) -> Highlight {
    let mut out = Highlight::default();
    out.nodes.insert(node);

    let visible = || view.links.iter().map(|&i| (i, graph.links()[i]));
    for (i, l) in visible() {
        if l.source == node {
            out.nodes.insert(l.target);
            out.links.insert(i);
        } else if l.target == node {
            out.nodes.insert(l.source);
            out.links.insert(i);
        }
    }

    if graph.level(node) == Some(NodeLevel::Era) {
        let origins: BTreeSet<usize> = visible()
            .filter(|(_, l)| l.kind == LinkKind::EraOrigin && l.source == node)
            .map(|(_, l)| l.target)
            .collect();
        for (i, l) in visible() {
            if l.kind == LinkKind::OriginDish && origins.contains(&l.source) {
                out.nodes.insert(l.target);
                out.links.insert(i);
            }
        }
    }
    out
}

/// Drawing opacity of a node. Hidden nodes are fully transparent.
pub fn node_opacity(
    graph: &GraphData,
    view: &GraphView,
    selection: &[usize],
    highlight: &Highlight,
    node: usize,
) -> f32 {
    if !view.is_visible(node) {
        return 0.0;
    }
    let level = graph.level(node);
    if selection.is_empty() {
        let filtered = view.filter.is_ingredient();
        return match level {
            Some(NodeLevel::Era) if filtered => if view.is_relevant(node) { 1.0 } else { 0.3 },
            Some(NodeLevel::Era) => 0.9,
            Some(NodeLevel::Origin) => 0.5,
            _ if filtered => if view.is_relevant(node) { 1.0 } else { 0.2 },
            _ => 0.85,
        };
    }
    if selection.contains(&node) || highlight.nodes.contains(&node) {
        1.0
    } else if level == Some(NodeLevel::Origin) {
        0.25
    } else {
        0.15
    }
}

/// Drawing opacity of a link. Hidden links are fully transparent.
pub fn link_opacity(view: &GraphView, selection: &[usize], highlight: &Highlight, link: usize) -> f32 {
    if !view.links.contains(&link) {
        return 0.0;
    }
    if selection.is_empty() {
        return if view.filter.is_ingredient() {
            LINK_OPACITY_FILTERED
        } else {
            LINK_OPACITY_DEFAULT
        };
    }
    if highlight.links.contains(&link) {
        LINK_OPACITY_HIGHLIGHTED
    } else {
        LINK_OPACITY_DIMMED
    }
}

/// Per-node and per-link opacities for the whole graph.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Opacities {
    pub nodes: Vec<f32>,
    pub links: Vec<f32>,
}

pub fn opacities(graph: &GraphData, view: &GraphView, selection: &[usize]) -> Opacities {
    let lit = highlight(graph, view, selection);
    Opacities {
        nodes: (0..graph.nodes().len())
            .map(|n| node_opacity(graph, view, selection, &lit, n))
            .collect(),
        links: (0..graph.links().len())
            .map(|l| link_opacity(view, selection, &lit, l))
            .collect(),
    }
}

/// Add `node` to the selection, or remove it if already selected.
/// Returns whether the node is selected afterwards.
pub fn toggle(selection: &mut Vec<usize>, node: usize) -> bool {
    if let Some(pos) = selection.iter().position(|&n| n == node) {
        selection.remove(pos);
        false
    } else {
        selection.push(node);
        true
    }
}
