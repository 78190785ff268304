//! Ingredient routes into New Spain, drawn as curved lines on the map.

use std::collections::HashMap;

use serde::Serialize;

use crate::data::DataError;

/// Points per arc, endpoints included.
pub const ARC_POINTS: usize = 21;
/// Routes listed in the "top routes" panel.
pub const TOP_ROUTES: usize = 5;

const CURVE_FACTOR: f64 = 0.2;
const MAX_CURVE: f64 = 10.0;

pub const DEFAULT_ROUTE_COLOR: &str = "#A0522D";

/// Destinations drawn as choropleth states instead of markers.
pub const MEXICAN_STATES: [&str; 34] = [
    "Aguascalientes", "Baja California", "Baja California Sur", "Campeche", "Chiapas",
    "Chihuahua", "Coahuila", "Colima", "Durango", "Guanajuato", "Guerrero", "Hidalgo",
    "Jalisco", "México", "Michoacán", "Morelos", "Nayarit", "Nuevo León", "Oaxaca",
    "Puebla", "Querétaro", "Quintana Roo", "San Luis Potosí", "Sinaloa", "Sonora",
    "Tabasco", "Tamaulipas", "Tlaxcala", "Veracruz", "Yucatán", "Zacatecas", "CDMX",
    "Ciudad de México", "Distrito Federal",
];

pub fn is_mexican_state(name: &str) -> bool {
    MEXICAN_STATES.contains(&name)
}

/// Choropleth legend bounds at 5, 20, 40 and 80 % of the largest state total.
pub fn legend_thresholds(max: u32) -> [u32; 4] {
    [0.05, 0.20, 0.40, 0.80].map(|f| (max as f32 * f).round() as u32)
}

const MARKER_MIN_SIZE: f32 = 20.0;
const MARKER_MAX_SIZE: f32 = 60.0;
const MARKER_FULL_AT: f32 = 50.0;

/// Marker diameter in px: 20 at zero ingredients, 60 from fifty on.
pub fn marker_size(ingredients: u32) -> f32 {
    let t = (ingredients as f32 / MARKER_FULL_AT).min(1.0);
    MARKER_MIN_SIZE + (MARKER_MAX_SIZE - MARKER_MIN_SIZE) * t
}

/// Line color per ingredient category.
pub fn route_color(category: &str) -> &'static str {
    match category {
        "Verduras y Hierbas" => "#8B7355",
        "Condimentos, Aceites y Endulzantes" => "#B8860B",
        "Carnes y Mariscos" => "#CD853F",
        "Lácteos y Huevos" => "#D2B48C",
        _ => DEFAULT_ROUTE_COLOR,
    }
}

/// Line width: 2 px at one ingredient up to 6 px at twenty, clamped outside.
pub fn route_width(ingredients: u32) -> f32 {
    let t = ((ingredients as f32 - 1.0) / 19.0).clamp(0.0, 1.0);
    2.0 + t * 4.0
}

/// Longitude/latitude pair, in that order.
pub type LngLat = [f64; 2];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Route {
    pub category: String,
    pub origin: String,
    pub origin_pos: LngLat,
    pub destination: String,
    pub destination_pos: LngLat,
    pub ingredients: u32,
}

impl Route {
    fn parse(line: &str) -> Option<Self> {
        let f: Vec<&str> = line.split('|').map(str::trim).collect();
        if f.len() < 8 {
            return None;
        }
        let num = |i: usize| f[i].parse::<f64>().ok().filter(|v| v.is_finite());
        Some(Self {
            category: f[0].to_string(),
            origin: f[1].to_string(),
            origin_pos: [num(3)?, num(2)?],
            destination: f[4].to_string(),
            destination_pos: [num(6)?, num(5)?],
            ingredients: f[7].parse().ok()?,
        })
    }

    /// Quadratic Bézier from origin to destination, bowed to the left of the
    /// chord by a fifth of its length, at most 10 degrees.
    pub fn arc(&self) -> Vec<LngLat> {
        let [x0, y0] = self.origin_pos;
        let [x1, y1] = self.destination_pos;
        let (dx, dy) = (x1 - x0, y1 - y0);
        let distance = (dx * dx + dy * dy).sqrt();
        let (mx, my) = ((x0 + x1) * 0.5, (y0 + y1) * 0.5);
        let control = if distance > 0.0 {
            let bow = (distance * CURVE_FACTOR).min(MAX_CURVE);
            [mx - dy / distance * bow, my + dx / distance * bow]
        } else {
            [mx, my]
        };

        let steps = (ARC_POINTS - 1) as f64;
        (0..ARC_POINTS)
            .map(|i| {
                let t = i as f64 / steps;
                let (a, b, c) = ((1.0 - t) * (1.0 - t), 2.0 * (1.0 - t) * t, t * t);
                [
                    a * x0 + b * control[0] + c * x1,
                    a * y0 + b * control[1] + c * y1,
                ]
            })
            .collect()
    }

    pub fn key(&self) -> String {
        format!("{} → {}", self.origin, self.destination)
    }
}

/// A route ready to draw.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Connection {
    pub category: String,
    pub origin: String,
    pub destination: String,
    pub ingredients: u32,
    pub color: &'static str,
    pub width: f32,
    pub coordinates: Vec<LngLat>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopRoute {
    pub route: String,
    pub ingredients: u32,
}

/// Ingredients arriving in one Mexican state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateTotal {
    pub state: String,
    pub ingredients: u32,
}

/// A non-Mexican route endpoint with the ingredients passing through it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OriginMarker {
    pub name: String,
    pub position: LngLat,
    pub ingredients: u32,
    pub size: f32,
}

#[derive(Debug, Clone, Default)]
pub struct RouteMap {
    routes: Vec<Route>,
}

impl RouteMap {
    /// Parse the routes CSV: category, origin, lat, lng, destination, lat,
    /// lng, ingredient count. Rows that do not parse are skipped.
    pub fn from_csv(text: &str) -> Result<Self, DataError> {
        let mut lines = text.lines().map(|l| l.trim_end_matches('\r')).filter(|l| !l.trim().is_empty());
        lines.next().ok_or(DataError::Empty)?;

        let mut routes = Vec::new();
        let mut skipped = 0usize;
        for line in lines {
            match Route::parse(line) {
                Some(route) => routes.push(route),
                None => skipped += 1,
            }
        }
        if skipped > 0 {
            log::warn!("routes: skipped {skipped} malformed rows");
        }
        Ok(Self { routes })
    }

    /// A handful of routes for when the CSV cannot be loaded.
    pub fn fallback() -> Self {
        let route = |category: &str, origin: &str, o: LngLat, destination: &str, d: LngLat, n: u32| Route {
            category: category.to_string(),
            origin: origin.to_string(),
            origin_pos: o,
            destination: destination.to_string(),
            destination_pos: d,
            ingredients: n,
        };
        let spain = [-3.70, 40.42];
        let manila = [120.98, 14.60];
        let veracruz = [-96.13, 19.17];
        let puebla = [-98.20, 19.04];
        Self {
            routes: vec![
                route("Carnes y Mariscos", "España", spain, "Veracruz", veracruz, 12),
                route("Carnes y Mariscos", "España", spain, "Puebla", puebla, 6),
                route("Condimentos, Aceites y Endulzantes", "Filipinas", manila, "CDMX", [-99.13, 19.43], 8),
                route("Condimentos, Aceites y Endulzantes", "España", spain, "Puebla", puebla, 9),
                route("Verduras y Hierbas", "España", spain, "Oaxaca", [-96.73, 17.06], 4),
            ],
        }
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Distinct categories in order of first appearance.
    pub fn categories(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for r in &self.routes {
            if !out.contains(&r.category.as_str()) {
                out.push(&r.category);
            }
        }
        out
    }

    pub fn routes_in<'a>(&'a self, category: &'a str) -> impl Iterator<Item = &'a Route> + 'a {
        self.routes.iter().filter(move |r| r.category == category)
    }

    pub fn filter(&self, category: &str) -> Vec<Connection> {
        self.routes_in(category)
            .map(|r| Connection {
                category: r.category.clone(),
                origin: r.origin.clone(),
                destination: r.destination.clone(),
                ingredients: r.ingredients,
                color: route_color(&r.category),
                width: route_width(r.ingredients),
                coordinates: r.arc(),
            })
            .collect()
    }

    /// Ingredient totals per origin → destination pair, largest first.
    pub fn top_routes(&self, category: &str, limit: usize) -> Vec<TopRoute> {
        let mut order: Vec<String> = Vec::new();
        let mut totals: HashMap<String, u32> = HashMap::new();
        for r in self.routes_in(category) {
            let key = r.key();
            if !totals.contains_key(&key) {
                order.push(key.clone());
            }
            *totals.entry(key).or_default() += r.ingredients;
        }
        let mut top: Vec<TopRoute> = order
            .into_iter()
            .map(|route| {
                let ingredients = totals.get(&route).copied().unwrap_or_default();
                TopRoute { route, ingredients }
            })
            .collect();
        // Stable: ties keep first-seen order.
        top.sort_by(|a, b| b.ingredients.cmp(&a.ingredients));
        top.truncate(limit);
        top
    }

    /// Ingredient totals per destination state, largest first.
    pub fn state_totals(&self, category: &str) -> Vec<StateTotal> {
        let mut totals: Vec<StateTotal> = Vec::new();
        for r in self.routes_in(category).filter(|r| is_mexican_state(&r.destination)) {
            match totals.iter_mut().find(|t| t.state == r.destination) {
                Some(t) => t.ingredients += r.ingredients,
                None => totals.push(StateTotal {
                    state: r.destination.clone(),
                    ingredients: r.ingredients,
                }),
            }
        }
        totals.sort_by(|a, b| b.ingredients.cmp(&a.ingredients));
        totals
    }

    /// Both endpoints of every route outside Mexico, keyed by name and
    /// position, in first-seen order.
    pub fn origin_markers(&self, category: &str) -> Vec<OriginMarker> {
        let mut markers: Vec<OriginMarker> = Vec::new();
        let endpoints = self.routes_in(category).flat_map(|r| {
            [
                (&r.origin, r.origin_pos, r.ingredients),
                (&r.destination, r.destination_pos, r.ingredients),
            ]
        });
        for (name, position, ingredients) in endpoints {
            if is_mexican_state(name) {
                continue;
            }
            match markers.iter_mut().find(|m| &m.name == name && m.position == position) {
                Some(m) => m.ingredients += ingredients,
                None => markers.push(OriginMarker {
                    name: name.clone(),
                    position,
                    ingredients,
                    size: 0.0,
                }),
            }
        }
        for m in &mut markers {
            m.size = marker_size(m.ingredients);
        }
        markers
    }
}
