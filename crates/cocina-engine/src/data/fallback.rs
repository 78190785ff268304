//! Small embedded datasets drawn when a CSV cannot be loaded.

use super::counts::CategoryCount;

pub fn culture_counts() -> Vec<CategoryCount> {
    vec![
        CategoryCount::new("Olmeca", 4),
        CategoryCount::new("Purépecha", 6),
        CategoryCount::new("Zapoteca", 9),
        CategoryCount::new("Maya", 14),
        CategoryCount::new("Mexica", 21),
    ]
}

pub fn dishes_by_state(ingredient: &str) -> Vec<CategoryCount> {
    let states: &[(&str, u32)] = match ingredient.trim().to_uppercase().as_str() {
        "MAIZ" => &[("Jalisco", 5), ("Oaxaca", 8), ("Puebla", 7), ("Yucatán", 4)],
        "FRIJOL" => &[("Michoacán", 4), ("Oaxaca", 7), ("Veracruz", 5)],
        "CHILE" => &[("Oaxaca", 6), ("Puebla", 9), ("Yucatán", 3)],
        "CALABAZA" => &[("Jalisco", 2), ("Michoacán", 3), ("Puebla", 4)],
        "CACAO" => &[("Chiapas", 3), ("Oaxaca", 6), ("Tabasco", 4)],
        _ => &[("Oaxaca", 3), ("Puebla", 2)],
    };
    states.iter().map(|&(label, count)| CategoryCount::new(label, count)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_shapes_match_the_primary_ordering() {
        let cultures = culture_counts();
        assert!(cultures.windows(2).all(|w| w[0].count <= w[1].count));
        let states = dishes_by_state("maiz");
        assert!(states.windows(2).all(|w| w[0].label < w[1].label));
        for ingredient in ["FRIJOL", "CALABAZA", "CACAO"] {
            let states = dishes_by_state(ingredient);
            assert!(states.windows(2).all(|w| w[0].label < w[1].label));
            assert_ne!(states, dishes_by_state("OTRO"), "{ingredient} has its own data");
        }
    }
}
