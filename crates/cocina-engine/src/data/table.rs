//! Pipe-delimited text tables.

use super::DataError;

/// Pipe-delimited table with a header row.
///
/// Blank lines are dropped. Rows shorter than the header are kept; their
/// missing fields read as `None`.
#[derive(Debug, Clone)]
pub struct PipeTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl PipeTable {
    pub fn parse(text: &str) -> Result<Self, DataError> {
        let mut lines = text
            .lines()
            .map(|line| line.trim_end_matches('\r'))
            .filter(|line| !line.trim().is_empty());

        let header = lines.next().ok_or(DataError::Empty)?;
        let headers = split(header);
        let rows = lines.map(split).collect();
        Ok(Self { headers, rows })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of the column named `fragment`, or else the first whose header
    /// contains it.
    pub fn column(&self, fragment: &str) -> Result<usize, DataError> {
        self.headers
            .iter()
            .position(|h| h == fragment)
            .or_else(|| self.headers.iter().position(|h| h.contains(fragment)))
            .ok_or_else(|| DataError::MissingColumn(fragment.to_string()))
    }

    /// Trimmed, non-empty field `col` of `row`.
    pub fn field(row: &[String], col: usize) -> Option<&str> {
        row.get(col).map(|s| s.as_str()).filter(|s| !s.is_empty())
    }
}

fn split(line: &str) -> Vec<String> {
    line.split('|').map(|f| f.trim().to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "NOMBRE DEL PLATILLO|ORIGEN_Platillo|Ingrediente\r\n\
                       Pozole|Jalisco|MAIZ\r\n\
                       \r\n\
                       Sopa| Puebla \r\n";

    #[test]
    fn parses_header_and_rows() {
        let table = PipeTable::parse(CSV).unwrap();
        assert_eq!(table.headers().len(), 3);
        assert_eq!(table.len(), 2, "blank line dropped");
        assert_eq!(table.rows()[1][1], "Puebla");
    }

    #[test]
    fn short_rows_yield_none() {
        let table = PipeTable::parse(CSV).unwrap();
        let col = table.column("Ingrediente").unwrap();
        assert_eq!(PipeTable::field(&table.rows()[0], col), Some("MAIZ"));
        assert_eq!(PipeTable::field(&table.rows()[1], col), None);
    }

    #[test]
    fn columns_by_fragment() {
        let table = PipeTable::parse("Cultura_prehispánica_Ingrediente|Ingrediente\n").unwrap();
        assert_eq!(table.column("Ingrediente").unwrap(), 1, "exact name wins");
        assert_eq!(table.column("Cultura").unwrap(), 0);
        assert!(matches!(table.column("Epoca"), Err(DataError::MissingColumn(_))));
    }

    #[test]
    fn empty_input_is_an_error() {
        assert!(matches!(PipeTable::parse(" \n\n"), Err(DataError::Empty)));
    }
}
