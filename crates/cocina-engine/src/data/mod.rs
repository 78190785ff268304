pub mod counts;
pub mod fallback;
pub mod table;

use thiserror::Error;

/// Inline notice shown next to a view drawn from embedded data.
pub const FALLBACK_NOTICE: &str = "Datos de demostración";

#[derive(Debug, Error)]
pub enum DataError {
    #[error("input is empty")]
    Empty,
    #[error("missing column {0:?}")]
    MissingColumn(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    Primary,
    Fallback,
}

/// A value together with where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset<T> {
    pub value: T,
    pub source: DataSource,
}

impl<T> Dataset<T> {
    pub fn primary(value: T) -> Self {
        Self { value, source: DataSource::Primary }
    }

    pub fn fallback(value: T) -> Self {
        Self { value, source: DataSource::Fallback }
    }

    /// Use the primary result, or log the failure and fall back.
    pub fn or_fallback<E: std::fmt::Display>(
        result: Result<T, E>,
        what: &str,
        fallback: impl FnOnce() -> T,
    ) -> Self {
        match result {
            Ok(value) => Self::primary(value),
            Err(err) => {
                log::warn!("{what}: {err}, using embedded data");
                Self::fallback(fallback())
            }
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.source == DataSource::Fallback
    }

    pub fn notice(&self) -> Option<&'static str> {
        self.is_fallback().then_some(FALLBACK_NOTICE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_carries_notice() {
        let d: Dataset<Vec<u32>> = Dataset::or_fallback(Err(DataError::Empty), "test", || vec![1]);
        assert!(d.is_fallback());
        assert_eq!(d.notice(), Some(FALLBACK_NOTICE));
        assert_eq!(d.value, vec![1]);

        let ok = Dataset::or_fallback(Ok::<_, DataError>(vec![2]), "test", Vec::new);
        assert_eq!(ok.notice(), None);
        assert_eq!(ok.source, DataSource::Primary);
    }
}
