use serde::{Deserialize, Serialize};

pub const DEFAULT_LIMIT: usize = 10;
pub const MAX_LIMIT: usize = 100;

/// Offset pagination as accepted by list endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    #[serde(default)]
    pub skip: usize,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    DEFAULT_LIMIT
}

impl Default for Page {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl Page {
    pub fn new(skip: usize, limit: usize) -> Self {
        Self { skip, limit }.normalized()
    }

    /// Clamp `limit` into `1..=MAX_LIMIT`.
    #[must_use]
    pub fn normalized(self) -> Self {
        Self {
            skip: self.skip,
            limit: self.limit.clamp(1, MAX_LIMIT),
        }
    }

    /// Slice an ordered collection.
    pub fn apply<T>(&self, items: impl IntoIterator<Item = T>) -> Vec<T> {
        items.into_iter().skip(self.skip).take(self.limit).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_is_clamped() {
        assert_eq!(Page::new(0, 0).limit, 1);
        assert_eq!(Page::new(0, 1000).limit, MAX_LIMIT);
        assert_eq!(Page::default().limit, DEFAULT_LIMIT);
    }

    #[test]
    fn test_apply_slices() {
        let page = Page::new(2, 3);
        assert_eq!(page.apply(0..10), vec![2, 3, 4]);
        assert_eq!(Page::new(9, 5).apply(0..10), vec![9]);
    }
}
