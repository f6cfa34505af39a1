use serde::Deserialize;

/// One page of a list endpoint.
///
/// List endpoints answer either a bare JSON array or the paginated
/// `{count, next, previous, results}` object; both deserialize into this.
/// A bare array is a single page with `count == results.len()`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(
    from = "PageRepr<T>",
    bound(deserialize = "T: Deserialize<'de>")
)]
pub struct Page<T> {
    pub count: u64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

#[derive(Deserialize)]
#[serde(untagged, bound(deserialize = "T: Deserialize<'de>"))]
enum PageRepr<T> {
    Paginated {
        #[serde(default)]
        count: Option<u64>,
        #[serde(default)]
        next: Option<String>,
        #[serde(default)]
        previous: Option<String>,
        results: Vec<T>,
    },
    Bare(Vec<T>),
}

impl<T> From<PageRepr<T>> for Page<T> {
    fn from(repr: PageRepr<T>) -> Self {
        match repr {
            PageRepr::Paginated {
                count,
                next,
                previous,
                results,
            } => Page {
                count: count.unwrap_or(results.len() as u64),
                next,
                previous,
                results,
            },
            PageRepr::Bare(results) => Page {
                count: results.len() as u64,
                next: None,
                previous: None,
                results,
            },
        }
    }
}

impl<T> Page<T> {
    pub fn has_next(&self) -> bool {
        self.next.is_some()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.results.iter()
    }
}

impl<T> IntoIterator for Page<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a Page<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.iter()
    }
}
