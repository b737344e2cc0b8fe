use serde::{Deserialize, Serialize};

/// Default page size when `_count` is absent
pub const DEFAULT_PAGE_SIZE: i64 = 20;
/// Upper bound for `_count`
pub const MAX_PAGE_SIZE: i64 = 100;

/// Paging query parameters shared by every list endpoint
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageParams {
    #[serde(rename = "_count")]
    pub count: Option<i64>,
    #[serde(rename = "_offset")]
    pub offset: Option<i64>,
}

impl PageParams {
    pub fn new(count: Option<i64>, offset: Option<i64>) -> Self {
        Self { count, offset }
    }

    /// Page size clamped to `1..=MAX_PAGE_SIZE`
    pub fn limit(&self) -> i64 {
        self.count
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE)
    }

    /// Offset, never negative
    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}

/// Navigation link of a page
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PageLink {
    pub relation: String,
    pub url: String,
}

/// One page of a list response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub total: i64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub link: Vec<PageLink>,
    pub items: Vec<T>,
}

impl<T> Page<T> {
    /// Build a page with self/previous/next links.
    ///
    /// `base` is the request path including any filter query string but
    /// without the paging parameters.
    pub fn new(base: &str, params: PageParams, total: i64, items: Vec<T>) -> Self {
        let limit = params.limit();
        let offset = params.offset();
        let sep = if base.contains('?') { '&' } else { '?' };
        let url = |off: i64| format!("{base}{sep}_count={limit}&_offset={off}");

        let mut link = vec![PageLink {
            relation: "self".to_string(),
            url: url(offset),
        }];
        if offset > 0 {
            link.push(PageLink {
                relation: "previous".to_string(),
                url: url((offset - limit).max(0)),
            });
        }
        let next = offset.saturating_add(limit);
        if next < total {
            link.push(PageLink {
                relation: "next".to_string(),
                url: url(next),
            });
        }

        Self { total, link, items }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn relations<T>(page: &Page<T>) -> Vec<&str> {
        page.link.iter().map(|l| l.relation.as_str()).collect()
    }

    #[test]
    fn limit_is_clamped() {
        assert_eq!(PageParams::default().limit(), DEFAULT_PAGE_SIZE);
        assert_eq!(PageParams::new(Some(0), None).limit(), 1);
        assert_eq!(PageParams::new(Some(5000), None).limit(), MAX_PAGE_SIZE);
        assert_eq!(PageParams::new(None, Some(-3)).offset(), 0);
    }

    #[test]
    fn first_page_has_next_only() {
        let page = Page::new("/api/patients", PageParams::new(Some(1), None), 3, vec![1]);
        assert_eq!(relations(&page), vec!["self", "next"]);
        assert_eq!(page.link[1].url, "/api/patients?_count=1&_offset=1");
    }

    #[test]
    fn middle_page_keeps_filters() {
        let page = Page::new(
            "/api/patients?name=ann",
            PageParams::new(Some(1), Some(1)),
            3,
            vec![1],
        );
        assert_eq!(relations(&page), vec!["self", "previous", "next"]);
        assert_eq!(page.link[0].url, "/api/patients?name=ann&_count=1&_offset=1");
        assert_eq!(page.link[1].url, "/api/patients?name=ann&_count=1&_offset=0");
    }

    #[test]
    fn last_page_has_previous_only() {
        let page = Page::new("/api/ledger", PageParams::new(Some(2), Some(2)), 3, vec![1]);
        assert_eq!(relations(&page), vec!["self", "previous"]);
    }

    #[test]
    fn huge_offset_has_no_next() {
        let page: Page<i32> =
            Page::new("/api/ledger", PageParams::new(Some(20), Some(i64::MAX)), 5, vec![]);
        assert_eq!(relations(&page), vec!["self", "previous"]);
        assert_eq!(
            page.link[1].url,
            format!("/api/ledger?_count=20&_offset={}", i64::MAX - 20)
        );
    }
}
