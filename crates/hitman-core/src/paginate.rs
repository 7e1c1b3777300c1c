use crate::error::{HitmanError, Result};
use crate::types::Page;

/// Drain a cursor-paginated listing.
///
/// Calls `fetch` with `None`, then with each returned cursor, until a page
/// comes back empty or without a cursor. Items keep server order. A listing
/// with no results yields an empty `Vec`.
pub fn fetch_all<T, F>(mut fetch: F) -> Result<Vec<T>>
where
    F: FnMut(Option<&str>) -> Result<Page<T>>,
{
    let mut items = Vec::new();
    let mut cursor: Option<String> = None;
    let mut pages = 0usize;
    loop {
        let page = fetch(cursor.as_deref())?;
        pages += 1;
        let last = page.is_last();
        let next = page.next_token;
        items.extend(page.items);
        if last {
            break;
        }
        if next.is_some() && next == cursor {
            return Err(HitmanError::Protocol(format!(
                "pagination cursor did not advance after page {pages}"
            )));
        }
        cursor = next;
    }
    tracing::debug!(pages, items = items.len(), "listing drained");
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Serve `total` integers in pages of `size`, the way the marketplace does:
    /// a cursor on every non-empty page and an empty final page.
    fn paged(total: usize, size: usize) -> impl FnMut(Option<&str>) -> Result<Page<usize>> {
        move |cursor| {
            let start: usize = cursor.map(|c| c.parse().unwrap()).unwrap_or(0);
            let end = (start + size).min(total);
            let items: Vec<usize> = (start..end).collect();
            let next = if items.is_empty() {
                None
            } else {
                Some(end.to_string())
            };
            Ok(Page::new(items, next))
        }
    }

    #[test]
    fn returns_every_record_regardless_of_page_size() {
        for size in [1, 2, 5, 10, 12, 100] {
            let all = fetch_all(paged(12, size)).unwrap();
            assert_eq!(all, (0..12).collect::<Vec<_>>(), "page size {size}");
        }
    }

    #[test]
    fn empty_listing_is_not_an_error() {
        let all = fetch_all(paged(0, 10)).unwrap();
        assert!(all.is_empty());
    }

    #[test]
    fn stops_when_cursor_is_absent() {
        let mut calls = 0;
        let all = fetch_all(|_| {
            calls += 1;
            Ok(Page::new(vec!["a", "b"], None))
        })
        .unwrap();
        assert_eq!(all, vec!["a", "b"]);
        assert_eq!(calls, 1);
    }

    #[test]
    fn propagates_fetch_errors() {
        let err = fetch_all::<u8, _>(|_| Err(HitmanError::Protocol("boom".into()))).unwrap_err();
        assert!(matches!(err, HitmanError::Protocol(_)));
    }

    #[test]
    fn stuck_cursor_is_a_protocol_error() {
        let err = fetch_all(|_| Ok(Page::new(vec![1u8], Some("same".into())))).unwrap_err();
        assert!(matches!(err, HitmanError::Protocol(_)));
    }
}
