//! Pagination Engine
//!
//! Slices an ordered collection into fixed-size pages. The reported `total`
//! is the length of the returned slice, not of the whole collection.

use std::collections::HashMap;

use crate::error::{DirectoryError, DirectoryResult, MSG_BAD_PAGE_PARAMS, MSG_NO_PAGE_PARAMS};

/// Requested window; both values are at least 1
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub size: u64,
}

impl PageRequest {
    /// Read `page` and `size` from query parameters
    ///
    /// `loc` names the endpoint in the validation error.
    pub fn from_query(query: &HashMap<String, String>, loc: &'static str) -> DirectoryResult<Self> {
        let (Some(page), Some(size)) = (query.get("page"), query.get("size")) else {
            return Err(DirectoryError::PageParams {
                loc,
                msg: MSG_NO_PAGE_PARAMS,
            });
        };

        let positive = |raw: &str| raw.trim().parse::<u64>().ok().filter(|n| *n >= 1);

        match (positive(page), positive(size)) {
            (Some(page), Some(size)) => Ok(Self { page, size }),
            _ => Err(DirectoryError::PageParams {
                loc,
                msg: MSG_BAD_PAGE_PARAMS,
            }),
        }
    }
}

/// One page of items plus the echo of the request
#[derive(Debug)]
pub struct PageSlice<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub size: u64,
}

/// Cut page `request.page` out of `items`
///
/// Fails with `NoSuchPage` when the window starts at or past the end,
/// including when `items` is empty.
pub fn paginate<T>(items: Vec<T>, request: PageRequest) -> DirectoryResult<PageSlice<T>> {
    let len = items.len() as u64;
    let start = (request.page - 1).saturating_mul(request.size);

    if start >= len {
        return Err(DirectoryError::NoSuchPage);
    }

    let end = request.page.saturating_mul(request.size).min(len);

    let items: Vec<T> = items
        .into_iter()
        .skip(start as usize)
        .take((end - start) as usize)
        .collect();

    Ok(PageSlice {
        total: items.len() as u64,
        items,
        page: request.page,
        size: request.size,
    })
}
