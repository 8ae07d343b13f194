//! Aggregations over the endpoint wrappers: paging loops and lookups by
//! linear scan, for things the API has no direct endpoint for.

pub mod groups;
pub mod members;
pub mod projects;
pub mod spaces;

pub use groups::GroupsService;
pub use members::MembersService;
pub use projects::ProjectsService;
pub use spaces::{DirectAccess, SpacesService};

use crate::api::common::{Paginated, PaginationParams};
use crate::api::ApiError;
use std::future::Future;

/// Upper bound on pages fetched by one listing
const MAX_PAGES: u32 = 500;

/// Fetches pages until the server reports no more
pub(crate) async fn collect_pages<T, F, Fut>(mut fetch: F) -> Result<Vec<T>, ApiError>
where
    F: FnMut(PaginationParams) -> Fut,
    Fut: Future<Output = Result<Paginated<T>, ApiError>>,
{
    let mut params = PaginationParams::new();
    let mut items = Vec::new();

    for _ in 0..MAX_PAGES {
        let page = fetch(params).await?;
        let more = page.has_more() && !page.data.is_empty();
        items.extend(page.data);
        if !more {
            return Ok(items);
        }
        params = params.next();
    }

    tracing::warn!(max_pages = MAX_PAGES, "stopped paging before the last page");
    Ok(items)
}
