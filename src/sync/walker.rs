use crate::error::{AppError, Result};
use crate::feed::FeedClient;
use crate::models::Post;

/// Everything a finished pagination walk collected.
#[derive(Debug, Default)]
pub struct PostsWalk {
    pub posts: Vec<Post>,
    pub pages: usize,
}

/// Follows the posts feed page by page until it reports no more pages.
///
/// Nothing is persisted here. On the first failed page the accumulated posts
/// are dropped and the error is returned, so a caller either gets every page
/// or nothing.
pub async fn walk_posts(
    client: &dyn FeedClient,
    start: Option<String>,
    max_pages: usize,
) -> Result<PostsWalk> {
    let mut cursor = start;
    let mut walk = PostsWalk::default();

    loop {
        if walk.pages >= max_pages {
            return Err(AppError::Pagination(format!(
                "posts feed still reports more pages after {max_pages} pages"
            )));
        }

        let page = client.get_posts(cursor.as_deref()).await?;
        walk.pages += 1;
        tracing::debug!(
            "Retrieved page {} with {} posts (has_more: {})",
            walk.pages,
            page.posts.len(),
            page.has_more
        );
        walk.posts.extend(page.posts);

        if !page.has_more {
            break;
        }

        // Without a cursor the next request would be page one again.
        match page.next_cursor {
            Some(next) => cursor = Some(next),
            None => {
                return Err(AppError::Pagination(format!(
                    "page {} reports more posts but carries no cursor",
                    walk.pages
                )))
            }
        }
    }

    Ok(walk)
}
