mod push;
mod repository;
mod schema;

pub use repository::Repository;
pub use schema::POSTS_CURSOR;
