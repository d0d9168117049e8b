use crate::server::ServerRouter;
use axum::Router;

mod auth;
mod posts;
mod social;
mod users;

pub fn routes() -> ServerRouter {
    Router::new()
        .merge(auth::routes())
        .merge(posts::routes())
        .merge(social::routes())
        .merge(users::routes())
}
