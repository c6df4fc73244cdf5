use axum::Router;

pub mod feed;
pub mod msg;
pub mod node;
pub mod perm;
pub mod sub;
pub mod timeline;

use crate::ServiceState;

pub fn router(state: ServiceState) -> Router<ServiceState> {
    Router::new()
        .nest("/feed", feed::router(state.clone()))
        .nest("/sub", sub::router(state.clone()))
        .nest("/timeline", timeline::router(state.clone()))
        .nest("/msg", msg::router(state.clone()))
        .nest("/perm", perm::router(state.clone()))
        .nest("/node", node::router(state.clone()))
        .with_state(state)
}
