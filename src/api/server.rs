use crate::api::routes;
use crate::config::Shared;
use crate::solver::DynSolver;
use std::future::Future;

#[derive(Clone)]
pub(super) struct AppState {
    pub config: Shared,
    pub solver: DynSolver,
}

/// Serve the HTTP API on [`Config::api_bind_addr`][crate::config::Config::api_bind_addr].
pub fn new(config: Shared, solver: DynSolver) -> impl Future<Output = hyper::Result<()>> {
    axum::Server::bind(&config.api_bind_addr)
        .serve(routes::new(AppState { config, solver }).into_make_service())
}
