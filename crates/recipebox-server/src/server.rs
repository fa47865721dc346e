use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    middleware,
    routing::{delete, get},
};
use recipebox_auth::JwtIdentityVerifier;
use recipebox_auth::middleware::AuthState;
use recipebox_db_memory::InMemoryStore;
use recipebox_storage::RecordStore;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::cache::{CacheCoordinator, create_cache_store};
use crate::config::AppConfig;
use crate::handlers::{self, AppState};
use crate::rate_limit::{self, RateLimiter};
use crate::service::ResourceService;

pub struct RecipeboxServer {
    addr: SocketAddr,
    app: Router,
}

pub fn build_router(state: AppState) -> Router {
    let mut api = Router::new()
        .route("/users/me", get(handlers::me))
        .route(
            "/groups",
            get(handlers::list_my_groups).post(handlers::create_group),
        )
        .route(
            "/groups/{id}",
            get(handlers::get_group).delete(handlers::delete_group),
        )
        .route(
            "/groups/{id}/members",
            get(handlers::list_group_members).post(handlers::add_member),
        )
        .route(
            "/groups/{id}/members/{user_id}",
            delete(handlers::remove_member),
        )
        .route(
            "/groups/{id}/recipes",
            get(handlers::list_group_recipes).post(handlers::create_recipe),
        )
        .route("/recipes", get(handlers::list_recipes))
        .route(
            "/recipes/{id}",
            get(handlers::get_recipe)
                .patch(handlers::update_recipe)
                .delete(handlers::delete_recipe),
        );
    if let Some(limiter) = state.rate_limiter.clone() {
        api = api.route_layer(middleware::from_fn_with_state(
            limiter,
            rate_limit::limit_requests,
        ));
    }

    Router::new()
        .route("/healthz", get(handlers::healthz))
        .merge(api)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    use tracing::field::Empty;
                    tracing::info_span!(
                        "http.request",
                        http.method = %req.method(),
                        http.target = %req.uri(),
                        http.status_code = Empty,
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        span.record(
                            "http.status_code",
                            tracing::field::display(res.status().as_u16()),
                        );
                        tracing::info!(
                            http.status = %res.status().as_u16(),
                            elapsed_ms = %latency.as_millis(),
                            "request handled"
                        );
                    },
                ),
        )
        .with_state(state)
}

/// Wire the service graph from configuration.
pub async fn build_state(cfg: &AppConfig, store: Arc<dyn RecordStore>) -> AppState {
    let cache_store = create_cache_store(&cfg.redis).await;
    let cache = CacheCoordinator::new(
        cache_store,
        cfg.cache.default_ttl,
        cfg.cache.operation_timeout,
    );
    let service = ResourceService::new(store, cache, cfg.cache.storage_timeout);
    let verifier = JwtIdentityVerifier::from_config(&cfg.auth);
    AppState {
        service: Arc::new(service),
        auth: AuthState::new(Arc::new(verifier), cfg.auth.verify_timeout),
        rate_limiter: RateLimiter::from_config(&cfg.rate_limit).map(Arc::new),
    }
}

pub struct ServerBuilder {
    addr: SocketAddr,
    config: AppConfig,
    store: Option<Arc<dyn RecordStore>>,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerBuilder {
    pub fn new() -> Self {
        let cfg = AppConfig::default();
        Self {
            addr: cfg.addr(),
            config: cfg,
            store: None,
        }
    }

    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.addr = cfg.addr();
        self.config = cfg;
        self
    }

    /// Use `store` as the system of record instead of a fresh in-memory one.
    pub fn with_store(mut self, store: Arc<dyn RecordStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub async fn build(self) -> anyhow::Result<RecipeboxServer> {
        self.config.validate()?;
        let store: Arc<dyn RecordStore> = match self.store {
            Some(store) => store,
            None => Arc::new(InMemoryStore::new()),
        };
        tracing::info!(backend = store.backend_name(), "system of record ready");

        let state = build_state(&self.config, store).await;
        let every = self.config.cache.cleanup_interval;
        state.service.cache().start_cleanup_task(every);
        if let Some(limiter) = state.rate_limiter.clone() {
            limiter.start_cleanup_task(every);
        }
        Ok(RecipeboxServer {
            addr: self.addr,
            app: build_router(state),
        })
    }
}

impl RecipeboxServer {
    pub fn router(&self) -> Router {
        self.app.clone()
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("listening on {}", self.addr);
        axum::serve(
            listener,
            self.app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
