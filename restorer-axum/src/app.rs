use axum::handler::Handler;
use axum::http::HeaderName;
use axum::routing::get;
use axum::Router;
use tokio::net::{TcpListener, ToSocketAddrs};
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Router builder shared by restorer binaries and tests.
#[derive(Clone, Default)]
pub struct AxumApp {
    pub router: Router<()>,
}

impl AxumApp {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge routes at the root.
    pub fn merge(mut self, router: Router<()>) -> Self {
        self.router = self.router.merge(router);
        self
    }

    /// Nest routes under a path prefix.
    pub fn use_router(mut self, path: &str, router: Router<()>) -> Self {
        self.router = self.router.nest(path, router);
        self
    }

    /// Mount the same routes at the root and under `prefix`.
    ///
    /// An empty or `/` prefix mounts at the root only.
    pub fn mount(self, prefix: &str, router: Router<()>) -> Self {
        let prefix = prefix.trim_end_matches('/');
        let app = self.merge(router.clone());
        if prefix.is_empty() {
            app
        } else {
            app.use_router(prefix, router)
        }
    }

    pub fn use_get<H, T>(mut self, path: &str, handler: H) -> Self
    where
        H: Handler<T, ()> + Clone + Send + Sync + 'static,
        T: 'static,
    {
        self.router = self.router.route(path, get(handler));
        self
    }

    /// Request tracing, `x-request-id` generation/propagation, permissive CORS.
    pub fn with_default_layers(mut self) -> Self {
        let header = HeaderName::from_static(REQUEST_ID_HEADER);
        self.router = self
            .router
            .layer(PropagateRequestIdLayer::new(header.clone()))
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::new(header, MakeRequestUuid))
            .layer(CorsLayer::permissive());
        self
    }

    pub fn into_router(self) -> Router<()> {
        self.router
    }

    pub async fn listen<A>(self, addr: A) -> anyhow::Result<()>
    where
        A: ToSocketAddrs,
    {
        let listener = TcpListener::bind(addr).await?;
        tracing::info!(addr = %listener.local_addr()?, "listening");
        self.serve(listener).await
    }

    /// Serve on an already bound listener.
    pub async fn serve(self, listener: TcpListener) -> anyhow::Result<()> {
        axum::serve(listener, self.router).await?;
        Ok(())
    }
}
