//! Route dispatch logic for the Admin API.

use crate::admin_api::handlers::{resources, system};
use crate::coordinator::Coordinator;
use crate::response::not_found;
use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::{Method, Request, Response};
use std::sync::Arc;
use tracing::debug;

/// Main request router
pub async fn route_request(
    req: Request<Incoming>,
    coordinator: Arc<Coordinator>,
) -> Result<Response<Full<Bytes>>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    debug!("Admin API: {} {}", method, path);

    Ok(route_by_path(&method, &path, &coordinator).await)
}

async fn route_by_path(method: &Method, path: &str, coordinator: &Coordinator) -> Response<Full<Bytes>> {
    match (method, path.trim_end_matches('/')) {
        (&Method::GET, "/health") => system::handle_health(coordinator),
        (&Method::GET, "/metrics") => system::handle_metrics(),
        (&Method::GET, "/resources") => resources::handle_list(coordinator),
        (&Method::POST, "/admin/reset") => resources::handle_reset(coordinator),
        (&Method::POST, "/admin/reload") => system::handle_reload(coordinator).await,
        _ => not_found(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::responder::ExampleResponder;
    use hyper::StatusCode;

    fn coordinator() -> Coordinator {
        Coordinator::new(Arc::new(Config::default()), Arc::new(ExampleResponder::new()))
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let resp = route_by_path(&Method::GET, "/imposters", &coordinator()).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        // reset only accepts POST
        let resp = route_by_path(&Method::GET, "/admin/reset", &coordinator()).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_trailing_slash() {
        let resp = route_by_path(&Method::GET, "/resources/", &coordinator()).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
