//! HTTP surface
//!
//! One catch-all warp filter: capture everything [`App::handle`] needs,
//! call it, and decorate the result with JSON and CORS headers.

use crate::app::{ApiRequest, ApiResponse, App};
use std::collections::HashMap;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use warp::http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
    CONTENT_TYPE, ORIGIN,
};
use warp::http::{HeaderMap, HeaderValue, Method};
use warp::hyper::body::Bytes;
use warp::hyper::Body;
use warp::path::FullPath;
use warp::reply::Response;
use warp::{Filter, Rejection};

const ALLOW_METHODS: &str = "GET, POST, PUT, DELETE, OPTIONS";
const ALLOW_HEADERS: &str = "Content-Type, Authorization";

/// Filter serving the whole API
pub fn routes(app: Arc<App>) -> impl Filter<Extract = (Response,), Error = Rejection> + Clone {
    let query = warp::query::<HashMap<String, String>>()
        .or(warp::any().map(HashMap::<String, String>::new))
        .unify();

    warp::method()
        .and(warp::path::full())
        .and(query)
        .and(warp::header::headers_cloned())
        .and(warp::addr::remote())
        .and(warp::body::bytes())
        .map(
            move |method: Method,
                  path: FullPath,
                  query: HashMap<String, String>,
                  headers: HeaderMap,
                  remote_addr: Option<SocketAddr>,
                  body: Bytes| {
                let request = ApiRequest {
                    method,
                    path: path.as_str().to_string(),
                    query,
                    headers,
                    remote_addr,
                    body: body.to_vec(),
                };
                let origin = request.header(ORIGIN.as_str()).map(str::to_string);
                let response = app.handle(request);
                into_reply(&app, &response, origin.as_deref())
            },
        )
}

/// Convert an [`ApiResponse`] into a hyper response with CORS headers
#[must_use]
pub fn into_reply(app: &App, response: &ApiResponse, origin: Option<&str>) -> Response {
    let mut reply = Response::new(Body::from(response.body_bytes()));
    *reply.status_mut() = response.status;

    let allow_origin = app.origins().allow_origin_header(origin);
    let headers = reply.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(
        ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_str(allow_origin).unwrap_or_else(|_| HeaderValue::from_static("*")),
    );
    headers.insert(ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static(ALLOW_METHODS));
    headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static(ALLOW_HEADERS));
    reply
}

/// Bind `addr` and serve until `shutdown` resolves
///
/// # Errors
/// When the address cannot be bound.
pub async fn serve(
    app: Arc<App>,
    addr: SocketAddr,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let (bound, server) = warp::serve(routes(app)).try_bind_with_graceful_shutdown(addr, shutdown)?;
    tracing::info!(target: "lifecycle", addr = %bound, "listening");
    server.await;
    tracing::info!(target: "lifecycle", "server stopped");
    Ok(())
}
