//! Request correlation middleware.
//!
//! Every request runs inside a [`TraceId`] scope. A caller may supply its own
//! id in the `trace-id` request header so a follow-then-fetch sequence from
//! one client shares a single id. Anything [`TraceId::from_caller`] refuses is
//! ignored and a fresh id is generated. The id is echoed on the response,
//! and each request ends with one log line carrying status and latency.

use std::rc::Rc;
use std::time::Instant;

use actix_web::Error;
use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready};
use actix_web::http::header::{HeaderName, HeaderValue};
use futures_util::future::{LocalBoxFuture, Ready, ready};
use tracing::{Instrument, info, info_span, warn};

use crate::domain::{TRACE_ID_HEADER, TraceId};

/// Middleware factory; wrap the app with it once.
///
/// # Examples
/// ```
/// use actix_web::App;
/// use socialgraph::Trace;
///
/// let app = App::new().wrap(Trace);
/// ```
#[derive(Clone, Copy, Default)]
pub struct Trace;

impl<S, B> Transform<S, ServiceRequest> for Trace
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = TraceMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(TraceMiddleware {
            service: Rc::new(service),
        }))
    }
}

/// Service produced by [`Trace`].
pub struct TraceMiddleware<S> {
    service: Rc<S>,
}

/// Reuse an acceptable caller id, otherwise mint one.
fn inbound_trace_id(req: &ServiceRequest) -> TraceId {
    req.headers()
        .get(TRACE_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(TraceId::from_caller)
        .unwrap_or_else(TraceId::generate)
}

impl<S, B> Service<ServiceRequest> for TraceMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let trace_id = inbound_trace_id(&req);
        let span = info_span!(
            "request",
            trace_id = %trace_id,
            method = %req.method(),
            path = %req.path()
        );
        let service = Rc::clone(&self.service);
        let started = Instant::now();

        Box::pin(TraceId::scope(
            trace_id,
            async move {
                let mut res = service.call(req).await?;
                match HeaderValue::from_str(&trace_id.to_string()) {
                    Ok(value) => {
                        res.headers_mut()
                            .insert(HeaderName::from_static(TRACE_ID_HEADER), value);
                    }
                    Err(error) => warn!(%error, "trace id is not a valid header value"),
                }
                info!(
                    status = res.status().as_u16(),
                    elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
                    "request completed"
                );
                Ok(res)
            }
            .instrument(span),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ApiResult;
    use actix_web::{App, HttpResponse, test, web};
    use rstest::rstest;

    async fn echo_trace_id() -> HttpResponse {
        match TraceId::current() {
            Some(id) => HttpResponse::Ok().body(id.to_string()),
            None => HttpResponse::InternalServerError().finish(),
        }
    }

    async fn missing_user() -> ApiResult<HttpResponse> {
        Err(crate::domain::Error::not_found("user does not exist"))
    }

    fn header(res: &ServiceResponse) -> String {
        res.headers()
            .get(TRACE_ID_HEADER)
            .expect("trace id header")
            .to_str()
            .expect("ascii header")
            .to_owned()
    }

    #[rstest]
    #[case::absent(None, false)]
    #[case::garbage(Some("not-a-uuid"), false)]
    #[case::nil(Some("00000000-0000-0000-0000-000000000000"), false)]
    #[case::caller_supplied(Some("6f1c0a52-1c44-4d3a-9d6e-6b8a4f5c2e10"), true)]
    #[actix_web::test]
    async fn handler_sees_the_echoed_trace_id(
        #[case] supplied: Option<&str>,
        #[case] reused: bool,
    ) {
        let app = test::init_service(
            App::new()
                .wrap(Trace)
                .route("/", web::get().to(echo_trace_id)),
        )
        .await;
        let mut req = test::TestRequest::get().uri("/");
        if let Some(value) = supplied {
            req = req.insert_header((TRACE_ID_HEADER, value));
        }

        let res = test::call_service(&app, req.to_request()).await;
        let echoed = header(&res);
        let body = test::read_body(res).await;
        assert_eq!(std::str::from_utf8(&body).expect("utf8"), echoed);
        assert_eq!(supplied == Some(echoed.as_str()), reused);
    }

    #[actix_web::test]
    async fn error_bodies_carry_the_request_trace_id() {
        let app = test::init_service(
            App::new()
                .wrap(Trace)
                .route("/", web::get().to(missing_user)),
        )
        .await;
        let res = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
        let echoed = header(&res);
        let body: crate::domain::Error = test::read_body_json(res).await;
        assert_eq!(body.trace_id(), Some(echoed.as_str()));
    }
}
