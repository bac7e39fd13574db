//! Liveness and readiness probes.
//!
//! Readiness combines two signals: the server has bound its socket, and the
//! configured store answers a probe. A server whose database went away keeps
//! reporting live (restarting it would not help) but stops reporting ready so
//! the load balancer drains it.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use actix_web::{HttpResponse, get, http::header, web};
use futures_util::future::BoxFuture;
use tracing::warn;

/// Asynchronous check that the backing store is reachable.
pub type StoreProbe = Arc<dyn Fn() -> BoxFuture<'static, bool> + Send + Sync>;

/// Shared probe state.
pub struct HealthState {
    ready: AtomicBool,
    live: AtomicBool,
    store_probe: Option<StoreProbe>,
}

impl Default for HealthState {
    fn default() -> Self {
        Self {
            ready: AtomicBool::new(false),
            live: AtomicBool::new(true),
            store_probe: None,
        }
    }
}

impl HealthState {
    /// Not ready, live, no store probe.
    pub fn new() -> Self {
        Self::default()
    }

    /// Consult `probe` on every readiness check.
    #[must_use]
    pub fn with_store_probe(mut self, probe: StoreProbe) -> Self {
        self.store_probe = Some(probe);
        self
    }

    pub fn mark_ready(&self) {
        self.ready.store(true, Ordering::Release);
    }

    /// Fail liveness from now on, e.g. while draining for shutdown.
    pub fn mark_unhealthy(&self) {
        self.live.store(false, Ordering::Release);
    }

    pub fn is_alive(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }

    /// Bound and, when a probe is configured, able to reach the store.
    pub async fn check_ready(&self) -> bool {
        if !self.ready.load(Ordering::Acquire) {
            return false;
        }
        match &self.store_probe {
            Some(probe) => {
                let reachable = probe().await;
                if !reachable {
                    warn!("readiness probe: store unreachable");
                }
                reachable
            }
            None => true,
        }
    }
}

fn probe_response(probe_ok: bool) -> HttpResponse {
    let mut response = if probe_ok {
        HttpResponse::Ok()
    } else {
        HttpResponse::ServiceUnavailable()
    };
    response
        .insert_header((header::CACHE_CONTROL, "no-store"))
        .finish()
}

/// Readiness probe. 200 once bound and the store answers, 503 otherwise.
#[utoipa::path(
    get,
    path = "/health/ready",
    tags = ["health"],
    security([]),
    responses(
        (status = 200, description = "Server is ready to handle traffic"),
        (status = 503, description = "Server not bound yet or store unreachable")
    )
)]
#[get("/health/ready")]
pub async fn ready(state: web::Data<HealthState>) -> HttpResponse {
    probe_response(state.check_ready().await)
}

/// Liveness probe. 200 while the process is marked alive, 503 once draining.
#[utoipa::path(
    get,
    path = "/health/live",
    tags = ["health"],
    security([]),
    responses(
        (status = 200, description = "Server is alive"),
        (status = 503, description = "Server is shutting down")
    )
)]
#[get("/health/live")]
pub async fn live(state: web::Data<HealthState>) -> HttpResponse {
    probe_response(state.is_alive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;
    use actix_web::{App, test};
    use futures_util::FutureExt;
    use rstest::rstest;

    fn fixed_probe(reachable: bool) -> StoreProbe {
        Arc::new(move || async move { reachable }.boxed())
    }

    #[rstest]
    #[case::not_bound(false, None, StatusCode::SERVICE_UNAVAILABLE)]
    #[case::bound_without_probe(true, None, StatusCode::OK)]
    #[case::store_up(true, Some(true), StatusCode::OK)]
    #[case::store_down(true, Some(false), StatusCode::SERVICE_UNAVAILABLE)]
    #[case::store_up_but_not_bound(false, Some(true), StatusCode::SERVICE_UNAVAILABLE)]
    #[actix_web::test]
    async fn readiness_requires_binding_and_a_reachable_store(
        #[case] bound: bool,
        #[case] store: Option<bool>,
        #[case] expected: StatusCode,
    ) {
        let mut state = HealthState::new();
        if let Some(reachable) = store {
            state = state.with_store_probe(fixed_probe(reachable));
        }
        if bound {
            state.mark_ready();
        }
        let app =
            test::init_service(App::new().app_data(web::Data::new(state)).service(ready)).await;

        let res =
            test::call_service(&app, test::TestRequest::get().uri("/health/ready").to_request())
                .await;
        assert_eq!(res.status(), expected);
        assert_eq!(
            res.headers()
                .get(header::CACHE_CONTROL)
                .and_then(|value| value.to_str().ok()),
            Some("no-store")
        );
    }

    #[actix_web::test]
    async fn liveness_ignores_the_store_and_fails_once_draining() {
        let state = web::Data::new(HealthState::new().with_store_probe(fixed_probe(false)));
        let app = test::init_service(App::new().app_data(state.clone()).service(live)).await;

        let res =
            test::call_service(&app, test::TestRequest::get().uri("/health/live").to_request())
                .await;
        assert_eq!(res.status(), StatusCode::OK);

        state.mark_unhealthy();
        let res =
            test::call_service(&app, test::TestRequest::get().uri("/health/live").to_request())
                .await;
        assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
