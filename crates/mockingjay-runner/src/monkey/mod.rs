//! Monkey layer: fault injection around any HTTP service
//!
//! On every request the layer takes one draw, asks the behavior table which
//! behavior (if any) that draw lands on, and either passes the request
//! straight through or applies the behavior's effect. The table is immutable
//! and the draw source is the only shared state, so concurrent requests never
//! interfere; an injected delay suspends only its own request.

mod effect;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::Router;
use axum::extract::Request;
use axum::response::Response;
use tower::{Layer, Service};
use tracing::info;

use mockingjay_core::BehaviorTable;

use crate::draw::{DrawSource, ThreadRngDraws};

/// Wraps services in [`MonkeyService`]
#[derive(Debug, Clone)]
pub struct MonkeyLayer {
    table: Arc<BehaviorTable>,
    draws: Arc<dyn DrawSource>,
}

impl MonkeyLayer {
    /// Layer drawing from the thread-local RNG
    #[must_use]
    pub fn new(table: BehaviorTable) -> Self {
        Self {
            table: Arc::new(table),
            draws: Arc::new(ThreadRngDraws),
        }
    }

    /// Replace the draw source (seeded or fixed draws in tests)
    #[must_use]
    pub fn with_draws(mut self, draws: impl DrawSource + 'static) -> Self {
        self.draws = Arc::new(draws);
        self
    }
}

impl<S> Layer<S> for MonkeyLayer {
    type Service = MonkeyService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MonkeyService {
            inner,
            table: Arc::clone(&self.table),
            draws: Arc::clone(&self.draws),
        }
    }
}

/// A service that sometimes misbehaves. Substitutable for the service it wraps.
#[derive(Debug, Clone)]
pub struct MonkeyService<S> {
    inner: S,
    table: Arc<BehaviorTable>,
    draws: Arc<dyn DrawSource>,
}

impl<S> Service<Request> for MonkeyService<S>
where
    S: Service<Request, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Response, S::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request) -> Self::Future {
        let effect = self
            .table
            .select(self.draws.draw())
            .map(|behavior| behavior.effect().clone());

        // take the service that was driven to readiness, leave a fresh clone
        let clone = self.inner.clone();
        let inner = std::mem::replace(&mut self.inner, clone);
        Box::pin(effect::misbehave(inner, request, effect))
    }
}

/// Wrap `router` in the monkey layer when a live behavior table is given.
///
/// With no table, or a table whose frequencies are all zero, the router is
/// returned as is.
pub fn monkey_around(router: Router, table: Option<BehaviorTable>) -> Router {
    match table {
        Some(table) if !table.is_inert() => {
            info!(
                behaviors = table.len(),
                total_frequency = table.total_frequency(),
                "monkey layer enabled"
            );
            Router::new().fallback_service(MonkeyLayer::new(table).layer(router))
        }
        _ => router,
    }
}
