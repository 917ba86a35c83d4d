//! Applying a selected effect to one request/response exchange

use axum::body::Body;
use axum::extract::Request;
use axum::http::StatusCode;
use axum::response::Response;
use tower::Service;
use tracing::debug;

use mockingjay_core::Effect;

/// Filler byte for garbage payloads
const GARBAGE_BYTE: u8 = b'#';

/// Serve one request through `inner`, corrupted by `effect` if one fired.
pub(super) async fn misbehave<S>(
    mut inner: S,
    request: Request,
    effect: Option<Effect>,
) -> Result<Response, S::Error>
where
    S: Service<Request, Response = Response>,
{
    let Some(effect) = effect else {
        return inner.call(request).await;
    };

    debug!(
        effect = effect.kind(),
        method = %request.method(),
        uri = %request.uri(),
        "monkeying around"
    );
    match effect {
        Effect::Noop => inner.call(request).await,
        Effect::Delay(delay) => {
            let response = inner.call(request).await?;
            tokio::time::sleep(delay).await;
            Ok(response)
        }
        Effect::Status(code) => {
            let mut response = inner.call(request).await?;
            *response.status_mut() = status_code(code);
            Ok(response)
        }
        Effect::Body { body, status } => Ok(replacement(status, Body::from(body))),
        Effect::Garbage { bytes, status } => Ok(replacement(status, Body::from(garbage(bytes)))),
    }
}

/// A response built without consulting the delegate
fn replacement(status: Option<u16>, body: Body) -> Response {
    let mut response = Response::new(body);
    *response.status_mut() = status.map_or(StatusCode::OK, status_code);
    response
}

fn status_code(code: u16) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

/// Exactly `bytes` bytes of filler
fn garbage(bytes: usize) -> Vec<u8> {
    vec![GARBAGE_BYTE; bytes]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn garbage_has_exact_length() {
        for n in [0, 1, 1984, 10_000_000] {
            assert_eq!(garbage(n).len(), n);
        }
    }

    #[test]
    fn replacement_defaults_to_ok() {
        assert_eq!(replacement(None, Body::empty()).status(), StatusCode::OK);
        assert_eq!(
            replacement(Some(404), Body::empty()).status(),
            StatusCode::NOT_FOUND
        );
    }
}
