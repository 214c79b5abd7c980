//! Turning a classified function into an HTTP handler.
//!
//! Any `async fn` (or closure returning a future) whose parameters implement
//! [`Input`] and whose return value implements [`Outputs`] is a [`Handler`].
//! [`Handler::call`] is the adapter built at runtime; `#[handler]` generates an
//! equivalent adapter at compile time. Both are assembled from [`from_fn`],
//! [`bind`] and [`finish`], which is what keeps their responses identical.

use std::any::{type_name, Any};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use anyhow::anyhow;
use axum::body::{Body, Bytes};
use axum::http::Request;
use axum::response::Response;
use http_body_util::LengthLimitError;

use crate::error::{Error, Result};
use crate::input::Input;
use crate::output::Outputs;
use crate::request::RequestContext;
use crate::respond::{self, ResponseWriter};
use crate::signature::{Info, InputKind, Signature};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A compiled request handler.
pub type Adapter = Arc<dyn Fn(Request<Body>) -> BoxFuture<'static, Response> + Send + Sync>;

pub trait Handler<Args>: Clone + Send + Sync + 'static {
    /// Descriptors of the parameters and results, in declaration order.
    fn signature() -> Signature;

    fn call(self, info: Arc<Info>, ctx: RequestContext) -> BoxFuture<'static, Response>;
}

macro_rules! impl_handler {
    ($($ty:ident),*) => {
        #[allow(non_snake_case, unused_mut, unused_variables, unused_assignments)]
        impl<F, Fut, R, $($ty,)*> Handler<($($ty,)*)> for F
        where
            F: Fn($($ty,)*) -> Fut + Clone + Send + Sync + 'static,
            Fut: Future<Output = R> + Send + 'static,
            R: Outputs,
            $($ty: Input,)*
        {
            fn signature() -> Signature {
                Signature::new(vec![$(<$ty as Input>::descriptor(),)*], R::descriptors())
            }

            fn call(self, info: Arc<Info>, ctx: RequestContext) -> BoxFuture<'static, Response> {
                Box::pin(async move {
                    let mut index = 0;
                    $(
                        let $ty = match bind::<$ty>(&info, index, &ctx) {
                            Ok(value) => value,
                            Err(err) => return respond::error_response(ctx.parts(), &err),
                        };
                        index += 1;
                    )*
                    let result = self($($ty,)*).await;
                    finish(&ctx, result)
                })
            }
        }
    };
}

impl_handler!();
impl_handler!(T1);
impl_handler!(T1, T2);
impl_handler!(T1, T2, T3);
impl_handler!(T1, T2, T3, T4);
impl_handler!(T1, T2, T3, T4, T5);
impl_handler!(T1, T2, T3, T4, T5, T6);
impl_handler!(T1, T2, T3, T4, T5, T6, T7);
impl_handler!(T1, T2, T3, T4, T5, T6, T7, T8);

/// Builds parameter `index` of a handler.
pub fn bind<T: Input>(info: &Info, index: usize, ctx: &RequestContext) -> Result<T> {
    if index >= info.inputs.len() {
        return Err(anyhow!(
            "parameter {index} of type {} is not part of the signature",
            type_name::<T>()
        )
        .into());
    }
    T::bind(ctx)
}

/// Writes a handler's results: responders in order, then the JSON body. The
/// first failure discards whatever was written and answers through the error
/// responder.
pub fn finish<R: Outputs>(ctx: &RequestContext, result: R) -> Response {
    let mut res = ResponseWriter::new();
    let mut body = None;
    let written = result.emit_all(&mut res, &mut body).and_then(|()| match body {
        Some(write) => write(&mut res),
        None => Ok(()),
    });
    match written {
        Ok(()) => res.into_response(),
        Err(err) => respond::error_response(ctx.parts(), &err),
    }
}

/// The most request body bytes an adapter reads before answering 413.
pub const BODY_LIMIT: usize = 2 * 1024 * 1024;

/// Wraps a per-request call into an [`Adapter`]. When the handler binds a
/// body or a custom extractor, the request body is read in full (up to
/// [`BODY_LIMIT`]) before `call` runs; otherwise it is left unread.
pub fn from_fn<C>(info: Arc<Info>, call: C) -> Adapter
where
    C: Fn(Arc<Info>, RequestContext) -> BoxFuture<'static, Response> + Send + Sync + 'static,
{
    let call = Arc::new(call);
    let reads_body = info.request_body_index.is_some()
        || info
            .inputs
            .iter()
            .any(|input| input.kind == InputKind::Custom);
    Arc::new(move |req: Request<Body>| -> BoxFuture<'static, Response> {
        let call = call.clone();
        let info = info.clone();
        Box::pin(async move {
            let (parts, body) = req.into_parts();
            let bytes = if reads_body {
                match axum::body::to_bytes(body, BODY_LIMIT).await {
                    Ok(bytes) => bytes,
                    Err(err) => return respond::error_response(&parts, &read_error(err)),
                }
            } else {
                Bytes::new()
            };
            (*call)(info, RequestContext::new(parts, bytes)).await
        })
    })
}

fn read_error(err: axum::Error) -> Error {
    let inner = err.into_inner();
    if inner.downcast_ref::<LengthLimitError>().is_some() {
        Error::BodyTooLarge { limit: BODY_LIMIT }
    } else {
        Error::ReadBody(inner.to_string())
    }
}

/// Classifies `H` and builds its runtime adapter.
pub fn into_adapter<H, Args>(handler: H) -> Result<Adapter>
where
    H: Handler<Args>,
{
    let info = Arc::new(H::signature().classify()?);
    Ok(from_fn(info, move |info, ctx| handler.clone().call(info, ctx)))
}

/// The fallback factory stored in the adapter cache for handlers without a
/// generated adapter.
pub fn reflective_factory<H, Args>(value: &dyn Any) -> Result<Adapter>
where
    H: Handler<Args>,
{
    let handler = value
        .downcast_ref::<H>()
        .ok_or(Error::AdaptorMismatch(type_name::<H>()))?;
    into_adapter(handler.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    crate::param_name! {
        Name = "name";
    }

    async fn greet(name: crate::StringParam<Name>) -> std::result::Result<Vec<String>, Error> {
        Ok(vec![format!("hello {}", &*name)])
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn signature_of<H: Handler<Args>, Args>(_handler: H) -> Signature {
        H::signature()
    }

    fn factory_of<H: Handler<Args>, Args>(_handler: &H) -> fn(&dyn Any) -> Result<Adapter> {
        reflective_factory::<H, Args>
    }

    #[test]
    fn signature_lists_parameters_and_results() {
        let info = signature_of(greet).classify().unwrap();
        assert_eq!(info.inputs[0].kind, InputKind::StringQueryParam);
        assert_eq!(info.response_body_index, Some(0));
        assert!(info.last_is_error);
    }

    #[tokio::test]
    async fn adapter_binds_calls_and_writes() {
        let adapter = into_adapter(greet).unwrap();

        let ok = (*adapter)(Request::get("/?name=ada").body(Body::empty()).unwrap()).await;
        assert_eq!(ok.status(), StatusCode::OK);
        assert_eq!(body_text(ok).await, r#"["hello ada"]"#);

        let missing = (*adapter)(Request::get("/").body(Body::empty()).unwrap()).await;
        assert_eq!(missing.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_text(missing).await,
            r#"{"error":"missing required query parameter: name"}"#
        );
    }

    #[test]
    fn reflective_factory_checks_the_value_type() {
        let factory = factory_of(&greet);
        assert!(factory(&greet).is_ok());
        assert!(matches!(factory(&42u8), Err(Error::AdaptorMismatch(_))));
    }
}
