use std::any::{type_name, Any, TypeId};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use axum::body::Body;
use axum::http::Request;
use axum::response::{IntoResponse, Response};

use crate::adapter::{self, Adapter, BoxFuture, Handler};
use crate::by_method::ByMethod;
use crate::cache::{self, AdaptorFactory};
use crate::error::Result;
use crate::signature::Signature;

/// Anything that can be registered on a path or in a method slot.
#[derive(Clone, Debug)]
pub enum HandlerValue {
    Raw(Raw),
    Methods(Box<ByMethod>),
    Function(FunctionHandler),
}

impl HandlerValue {
    pub fn compile(&self) -> Result<Adapter> {
        match self {
            HandlerValue::Raw(raw) => Ok(raw.adapter()),
            HandlerValue::Methods(methods) => methods.compile(),
            HandlerValue::Function(function) => function.compile(),
        }
    }
}

/// A plain request handler, served as is.
#[derive(Clone)]
pub struct Raw {
    adapter: Adapter,
}

impl Raw {
    pub fn new<F, Fut, R>(handler: F) -> Self
    where
        F: Fn(Request<Body>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoResponse,
    {
        let handler = Arc::new(handler);
        Raw {
            adapter: Arc::new(move |req: Request<Body>| -> BoxFuture<'static, Response> {
                let response = (*handler)(req);
                Box::pin(async move { response.await.into_response() })
            }),
        }
    }

    pub fn adapter(&self) -> Adapter {
        self.adapter.clone()
    }
}

impl fmt::Debug for Raw {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Raw")
    }
}

/// A signature-typed function, kept type-erased until it is compiled.
#[derive(Clone)]
pub struct FunctionHandler {
    key: TypeId,
    name: &'static str,
    value: Arc<dyn Any + Send + Sync>,
    signature: fn() -> Signature,
    fallback: AdaptorFactory,
}

impl FunctionHandler {
    pub fn new<H, Args>(handler: H) -> Self
    where
        H: Handler<Args>,
        Args: 'static,
    {
        FunctionHandler {
            key: TypeId::of::<H>(),
            name: type_name::<H>(),
            value: Arc::new(handler),
            signature: H::signature,
            fallback: adapter::reflective_factory::<H, Args>,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn signature(&self) -> Signature {
        (self.signature)()
    }

    /// Builds the adapter through the cache, preferring a generated one.
    pub fn compile(&self) -> Result<Adapter> {
        let factory = cache::adaptor_for(self.key, self.name, self.fallback);
        factory(self.value.as_ref())
    }
}

impl fmt::Debug for FunctionHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionHandler")
            .field("name", &self.name)
            .finish()
    }
}

#[doc(hidden)]
pub struct FunctionMarker;

#[doc(hidden)]
pub struct ValueMarker;

/// Conversion into a [`HandlerValue`]. The marker parameter lets functions
/// and handler values share one registration method.
pub trait IntoHandler<M> {
    fn into_handler(self) -> HandlerValue;
}

impl<H, Args> IntoHandler<(FunctionMarker, Args)> for H
where
    H: Handler<Args>,
    Args: 'static,
{
    fn into_handler(self) -> HandlerValue {
        HandlerValue::Function(FunctionHandler::new(self))
    }
}

impl IntoHandler<ValueMarker> for HandlerValue {
    fn into_handler(self) -> HandlerValue {
        self
    }
}

impl IntoHandler<ValueMarker> for ByMethod {
    fn into_handler(self) -> HandlerValue {
        HandlerValue::Methods(Box::new(self))
    }
}

impl IntoHandler<ValueMarker> for Raw {
    fn into_handler(self) -> HandlerValue {
        HandlerValue::Raw(self)
    }
}
