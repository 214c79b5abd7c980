//! How handler parameters are built from a request.
//!
//! Three kinds of parameter types exist:
//!
//! - JSON bodies: types implementing [`Dto`] (usually through `#[api_dto]`),
//!   their `Box` forms and `Vec`s of them.
//! - Extractors: types implementing [`FromRequest`], and `Box`es of them.
//! - Query parameters: [`StringParam`] and [`IntParam`], named through a
//!   [`ParamName`] marker declared with [`param_name!`](crate::param_name).
//!   Wrapping one in `Option` makes it optional.

use std::any::type_name;
use std::fmt;
use std::marker::PhantomData;
use std::ops::Deref;

use axum::http::{HeaderMap, Method, Uri};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::example::Example;
use crate::request::RequestContext;
use crate::signature::{Scalar, TypeDescriptor};

/// A user type that populates itself from the request.
///
/// `Box<T>` is the pointer form: it is allocated and filled by `T`'s
/// implementation and documented under `T`'s name.
pub trait FromRequest: Sized + Send + 'static {
    #[doc(hidden)]
    const IS_POINTER: bool = false;

    #[doc(hidden)]
    fn pointee_name() -> &'static str {
        type_name::<Self>()
    }

    fn from_request(ctx: &RequestContext) -> Result<Self>;

    /// Listed as a note on every endpoint that takes this type.
    fn documentation() -> Option<&'static str> {
        None
    }
}

impl<T: FromRequest> FromRequest for Box<T> {
    const IS_POINTER: bool = true;

    fn pointee_name() -> &'static str {
        T::pointee_name()
    }

    fn from_request(ctx: &RequestContext) -> Result<Self> {
        T::from_request(ctx).map(Box::new)
    }

    fn documentation() -> Option<&'static str> {
        T::documentation()
    }
}

impl FromRequest for HeaderMap {
    fn from_request(ctx: &RequestContext) -> Result<Self> {
        Ok(ctx.headers().clone())
    }
}

impl FromRequest for Method {
    fn from_request(ctx: &RequestContext) -> Result<Self> {
        Ok(ctx.method().clone())
    }
}

impl FromRequest for Uri {
    fn from_request(ctx: &RequestContext) -> Result<Self> {
        Ok(ctx.uri().clone())
    }
}

/// A JSON structure usable as a request or response body.
pub trait Dto: Serialize + DeserializeOwned + Example + Send + 'static {
    /// Description of the type in the documentation's type dictionary.
    fn documentation() -> Option<&'static str> {
        None
    }
}

impl<T: Dto> Dto for Vec<T> {}

macro_rules! scalar_dto {
    ($($ty:ty),* $(,)?) => {
        $(impl Dto for $ty {})*
    };
}

scalar_dto!(bool, i32, i64, u32, u64, f32, f64, String, Value);

/// A type that can appear as a handler parameter.
pub trait Input: Sized + Send + 'static {
    fn descriptor() -> TypeDescriptor;

    fn bind(ctx: &RequestContext) -> Result<Self>;
}

impl<T: FromRequest> Input for T {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::new(T::pointee_name())
            .pointer(T::IS_POINTER)
            .from_request()
            .documentation(T::documentation())
    }

    fn bind(ctx: &RequestContext) -> Result<Self> {
        T::from_request(ctx)
    }
}

impl<T: Dto> Input for Vec<T> {
    fn descriptor() -> TypeDescriptor {
        body_descriptor::<Self>(false)
    }

    fn bind(ctx: &RequestContext) -> Result<Self> {
        decode_body(ctx)
    }
}

/// Descriptor of the body type `T`, or of its `Box` when `is_pointer`.
pub fn body_descriptor<T: Dto>(is_pointer: bool) -> TypeDescriptor {
    TypeDescriptor::of::<T>()
        .pointer(is_pointer)
        .json(example_json::<T>)
        .documentation(<T as Dto>::documentation())
}

pub fn example_json<T: Dto>() -> Value {
    serde_json::to_value(T::example()).unwrap_or(Value::Null)
}

/// Decodes the first JSON value of the body. Bytes after it are ignored.
pub fn decode_body<T: DeserializeOwned>(ctx: &RequestContext) -> Result<T> {
    match serde_json::Deserializer::from_slice(ctx.body())
        .into_iter::<T>()
        .next()
    {
        Some(decoded) => decoded.map_err(Error::DecodeJson),
        None => Err(Error::DecodeJson(serde::de::Error::custom(
            "empty request body",
        ))),
    }
}

/// Names a query parameter at the type level.
pub trait ParamName: Send + Sync + 'static {
    const NAME: &'static str;

    fn documentation() -> Option<&'static str> {
        None
    }
}

/// Declares [`ParamName`] markers. Doc comments become the parameter's
/// description.
///
/// ```
/// plumb_kit::param_name! {
///     /// Identifier of the item.
///     pub ItemId = "id";
///     pub Page = "page";
/// }
/// ```
#[macro_export]
macro_rules! param_name {
    ($($(#[doc = $doc:literal])* $vis:vis $ident:ident = $name:literal;)*) => {
        $(
            $(#[doc = $doc])*
            #[derive(Debug, Clone, Copy, PartialEq, Eq)]
            $vis struct $ident;

            impl $crate::ParamName for $ident {
                const NAME: &'static str = $name;

                fn documentation() -> ::std::option::Option<&'static str> {
                    let doc: &'static str = concat!($($doc, "\n",)*);
                    if doc.is_empty() {
                        ::std::option::Option::None
                    } else {
                        ::std::option::Option::Some(doc)
                    }
                }
            }
        )*
    };
}

/// A query parameter carrier: the name and scalar type it binds.
pub trait QueryParam: Sized + Send + 'static {
    const NAME: &'static str;
    const SCALAR: Scalar;

    fn parse(raw: &str) -> Result<Self>;

    fn documentation() -> Option<&'static str>;
}

/// A required string query parameter named by `N`.
pub struct StringParam<N> {
    value: String,
    _name: PhantomData<fn() -> N>,
}

impl<N> StringParam<N> {
    pub fn new(value: impl Into<String>) -> Self {
        StringParam {
            value: value.into(),
            _name: PhantomData,
        }
    }

    pub fn into_inner(self) -> String {
        self.value
    }
}

impl<N> Deref for StringParam<N> {
    type Target = str;

    fn deref(&self) -> &str {
        &self.value
    }
}

impl<N: ParamName> fmt::Debug for StringParam<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("StringParam")
            .field(&N::NAME)
            .field(&self.value)
            .finish()
    }
}

impl<N: ParamName> QueryParam for StringParam<N> {
    const NAME: &'static str = N::NAME;
    const SCALAR: Scalar = Scalar::String;

    fn parse(raw: &str) -> Result<Self> {
        Ok(StringParam::new(raw))
    }

    fn documentation() -> Option<&'static str> {
        N::documentation()
    }
}

/// A required integer query parameter named by `N`.
pub struct IntParam<N> {
    value: i64,
    _name: PhantomData<fn() -> N>,
}

impl<N> IntParam<N> {
    pub fn new(value: i64) -> Self {
        IntParam {
            value,
            _name: PhantomData,
        }
    }

    pub fn get(&self) -> i64 {
        self.value
    }
}

impl<N> Deref for IntParam<N> {
    type Target = i64;

    fn deref(&self) -> &i64 {
        &self.value
    }
}

impl<N: ParamName> fmt::Debug for IntParam<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("IntParam")
            .field(&N::NAME)
            .field(&self.value)
            .finish()
    }
}

impl<N: ParamName> QueryParam for IntParam<N> {
    const NAME: &'static str = N::NAME;
    const SCALAR: Scalar = Scalar::Integer;

    fn parse(raw: &str) -> Result<Self> {
        raw.parse::<i64>()
            .map(IntParam::new)
            .map_err(|err| Error::BadParam {
                name: N::NAME,
                reason: err.to_string(),
            })
    }

    fn documentation() -> Option<&'static str> {
        N::documentation()
    }
}

fn query_descriptor<T: QueryParam>(is_pointer: bool) -> TypeDescriptor {
    TypeDescriptor::of::<T>()
        .pointer(is_pointer)
        .query(T::NAME, T::SCALAR)
        .documentation(T::documentation())
}

/// An empty value counts as absent.
fn read_param<T: QueryParam>(ctx: &RequestContext) -> Result<Option<T>> {
    ctx.query(T::NAME)
        .filter(|raw| !raw.is_empty())
        .map(T::parse)
        .transpose()
}

impl<N: ParamName> Input for StringParam<N> {
    fn descriptor() -> TypeDescriptor {
        query_descriptor::<Self>(false)
    }

    fn bind(ctx: &RequestContext) -> Result<Self> {
        read_param(ctx)?.ok_or(Error::MissingParam(N::NAME))
    }
}

impl<N: ParamName> Input for IntParam<N> {
    fn descriptor() -> TypeDescriptor {
        query_descriptor::<Self>(false)
    }

    fn bind(ctx: &RequestContext) -> Result<Self> {
        read_param(ctx)?.ok_or(Error::MissingParam(N::NAME))
    }
}

impl<T: QueryParam> Input for Option<T> {
    fn descriptor() -> TypeDescriptor {
        query_descriptor::<T>(true)
    }

    fn bind(ctx: &RequestContext) -> Result<Self> {
        read_param(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::Capabilities;
    use axum::body::Bytes;
    use axum::http::Request;

    crate::param_name! {
        /// Identifier of the
        ///   requested item.
        ItemId = "id";
        Page = "page";
    }

    fn context(uri: &str, body: &'static str) -> RequestContext {
        let (parts, _) = Request::builder().uri(uri).body(()).unwrap().into_parts();
        RequestContext::new(parts, Bytes::from_static(body.as_bytes()))
    }

    #[test]
    fn required_string_param_binds_or_reports_missing() {
        let id = StringParam::<ItemId>::bind(&context("/x?id=abc", "")).unwrap();
        assert_eq!(&*id, "abc");

        let err = StringParam::<ItemId>::bind(&context("/x", "")).unwrap_err();
        assert!(matches!(err, Error::MissingParam("id")));

        let err = StringParam::<ItemId>::bind(&context("/x?id=", "")).unwrap_err();
        assert!(matches!(err, Error::MissingParam("id")));
    }

    #[test]
    fn int_param_parses_or_reports_bad_value() {
        let page = IntParam::<Page>::bind(&context("/x?page=12", "")).unwrap();
        assert_eq!(page.get(), 12);

        let err = IntParam::<Page>::bind(&context("/x?page=twelve", "")).unwrap_err();
        assert!(matches!(err, Error::BadParam { name: "page", .. }));

        let err = IntParam::<Page>::bind(&context("/x?page=%2012", "")).unwrap_err();
        assert!(matches!(err, Error::BadParam { name: "page", .. }));
    }

    #[test]
    fn optional_params_are_pointers_and_may_be_absent() {
        assert!(Option::<IntParam<Page>>::bind(&context("/x", "")).unwrap().is_none());

        let descriptor = Option::<IntParam<Page>>::descriptor();
        assert!(descriptor.is_pointer);
        assert_eq!(descriptor.query.map(|q| q.name), Some("page"));
        assert_eq!(descriptor.query.map(|q| q.scalar), Some(Scalar::Integer));
    }

    #[test]
    fn param_names_carry_their_doc_comments() {
        assert_eq!(
            ItemId::documentation(),
            Some(" Identifier of the\n   requested item.\n")
        );
        assert_eq!(Page::documentation(), None);
    }

    #[test]
    fn boxed_extractors_report_the_pointee() {
        struct Session;

        impl FromRequest for Session {
            fn from_request(_ctx: &RequestContext) -> Result<Self> {
                Ok(Session)
            }

            fn documentation() -> Option<&'static str> {
                Some("needs a session")
            }
        }

        let descriptor = <Box<Session> as Input>::descriptor();
        assert!(descriptor.is_pointer);
        assert!(descriptor.type_name.ends_with("Session"));
        assert_eq!(descriptor.documentation, Some("needs a session"));
        assert_eq!(
            descriptor.capabilities,
            Capabilities {
                from_request: true,
                ..Capabilities::default()
            }
        );
    }

    #[derive(Debug, PartialEq, serde::Serialize, serde::Deserialize)]
    struct Tag {
        label: String,
    }

    impl Example for Tag {
        fn example_at(depth: usize) -> Self {
            Tag {
                label: Example::example_at(depth),
            }
        }
    }

    impl Dto for Tag {}

    #[test]
    fn vec_bodies_decode_json() {
        let tags = Vec::<Tag>::bind(&context("/x", r#"[{"label":"a"}]"#)).unwrap();
        assert_eq!(tags, vec![Tag { label: "a".into() }]);

        let err = Vec::<Tag>::bind(&context("/x", "not-json")).unwrap_err();
        assert!(err.to_string().starts_with("decoding json: "));

        let tags = Vec::<Tag>::bind(&context("/x", r#"[{"label":"a"}] trailing"#)).unwrap();
        assert_eq!(tags.len(), 1);

        let err = Vec::<Tag>::bind(&context("/x", "  ")).unwrap_err();
        assert_eq!(err.to_string(), "decoding json: empty request body");

        let descriptor = <Vec<Tag> as Input>::descriptor();
        assert!(descriptor.capabilities.json);
        let example = descriptor.example.map(|example| example());
        assert_eq!(example, Some(serde_json::json!([{"label": ""}])));
    }
}
