//! How handler results are written to the response.
//!
//! A handler's return value implements [`Outputs`]: nothing, a single
//! [`Output`], a tuple of them, or a `Result` whose error becomes the trailing
//! error result. [`ToResponse`] outputs write themselves in declaration order;
//! the body output (a [`Dto`]) is held back and encoded after all of them, so
//! responders can set the status and headers first.

use std::any::type_name;

use axum::http::StatusCode;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::input::{body_descriptor, Dto};
use crate::respond::ResponseWriter;
use crate::signature::TypeDescriptor;

/// A user type that writes itself into the response.
pub trait ToResponse: Send + 'static {
    fn to_response(self, res: &mut ResponseWriter) -> Result<()>;

    /// Listed as a note on every endpoint that returns this type.
    fn documentation() -> Option<&'static str>
    where
        Self: Sized,
    {
        None
    }
}

impl ToResponse for StatusCode {
    fn to_response(self, res: &mut ResponseWriter) -> Result<()> {
        res.write_status(self);
        Ok(())
    }
}

/// The JSON body, written once every other output has run.
pub type PendingBody = Box<dyn FnOnce(&mut ResponseWriter) -> Result<()> + Send>;

/// A type that can appear as one handler result.
pub trait Output: Send + 'static {
    fn descriptor() -> TypeDescriptor;

    fn emit(self, res: &mut ResponseWriter, body: &mut Option<PendingBody>) -> Result<()>;
}

impl<T: ToResponse> Output for T {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::of::<T>()
            .to_response()
            .documentation(T::documentation())
    }

    fn emit(self, res: &mut ResponseWriter, _body: &mut Option<PendingBody>) -> Result<()> {
        self.to_response(res)
    }
}

impl<T: Dto> Output for Vec<T> {
    fn descriptor() -> TypeDescriptor {
        body_descriptor::<Self>(false)
    }

    fn emit(self, _res: &mut ResponseWriter, body: &mut Option<PendingBody>) -> Result<()> {
        stash_body(self, body);
        Ok(())
    }
}

pub fn stash_body<T: Serialize + Send + 'static>(value: T, body: &mut Option<PendingBody>) {
    *body = Some(Box::new(move |res: &mut ResponseWriter| res.write_json(&value)));
}

/// Everything a handler returns.
pub trait Outputs: Send + 'static {
    fn descriptors() -> Vec<TypeDescriptor>;

    fn emit_all(self, res: &mut ResponseWriter, body: &mut Option<PendingBody>) -> Result<()>;
}

impl Outputs for () {
    fn descriptors() -> Vec<TypeDescriptor> {
        Vec::new()
    }

    fn emit_all(self, _res: &mut ResponseWriter, _body: &mut Option<PendingBody>) -> Result<()> {
        Ok(())
    }
}

impl<T: Output> Outputs for T {
    fn descriptors() -> Vec<TypeDescriptor> {
        vec![T::descriptor()]
    }

    fn emit_all(self, res: &mut ResponseWriter, body: &mut Option<PendingBody>) -> Result<()> {
        self.emit(res, body)
    }
}

macro_rules! impl_outputs_tuple {
    ($($ty:ident),+) => {
        #[allow(non_snake_case)]
        impl<$($ty: Output,)+> Outputs for ($($ty,)+) {
            fn descriptors() -> Vec<TypeDescriptor> {
                vec![$($ty::descriptor(),)+]
            }

            fn emit_all(self, res: &mut ResponseWriter, body: &mut Option<PendingBody>) -> Result<()> {
                let ($($ty,)+) = self;
                $($ty.emit(res, body)?;)+
                Ok(())
            }
        }
    };
}

impl_outputs_tuple!(T1, T2);
impl_outputs_tuple!(T1, T2, T3);
impl_outputs_tuple!(T1, T2, T3, T4);

/// The error short-circuits: nothing from `R` is written when it is `Err`.
impl<R, E> Outputs for std::result::Result<R, E>
where
    R: Outputs,
    E: Into<Error> + Send + 'static,
{
    fn descriptors() -> Vec<TypeDescriptor> {
        let mut descriptors = R::descriptors();
        descriptors.push(TypeDescriptor::new(type_name::<E>()).error());
        descriptors
    }

    fn emit_all(self, res: &mut ResponseWriter, body: &mut Option<PendingBody>) -> Result<()> {
        match self {
            Ok(outputs) => outputs.emit_all(res, body),
            Err(err) => Err(err.into()),
        }
    }
}
