//! The classification vocabulary shared by the adapters and the documentation
//! extractor.
//!
//! Every handler parameter type describes itself with a [`TypeDescriptor`]
//! (through [`Input`](crate::Input)), and so does every result (through
//! [`Output`](crate::Output)). [`Signature::classify`] walks those descriptors
//! in declaration order and decides how each one is bound to the request or
//! written to the response, producing an [`Info`] record. The rules are local:
//! each position is decided from its own descriptor plus whether a body has
//! already been claimed.

use serde_json::Value;
use std::collections::HashSet;
use thiserror::Error;

/// How a handler parameter is built from the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputKind {
    Body,
    StringQueryParam,
    IntQueryParam,
    Custom,
}

/// How a handler result is written to the response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputKind {
    Body,
    Custom,
    Error,
}

/// Scalar type carried by a query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scalar {
    String,
    Integer,
}

impl Scalar {
    pub fn label(self) -> &'static str {
        match self {
            Scalar::String => "string",
            Scalar::Integer => "integer",
        }
    }

    fn input_kind(self) -> InputKind {
        match self {
            Scalar::String => InputKind::StringQueryParam,
            Scalar::Integer => InputKind::IntQueryParam,
        }
    }
}

/// Behavioral roles a type opts into.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    /// A JSON (de)serializable structure usable as a request or response body.
    pub json: bool,
    pub from_request: bool,
    pub to_response: bool,
    pub error: bool,
}

/// The name and scalar type of a query-parameter carrier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryCarrier {
    pub name: &'static str,
    pub scalar: Scalar,
}

/// What a parameter or result type says about itself.
#[derive(Debug, Clone)]
pub struct TypeDescriptor {
    pub type_name: &'static str,
    /// The declared type is the pointer form (`Box<T>` for values, `Option<T>`
    /// for query parameters) of the described type.
    pub is_pointer: bool,
    pub capabilities: Capabilities,
    pub query: Option<QueryCarrier>,
    pub documentation: Option<&'static str>,
    /// Deep-zero JSON example, present for body types.
    pub example: Option<fn() -> Value>,
}

impl TypeDescriptor {
    pub fn new(type_name: &'static str) -> Self {
        TypeDescriptor {
            type_name,
            is_pointer: false,
            capabilities: Capabilities::default(),
            query: None,
            documentation: None,
            example: None,
        }
    }

    pub fn of<T: ?Sized>() -> Self {
        Self::new(std::any::type_name::<T>())
    }

    pub fn pointer(mut self, is_pointer: bool) -> Self {
        self.is_pointer = is_pointer;
        self
    }

    pub fn json(mut self, example: fn() -> Value) -> Self {
        self.capabilities.json = true;
        self.example = Some(example);
        self
    }

    pub fn from_request(mut self) -> Self {
        self.capabilities.from_request = true;
        self
    }

    pub fn to_response(mut self) -> Self {
        self.capabilities.to_response = true;
        self
    }

    pub fn error(mut self) -> Self {
        self.capabilities.error = true;
        self
    }

    pub fn query(mut self, name: &'static str, scalar: Scalar) -> Self {
        self.query = Some(QueryCarrier { name, scalar });
        self
    }

    pub fn documentation(mut self, documentation: Option<&'static str>) -> Self {
        self.documentation = documentation.filter(|doc| !doc.trim().is_empty());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSpec {
    pub type_name: &'static str,
    pub kind: InputKind,
    /// Query parameter name; `None` for body and custom inputs.
    pub name: Option<&'static str>,
    pub is_pointer: bool,
    pub required: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultSpec {
    pub type_name: &'static str,
    pub kind: OutputKind,
}

/// How one function type maps onto HTTP. Computed once per handler and
/// immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Info {
    pub inputs: Vec<ParamSpec>,
    pub outputs: Vec<ResultSpec>,
    pub request_body_index: Option<usize>,
    pub response_body_index: Option<usize>,
    pub last_is_error: bool,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClassificationError {
    #[error("unsupported parameter {index} of type {type_name}")]
    UnsupportedParameter {
        index: usize,
        type_name: &'static str,
    },

    #[error("unsupported result {index} of type {type_name}")]
    UnsupportedResult {
        index: usize,
        type_name: &'static str,
    },

    #[error("query parameter {index} of type {type_name} has an empty name")]
    EmptyParamName {
        index: usize,
        type_name: &'static str,
    },

    #[error("query parameter {name} is declared more than once")]
    DuplicateParam { name: &'static str },
}

/// The descriptors of a function type's parameters and results.
#[derive(Debug, Clone)]
pub struct Signature {
    pub inputs: Vec<TypeDescriptor>,
    pub outputs: Vec<TypeDescriptor>,
}

impl Signature {
    pub fn new(inputs: Vec<TypeDescriptor>, outputs: Vec<TypeDescriptor>) -> Self {
        Signature { inputs, outputs }
    }

    pub fn classify(&self) -> Result<Info, ClassificationError> {
        classify(&self.inputs, &self.outputs)
    }
}

pub fn classify(
    inputs: &[TypeDescriptor],
    outputs: &[TypeDescriptor],
) -> Result<Info, ClassificationError> {
    let mut info = Info {
        inputs: Vec::with_capacity(inputs.len()),
        outputs: Vec::with_capacity(outputs.len()),
        request_body_index: None,
        response_body_index: None,
        last_is_error: false,
    };
    let mut seen_params = HashSet::new();

    for (index, input) in inputs.iter().enumerate() {
        let caps = input.capabilities;
        let mut spec = ParamSpec {
            type_name: input.type_name,
            kind: InputKind::Custom,
            name: None,
            is_pointer: input.is_pointer,
            required: true,
        };

        if caps.json && !caps.from_request && info.request_body_index.is_none() {
            spec.kind = InputKind::Body;
            info.request_body_index = Some(index);
        } else if caps.from_request {
            spec.kind = InputKind::Custom;
        } else if let Some(carrier) = input.query {
            if carrier.name.is_empty() {
                return Err(ClassificationError::EmptyParamName {
                    index,
                    type_name: input.type_name,
                });
            }
            if !seen_params.insert(carrier.name) {
                return Err(ClassificationError::DuplicateParam { name: carrier.name });
            }
            spec.kind = carrier.scalar.input_kind();
            spec.name = Some(carrier.name);
            spec.required = !input.is_pointer;
        } else {
            return Err(ClassificationError::UnsupportedParameter {
                index,
                type_name: input.type_name,
            });
        }

        info.inputs.push(spec);
    }

    let last = outputs.len().checked_sub(1);
    for (index, output) in outputs.iter().enumerate() {
        let caps = output.capabilities;
        let kind = if caps.error && Some(index) == last {
            info.last_is_error = true;
            OutputKind::Error
        } else if caps.error {
            return Err(ClassificationError::UnsupportedResult {
                index,
                type_name: output.type_name,
            });
        } else if caps.to_response {
            OutputKind::Custom
        } else if info.response_body_index.is_none() {
            info.response_body_index = Some(index);
            OutputKind::Body
        } else {
            return Err(ClassificationError::UnsupportedResult {
                index,
                type_name: output.type_name,
            });
        };

        info.outputs.push(ResultSpec {
            type_name: output.type_name,
            kind,
        });
    }

    Ok(info)
}
