//! API documentation derived from the registered routes.
//!
//! Every function handler is classified again with the same rules the adapters
//! use, so the artifact always matches what is served: body type names, query
//! parameters with their scalar types, notes from extractor and responder
//! documentation, and a dictionary of body types with deep-zero examples.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::by_method::Method;
use crate::error::Result;
use crate::handler::{FunctionHandler, HandlerValue};
use crate::mux::ServeMux;
use crate::signature::{InputKind, OutputKind, Scalar, TypeDescriptor};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Documentation {
    pub endpoints: Vec<Endpoint>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub types: BTreeMap<String, TypeDoc>,
    #[serde(rename = "Introduction", default)]
    pub introduction: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    pub path: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub request_body: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub response_body: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, ParamDoc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDoc {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub example: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamDoc {
    #[serde(rename = "type")]
    pub scalar: String,
    pub required: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

impl Documentation {
    pub fn collect(mux: &ServeMux, introduction: &[&str]) -> Result<Self> {
        let mut documentation = Documentation {
            introduction: introduction.iter().map(|line| cleanup_text(line)).collect(),
            ..Documentation::default()
        };

        for (path, handler, lines) in mux.walk() {
            let description = cleanup_text(&lines.join("\n"));
            match handler {
                HandlerValue::Raw(_) => documentation.endpoints.push(Endpoint {
                    path: path.to_string(),
                    description,
                    ..Endpoint::default()
                }),
                HandlerValue::Methods(methods) => {
                    for (method, slot) in methods.iter() {
                        let mut endpoint = documentation.slot_endpoint(slot)?;
                        endpoint.method = Some(method.as_str().to_string());
                        endpoint.path = path.to_string();
                        endpoint.description = description.clone();
                        documentation.endpoints.push(endpoint);
                    }
                }
                HandlerValue::Function(function) => {
                    let mut endpoint = documentation.function_endpoint(function)?;
                    endpoint.path = path.to_string();
                    endpoint.description = description;
                    documentation.endpoints.push(endpoint);
                }
            }
        }

        Ok(documentation)
    }

    /// Method slots holding anything but a function are listed without a
    /// signature.
    fn slot_endpoint(&mut self, slot: &HandlerValue) -> Result<Endpoint> {
        match slot {
            HandlerValue::Function(function) => self.function_endpoint(function),
            _ => Ok(Endpoint::default()),
        }
    }

    fn function_endpoint(&mut self, function: &FunctionHandler) -> Result<Endpoint> {
        let signature = function.signature();
        let info = signature.classify()?;
        let mut endpoint = Endpoint::default();

        for (spec, descriptor) in info.inputs.iter().zip(&signature.inputs) {
            match spec.kind {
                InputKind::Body => endpoint.request_body = self.register_type(descriptor),
                InputKind::Custom => push_note(&mut endpoint, descriptor),
                InputKind::StringQueryParam | InputKind::IntQueryParam => {
                    let scalar = if spec.kind == InputKind::IntQueryParam {
                        Scalar::Integer
                    } else {
                        Scalar::String
                    };
                    let name = spec.name.unwrap_or_default().to_string();
                    endpoint.params.insert(
                        name,
                        ParamDoc {
                            scalar: scalar.label().to_string(),
                            required: spec.required,
                            description: descriptor
                                .documentation
                                .map(cleanup_text)
                                .unwrap_or_default(),
                        },
                    );
                }
            }
        }

        for (spec, descriptor) in info.outputs.iter().zip(&signature.outputs) {
            match spec.kind {
                OutputKind::Body => endpoint.response_body = self.register_type(descriptor),
                OutputKind::Custom => push_note(&mut endpoint, descriptor),
                OutputKind::Error => {}
            }
        }

        Ok(endpoint)
    }

    fn register_type(&mut self, descriptor: &TypeDescriptor) -> String {
        let name = short_type_name(descriptor.type_name);
        self.types.entry(name.clone()).or_insert_with(|| TypeDoc {
            description: descriptor
                .documentation
                .map(cleanup_text)
                .unwrap_or_default(),
            example: descriptor.example.map_or(Value::Null, |example| example()),
        });
        name
    }

    /// Endpoints for `method`, in registration order.
    pub fn endpoints_for(&self, method: Method) -> impl Iterator<Item = &Endpoint> {
        self.endpoints
            .iter()
            .filter(move |endpoint| endpoint.method.as_deref() == Some(method.as_str()))
    }
}

fn push_note(endpoint: &mut Endpoint, descriptor: &TypeDescriptor) {
    if let Some(doc) = descriptor.documentation {
        endpoint.notes.push(cleanup_text(doc));
    }
}

/// Joins the trimmed lines of `text` with single spaces.
pub fn cleanup_text(text: &str) -> String {
    text.split('\n')
        .map(str::trim)
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_string()
}

/// Drops module paths from every type inside `name`:
/// `alloc::vec::Vec<app::dtos::Item>` becomes `Vec<Item>`.
pub fn short_type_name(name: &str) -> String {
    let mut short = String::with_capacity(name.len());
    let mut segment = String::new();
    for ch in name.chars() {
        if ch.is_alphanumeric() || ch == '_' || ch == ':' {
            segment.push(ch);
        } else {
            flush_segment(&mut short, &mut segment);
            short.push(ch);
        }
    }
    flush_segment(&mut short, &mut segment);
    short
}

fn flush_segment(short: &mut String, segment: &mut String) {
    if let Some(last) = segment.rsplit("::").next() {
        short.push_str(last);
    }
    segment.clear();
}
