use std::collections::BTreeMap;

use heck::{ToSnakeCase, ToUpperCamelCase};
use serde_json::Value;
use utoipa::openapi::path::{OperationBuilder, ParameterBuilder, ParameterIn};
use utoipa::openapi::request_body::RequestBodyBuilder;
use utoipa::openapi::schema::{Array, ObjectBuilder, Type};
use utoipa::openapi::{
    self, ComponentsBuilder, ContentBuilder, Ref, RefOr, Required, ResponseBuilder,
    ResponsesBuilder, Schema,
};

use crate::docs::{Documentation, Endpoint};

/// 根据 Documentation 构建 OpenAPI 文档
///
/// Body types become component schemas inferred from their deep-zero
/// examples. Endpoints without a method are published as POST when they take
/// a body and as GET otherwise.
pub fn build_openapi(
    documentation: &Documentation,
    title: &str,
    version: &str,
    description: &str,
) -> openapi::OpenApi {
    let mut openapi = openapi::OpenApiBuilder::new()
        .info(
            openapi::InfoBuilder::new()
                .title(title)
                .version(version)
                .description(Some(description))
                .build(),
        )
        .paths(openapi::Paths::new())
        .build();

    let schemas: BTreeMap<String, RefOr<Schema>> = documentation
        .types
        .iter()
        .map(|(name, doc)| {
            let mut schema = schema_from_example(&doc.example);
            if let RefOr::T(Schema::Object(object)) = &mut schema {
                if !doc.description.is_empty() {
                    object.description = Some(doc.description.clone());
                }
            }
            (component_name(name), schema)
        })
        .collect();

    for endpoint in &documentation.endpoints {
        let method = endpoint_method(endpoint);
        let operation = build_operation(endpoint, method);
        let path_item = openapi
            .paths
            .paths
            .entry(endpoint.path.clone())
            .or_default();

        match method {
            "GET" => path_item.get = Some(operation),
            "POST" => path_item.post = Some(operation),
            "PUT" => path_item.put = Some(operation),
            "PATCH" => path_item.patch = Some(operation),
            "DELETE" => path_item.delete = Some(operation),
            "OPTIONS" => path_item.options = Some(operation),
            _ => {}
        }
    }

    openapi.components = Some(ComponentsBuilder::new().schemas_from_iter(schemas).build());
    openapi
}

fn endpoint_method(endpoint: &Endpoint) -> &str {
    match endpoint.method.as_deref() {
        Some(method) => method,
        None if !endpoint.request_body.is_empty() => "POST",
        None => "GET",
    }
}

fn build_operation(endpoint: &Endpoint, method: &str) -> openapi::path::Operation {
    let operation_id = format!("{} {}", method, endpoint.path).to_snake_case();
    let mut description = endpoint.description.clone();
    for note in &endpoint.notes {
        if !description.is_empty() {
            description.push('\n');
        }
        description.push_str(note);
    }

    let mut operation_builder = OperationBuilder::new()
        .operation_id(Some(operation_id))
        .description((!description.is_empty()).then_some(description));

    for (name, param) in &endpoint.params {
        let scalar = if param.scalar == "integer" {
            Type::Integer
        } else {
            Type::String
        };
        let built_parameter = ParameterBuilder::new()
            .name(name)
            .parameter_in(ParameterIn::Query)
            .required(if param.required { Required::True } else { Required::False })
            .description((!param.description.is_empty()).then(|| param.description.clone()))
            .schema(Some(RefOr::T(Schema::Object(
                ObjectBuilder::new().schema_type(scalar).build(),
            ))))
            .build();
        operation_builder = operation_builder.parameter(built_parameter);
    }

    if !endpoint.request_body.is_empty() {
        let request_body = RequestBodyBuilder::new()
            .required(Some(Required::True))
            .content(
                "application/json",
                ContentBuilder::new()
                    .schema(Some(schema_ref(&endpoint.request_body)))
                    .build(),
            )
            .build();
        operation_builder = operation_builder.request_body(Some(request_body));
    }

    let mut response_builder = ResponseBuilder::new().description("OK");
    if !endpoint.response_body.is_empty() {
        response_builder = response_builder.content(
            "application/json",
            ContentBuilder::new()
                .schema(Some(schema_ref(&endpoint.response_body)))
                .build(),
        );
    }
    let responses = ResponsesBuilder::new()
        .response("200", response_builder.build())
        .response(
            "default",
            ResponseBuilder::new()
                .description("Error: {\"error\": \"<message>\"}")
                .build(),
        )
        .build();

    operation_builder.responses(responses).build()
}

fn component_name(type_name: &str) -> String {
    type_name.to_upper_camel_case()
}

fn schema_ref(type_name: &str) -> RefOr<Schema> {
    RefOr::Ref(Ref::from_schema_name(component_name(type_name)))
}

/// Infers a schema from a deep-zero example.
fn schema_from_example(example: &Value) -> RefOr<Schema> {
    let scalar = |schema_type: Type| {
        RefOr::T(Schema::Object(
            ObjectBuilder::new().schema_type(schema_type).build(),
        ))
    };

    match example {
        Value::Null => RefOr::T(Schema::default()),
        Value::Bool(_) => scalar(Type::Boolean),
        Value::Number(number) if number.is_f64() => scalar(Type::Number),
        Value::Number(_) => scalar(Type::Integer),
        Value::String(_) => scalar(Type::String),
        Value::Array(items) => {
            let item = items
                .first()
                .map(schema_from_example)
                .unwrap_or_else(|| RefOr::T(Schema::default()));
            RefOr::T(Schema::Array(Array::new(item)))
        }
        Value::Object(fields) => {
            let object = fields.iter().fold(
                ObjectBuilder::new().schema_type(Type::Object),
                |builder, (name, value)| {
                    builder
                        .property(name, schema_from_example(value))
                        .required(name)
                },
            );
            RefOr::T(Schema::Object(object.build()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docs::{ParamDoc, TypeDoc};
    use serde_json::json;

    fn documentation() -> Documentation {
        let mut documentation = Documentation::default();
        documentation.types.insert(
            "Vec<Item>".into(),
            TypeDoc {
                description: String::new(),
                example: json!([{"id": "", "count": 0, "price": 0.0}]),
            },
        );
        documentation.endpoints.push(Endpoint {
            path: "/items".into(),
            request_body: "Vec<Item>".into(),
            ..Endpoint::default()
        });
        documentation.endpoints.push(Endpoint {
            method: Some("GET".into()),
            path: "/item".into(),
            params: BTreeMap::from([(
                "id".into(),
                ParamDoc {
                    scalar: "integer".into(),
                    required: false,
                    description: "which item".into(),
                },
            )]),
            ..Endpoint::default()
        });
        documentation
    }

    #[test]
    fn methodless_endpoints_with_a_body_are_posts() {
        let openapi = build_openapi(&documentation(), "Items", "1.0.0", "");
        let items = &openapi.paths.paths["/items"];
        assert!(items.post.is_some());
        assert!(items.get.is_none());
        assert_eq!(
            items.post.as_ref().and_then(|op| op.operation_id.clone()),
            Some("post_items".to_string())
        );
    }

    #[test]
    fn query_params_and_components_are_exported() {
        let openapi = build_openapi(&documentation(), "Items", "1.0.0", "");
        let value = serde_json::to_value(&openapi).unwrap();

        let parameter = &value["paths"]["/item"]["get"]["parameters"][0];
        assert_eq!(parameter["name"], "id");
        assert_eq!(parameter["in"], "query");
        assert_eq!(parameter["required"], false);
        assert_eq!(parameter["schema"]["type"], "integer");

        let item = &value["components"]["schemas"]["VecItem"]["items"];
        assert_eq!(item["properties"]["count"]["type"], "integer");
        assert_eq!(item["properties"]["price"]["type"], "number");
    }
}
