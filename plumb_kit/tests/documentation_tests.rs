use std::collections::BTreeMap;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::response::IntoResponse;
use plumb_kit::bootstrap::rest_router_with_docs;
use plumb_kit::docs::ParamDoc;
use plumb_kit::openapi::build_openapi;
use plumb_kit::{
    api_dto, param_name, ByMethod, Documentation, Error, Example, FromRequest, IntParam, Raw,
    RequestContext, ServeMux, StringParam,
};
use serde_json::{json, Value};
use tower::ServiceExt;

/// A number,
///     wrapped.
#[api_dto]
pub struct Foo {
    pub n: i64,
}

/// A shelf of books.
#[api_dto]
pub struct Shelf {
    pub label: String,
    pub books: Vec<Book>,
    pub index: BTreeMap<String, i64>,
    pub next: Option<Box<Shelf>>,
}

#[api_dto]
pub struct Book {
    pub title: String,
    pub price: f64,
    pub in_stock: bool,
}

param_name! {
    /// Identifier
    /// of the foo.
    pub Id = "id";
    pub Page = "page";
}

struct Session;

impl FromRequest for Session {
    fn from_request(_ctx: &RequestContext) -> plumb_kit::Result<Self> {
        Ok(Session)
    }

    fn documentation() -> Option<&'static str> {
        Some(
            "Needs a
             session.",
        )
    }
}

async fn take_foo(_foo: Box<Foo>) {}

async fn find_foo(_id: StringParam<Id>, _page: Option<IntParam<Page>>) -> Result<Foo, Error> {
    Ok(Foo { n: 1 })
}

async fn list_shelves(_session: Session) -> Vec<Shelf> {
    Vec::new()
}

fn mux() -> ServeMux {
    let mut mux = ServeMux::new();
    mux.handle("/take", take_foo).unwrap().doc("  Takes a foo.\n  Returns nothing. ");
    mux.handle("/find", ByMethod::new().get(find_foo).post(take_foo))
        .unwrap()
        .doc("Finds foos.");
    mux.handle("/shelves", ByMethod::new().get(list_shelves))
        .unwrap();
    mux.handle(
        "/health",
        Raw::new(|_req: Request<Body>| async { StatusCode::OK.into_response() }),
    )
    .unwrap()
    .doc("Health.");
    mux
}

#[test]
fn artifact_describes_every_endpoint_in_order() {
    let documentation = mux().documentation(&["  Hello\n   world. "]).unwrap();
    assert_eq!(documentation.introduction, vec!["Hello world."]);

    let summary: Vec<(Option<&str>, &str)> = documentation
        .endpoints
        .iter()
        .map(|endpoint| (endpoint.method.as_deref(), endpoint.path.as_str()))
        .collect();
    assert_eq!(
        summary,
        vec![
            (None, "/take"),
            (Some("GET"), "/find"),
            (Some("POST"), "/find"),
            (Some("GET"), "/shelves"),
            (None, "/health"),
        ]
    );

    let take = &documentation.endpoints[0];
    assert_eq!(take.description, "Takes a foo. Returns nothing.");
    assert_eq!(take.request_body, "Foo");
    assert_eq!(take.response_body, "");

    let find = &documentation.endpoints[1];
    assert_eq!(find.description, "Finds foos.");
    assert_eq!(find.response_body, "Foo");
    assert_eq!(
        find.params,
        BTreeMap::from([
            (
                "id".to_string(),
                ParamDoc {
                    scalar: "string".into(),
                    required: true,
                    description: "Identifier of the foo.".into(),
                }
            ),
            (
                "page".to_string(),
                ParamDoc {
                    scalar: "integer".into(),
                    required: false,
                    description: String::new(),
                }
            ),
        ])
    );

    let shelves = &documentation.endpoints[3];
    assert_eq!(shelves.response_body, "Vec<Shelf>");
    assert_eq!(shelves.notes, vec!["Needs a session."]);

    let health = &documentation.endpoints[4];
    assert_eq!(health.description, "Health.");
    assert!(health.params.is_empty());
}

#[test]
fn type_dictionary_holds_deep_zero_examples() {
    let documentation = mux().documentation(&[]).unwrap();

    let foo = &documentation.types["Foo"];
    assert_eq!(foo.description, "A number, wrapped.");
    assert_eq!(foo.example, json!({"n": 0}));
    assert_eq!(foo.example, serde_json::to_value(Foo::example()).unwrap());

    let shelves = &documentation.types["Vec<Shelf>"].example;
    let shelf = &shelves[0];
    assert_eq!(shelf["label"], "");
    assert_eq!(
        shelf["books"],
        json!([{"title": "", "price": 0.0, "inStock": false}])
    );
    assert_eq!(shelf["index"], json!({"": 0}));
    assert!(shelf["next"].is_object());
    assert_eq!(documentation.types.len(), 2);
}

#[test]
fn deep_zero_examples_round_trip() {
    let encoded = serde_json::to_string(&Shelf::example()).unwrap();
    let decoded: Shelf = serde_json::from_str(&encoded).unwrap();
    assert_eq!(serde_json::to_string(&decoded).unwrap(), encoded);
}

#[test]
fn openapi_document_follows_the_artifact() {
    let documentation = mux().documentation(&[]).unwrap();
    let openapi = build_openapi(&documentation, "Foos", "1.0.0", "All about foos.");
    let value = serde_json::to_value(&openapi).unwrap();

    assert_eq!(value["info"]["title"], "Foos");
    assert!(value["paths"]["/take"]["post"].is_object());
    assert!(value["paths"]["/health"]["get"].is_object());

    let find = &value["paths"]["/find"]["get"];
    assert_eq!(find["operationId"], "get_find");
    let names: Vec<&str> = find["parameters"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|param| param["name"].as_str())
        .collect();
    assert_eq!(names, vec!["id", "page"]);
    assert_eq!(find["parameters"][0]["required"], true);
    assert_eq!(find["parameters"][1]["required"], false);

    let schemas = &value["components"]["schemas"];
    assert!(schemas["Foo"]["properties"]["n"].is_object());
    assert_eq!(schemas["VecShelf"]["type"], "array");
}

#[tokio::test]
async fn documentation_is_served_next_to_the_routes() {
    let expected = mux().documentation(&["Intro."]).unwrap();
    let router = rest_router_with_docs(mux(), "Foos", "1.0.0", &["Intro."]).unwrap();

    let response = router
        .clone()
        .oneshot(
            Request::get("/api-docs/endpoints.json")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let served: Documentation = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(served, expected);

    let response = router
        .oneshot(
            Request::get("/api-docs/openapi.json")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let openapi: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(openapi["info"]["description"], "Intro.");
}
