use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

use axum::http::header::LOCATION;
use axum::http::{HeaderValue, StatusCode};
use once_cell::sync::Lazy;
use plumb_kit::{
    handler, param_name, FromRequest, HttpError, IntParam, RequestContext, ResponseWriter,
    StringParam, ToResponse,
};

use crate::dtos::{
    AddParams, Category, Greeting, LegacyData, NewProduct, Product, ProductUpdate, Sum,
};

param_name! {
    /// Identifier of the product.
    pub ProductId = "id";
    /// Only list products in this category.
    pub CategoryId = "category";
    /// Maximum number of products to return.
    pub Limit = "limit";
    /// Who to greet.
    pub Name = "name";
}

#[derive(Debug, thiserror::Error)]
pub enum ProductError {
    #[error("product {0} not found")]
    NotFound(String),
    #[error("product code {0} is already taken")]
    DuplicateCode(String),
    #[error("price must not be negative")]
    NegativePrice,
}

impl HttpError for ProductError {
    fn response_code(&self) -> StatusCode {
        match self {
            ProductError::NotFound(_) => StatusCode::NOT_FOUND,
            ProductError::DuplicateCode(_) => StatusCode::CONFLICT,
            ProductError::NegativePrice => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }
}

/// The caller's API key, read from the `x-api-key` header.
#[derive(Debug)]
pub struct ApiKey(pub String);

impl FromRequest for ApiKey {
    fn from_request(ctx: &RequestContext) -> plumb_kit::Result<Self> {
        match ctx.header("x-api-key") {
            Some(key) if !key.trim().is_empty() => Ok(ApiKey(key.trim().to_string())),
            _ => Err(plumb_kit::Error::http(
                StatusCode::UNAUTHORIZED,
                "missing x-api-key header",
            )),
        }
    }

    fn documentation() -> Option<&'static str> {
        Some(
            "Requires an API key
             in the x-api-key header.",
        )
    }
}

/// Marks a newly created product: 201 with its location.
#[derive(Debug)]
pub struct Created {
    pub location: String,
}

impl ToResponse for Created {
    fn to_response(self, res: &mut ResponseWriter) -> plumb_kit::Result<()> {
        let location = HeaderValue::from_str(&self.location)
            .map_err(|err| anyhow::anyhow!("invalid location {}: {err}", self.location))?;
        res.write_status(StatusCode::CREATED);
        res.insert_header(LOCATION, location);
        Ok(())
    }

    fn documentation() -> Option<&'static str> {
        Some("Responds 201 Created with a Location header.")
    }
}

static CATALOG: Lazy<RwLock<BTreeMap<String, Product>>> = Lazy::new(|| {
    let electronics = Category {
        id: "cat-01".to_string(),
        name: "Electronics".to_string(),
        parent: None,
    };
    let books = Category {
        id: "cat-02".to_string(),
        name: "Books".to_string(),
        parent: None,
    };
    let products = [
        Product {
            id: "prod-001".to_string(),
            product_code: "P-12345".to_string(),
            name: "Example Product 1".to_string(),
            description: Some("This is product 1.".to_string()),
            price: 99.99,
            category: electronics,
            attributes: BTreeMap::from([("colour".to_string(), "black".to_string())]),
        },
        Product {
            id: "prod-002".to_string(),
            product_code: "P-67890".to_string(),
            name: "Example Product 2".to_string(),
            description: Some("This is product 2.".to_string()),
            price: 149.99,
            category: books,
            attributes: BTreeMap::new(),
        },
    ];
    RwLock::new(
        products
            .into_iter()
            .map(|product| (product.id.clone(), product))
            .collect(),
    )
});

/// Next product number; ids are never handed out twice, even after a delete.
static NEXT_ID: AtomicU64 = AtomicU64::new(3);

fn find(id: &str) -> Result<Product, ProductError> {
    CATALOG
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(id)
        .cloned()
        .ok_or_else(|| ProductError::NotFound(id.to_string()))
}

#[handler]
pub async fn list_products(
    category: Option<StringParam<CategoryId>>,
    limit: Option<IntParam<Limit>>,
) -> Vec<Product> {
    let limit = limit.map_or(usize::MAX, |limit| limit.get().max(0) as usize);
    CATALOG
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .values()
        .filter(|product| {
            category
                .as_ref()
                .map_or(true, |category| product.category.id == **category)
        })
        .take(limit)
        .cloned()
        .collect()
}

#[handler]
pub async fn get_product(id: StringParam<ProductId>) -> Result<Product, ProductError> {
    find(&id)
}

#[handler]
pub async fn create_product(
    _key: ApiKey,
    new_product: Box<NewProduct>,
) -> Result<(Created, Product), ProductError> {
    if new_product.price < 0.0 {
        return Err(ProductError::NegativePrice);
    }

    let mut catalog = CATALOG.write().unwrap_or_else(PoisonError::into_inner);
    if catalog
        .values()
        .any(|product| product.product_code == new_product.product_code)
    {
        return Err(ProductError::DuplicateCode(new_product.product_code));
    }

    let NewProduct {
        product_code,
        name,
        description,
        price,
        category,
    } = *new_product;
    let id = format!("prod-{:03}", NEXT_ID.fetch_add(1, Ordering::Relaxed));
    let product = Product {
        id: id.clone(),
        product_code,
        name,
        description,
        price,
        category,
        attributes: BTreeMap::new(),
    };
    catalog.insert(id.clone(), product.clone());
    tracing::info!(%id, "created product");

    Ok((
        Created {
            location: format!("/v1/product?id={id}"),
        },
        product,
    ))
}

#[handler]
pub async fn update_product(
    _key: ApiKey,
    id: StringParam<ProductId>,
    update: ProductUpdate,
) -> Result<Product, ProductError> {
    if update.price.is_some_and(|price| price < 0.0) {
        return Err(ProductError::NegativePrice);
    }

    let mut catalog = CATALOG.write().unwrap_or_else(PoisonError::into_inner);
    let product = catalog
        .get_mut(&*id)
        .ok_or_else(|| ProductError::NotFound(id.to_string()))?;
    if let Some(name) = update.name {
        product.name = name;
    }
    if update.description.is_some() {
        product.description = update.description;
    }
    if let Some(price) = update.price {
        product.price = price;
    }
    Ok(product.clone())
}

#[handler]
pub async fn delete_product(
    _key: ApiKey,
    id: StringParam<ProductId>,
) -> Result<StatusCode, ProductError> {
    CATALOG
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .remove(&*id)
        .map(|_| StatusCode::NO_CONTENT)
        .ok_or_else(|| ProductError::NotFound(id.to_string()))
}

/// Add two numbers. Registered without `#[handler]`, so it is served by the
/// runtime adapter.
pub async fn add(params: AddParams) -> Sum {
    Sum {
        value: params.a + params.b,
    }
}

#[handler]
pub async fn hello(name: Option<StringParam<Name>>) -> Greeting {
    let name = name.map_or_else(|| "world".to_string(), StringParam::into_inner);
    Greeting {
        message: format!("Hello, {name}!"),
    }
}

#[handler]
pub async fn legacy_echo(data: LegacyData) -> LegacyData {
    data
}
