use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Product catalog served through plumb_kit.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Config {
    /// Address to listen on.
    #[arg(long, env = "HOST", default_value = "127.0.0.1")]
    host: String,

    /// Port to listen on.
    #[arg(long, env = "PORT", default_value_t = 3000)]
    port: u16,

    /// Print the endpoint documentation and the OpenAPI document as JSON, then exit.
    #[arg(long, env = "PRINT_DOCS")]
    print_docs: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if config.print_docs {
        let mux = product_service::build_mux()?;
        let documentation = product_service::documentation(&mux)?;
        let openapi = product_service::openapi(&documentation);
        println!("{}", serde_json::to_string_pretty(&documentation)?);
        println!("{}", serde_json::to_string_pretty(&openapi)?);
        return Ok(());
    }

    let app = product_service::build_app()?;

    let address = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("binding {address}"))?;
    tracing::info!("🚀 Server running at http://{address}");
    tracing::info!("📚 Swagger UI available at http://{address}/swagger-ui");

    axum::serve(listener, app).await?;
    Ok(())
}
