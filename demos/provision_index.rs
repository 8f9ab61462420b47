use provision_http::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION},
    Client, ClientConfig,
};
use serde_json::json;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let token = std::env::var("PROVISION_HTTP_TOKEN")?;

    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {token}"))?);
    let client = Client::new(ClientConfig::from_env()?.with_default_headers(headers))?;

    // Safe to re-run: an existing index answers 409 or a 500 that says so.
    let created = client
        .post_form(
            "/services/data/indexes",
            [("name", "provisioned"), ("datatype", "event")],
            HeaderMap::new(),
        )
        .await?;
    println!("create index: {} in {:?}", created.status(), created.elapsed());

    let updated = client
        .put(
            "/services/data/indexes/provisioned",
            &json!({ "frozenTimePeriodInSecs": 86_400 }),
            HeaderMap::new(),
        )
        .await?;
    println!("update index: {}", updated.status());

    Ok(())
}
