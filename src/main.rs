use std::convert::Infallible;
use std::env;
use std::net::SocketAddr;

use hyper::service::{make_service_fn, service_fn};
use hyper::{Client, Server};

use medledger::handlers;
use medledger::RecordStore;

const LISTEN_ADDR: &str = "127.0.0.1:3001";
const CHAIN_GATEWAY_URL: &str = "http://127.0.0.1:8545";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Starting MedLedger record service");

    // Warm up the store so a broken database surfaces at startup
    let store = handlers::get_store();
    println!(
        "Store initialized with {} records",
        store.count_by_status().map(|c| c.total).unwrap_or(0)
    );
    drop(store);

    let gateway_url =
        env::var("MEDLEDGER_CHAIN_GATEWAY").unwrap_or_else(|_| CHAIN_GATEWAY_URL.to_string());
    let addr: SocketAddr = env::var("MEDLEDGER_LISTEN_ADDR")
        .unwrap_or_else(|_| LISTEN_ADDR.to_string())
        .parse()?;

    println!("Using chain gateway at: {}", gateway_url);

    let client = Client::new();
    let make_svc = make_service_fn(move |_conn| {
        let client = client.clone();
        let gateway_url = gateway_url.clone();
        async move {
            Ok::<_, Infallible>(service_fn(move |req| {
                let client = client.clone();
                let gateway_url = gateway_url.clone();
                async move { handlers::route(&client, &gateway_url, req).await }
            }))
        }
    });

    println!("Listening on http://{}", addr);
    Server::bind(&addr).serve(make_svc).await?;

    Ok(())
}
