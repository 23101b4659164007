use mock_server::MockStore;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    let port = std::env::var("PORT").unwrap_or_else(|_| "4000".to_string());
    let addr = format!("127.0.0.1:{port}");
    let store = match std::env::var("BUBBLE_API_KEY") {
        Ok(token) => MockStore::with_token(&token),
        Err(_) => MockStore::new(),
    };
    let listener = TcpListener::bind(&addr).await?;
    println!("mock record store listening on {addr}");
    mock_server::run_with_store(listener, store).await
}
