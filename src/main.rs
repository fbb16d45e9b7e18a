#[tokio::main]
async fn main() {
    if let Err(e) = sortdesk::run().await {
        // Tracing may not be initialized if startup failed early
        eprintln!("sortdesk: {}", e);
        std::process::exit(1);
    }
}
