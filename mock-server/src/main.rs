use log::{info, warn};
use tokio::net::TcpListener;

const DEFAULT_PORT: u16 = 3000;

fn parse_port(raw: Option<&str>) -> u16 {
    match raw {
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("ignoring PORT={raw:?}, not a port number; using {DEFAULT_PORT}");
            DEFAULT_PORT
        }),
        None => DEFAULT_PORT,
    }
}

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let port = parse_port(std::env::var("PORT").ok().as_deref());
    let listener = TcpListener::bind(("127.0.0.1", port)).await?;
    info!("mock server listening on {}", listener.local_addr()?);
    mock_server::run(listener).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_falls_back_to_default() {
        assert_eq!(parse_port(None), DEFAULT_PORT);
        assert_eq!(parse_port(Some("8081")), 8081);
        assert_eq!(parse_port(Some("eighty")), DEFAULT_PORT);
        assert_eq!(parse_port(Some("70000")), DEFAULT_PORT);
    }
}
