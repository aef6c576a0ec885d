use std::time::Duration;

use reqwest::Client;

pub mod fetcher;
pub mod notifier;

pub use fetcher::HttpFetcher;
pub use notifier::HttpNotifier;

/// Fetch has no overall timeout; large sources can take as long as they take.
pub fn fetch_client() -> reqwest::Result<Client> {
    Client::builder().build()
}

pub fn notify_client(timeout: Duration) -> reqwest::Result<Client> {
    Client::builder().timeout(timeout).build()
}
