//! One-shot GET helpers and the process wide default client.
//!
//! The default client is shared global state. It is created on first use
//! and can be replaced at any time. Access is serialized by a mutex, so
//! requests made through it from several threads run one after another.

use std::sync::{Mutex, MutexGuard, PoisonError};

use http::HeaderMap;

use crate::client::Client;
use crate::error::Result;
use crate::response::Response;
use crate::transport::Transport;

static DEFAULT_CLIENT: Mutex<Option<Client>> = Mutex::new(None);

fn lock() -> MutexGuard<'static, Option<Client>> {
    // A panic while holding the lock leaves the client itself intact.
    DEFAULT_CLIENT
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
}

/// GET `url` with the default client, creating it if needed.
pub fn open(url: &str) -> Result<Response> {
    with_default_client(|client| open_with(client, url))
}

/// GET `url` with the given client.
pub fn open_with<T: Transport>(client: &mut Client<T>, url: &str) -> Result<Response> {
    client.get(url, &HeaderMap::new())
}

/// Run `f` with the default client, creating it if needed.
pub fn with_default_client<R>(f: impl FnOnce(&mut Client) -> R) -> R {
    let mut guard = lock();
    let client = guard.get_or_insert_with(|| {
        debug!("Create default client");
        Client::new()
    });
    f(client)
}

/// Replace the default client, returning the previous one.
///
/// `None` removes it; the next use creates a fresh one.
pub fn set_default_client(client: Option<Client>) -> Option<Client> {
    std::mem::replace(&mut *lock(), client)
}

/// Whether a default client currently exists.
pub fn has_default_client() -> bool {
    lock().is_some()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::session::SslMode;

    // All default client assertions live in one test since the client is
    // process wide.
    #[test]
    fn default_client_lifecycle() {
        set_default_client(None);
        assert!(!has_default_client());

        let mode = with_default_client(|c| c.ssl_mode());
        assert_eq!(mode, SslMode::On);
        assert!(has_default_client());

        let mut replacement = Client::new();
        replacement.set_ssl_mode(SslMode::Disable);
        let previous = set_default_client(Some(replacement));
        assert!(previous.is_some());

        assert_eq!(with_default_client(|c| c.ssl_mode()), SslMode::Disable);

        let taken = set_default_client(None);
        assert_eq!(taken.map(|c| c.ssl_mode()), Some(SslMode::Disable));
        assert!(!has_default_client());
    }
}
