//! Identity of the logged-in client.

/// Established by [`FleetLedger::login_client`] and handed back into every
/// client-path call by the caller. The ledger keeps no session state itself.
///
/// [`FleetLedger::login_client`]: crate::ledger::FleetLedger::login_client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSession {
    /// Id the client logged in with.
    pub client_id: String,
    /// Name resolved at login.
    pub name: String,
}

impl ClientSession {
    /// Build a session for `client_id`.
    pub fn new(client_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            name: name.into(),
        }
    }

    /// Greeting shown after login.
    pub fn greeting(&self) -> String {
        format!("Welcome {}", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn greeting_uses_name() {
        let session = ClientSession::new("C1", "Alice");
        assert_eq!(session.greeting(), "Welcome Alice");
    }
}
