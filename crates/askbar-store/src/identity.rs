//! Persistence of the client identifier.

use askbar_shared::constants::CLIENT_ID_KEY;
use askbar_shared::ClientId;

use crate::database::Database;
use crate::error::Result;

impl Database {
    /// Return the stored client identifier, generating and storing one on
    /// first access.  The identifier is never rotated.
    pub fn client_id(&self) -> Result<ClientId> {
        if let Some(id) = self.get_item(CLIENT_ID_KEY)?.and_then(ClientId::from_stored) {
            return Ok(id);
        }

        let id = ClientId::generate();
        self.set_item(CLIENT_ID_KEY, id.as_str())?;
        tracing::info!(client_id = %id, "generated new client identifier");
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_id_is_stable_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("id.db");

        let first = Database::open_at(&path).unwrap().client_id().unwrap();
        let second = Database::open_at(&path).unwrap().client_id().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn blank_stored_id_is_replaced() {
        let db = Database::open_in_memory().unwrap();
        db.set_item(CLIENT_ID_KEY, "").unwrap();

        let id = db.client_id().unwrap();
        assert!(!id.as_str().is_empty());
        assert_eq!(db.get_item(CLIENT_ID_KEY).unwrap().as_deref(), Some(id.as_str()));
    }
}
