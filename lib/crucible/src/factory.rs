//! Client factory holding a frozen configuration snapshot.

use crate::{Result, builder::FactoryState, client::Client, pipeline};

/// Factory producing pre-configured [`Client`] instances.
///
/// Holds the configuration frozen by [`FactoryBuilder::build`]. Each
/// [`Self::create_client`] call assembles a fresh pipeline from the same
/// snapshot, so repeated calls yield structurally equivalent, independently
/// usable clients.
///
/// [`FactoryBuilder::build`]: crate::FactoryBuilder::build
#[derive(Debug)]
pub struct ClientFactory {
    state: FactoryState,
}

impl ClientFactory {
    pub(crate) fn new(state: FactoryState) -> Self {
        Self { state }
    }

    /// Instantiate the pre-configured HTTP client.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport cannot be prepared, e.g. when the
    /// configured client certificate material is invalid.
    pub fn create_client(&self) -> Result<Client> {
        let (entry, _transport) = pipeline::assemble(&self.state)?;
        Ok(Client::from_state(entry, &self.state))
    }
}
