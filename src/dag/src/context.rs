//! Chain context handed to the serializer at initialization

use snowdag_core::Id;

/// Identity of the chain a serializer works for
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChainContext {
    /// Network the chain belongs to
    pub network_id: u32,
    /// Chain identifier, used as a logging field
    pub chain_id: Id,
}

impl ChainContext {
    pub fn new(network_id: u32, chain_id: Id) -> Self {
        Self {
            network_id,
            chain_id,
        }
    }
}
