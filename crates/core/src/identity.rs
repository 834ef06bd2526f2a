// SPDX-License-Identifier: MIT

//! Caller identity, as handed to every command by the RPC surface (§6 treats
//! the transport itself as an external collaborator — this is only the
//! shape of the identity it is expected to supply).

use serde::{Deserialize, Serialize};

/// Opaque identity of an RPC caller, checked against
/// [`crate::config::Config::control_clients`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClientIdentity(pub String);

impl ClientIdentity {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for ClientIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
