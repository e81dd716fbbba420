use serde::{Deserialize, Serialize};

use crate::hub::{ClientEndpoint, ServerHub};

/// How this process takes part in a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NetMode {
    #[default]
    Standalone,
    Client,
    DedicatedServer,
}

impl NetMode {
    /// Whether this process may mutate the world directly.
    pub fn has_authority(self) -> bool {
        !matches!(self, NetMode::Client)
    }

    /// Whether world changes must be pushed to connected clients.
    pub fn broadcasts(self) -> bool {
        matches!(self, NetMode::DedicatedServer)
    }
}

pub enum Session {
    Standalone,
    Server(ServerHub),
    Client(ClientEndpoint),
}

impl Session {
    pub fn mode(&self) -> NetMode {
        match self {
            Session::Standalone => NetMode::Standalone,
            Session::Server(_) => NetMode::DedicatedServer,
            Session::Client(_) => NetMode::Client,
        }
    }

    pub fn has_authority(&self) -> bool {
        self.mode().has_authority()
    }
}

impl Default for Session {
    fn default() -> Self {
        Session::Standalone
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_clients_lack_authority() {
        assert!(NetMode::Standalone.has_authority());
        assert!(NetMode::DedicatedServer.has_authority());
        assert!(!NetMode::Client.has_authority());
        assert!(NetMode::DedicatedServer.broadcasts());
        assert!(!NetMode::Standalone.broadcasts());
    }

    #[test]
    fn session_reports_its_mode() {
        let hub = ServerHub::new();
        let client = Session::Client(hub.connect_local());
        assert_eq!(client.mode(), NetMode::Client);
        assert!(!client.has_authority());
        assert_eq!(Session::Server(hub).mode(), NetMode::DedicatedServer);
        assert_eq!(Session::default().mode(), NetMode::Standalone);
    }
}
