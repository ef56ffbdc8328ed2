//! Handoff detection for the wallet step
//!
//! The wallet agent hands off to the mining step by convention over the
//! location path alone. There is no shared state between the two agents.

use tracing::{debug, info};
use warden_core::{NavigationStatus, SiteConfig};

/// What the current location means for the wallet agent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handoff {
    /// Still on the wallet step; run normal tick logic
    Stay,
    /// Arrived on the mining step; stop and reload it once
    Destination,
    /// Some other step; stop without acting
    Elsewhere,
}

/// Classifies the current location against the wallet and mining steps
#[derive(Debug, Clone)]
pub struct HandoffDetector {
    own_path: String,
    destination_path: String,
}

impl HandoffDetector {
    pub fn new(own_path: impl Into<String>, destination_path: impl Into<String>) -> Self {
        Self {
            own_path: own_path.into(),
            destination_path: destination_path.into(),
        }
    }

    /// Wallet step handing off to the mining step
    pub fn for_wallet(site: &SiteConfig) -> Self {
        Self::new(site.wallet_path.clone(), site.mine_path.clone())
    }

    /// An unreadable location counts as [`Handoff::Stay`]
    pub fn inspect(&self, navigation: Option<&NavigationStatus>) -> Handoff {
        let Some(navigation) = navigation else {
            debug!("Location unreadable, staying on current step");
            return Handoff::Stay;
        };
        let path = navigation.current_path.as_str();

        if path.ends_with(&self.destination_path) {
            info!("Location is now {}, handing off", path);
            Handoff::Destination
        } else if !path.ends_with(&self.own_path) {
            info!("Location moved to {}, yielding", path);
            Handoff::Elsewhere
        } else {
            Handoff::Stay
        }
    }
}
