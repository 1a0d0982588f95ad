//! Outcome of a complete dual-stack run

use super::ResultPair;
use crate::api::types::ClientInfo;
use crate::types::NetworkFamily;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What the API reported about one reachable family
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FamilyInfo {
    pub client: ClientInfo,
    /// Missing when the MSS probe failed
    pub mss: Option<i32>,
}

/// Everything the output layer needs after a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// Session creation time as reported by the API
    pub created_at: DateTime<Utc>,
    pub session_uuid: String,
    pub prefer_ipv6: bool,
    pub ipv4: Option<FamilyInfo>,
    pub ipv6: Option<FamilyInfo>,
    pub results: ResultPair,
    /// Whether the API acknowledged the finished session
    pub finished: bool,
}

impl RunReport {
    pub fn family_info(&self, family: NetworkFamily) -> Option<&FamilyInfo> {
        match family {
            NetworkFamily::V4 => self.ipv4.as_ref(),
            NetworkFamily::V6 => self.ipv6.as_ref(),
        }
    }

    pub fn is_available(&self, family: NetworkFamily) -> bool {
        self.family_info(family).is_some()
    }
}
