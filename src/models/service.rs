use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    pub id: String,
    pub name: String,
    pub duration_minutes: u32,
    pub price_gel: u32,
    /// Role tag a staff member must carry to perform this service. A service
    /// without one can be performed by anyone.
    #[serde(default)]
    pub required_role: Option<String>,
}
