use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SessionType {
    #[default]
    Work,
    Break,
    Lunch,
    Meeting,
    Errand,
}

impl SessionType {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            SessionType::Work => "work",
            SessionType::Break => "break",
            SessionType::Lunch => "lunch",
            SessionType::Meeting => "meeting",
            SessionType::Errand => "errand",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "work" => Some(SessionType::Work),
            "break" => Some(SessionType::Break),
            "lunch" => Some(SessionType::Lunch),
            "meeting" => Some(SessionType::Meeting),
            "errand" => Some(SessionType::Errand),
            _ => None,
        }
    }
}
