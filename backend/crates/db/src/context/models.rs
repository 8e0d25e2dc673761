use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalKind {
    Campaign,
    News,
}

/// One campaign or news item for a day. `name` is the campaign name or the
/// news headline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextSignal {
    pub kind: SignalKind,
    pub name: String,
    pub description: Option<String>,
}

impl ContextSignal {
    pub fn campaign(name: impl Into<String>, description: Option<String>) -> Self {
        Self {
            kind: SignalKind::Campaign,
            name: name.into(),
            description,
        }
    }

    pub fn news(headline: impl Into<String>, description: Option<String>) -> Self {
        Self {
            kind: SignalKind::News,
            name: headline.into(),
            description,
        }
    }
}
