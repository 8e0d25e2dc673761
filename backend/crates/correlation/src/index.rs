use ctxwatch_db::context::models::ContextSignal;

/// The day's campaign and news signals, built once per run and read-only
/// afterwards. Presence flags are computed at construction.
#[derive(Debug, Clone, Default)]
pub struct ContextIndex {
    campaigns: Vec<ContextSignal>,
    news: Vec<ContextSignal>,
    has_campaign: bool,
    has_news: bool,
}

impl ContextIndex {
    pub fn new(campaigns: Vec<ContextSignal>, news: Vec<ContextSignal>) -> Self {
        Self {
            has_campaign: !campaigns.is_empty(),
            has_news: !news.is_empty(),
            campaigns,
            news,
        }
    }

    pub fn has_campaign(&self) -> bool {
        self.has_campaign
    }

    pub fn has_news(&self) -> bool {
        self.has_news
    }

    pub fn campaigns(&self) -> &[ContextSignal] {
        &self.campaigns
    }

    pub fn news(&self) -> &[ContextSignal] {
        &self.news
    }
}
