use casino_feed_core::{BookmakerId, ClientCommand};
use casino_feed_ingest::FeedView;
use tokio::sync::oneshot;

#[derive(Debug)]
pub enum FeedCommand {
    Subscribe(BookmakerId),
    Unsubscribe,
    Table(TableRequest),
    Disconnect,
    GetView(oneshot::Sender<Option<FeedView>>),
}

/// Roulette request aimed at the subscribed table. `window` is the number of
/// recent spins a forecast is computed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableRequest {
    SubscribePrediction { window: u32 },
    UnsubscribePrediction { window: u32 },
    PredictionUpdate { window: u32 },
    LatestHistory,
}

impl TableRequest {
    #[must_use]
    pub fn command(self, bookmaker_id: BookmakerId) -> ClientCommand {
        match self {
            Self::SubscribePrediction { window } => {
                ClientCommand::subscribe_prediction(bookmaker_id, window)
            }
            Self::UnsubscribePrediction { window } => {
                ClientCommand::unsubscribe_prediction(bookmaker_id, window)
            }
            Self::PredictionUpdate { window } => {
                ClientCommand::request_immediate_update(bookmaker_id, window)
            }
            Self::LatestHistory => ClientCommand::get_latest_history(bookmaker_id),
        }
    }
}
