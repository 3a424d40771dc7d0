use std::sync::Arc;

use chrono::Duration;

use crate::clock::Clock;
use crate::config::Config;
use crate::notify::Notifier;
use crate::ranking::{RankingEngine, SelectionConfig};
use crate::store::SubmissionStore;
use crate::workflow::{EditorialWorkflow, PosterWorkflow, ReviewWorkflow, SubmissionWorkflow};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn SubmissionStore>,
    pub clock: Arc<dyn Clock>,
    pub config: Arc<Config>,
    pub notifier: Arc<Notifier>,
}

impl AppState {
    pub fn selection_config(&self) -> SelectionConfig {
        SelectionConfig {
            per_event: self.config.per_event_slots,
            general_extra: self.config.general_slots,
            confirmation_window: Duration::hours(self.config.confirmation_window_hours),
        }
    }

    pub fn submissions(&self) -> SubmissionWorkflow {
        SubmissionWorkflow::new(
            self.store.clone(),
            self.clock.clone(),
            self.config.payment_gateway,
        )
    }

    pub fn reviews(&self) -> ReviewWorkflow {
        ReviewWorkflow::new(self.store.clone(), self.clock.clone())
    }

    pub fn editorial(&self) -> EditorialWorkflow {
        EditorialWorkflow::new(self.store.clone(), self.clock.clone())
    }

    pub fn posters(&self) -> PosterWorkflow {
        PosterWorkflow::new(self.store.clone())
    }

    pub fn ranking(&self) -> RankingEngine {
        RankingEngine::new(self.store.clone(), self.selection_config())
    }
}
