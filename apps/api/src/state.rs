use std::sync::Arc;

use crate::auth::session::SessionIssuer;
use crate::auth::token::TokenCodec;
use crate::resumes::improver::ContentImprover;
use crate::resumes::workflow::ResumeWorkflow;
use crate::store::{HistoryLedger, ResumeStore, UserStore};

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Identity lookups for the `CurrentUser` extractor.
    pub users: Arc<dyn UserStore>,
    pub tokens: Arc<TokenCodec>,
    pub sessions: Arc<SessionIssuer>,
    pub workflow: Arc<ResumeWorkflow>,
}

impl AppState {
    pub fn new(
        users: Arc<dyn UserStore>,
        resumes: Arc<dyn ResumeStore>,
        history: Arc<dyn HistoryLedger>,
        tokens: Arc<TokenCodec>,
        improver: Arc<dyn ContentImprover>,
    ) -> Self {
        let sessions = Arc::new(SessionIssuer::new(users.clone(), tokens.clone()));
        let workflow = Arc::new(ResumeWorkflow::new(
            users.clone(),
            resumes,
            history,
            improver,
        ));
        Self {
            users,
            tokens,
            sessions,
            workflow,
        }
    }
}
