//! Upload-and-poll workflow
//!
//! [`WorkflowState`] is the state machine for one file attempt; [`Workflow`]
//! drives it against the API, reporting every change to a
//! [`WorkflowObserver`] so the presentation layer can render progress.

use thiserror::Error;

use crate::api::{ApiClient, FileHandle, PresignedUrlPair};
use crate::error::{ValidationError, WorkflowError};
use crate::poller::{self, Outcome, PollPolicy, Sleeper, TokioSleeper};
use crate::session::Session;

/// Where the current attempt stands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowState {
    Unauthenticated,
    Authenticated,
    UrlsRequested { file_name: String },
    Uploading { urls: PresignedUrlPair },
    Uploaded { urls: PresignedUrlPair },
    Polling { urls: PresignedUrlPair },
    Ready { urls: PresignedUrlPair },
    /// Still processing when polling gave up; the link may become valid later
    TimedOut { urls: PresignedUrlPair },
    Failed { error: WorkflowError },
}

/// Input driving the state machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Authenticated,
    FileSelected { file_name: String },
    UrlsReceived(PresignedUrlPair),
    UrlsFailed(WorkflowError),
    UploadSucceeded,
    UploadFailed(WorkflowError),
    PollStarted,
    ProbeSucceeded,
    PollExhausted,
    /// Logout, or the API revoking the key
    LoggedOut,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot handle {event} while {state}")]
pub struct InvalidTransition {
    pub state: &'static str,
    pub event: &'static str,
}

impl WorkflowState {
    pub fn name(&self) -> &'static str {
        match self {
            WorkflowState::Unauthenticated => "unauthenticated",
            WorkflowState::Authenticated => "authenticated",
            WorkflowState::UrlsRequested { .. } => "requesting URLs",
            WorkflowState::Uploading { .. } => "uploading",
            WorkflowState::Uploaded { .. } => "uploaded",
            WorkflowState::Polling { .. } => "polling",
            WorkflowState::Ready { .. } => "ready",
            WorkflowState::TimedOut { .. } => "timed out",
            WorkflowState::Failed { .. } => "failed",
        }
    }

    /// Ready, TimedOut and Failed end an attempt
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            WorkflowState::Ready { .. } | WorkflowState::TimedOut { .. } | WorkflowState::Failed { .. }
        )
    }

    /// Download link to surface to the user, if the attempt got that far
    pub fn download_url(&self) -> Option<&str> {
        match self {
            WorkflowState::Uploading { urls }
            | WorkflowState::Uploaded { urls }
            | WorkflowState::Polling { urls }
            | WorkflowState::Ready { urls }
            | WorkflowState::TimedOut { urls } => Some(&urls.download_url),
            _ => None,
        }
    }

    /// Compute the state following `event`
    pub fn transition(&self, event: Event) -> Result<WorkflowState, InvalidTransition> {
        use WorkflowState as S;

        let next = match (self, event) {
            (_, Event::LoggedOut) => S::Unauthenticated,
            (S::Unauthenticated, Event::Authenticated) => S::Authenticated,
            (
                S::Authenticated | S::Ready { .. } | S::TimedOut { .. } | S::Failed { .. },
                Event::FileSelected { file_name },
            ) => S::UrlsRequested { file_name },
            (S::UrlsRequested { .. }, Event::UrlsReceived(urls)) => S::Uploading { urls },
            (S::UrlsRequested { .. }, Event::UrlsFailed(error)) => S::Failed { error },
            (S::Uploading { urls }, Event::UploadSucceeded) => S::Uploaded { urls: urls.clone() },
            (S::Uploading { .. }, Event::UploadFailed(error)) => S::Failed { error },
            (S::Uploaded { urls }, Event::PollStarted) => S::Polling { urls: urls.clone() },
            (S::Polling { urls }, Event::ProbeSucceeded) => S::Ready { urls: urls.clone() },
            (S::Polling { urls }, Event::PollExhausted) => S::TimedOut { urls: urls.clone() },
            (state, event) => {
                return Err(InvalidTransition {
                    state: state.name(),
                    event: event.name(),
                })
            }
        };

        Ok(next)
    }
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::Authenticated => "authentication",
            Event::FileSelected { .. } => "file selection",
            Event::UrlsReceived(_) => "presigned URLs",
            Event::UrlsFailed(_) => "presigned URL failure",
            Event::UploadSucceeded => "upload success",
            Event::UploadFailed(_) => "upload failure",
            Event::PollStarted => "poll start",
            Event::ProbeSucceeded => "probe success",
            Event::PollExhausted => "poll exhaustion",
            Event::LoggedOut => "logout",
        }
    }
}

/// Receives progress from a running [`Workflow`]
pub trait WorkflowObserver {
    fn on_state(&mut self, state: &WorkflowState);

    /// Called before each probe with the 1-based attempt number
    fn on_poll_attempt(&mut self, _attempt: u32, _max_attempts: u32) {}
}

/// Drives the state machine for one file at a time
pub struct Workflow<S = TokioSleeper> {
    client: ApiClient,
    sleeper: S,
    policy: PollPolicy,
    state: WorkflowState,
}

impl Workflow<TokioSleeper> {
    pub fn new(client: ApiClient) -> Self {
        Self::with_sleeper(client, TokioSleeper, PollPolicy::default())
    }
}

impl<S: Sleeper> Workflow<S> {
    pub fn with_sleeper(client: ApiClient, sleeper: S, policy: PollPolicy) -> Self {
        Self {
            client,
            sleeper,
            policy,
            state: WorkflowState::Unauthenticated,
        }
    }

    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn policy(&self) -> PollPolicy {
        self.policy
    }

    /// Store credentials in `session` and leave the unauthenticated state
    pub fn login(
        &mut self,
        session: &mut Session,
        endpoint: &str,
        api_key: &str,
        observer: &mut impl WorkflowObserver,
    ) -> Result<(), ValidationError> {
        session.authenticate(endpoint, api_key)?;
        if self.state == WorkflowState::Unauthenticated {
            self.apply_or_warn(Event::Authenticated, observer);
        }
        Ok(())
    }

    /// Reset `session` and return to the unauthenticated state
    pub fn logout(&mut self, session: &mut Session, observer: &mut impl WorkflowObserver) {
        session.logout();
        self.apply_or_warn(Event::LoggedOut, observer);
    }

    /// Run one file attempt to a terminal state.
    ///
    /// Fails only when no attempt can start, i.e. the session is not
    /// authenticated. Every other failure ends in [`WorkflowState::Failed`].
    pub async fn run(
        &mut self,
        session: &mut Session,
        file: FileHandle,
        observer: &mut impl WorkflowObserver,
    ) -> Result<&WorkflowState, InvalidTransition> {
        let machine_authenticated = self.state != WorkflowState::Unauthenticated;
        match (session.is_authenticated(), machine_authenticated) {
            (true, false) => self.apply(Event::Authenticated, observer)?,
            (false, true) => self.apply(Event::LoggedOut, observer)?,
            _ => {}
        }

        self.apply(
            Event::FileSelected {
                file_name: file.name.clone(),
            },
            observer,
        )?;
        session.begin_attempt();
        tracing::info!("Processing {} ({})", file.name, file.size_string());

        let urls = match self.client.request_urls(session, &file.name).await {
            Ok(urls) => urls,
            Err(error) => {
                let revoked = error.is_authentication();
                self.apply(Event::UrlsFailed(error), observer)?;
                if revoked {
                    self.apply(Event::LoggedOut, observer)?;
                }
                return Ok(&self.state);
            }
        };
        let upload_url = urls.upload_url.clone();
        let download_url = urls.download_url.clone();
        self.apply(Event::UrlsReceived(urls), observer)?;

        if let Err(error) = self.client.upload_file(&upload_url, file.content).await {
            tracing::warn!("Upload of {} failed: {}", file.name, error);
            self.apply(Event::UploadFailed(error), observer)?;
            return Ok(&self.state);
        }
        session.mark_uploaded();
        self.apply(Event::UploadSucceeded, observer)?;
        self.apply(Event::PollStarted, observer)?;

        let max_attempts = self.policy.max_attempts;
        let outcome = poller::wait_for_completion(
            &self.client,
            &self.sleeper,
            self.policy,
            &download_url,
            |attempt| observer.on_poll_attempt(attempt, max_attempts),
        )
        .await;

        match outcome {
            Outcome::Ready => {
                session.mark_processed();
                self.apply(Event::ProbeSucceeded, observer)?;
            }
            Outcome::TimedOut => self.apply(Event::PollExhausted, observer)?,
        }

        Ok(&self.state)
    }

    fn apply(
        &mut self,
        event: Event,
        observer: &mut impl WorkflowObserver,
    ) -> Result<(), InvalidTransition> {
        let next = self.state.transition(event)?;
        tracing::debug!("Workflow: {} -> {}", self.state.name(), next.name());
        self.state = next;
        observer.on_state(&self.state);
        Ok(())
    }

    fn apply_or_warn(&mut self, event: Event, observer: &mut impl WorkflowObserver) {
        if let Err(e) = self.apply(event, observer) {
            tracing::warn!("Ignoring workflow event: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn urls() -> PresignedUrlPair {
        PresignedUrlPair {
            upload_url: "https://storage/up".to_string(),
            download_url: "https://storage/down.csv".to_string(),
        }
    }

    fn all_states() -> Vec<WorkflowState> {
        vec![
            WorkflowState::Unauthenticated,
            WorkflowState::Authenticated,
            WorkflowState::UrlsRequested {
                file_name: "stmt.pdf".to_string(),
            },
            WorkflowState::Uploading { urls: urls() },
            WorkflowState::Uploaded { urls: urls() },
            WorkflowState::Polling { urls: urls() },
            WorkflowState::Ready { urls: urls() },
            WorkflowState::TimedOut { urls: urls() },
            WorkflowState::Failed {
                error: WorkflowError::Authentication,
            },
        ]
    }

    fn select() -> Event {
        Event::FileSelected {
            file_name: "stmt.pdf".to_string(),
        }
    }

    #[test]
    fn test_happy_path_transitions() {
        let mut state = WorkflowState::Unauthenticated;
        let events = vec![
            Event::Authenticated,
            select(),
            Event::UrlsReceived(urls()),
            Event::UploadSucceeded,
            Event::PollStarted,
            Event::ProbeSucceeded,
        ];
        for event in events {
            state = state.transition(event).unwrap();
        }
        assert_eq!(state, WorkflowState::Ready { urls: urls() });
        assert!(state.is_terminal());
        assert_eq!(state.download_url(), Some("https://storage/down.csv"));
    }

    #[test]
    fn test_failure_transitions() {
        let requested = WorkflowState::Authenticated.transition(select()).unwrap();
        let failed = requested
            .transition(Event::UrlsFailed(WorkflowError::MalformedResponse("x".into())))
            .unwrap();
        assert!(matches!(failed, WorkflowState::Failed { .. }));

        let uploading = WorkflowState::Uploading { urls: urls() };
        let failed = uploading
            .transition(Event::UploadFailed(WorkflowError::Upload {
                reason: "HTTP 403".into(),
            }))
            .unwrap();
        assert!(matches!(failed, WorkflowState::Failed { .. }));
        assert_eq!(failed.download_url(), None);
    }

    #[test]
    fn test_poll_exhausted_keeps_link() {
        let state = WorkflowState::Polling { urls: urls() }
            .transition(Event::PollExhausted)
            .unwrap();
        assert_eq!(state, WorkflowState::TimedOut { urls: urls() });
        assert_eq!(state.download_url(), Some("https://storage/down.csv"));
    }

    #[test]
    fn test_logout_from_every_state() {
        for state in all_states() {
            assert_eq!(
                state.transition(Event::LoggedOut).unwrap(),
                WorkflowState::Unauthenticated,
                "from {}",
                state.name()
            );
        }
    }

    #[test]
    fn test_new_selection_restarts_from_terminal_states() {
        for state in all_states().into_iter().filter(|s| s.is_terminal()) {
            let next = state.transition(select()).unwrap();
            assert!(matches!(next, WorkflowState::UrlsRequested { .. }));
        }
    }

    #[test]
    fn test_rejected_transitions() {
        let err = WorkflowState::Unauthenticated.transition(select()).unwrap_err();
        assert_eq!(err.state, "unauthenticated");
        assert_eq!(err.event, "file selection");

        let polling = WorkflowState::Polling { urls: urls() };
        assert!(polling.transition(select()).is_err());
        assert!(polling.transition(Event::UploadSucceeded).is_err());
        assert!(WorkflowState::Authenticated
            .transition(Event::Authenticated)
            .is_err());
        assert!(WorkflowState::Uploaded { urls: urls() }
            .transition(Event::ProbeSucceeded)
            .is_err());
    }
}
