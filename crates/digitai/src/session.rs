//! Demo session controller.
//!
//! A [`DemoSession`] walks a visitor from filling in their business profile
//! (`Setup`) to chatting with the generated persona (`Chat`). The transcript
//! is append-only and starts with a greeting synthesized from the business
//! name. At most one relay call is in flight; a submit while one is pending,
//! or with blank text, is dropped.
//!
//! ```text
//!            start_chat (name + services set)
//!   Setup ───────────────────────────────────────▶ Chat
//!     ▲                                              │
//!     └──────────────── back_to_setup ───────────────┘
//!                  (transcript discarded)
//! ```
//!
//! Two ways to drive a submit:
//!
//! - [`DemoSession::submit`] when the caller owns the session.
//! - [`submit_shared`] when the session lives behind an
//!   `Arc<Mutex<DemoSession>>` shared with a renderer. The lock is released
//!   for the duration of the network call; the split-phase
//!   [`begin_submit`](DemoSession::begin_submit) /
//!   [`finish_submit`](DemoSession::finish_submit) pair is what it uses.

use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use crate::ChatTurn;
use crate::error::Result;
use crate::profile::BusinessProfile;
use crate::prompt::compose_system_prompt;
use crate::relay::{ChatRelay, RelayRequest};

/// Assistant turn appended when the relay call fails for any reason.
pub const FALLBACK_REPLY: &str = "Desculpe, tive um problema técnico. Pode tentar novamente?";

/// Suggestions are offered while the transcript is at most this long.
const SUGGESTION_WINDOW: usize = 2;

/// Opening assistant turn for a business.
pub fn greeting(name: &str) -> String {
    format!("Olá! Seja bem-vindo(a) à {name}! Como posso ajudar você hoje?")
}

/// Where the visitor is in the demo.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    /// Profile is being filled in.
    Setup,
    /// Profile frozen, transcript active.
    Chat,
}

/// A relay call that has been started but not yet resolved.
///
/// Returned by [`DemoSession::begin_submit`]; hand it back to
/// [`DemoSession::finish_submit`] with the relay's outcome.
#[derive(Debug, Clone)]
pub struct PendingSubmit {
    epoch: u64,
    request: RelayRequest,
}

impl PendingSubmit {
    /// The body to send to the relay.
    pub fn request(&self) -> &RelayRequest {
        &self.request
    }
}

/// State of one demo visit.
#[derive(Debug)]
pub struct DemoSession {
    stage: Stage,
    profile: BusinessProfile,
    system_prompt: String,
    transcript: Vec<ChatTurn>,
    pending: bool,
    /// Bumped on every stage change so replies to a discarded chat are ignored.
    epoch: u64,
}

impl Default for DemoSession {
    fn default() -> Self {
        Self::new()
    }
}

impl DemoSession {
    /// A fresh session in `Setup` with an empty profile.
    pub fn new() -> Self {
        Self::with_profile(BusinessProfile::default())
    }

    /// A session in `Setup` with a pre-filled profile.
    pub fn with_profile(profile: BusinessProfile) -> Self {
        Self {
            stage: Stage::Setup,
            profile,
            system_prompt: String::new(),
            transcript: Vec::new(),
            pending: false,
            epoch: 0,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn profile(&self) -> &BusinessProfile {
        &self.profile
    }

    /// Mutable access to the profile. `None` once the chat has started.
    pub fn profile_mut(&mut self) -> Option<&mut BusinessProfile> {
        match self.stage {
            Stage::Setup => Some(&mut self.profile),
            Stage::Chat => None,
        }
    }

    /// The composed persona. `None` while in setup.
    pub fn system_prompt(&self) -> Option<&str> {
        match self.stage {
            Stage::Setup => None,
            Stage::Chat => Some(&self.system_prompt),
        }
    }

    pub fn transcript(&self) -> &[ChatTurn] {
        &self.transcript
    }

    /// Whether a relay call is in flight.
    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Whether the setup form may be submitted.
    pub fn can_start(&self) -> bool {
        self.stage == Stage::Setup && self.profile.is_complete()
    }

    /// Move from `Setup` to `Chat`.
    ///
    /// Fails with [`Error::IncompleteProfile`](crate::Error::IncompleteProfile)
    /// and stays in setup unless `name` and `services` are filled in. Calling
    /// it while already chatting changes nothing.
    pub fn start_chat(&mut self) -> Result<()> {
        if self.stage == Stage::Chat {
            return Ok(());
        }
        self.profile.validate()?;

        self.system_prompt = compose_system_prompt(&self.profile);
        self.transcript = vec![ChatTurn::assistant(greeting(&self.profile.name))];
        self.pending = false;
        self.epoch += 1;
        self.stage = Stage::Chat;
        debug!(
            "demo chat started for '{}' ({})",
            self.profile.name, self.profile.category
        );
        Ok(())
    }

    /// Return to `Setup`, discarding transcript and system prompt.
    ///
    /// An in-flight relay call is not cancelled; its reply is dropped when it
    /// arrives.
    pub fn back_to_setup(&mut self) {
        self.stage = Stage::Setup;
        self.system_prompt.clear();
        self.transcript.clear();
        self.pending = false;
        self.epoch += 1;
    }

    /// Suggested questions for the current category, offered only at the
    /// start of a chat.
    pub fn suggestions(&self) -> Vec<&'static str> {
        if self.stage == Stage::Chat && self.transcript.len() <= SUGGESTION_WINDOW {
            self.profile.category.suggestions().to_vec()
        } else {
            Vec::new()
        }
    }

    /// First half of a submit: validate, append the user turn and mark the
    /// session pending.
    ///
    /// Returns `None` (and changes nothing) outside `Chat`, while another
    /// call is pending, or when `text` is blank.
    pub fn begin_submit(&mut self, text: &str) -> Option<PendingSubmit> {
        let text = text.trim();
        if self.stage != Stage::Chat || self.pending || text.is_empty() {
            return None;
        }

        self.transcript.push(ChatTurn::user(text));
        self.pending = true;

        Some(PendingSubmit {
            epoch: self.epoch,
            request: RelayRequest {
                messages: self.transcript.clone(),
                system_prompt: self.system_prompt.clone(),
            },
        })
    }

    /// Second half of a submit: append the reply (or the fallback) and clear
    /// the pending flag.
    ///
    /// Outcomes for a chat that has since been discarded are ignored.
    pub fn finish_submit(&mut self, submit: &PendingSubmit, outcome: Result<String>) {
        if submit.epoch != self.epoch {
            debug!("dropping relay reply for a discarded chat");
            return;
        }
        self.pending = false;
        match outcome {
            Ok(message) => self.transcript.push(ChatTurn::assistant(message)),
            Err(e) => {
                warn!("chat relay call failed: {e}");
                self.transcript.push(ChatTurn::assistant(FALLBACK_REPLY));
            }
        }
    }

    /// Close out a submit whose future was dropped before the relay
    /// answered. The unanswered user turn gets the fallback reply so the
    /// transcript keeps alternating.
    fn abandon(&mut self, epoch: u64) {
        if self.epoch != epoch || !self.pending {
            return;
        }
        warn!("chat relay call abandoned before it completed");
        self.pending = false;
        self.transcript.push(ChatTurn::assistant(FALLBACK_REPLY));
    }

    /// Send `text` through `relay` and append the reply.
    ///
    /// Returns `false` if the submit was dropped (blank text, already
    /// pending, not chatting). If this future is dropped before the relay
    /// answers, the fallback reply is appended and the pending flag cleared.
    pub async fn submit<R: ChatRelay + ?Sized>(&mut self, relay: &R, text: &str) -> bool {
        let Some(submit) = self.begin_submit(text) else {
            return false;
        };
        let mut guard = PendingGuard {
            session: self,
            epoch: submit.epoch,
        };
        let outcome = relay.send(submit.request()).await;
        guard.session.finish_submit(&submit, outcome);
        true
    }
}

/// Closes out the submit if its future is dropped mid-flight.
struct PendingGuard<'s> {
    session: &'s mut DemoSession,
    epoch: u64,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.session.abandon(self.epoch);
    }
}

/// A session shared between a UI renderer and the submit driver.
pub type SharedSession = Arc<Mutex<DemoSession>>;

/// [`DemoSession::submit`] for a session behind a mutex.
///
/// The lock is held only to begin and finish the submit, never across the
/// relay call, so a renderer can keep reading the transcript and the pending
/// flag meanwhile.
pub async fn submit_shared<R: ChatRelay + ?Sized>(
    session: &SharedSession,
    relay: &R,
    text: &str,
) -> bool {
    let submit = {
        let mut s = session.lock().unwrap_or_else(|e| e.into_inner());
        s.begin_submit(text)
    };
    let Some(submit) = submit else {
        return false;
    };

    let _guard = SharedPendingGuard {
        session,
        epoch: submit.epoch,
    };
    let outcome = relay.send(submit.request()).await;
    session
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .finish_submit(&submit, outcome);
    true
}

struct SharedPendingGuard<'s> {
    session: &'s SharedSession,
    epoch: u64,
}

impl Drop for SharedPendingGuard<'_> {
    fn drop(&mut self) {
        self.session
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .abandon(self.epoch);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Role;
    use crate::error::Error;
    use crate::profile::BusinessCategory;
    use crate::relay::{RelayClient, RelayFuture};
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Relay that answers every call with a fixed outcome and records requests.
    struct ScriptedRelay {
        reply: std::result::Result<String, u16>,
        calls: Mutex<Vec<RelayRequest>>,
    }

    impl ScriptedRelay {
        fn ok(message: &str) -> Self {
            Self {
                reply: Ok(message.to_string()),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn failing(status: u16) -> Self {
            Self {
                reply: Err(status),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<RelayRequest> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl ChatRelay for ScriptedRelay {
        fn send<'a>(&'a self, request: &'a RelayRequest) -> RelayFuture<'a> {
            self.calls.lock().unwrap().push(request.clone());
            let reply = self.reply.clone();
            Box::pin(async move {
                reply.map_err(|status| Error::Status {
                    status,
                    body: String::new(),
                })
            })
        }
    }

    /// Relay that never answers.
    struct HangingRelay;

    impl ChatRelay for HangingRelay {
        fn send<'a>(&'a self, _request: &'a RelayRequest) -> RelayFuture<'a> {
            Box::pin(std::future::pending())
        }
    }

    fn clinic_session() -> DemoSession {
        let mut session = DemoSession::new();
        let profile = session.profile_mut().unwrap();
        profile.name = "Clínica X".into();
        profile.services = "Consultas".into();
        session.start_chat().unwrap();
        session
    }

    #[test]
    fn start_requires_name_and_services() {
        let mut session = DemoSession::new();
        assert!(!session.can_start());
        assert!(matches!(
            session.start_chat(),
            Err(Error::IncompleteProfile { .. })
        ));
        assert_eq!(session.stage(), Stage::Setup);

        session.profile_mut().unwrap().name = "Clínica X".into();
        assert!(session.start_chat().is_err());
        assert!(session.transcript().is_empty());
    }

    #[test]
    fn start_seeds_greeting_and_prompt() {
        let session = clinic_session();
        assert_eq!(session.stage(), Stage::Chat);
        assert_eq!(
            session.transcript(),
            &[ChatTurn {
                role: Role::Assistant,
                content: "Olá! Seja bem-vindo(a) à Clínica X! Como posso ajudar você hoje?"
                    .into(),
            }]
        );
        assert!(session.system_prompt().unwrap().contains("Clínica X"));
        assert!(!session.is_pending());
    }

    #[test]
    fn profile_is_frozen_during_chat() {
        let mut session = clinic_session();
        assert!(session.profile_mut().is_none());
    }

    #[test]
    fn start_chat_twice_keeps_transcript() {
        let mut session = clinic_session();
        session.begin_submit("Oi").unwrap();
        session.start_chat().unwrap();
        assert_eq!(session.transcript().len(), 2);
    }

    #[tokio::test]
    async fn whitespace_submit_is_a_no_op() {
        let mut session = clinic_session();
        let relay = ScriptedRelay::ok("nunca");

        assert!(!session.submit(&relay, "  ").await);
        assert_eq!(session.transcript().len(), 1);
        assert!(!session.is_pending());
        assert!(relay.calls().is_empty());
    }

    #[tokio::test]
    async fn submit_while_pending_is_dropped() {
        let mut session = clinic_session();
        let relay = ScriptedRelay::ok("nunca");

        let _first = session.begin_submit("Primeira").unwrap();
        assert!(session.is_pending());
        let before = session.transcript().to_vec();

        assert!(!session.submit(&relay, "Oi").await);
        assert_eq!(session.transcript(), before.as_slice());
        assert!(relay.calls().is_empty());
    }

    #[tokio::test]
    async fn submit_in_setup_is_dropped() {
        let mut session = DemoSession::new();
        let relay = ScriptedRelay::ok("nunca");
        assert!(!session.submit(&relay, "Oi").await);
        assert!(session.transcript().is_empty());
    }

    #[tokio::test]
    async fn successful_reply_is_appended_verbatim() {
        let mut session = clinic_session();
        let relay = ScriptedRelay::ok("Olá! Posso ajudar.");

        assert!(session.submit(&relay, "  Oi  ").await);

        let transcript = session.transcript();
        assert_eq!(transcript.len(), 3);
        assert_eq!(transcript[1], ChatTurn::user("Oi"));
        assert_eq!(transcript[2], ChatTurn::assistant("Olá! Posso ajudar."));
        assert!(!session.is_pending());
    }

    #[tokio::test]
    async fn relay_receives_full_history_and_prompt() {
        let mut session = clinic_session();
        let relay = ScriptedRelay::ok("Resposta");

        session.submit(&relay, "Primeira").await;
        session.submit(&relay, "Segunda").await;

        let calls = relay.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].messages.len(), 2);
        assert_eq!(calls[1].messages.len(), 4);
        assert_eq!(calls[1].messages[3], ChatTurn::user("Segunda"));
        assert_eq!(calls[1].system_prompt, session.system_prompt().unwrap());
    }

    #[tokio::test]
    async fn failed_relay_appends_fallback() {
        let mut session = clinic_session();
        let relay = ScriptedRelay::failing(502);

        assert!(session.submit(&relay, "Oi").await);

        let transcript = session.transcript();
        assert_eq!(transcript.len(), 3);
        assert_eq!(transcript[1], ChatTurn::user("Oi"));
        assert_eq!(transcript[2], ChatTurn::assistant(FALLBACK_REPLY));
        assert!(!session.is_pending());
    }

    #[tokio::test]
    async fn http_500_from_relay_server_appends_fallback() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(
                ResponseTemplate::new(500)
                    .set_body_json(serde_json::json!({"error": "Internal server error"})),
            )
            .mount(&server)
            .await;
        let relay = RelayClient::new(server.uri()).unwrap();
        let mut session = clinic_session();

        session.submit(&relay, "Oi").await;

        let new_turns = &session.transcript()[1..];
        assert_eq!(
            new_turns,
            &[ChatTurn::user("Oi"), ChatTurn::assistant(FALLBACK_REPLY)]
        );
        assert!(!session.is_pending());
    }

    #[tokio::test]
    async fn identical_inputs_are_not_deduplicated() {
        let mut session = clinic_session();
        let relay = ScriptedRelay::ok("ok");
        session.submit(&relay, "Oi").await;
        session.submit(&relay, "Oi").await;
        assert_eq!(session.transcript().len(), 5);
    }

    #[tokio::test]
    async fn transcript_alternates_user_and_assistant() {
        let mut session = clinic_session();
        let ok = ScriptedRelay::ok("ok");
        let failing = ScriptedRelay::failing(500);
        session.submit(&ok, "a").await;
        session.submit(&failing, "b").await;
        session.submit(&ok, "c").await;

        let roles: Vec<Role> = session.transcript().iter().map(|t| t.role).collect();
        assert_eq!(
            roles,
            vec![
                Role::Assistant,
                Role::User,
                Role::Assistant,
                Role::User,
                Role::Assistant,
                Role::User,
                Role::Assistant,
            ]
        );
    }

    #[tokio::test]
    async fn dropped_submit_appends_fallback() {
        let mut session = clinic_session();
        let timed_out =
            tokio::time::timeout(Duration::from_millis(20), session.submit(&HangingRelay, "Oi"))
                .await;
        assert!(timed_out.is_err());
        assert!(!session.is_pending());
        assert_eq!(
            &session.transcript()[1..],
            &[ChatTurn::user("Oi"), ChatTurn::assistant(FALLBACK_REPLY)]
        );
    }

    #[tokio::test]
    async fn next_submit_after_timeout_keeps_alternation() {
        let mut session = clinic_session();
        let _ = tokio::time::timeout(
            Duration::from_millis(20),
            session.submit(&HangingRelay, "Primeira"),
        )
        .await;

        let relay = ScriptedRelay::ok("ok");
        assert!(session.submit(&relay, "Segunda").await);

        let roles: Vec<Role> = session.transcript().iter().map(|t| t.role).collect();
        assert_eq!(
            roles,
            vec![
                Role::Assistant,
                Role::User,
                Role::Assistant,
                Role::User,
                Role::Assistant,
            ]
        );
        let relayed: Vec<Role> = relay.calls()[0].messages.iter().map(|t| t.role).collect();
        assert_eq!(relayed, vec![Role::Assistant, Role::User, Role::Assistant, Role::User]);
    }

    #[test]
    fn finished_submit_is_not_abandoned() {
        let mut session = clinic_session();
        let submit = session.begin_submit("Oi").unwrap();
        session.finish_submit(&submit, Ok("Olá".into()));
        session.abandon(submit.epoch);
        assert_eq!(session.transcript().len(), 3);
    }

    #[test]
    fn poisoned_shared_session_still_clears_pending() {
        let session: SharedSession = Arc::new(Mutex::new(clinic_session()));
        let epoch = {
            let mut s = session.lock().unwrap();
            s.begin_submit("Oi").unwrap().epoch
        };
        let poisoner = session.clone();
        let _ = std::thread::spawn(move || {
            let _held = poisoner.lock().unwrap();
            panic!("poison the lock");
        })
        .join();
        assert!(session.is_poisoned());

        drop(SharedPendingGuard {
            session: &session,
            epoch,
        });

        let s = session.lock().unwrap_or_else(|e| e.into_inner());
        assert!(!s.is_pending());
        assert_eq!(s.transcript().last(), Some(&ChatTurn::assistant(FALLBACK_REPLY)));
    }

    #[test]
    fn back_to_setup_and_restart_regenerates_greeting() {
        let mut session = clinic_session();
        session.begin_submit("Oi").unwrap();

        session.back_to_setup();
        assert_eq!(session.stage(), Stage::Setup);
        assert!(session.transcript().is_empty());
        assert!(session.system_prompt().is_none());
        assert!(!session.is_pending());

        session.profile_mut().unwrap().name = "Clínica Y".into();
        session.start_chat().unwrap();
        assert_eq!(session.transcript().len(), 1);
        assert_eq!(session.transcript()[0].content, greeting("Clínica Y"));
        assert!(session.system_prompt().unwrap().contains("Clínica Y"));
    }

    #[test]
    fn late_reply_for_discarded_chat_is_ignored() {
        let mut session = clinic_session();
        let stale = session.begin_submit("Oi").unwrap();
        session.back_to_setup();
        session.start_chat().unwrap();

        session.finish_submit(&stale, Ok("tarde demais".into()));
        assert_eq!(session.transcript().len(), 1);
        assert!(!session.is_pending());
    }

    #[test]
    fn suggestions_only_at_chat_start() {
        let mut session = DemoSession::new();
        {
            let profile = session.profile_mut().unwrap();
            profile.name = "Cantina".into();
            profile.services = "Massas".into();
            profile.category = BusinessCategory::Restaurante;
        }
        assert!(session.suggestions().is_empty());

        session.start_chat().unwrap();
        assert_eq!(session.suggestions(), vec![
            "Qual o horário de funcionamento?",
            "Tem delivery?",
            "Aceitam reserva?",
        ]);

        let submit = session.begin_submit("Tem delivery?").unwrap();
        session.finish_submit(&submit, Ok("Sim!".into()));
        assert!(session.suggestions().is_empty());
    }

    #[tokio::test]
    async fn shared_submit_releases_lock_during_call() {
        let session: SharedSession = Arc::new(Mutex::new(clinic_session()));
        let relay = ScriptedRelay::ok("Olá! Posso ajudar.");

        assert!(submit_shared(&session, &relay, "Oi").await);

        let s = session.lock().unwrap();
        assert_eq!(s.transcript().len(), 3);
        assert_eq!(s.transcript()[2].content, "Olá! Posso ajudar.");
        assert!(!s.is_pending());
    }

    #[tokio::test]
    async fn shared_submit_rejects_second_call_while_pending() {
        let session: SharedSession = Arc::new(Mutex::new(clinic_session()));
        let in_flight = {
            let session = session.clone();
            tokio::spawn(async move { submit_shared(&session, &HangingRelay, "Primeira").await })
        };

        // Wait until the first submit has marked the session pending.
        for _ in 0..100 {
            if session.lock().unwrap().is_pending() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(session.lock().unwrap().is_pending());

        let relay = ScriptedRelay::ok("nunca");
        assert!(!submit_shared(&session, &relay, "Oi").await);
        assert_eq!(session.lock().unwrap().transcript().len(), 2);

        in_flight.abort();
        let _ = in_flight.await;
        let s = session.lock().unwrap();
        assert!(!s.is_pending());
        assert_eq!(s.transcript().len(), 3);
        assert_eq!(s.transcript()[2], ChatTurn::assistant(FALLBACK_REPLY));
    }
}
