use log::{ debug, error, info };
use serde::{ Deserialize, Serialize };
use std::sync::{ Arc, Mutex, MutexGuard, PoisonError };
use tokio::task::JoinHandle;

use crate::gateway::{ ChatClient, ReplyResolver, Resolution };
use crate::models::chat::Message;

/// What to do with a submission while an earlier one is still waiting for its reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionPolicy {
    /// Every submission resolves independently; replies land in arrival order.
    #[default]
    Interleave,
    /// At most one submission in flight; later ones are turned away untouched.
    RejectWhilePending,
}

#[derive(Debug)]
struct ConversationState {
    messages: Vec<Message>,
    pending_input: String,
    in_flight: usize,
    loaded: bool,
    greeting_id: String,
}

impl ConversationState {
    fn only_greeting(&self) -> bool {
        matches!(self.messages.as_slice(), [m] if m.id == self.greeting_id)
    }
}

/// Handle on an assistant reply that has not been appended yet.
#[derive(Debug)]
pub struct PendingReply {
    handle: JoinHandle<Resolution>,
}

impl PendingReply {
    /// Resolves once the assistant turn is in the log.
    pub async fn wait(self) -> Option<Resolution> {
        match self.handle.await {
            Ok(resolution) => Some(resolution),
            Err(e) => {
                error!("Reply task failed: {}", e);
                None
            }
        }
    }
}

#[derive(Debug)]
pub enum Submission {
    /// Blank input, nothing appended.
    Ignored,
    /// Gate closed under [`SubmissionPolicy::RejectWhilePending`], nothing appended.
    Rejected,
    Accepted {
        user_message: Message,
        reply: PendingReply,
    },
}

impl Submission {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Submission::Accepted { .. })
    }

    pub async fn into_reply(self) -> Option<Resolution> {
        match self {
            Submission::Accepted { reply, .. } => reply.wait().await,
            _ => None,
        }
    }
}

/// Owns the message log for one session.
#[derive(Clone)]
pub struct Conversation {
    state: Arc<Mutex<ConversationState>>,
    resolver: ReplyResolver,
    policy: SubmissionPolicy,
}

impl Conversation {
    pub fn new(resolver: ReplyResolver, policy: SubmissionPolicy) -> Self {
        let greeting = Message::greeting();
        Self {
            state: Arc::new(
                Mutex::new(ConversationState {
                    greeting_id: greeting.id.clone(),
                    messages: vec![greeting],
                    pending_input: String::new(),
                    in_flight: 0,
                    loaded: false,
                })
            ),
            resolver,
            policy,
        }
    }

    fn lock(&self) -> MutexGuard<'_, ConversationState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn client(&self) -> Arc<dyn ChatClient> {
        self.resolver.client()
    }

    pub fn policy(&self) -> SubmissionPolicy {
        self.policy
    }

    pub fn messages(&self) -> Vec<Message> {
        self.lock().messages.clone()
    }

    pub fn len(&self) -> usize {
        self.lock().messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().messages.is_empty()
    }

    pub fn in_flight(&self) -> usize {
        self.lock().in_flight
    }

    pub fn set_input(&self, text: &str) {
        self.lock().pending_input = text.to_string();
    }

    pub fn pending_input(&self) -> String {
        self.lock().pending_input.clone()
    }

    /// Submits whatever is in the input buffer.
    pub fn submit_input(&self) -> Submission {
        let text = self.pending_input();
        self.submit(&text)
    }

    /// Appends the user turn now and spawns resolution of the assistant turn.
    ///
    /// Must be called from within a tokio runtime.
    pub fn submit(&self, text: &str) -> Submission {
        if text.trim().is_empty() {
            return Submission::Ignored;
        }

        let user_message = {
            let mut state = self.lock();
            if self.policy == SubmissionPolicy::RejectWhilePending && state.in_flight > 0 {
                info!("Submission rejected: {} reply still pending", state.in_flight);
                return Submission::Rejected;
            }
            let message = Message::user(text);
            state.messages.push(message.clone());
            state.pending_input.clear();
            state.in_flight += 1;
            message
        };

        let resolver = self.resolver.clone();
        let state = Arc::clone(&self.state);
        let utterance = text.to_string();
        let handle = tokio::spawn(async move {
            let resolution = resolver.resolve(&utterance).await;
            let mut guard = state.lock().unwrap_or_else(PoisonError::into_inner);
            guard.messages.push(resolution.message.clone());
            guard.in_flight = guard.in_flight.saturating_sub(1);
            debug!(
                "Appended assistant reply ({:?}); log now has {} messages",
                resolution.source,
                guard.messages.len()
            );
            resolution
        });

        Submission::Accepted {
            user_message,
            reply: PendingReply { handle },
        }
    }

    /// Fetches the stored log once and puts it in place of the greeting.
    ///
    /// Turns submitted while the fetch was in flight are kept after the stored log.
    /// Failures leave the log as it is.
    pub async fn load_initial(&self) {
        {
            let mut state = self.lock();
            if state.loaded {
                debug!("Conversation already loaded; skipping fetch");
                return;
            }
            state.loaded = true;
        }

        let fetched = self.client().fetch_history().await;
        let mut state = self.lock();
        match fetched {
            Ok(history) if history.is_empty() => info!("No stored messages; keeping greeting"),
            Ok(history) => {
                info!("Loaded {} stored messages", history.len());
                if state.only_greeting() {
                    state.messages = history;
                } else {
                    let greeting_id = state.greeting_id.clone();
                    let local: Vec<Message> = std::mem::take(&mut state.messages)
                        .into_iter()
                        .filter(|m| m.id != greeting_id)
                        .collect();
                    debug!("Keeping {} turns submitted during the load", local.len());
                    state.messages = history;
                    state.messages.extend(local);
                }
            }
            Err(e) => error!("Error loading messages: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::test_support::ScriptedClient;
    use crate::gateway::ReplySource;
    use crate::models::chat::{ Role, GREETING };
    use tokio::sync::Semaphore;

    fn conversation(client: ScriptedClient, policy: SubmissionPolicy) -> Conversation {
        Conversation::new(ReplyResolver::new(Arc::new(client)), policy)
    }

    #[tokio::test]
    async fn starts_with_greeting() {
        let convo = conversation(ScriptedClient::failing(), SubmissionPolicy::Interleave);
        let messages = convo.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, Role::Assistant);
        assert_eq!(messages[0].content, GREETING);
    }

    #[tokio::test]
    async fn blank_input_is_ignored() {
        let convo = conversation(ScriptedClient::failing(), SubmissionPolicy::Interleave);
        assert!(matches!(convo.submit(""), Submission::Ignored));
        assert!(matches!(convo.submit("   \n\t"), Submission::Ignored));
        assert_eq!(convo.len(), 1);
    }

    #[tokio::test]
    async fn user_turn_lands_before_reply() {
        let convo = conversation(ScriptedClient::answering("ok"), SubmissionPolicy::Interleave);
        convo.set_input("hello");
        let submission = convo.submit_input();
        assert!(submission.is_accepted());
        assert_eq!(convo.pending_input(), "");
        assert_eq!(convo.messages().last().map(|m| m.role), Some(Role::User));

        let resolution = submission.into_reply().await.unwrap();
        assert_eq!(resolution.source, ReplySource::Remote);

        let messages = convo.messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1].role, Role::User);
        assert_eq!(messages[1].content, "hello");
        assert_eq!(messages[2].role, Role::Assistant);
        assert_eq!(convo.in_flight(), 0);
    }

    #[tokio::test]
    async fn failing_remote_still_appends_a_reply() {
        let convo = conversation(ScriptedClient::failing(), SubmissionPolicy::Interleave);
        let resolution = convo.submit("3*4").into_reply().await.unwrap();
        assert_eq!(resolution.source, ReplySource::Local);
        let messages = convo.messages();
        assert_eq!(messages.len(), 3);
        assert!(messages[2].content.contains("12"));
    }

    #[tokio::test]
    async fn gate_rejects_while_reply_outstanding() {
        let gate = Arc::new(Semaphore::new(0));
        let mut client = ScriptedClient::answering("slow");
        client.gate = Some(Arc::clone(&gate));
        let convo = conversation(client, SubmissionPolicy::RejectWhilePending);

        let first = convo.submit("one");
        assert!(first.is_accepted());
        assert!(matches!(convo.submit("two"), Submission::Rejected));
        assert_eq!(convo.len(), 2);

        gate.add_permits(1);
        first.into_reply().await.unwrap();
        assert_eq!(convo.len(), 3);
        assert!(convo.submit("three").is_accepted());
    }

    #[tokio::test]
    async fn interleave_lets_both_user_turns_in_first() {
        let gate = Arc::new(Semaphore::new(0));
        let mut client = ScriptedClient::answering("late");
        client.gate = Some(Arc::clone(&gate));
        let convo = conversation(client, SubmissionPolicy::Interleave);

        let first = convo.submit("one");
        let second = convo.submit("two");
        assert_eq!(convo.in_flight(), 2);

        let roles: Vec<Role> = convo.messages().iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::Assistant, Role::User, Role::User]);

        gate.add_permits(2);
        first.into_reply().await.unwrap();
        second.into_reply().await.unwrap();
        assert_eq!(convo.len(), 5);
    }

    #[tokio::test]
    async fn load_failure_keeps_greeting() {
        let convo = conversation(ScriptedClient::failing(), SubmissionPolicy::Interleave);
        convo.load_initial().await;
        assert_eq!(convo.len(), 1);
        assert_eq!(convo.messages()[0].content, GREETING);
    }

    #[tokio::test]
    async fn load_replaces_greeting_with_history() {
        let mut client = ScriptedClient::answering("x");
        client.history = Ok(vec![Message::user("earlier"), Message::assistant("answer")]);
        let convo = conversation(client, SubmissionPolicy::Interleave);
        convo.load_initial().await;
        let messages = convo.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].content, "earlier");
    }

    #[tokio::test]
    async fn submit_during_load_keeps_local_turns() {
        let gate = Arc::new(Semaphore::new(0));
        let mut client = ScriptedClient::answering("fresh reply");
        client.history = Ok(vec![Message::user("old"), Message::assistant("old reply")]);
        client.history_gate = Some(Arc::clone(&gate));
        let convo = conversation(client, SubmissionPolicy::Interleave);

        let loader = {
            let convo = convo.clone();
            tokio::spawn(async move { convo.load_initial().await })
        };
        tokio::task::yield_now().await;

        convo.submit("3*4").into_reply().await.unwrap();
        gate.add_permits(1);
        loader.await.unwrap();

        let turns: Vec<(Role, String)> = convo
            .messages()
            .into_iter()
            .map(|m| (m.role, m.content))
            .collect();
        assert_eq!(
            turns,
            vec![
                (Role::User, "old".to_string()),
                (Role::Assistant, "old reply".to_string()),
                (Role::User, "3*4".to_string()),
                (Role::Assistant, "fresh reply".to_string())
            ]
        );
    }

    #[tokio::test]
    async fn concurrent_loads_fetch_once() {
        let gate = Arc::new(Semaphore::new(0));
        let mut client = ScriptedClient::answering("x");
        client.history = Ok(vec![Message::user("earlier")]);
        client.history_gate = Some(Arc::clone(&gate));
        let client = Arc::new(client);
        let convo = Conversation::new(
            ReplyResolver::new(client.clone()),
            SubmissionPolicy::Interleave
        );

        gate.add_permits(2);
        tokio::join!(convo.load_initial(), convo.load_initial());
        convo.load_initial().await;

        assert_eq!(client.fetches.load(std::sync::atomic::Ordering::SeqCst), 1);
        assert_eq!(convo.len(), 1);
        assert_eq!(convo.messages()[0].content, "earlier");
    }

    #[tokio::test]
    async fn empty_history_keeps_greeting() {
        let convo = conversation(ScriptedClient::answering("x"), SubmissionPolicy::Interleave);
        convo.load_initial().await;
        assert_eq!(convo.messages()[0].content, GREETING);
    }
}
