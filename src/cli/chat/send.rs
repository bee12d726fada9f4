use eyre::Result;
use tracing::{info, warn};

use super::conversation_state::{ConversationState, Role};
use super::view::ChatView;
use crate::chat_client::{ChatRequest, ChatTransport};

pub const FALLBACK_MESSAGE: &str =
    "Sorry, there was an error processing your request. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Empty or whitespace-only input; nothing was sent.
    Ignored,
    /// A request was already pending.
    Rejected,
    Replied,
    /// The request failed and the fallback message was shown.
    Failed,
}

/// Sends one user message and renders whatever comes back.
///
/// Request failures are absorbed here and shown as the fallback assistant
/// message. Only errors writing to `view` are returned.
pub async fn send_message<T, V>(
    state: &mut ConversationState,
    transport: &T,
    view: &mut V,
    input: &str,
) -> Result<SendOutcome>
where
    T: ChatTransport + ?Sized,
    V: ChatView + ?Sized,
{
    let message = input.trim();
    if message.is_empty() {
        return Ok(SendOutcome::Ignored);
    }

    if let Err(e) = state.begin_send() {
        warn!("Ignoring message: {}", e);
        return Ok(SendOutcome::Rejected);
    }

    let outcome = exchange(state, transport, view, message).await;
    state.finish_send();
    outcome
}

async fn exchange<T, V>(
    state: &mut ConversationState,
    transport: &T,
    view: &mut V,
    message: &str,
) -> Result<SendOutcome>
where
    T: ChatTransport + ?Sized,
    V: ChatView + ?Sized,
{
    state.push_user(message);
    view.append_turn(Role::User, message, &[])?;
    view.show_typing()?;

    let request = ChatRequest {
        message: message.to_string(),
        history: state.history().to_vec(),
    };

    match transport.send(&request).await {
        Ok(response) => {
            info!(sources = response.sources().len(), "Assistant replied");
            view.hide_typing()?;
            view.append_turn(Role::Assistant, &response.message, response.sources())?;
            state.push_assistant(&response.message);
            Ok(SendOutcome::Replied)
        }
        Err(e) => {
            warn!("Chat request failed: {}", e);
            view.hide_typing()?;
            view.append_turn(Role::Assistant, FALLBACK_MESSAGE, &[])?;
            Ok(SendOutcome::Failed)
        }
    }
}
