pub mod conversation_state;
pub mod format;
pub mod prompt;
pub mod render;
pub mod send;
pub mod typing_indicator;
pub mod view;

use std::io::Write;
use std::process::ExitCode;

use color_print::cformat;
use conversation_state::ConversationState;
use eyre::Result;
use prompt::generate_prompt;
use send::{SendOutcome, send_message};
use tracing::{debug, error, info};
use view::{OutputFormat, TerminalView};

use crate::chat_client::ChatTransport;

const SUGGESTIONS: &[&str] = &[
    "What cocktails can I make with gin and lime?",
    "Recommend a non-alcoholic drink for a summer party.",
    "What are 5 cocktails containing lemon juice?",
    "What is my favourite ingredient?",
];

const HELP_TEXT: &str = "
Advisor Chat CLI

/clear        Clear the conversation history
/history      Show the turns sent as context
/try          List suggested questions
/try <n>      Ask suggested question <n>
/help         Show this help dialogue
/quit         Quit the application
";

pub struct ChatContext {
    view: TerminalView<Box<dyn Write>>,
    input: Option<String>,
    interactive: bool,
    conversation_state: ConversationState,
    transport: Box<dyn ChatTransport + Send + Sync>,
}

impl ChatContext {
    pub fn new(
        output: Box<dyn Write>,
        input: Option<String>,
        interactive: bool,
        format: OutputFormat,
        transport: Box<dyn ChatTransport + Send + Sync>,
    ) -> Self {
        // rustyline already shows what the user typed in interactive mode.
        let echo_user = input.is_some() || format == OutputFormat::Html;
        Self {
            view: TerminalView::new(output, format, echo_user),
            input,
            interactive,
            conversation_state: ConversationState::new(),
            transport,
        }
    }

    pub async fn run(&mut self) -> Result<ExitCode> {
        // Handle non-interactive mode (single query)
        if let Some(input) = self.input.take() {
            let outcome = self.handle_input(&input).await?;
            return Ok(match outcome {
                None | Some(SendOutcome::Replied) => ExitCode::SUCCESS,
                Some(_) => ExitCode::FAILURE,
            });
        }

        if self.interactive {
            self.print_welcome()?;
            self.run_interactive().await?;
        }

        Ok(ExitCode::SUCCESS)
    }

    fn print_welcome(&mut self) -> Result<()> {
        let mut welcome = cformat!("\n<bold>Hi, I'm your drinks advisor.</> Ask me anything.\n\nThings to try\n");
        for suggestion in SUGGESTIONS {
            welcome.push_str(&format!("• {}\n", suggestion));
        }
        welcome.push_str(&cformat!("\n<dim>/help         Show the help dialogue</>\n<dim>/quit         Quit the application</>\n"));

        writeln!(self.view.output(), "{}", welcome)?;
        Ok(())
    }

    async fn run_interactive(&mut self) -> Result<()> {
        let mut rl = prompt::rl()?;

        loop {
            let prompt_text = generate_prompt(self.conversation_state.len());
            let readline = rl.readline(&prompt_text);

            match readline {
                Ok(line) => {
                    if line.trim().is_empty() {
                        continue;
                    }

                    rl.add_history_entry(line.as_str());

                    if line.trim() == "/quit" {
                        break;
                    }

                    if let Err(e) = self.handle_input(&line).await {
                        error!("Failed to handle input: {}", e);
                        writeln!(self.view.output(), "Error: {}", e)?;
                    }
                }
                Err(e) => {
                    debug!("Readline finished: {}", e);
                    break;
                }
            }
        }

        info!("Chat session ended");
        Ok(())
    }

    /// Runs a slash command or sends `input`; the outcome is `None` for
    /// commands that issue no request.
    async fn handle_input(&mut self, input: &str) -> Result<Option<SendOutcome>> {
        let trimmed = input.trim();
        match trimmed {
            "/help" => {
                writeln!(self.view.output(), "{}", HELP_TEXT)?;
            }
            "/clear" => match self.conversation_state.clear() {
                Ok(()) => writeln!(self.view.output(), "Conversation cleared.")?,
                Err(e) => writeln!(self.view.output(), "Cannot clear: {}", e)?,
            },
            "/history" => self.print_history()?,
            "/try" => self.print_suggestions()?,
            _ => {
                if let Some(choice) = trimmed.strip_prefix("/try ") {
                    match suggestion(choice) {
                        Some(question) => return self.send(question).await.map(Some),
                        None => writeln!(
                            self.view.output(),
                            "No suggestion '{}'. Use /try to list them.",
                            choice.trim()
                        )?,
                    }
                } else {
                    return self.send(input).await.map(Some);
                }
            }
        }

        Ok(None)
    }

    async fn send(&mut self, input: &str) -> Result<SendOutcome> {
        let outcome = send_message(
            &mut self.conversation_state,
            self.transport.as_ref(),
            &mut self.view,
            input,
        )
        .await?;
        debug!(?outcome, turns = self.conversation_state.len(), "Message handled");
        Ok(outcome)
    }

    fn print_history(&mut self) -> Result<()> {
        if self.conversation_state.is_empty() {
            writeln!(self.view.output(), "No turns yet.")?;
            return Ok(());
        }

        let history = self.conversation_state.history();
        writeln!(self.view.output(), "{} turn(s) kept as context", history.len())?;
        for turn in history {
            writeln!(self.view.output(), "  {}: {}", turn.role.as_str(), turn.content)?;
        }
        Ok(())
    }

    fn print_suggestions(&mut self) -> Result<()> {
        for (i, suggestion) in SUGGESTIONS.iter().enumerate() {
            writeln!(self.view.output(), "  {}. {}", i + 1, suggestion)?;
        }
        Ok(())
    }
}

/// Resolves a 1-based `/try` argument.
fn suggestion(choice: &str) -> Option<&'static str> {
    let index = choice.trim().parse::<usize>().ok()?;
    SUGGESTIONS.get(index.checked_sub(1)?).copied()
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use super::*;
    use crate::chat_client::{ChatError, ChatRequest, ChatResponse};

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl SharedBuf {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    struct EchoTransport;

    #[async_trait]
    impl ChatTransport for EchoTransport {
        async fn send(&self, request: &ChatRequest) -> Result<ChatResponse, ChatError> {
            Ok(ChatResponse {
                message: format!("echo: {}", request.message),
                sources: None,
            })
        }
    }

    fn context(buf: &SharedBuf) -> ChatContext {
        ChatContext::new(
            Box::new(buf.clone()),
            None,
            true,
            OutputFormat::Text,
            Box::new(EchoTransport),
        )
    }

    #[tokio::test]
    async fn try_sends_the_chosen_suggestion() {
        let buf = SharedBuf::default();
        let mut chat = context(&buf);

        chat.handle_input("/try 2").await.unwrap();

        assert_eq!(chat.conversation_state.len(), 2);
        assert_eq!(chat.conversation_state.history()[0].content, SUGGESTIONS[1]);
        assert!(buf.contents().contains(&format!("echo: {}", SUGGESTIONS[1])));
    }

    #[tokio::test]
    async fn unknown_suggestion_sends_nothing() {
        let buf = SharedBuf::default();
        let mut chat = context(&buf);

        chat.handle_input("/try 42").await.unwrap();

        assert!(chat.conversation_state.is_empty());
        assert!(buf.contents().contains("No suggestion '42'"));
    }

    #[tokio::test]
    async fn clear_resets_the_conversation() {
        let buf = SharedBuf::default();
        let mut chat = context(&buf);

        chat.handle_input("what goes with rum?").await.unwrap();
        assert_eq!(chat.conversation_state.len(), 2);

        chat.handle_input("/clear").await.unwrap();
        assert!(chat.conversation_state.is_empty());
        assert!(buf.contents().contains("Conversation cleared."));
    }

    #[tokio::test]
    async fn history_lists_retained_turns() {
        let buf = SharedBuf::default();
        let mut chat = context(&buf);

        chat.handle_input("hello").await.unwrap();
        chat.handle_input("/history").await.unwrap();

        let out = buf.contents();
        assert!(out.contains("2 turn(s) kept as context"));
        assert!(out.contains("  user: hello"));
        assert!(out.contains("  assistant: echo: hello"));
    }

    #[tokio::test]
    async fn single_shot_input_runs_commands() {
        let buf = SharedBuf::default();
        let mut chat = ChatContext::new(
            Box::new(buf.clone()),
            Some("/try 2".to_string()),
            true,
            OutputFormat::Text,
            Box::new(EchoTransport),
        );

        chat.run().await.unwrap();

        assert_eq!(chat.conversation_state.history()[0].content, SUGGESTIONS[1]);
        assert!(buf.contents().contains(&format!("echo: {}", SUGGESTIONS[1])));
    }

    #[tokio::test]
    async fn commands_report_no_send_outcome() {
        let buf = SharedBuf::default();
        let mut chat = context(&buf);

        assert_eq!(chat.handle_input("/help").await.unwrap(), None);
        assert_eq!(chat.handle_input("/history").await.unwrap(), None);
        assert!(buf.contents().contains("No turns yet."));
        assert_eq!(
            chat.handle_input("a martini").await.unwrap(),
            Some(SendOutcome::Replied)
        );
    }

    #[test]
    fn suggestions_are_one_based() {
        assert_eq!(suggestion("1"), Some(SUGGESTIONS[0]));
        assert_eq!(suggestion(" 4 "), Some(SUGGESTIONS[3]));
        assert_eq!(suggestion("0"), None);
        assert_eq!(suggestion("9"), None);
        assert_eq!(suggestion("gin"), None);
    }
}
