/*!
Command handlers for the CLI

This module provides command handlers invoked by the CLI entrypoint.

- `chat`     : Interactive classification chat
- `classify` : Classify a single prompt
- `stats`    : Print the usage statistics snapshot
- `flag`     : Flag a classification as incorrect
- `transport`: Print the resolved transport descriptor

Every handler dispatches through a shared `FallbackRouter`; none of them talk
to a backend directly.
*/

use crate::backends::{ClassificationResult, Stats, Verdict};
use crate::config::Config;
use crate::conversation::{Conversation, ConversationEvent, Message, Notice, Role};
use crate::error::Result;
use crate::router::FallbackRouter;
use std::sync::Arc;

// Special commands parser for the interactive session
pub mod special_commands;

/// Format a stats snapshot as the sidebar block
///
/// # Examples
///
/// ```
/// use guardchat::backends::Stats;
/// use guardchat::commands::format_stats;
///
/// let text = format_stats(&Stats { total_prompts: 4, safe_count: 3, misuse_count: 1, flagged_count: 0 });
/// assert!(text.contains("Total prompts: 4"));
/// assert!(text.contains("75.0%"));
/// ```
pub fn format_stats(stats: &Stats) -> String {
    let share = |count: u64| {
        if stats.total_prompts == 0 {
            0.0
        } else {
            count as f64 * 100.0 / stats.total_prompts as f64
        }
    };

    format!(
        "Usage Statistics\n  Total prompts: {}\n  Safe:          {} ({:.1}%)\n  Misuse:        {} ({:.1}%)\n  Flagged:       {}",
        stats.total_prompts,
        stats.safe_count,
        share(stats.safe_count),
        stats.misuse_count,
        share(stats.misuse_count),
        stats.flagged_count
    )
}

/// Resolve `/flag [n]` to a message index
///
/// `flaggable` holds the indices of flaggable messages in chat order. `None`
/// selects the most recent verdict; `Some(n)` selects the n-th (1-based).
pub fn flag_target(flaggable: &[usize], n: Option<usize>) -> Option<usize> {
    match n {
        None => flaggable.last().copied(),
        Some(0) => None,
        Some(n) => flaggable.get(n - 1).copied(),
    }
}

fn colored_verdict(verdict: Verdict) -> colored::ColoredString {
    use colored::Colorize;

    match verdict {
        Verdict::Safe => verdict.label().green().bold(),
        Verdict::Misuse => verdict.label().red().bold(),
    }
}

fn print_message(message: &Message, verdict_number: Option<usize>) {
    use colored::Colorize;

    let header = match message.role {
        Role::User => "You".cyan().bold(),
        Role::Assistant => "Guardrail".magenta().bold(),
    };

    match (message.predicted_class, verdict_number) {
        (Some(verdict), Some(n)) => {
            println!("\n{} [{} #{}]", header, colored_verdict(verdict), n)
        }
        (Some(verdict), None) => println!("\n{} [{}]", header, colored_verdict(verdict)),
        _ => println!("\n{}", header),
    }
    println!("{}", message.content);
}

fn print_verdict(result: &ClassificationResult) {
    print_message(&Message::verdict(result), None);
    println!("\nClassification id: {}", result.id);
}

fn print_notice(notice: &Notice) {
    use colored::Colorize;

    match notice {
        Notice::Confirmation(text) => println!("\n{}\n", text.green()),
        Notice::Error(text) => eprintln!("\n{}\n", text.red()),
    }
}

fn print_stats(stats: &Stats) {
    use colored::Colorize;

    println!("\n{}\n", format_stats(stats).dimmed());
}

// Chat command handler
pub mod chat {
    //! Interactive chat mode handler.
    //!
    //! Starts a `Conversation`, runs a readline loop that submits input for
    //! classification, and renders conversation events as they arrive. Stats
    //! refreshes run in the background; their snapshots are printed before the
    //! next prompt, and only the exit path waits for them.

    use super::special_commands::{parse_special_command, print_help, SpecialCommand};
    use super::*;
    use crate::config::ChatConfig;
    use crate::conversation::ConversationState;
    use rustyline::error::ReadlineError;
    use rustyline::DefaultEditor;
    use tokio::sync::mpsc::UnboundedReceiver;

    /// Start interactive chat mode
    ///
    /// # Arguments
    ///
    /// * `config` - Global configuration (consumed)
    /// * `router` - Router shared by every operation of the session
    pub async fn run_chat(config: Config, router: Arc<FallbackRouter>) -> Result<()> {
        tracing::info!("Starting interactive chat mode");

        let mut rl = DefaultEditor::new()?;
        let mut session = ChatSession::start(&config.chat, router);
        print_banner(session.conversation());

        loop {
            session.render_pending();

            match rl.readline("guardchat> ") {
                Ok(line) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    let _ = rl.add_history_entry(trimmed);

                    if session.handle_line(trimmed).await == LoopControl::Exit {
                        break;
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("CTRL-C");
                    break;
                }
                Err(ReadlineError::Eof) => {
                    println!("CTRL-D");
                    break;
                }
                Err(err) => {
                    tracing::error!("Readline error: {:?}", err);
                    break;
                }
            }
        }

        session.finish().await;
        println!("Goodbye!");
        Ok(())
    }

    /// What the loop does after a line was handled
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum LoopControl {
        Continue,
        Exit,
    }

    /// A conversation together with the terminal rendering of its events
    pub struct ChatSession {
        conversation: Conversation,
        events: UnboundedReceiver<ConversationEvent>,
        renderer: Renderer,
    }

    impl ChatSession {
        /// Start a conversation; the welcome message and first stats fetch
        /// are queued, not awaited
        pub fn start(config: &ChatConfig, router: Arc<FallbackRouter>) -> Self {
            let (conversation, events) = Conversation::start(router);
            Self {
                conversation,
                events,
                renderer: Renderer {
                    show_welcome: config.show_welcome,
                    show_sidebar: config.show_sidebar,
                    stats_requested: false,
                    verdicts: 0,
                },
            }
        }

        pub fn conversation(&self) -> &Conversation {
            &self.conversation
        }

        /// Render every event queued so far without waiting for more
        pub fn render_pending(&mut self) {
            self.renderer.drain(&mut self.events);
        }

        /// Handle one line of input
        ///
        /// Returns once the line's own request has completed. Stats
        /// refreshes it starts keep running in the background.
        pub async fn handle_line(&mut self, line: &str) -> LoopControl {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                return LoopControl::Continue;
            }

            let command = match parse_special_command(trimmed) {
                Ok(command) => command,
                Err(e) => {
                    eprintln!("{}", e);
                    return LoopControl::Continue;
                }
            };

            match command {
                SpecialCommand::Flag(n) => match flag_target(&self.conversation.flaggable(), n) {
                    Some(index) => {
                        self.conversation.flag(index).await;
                    }
                    None => eprintln!("No verdict to flag.\n"),
                },
                SpecialCommand::Stats => {
                    self.renderer.stats_requested = true;
                    self.conversation.refresh_stats();
                    print_stats(&self.conversation.stats());
                }
                SpecialCommand::History => print_history(self.conversation.messages()),
                SpecialCommand::Help => print_help(),
                SpecialCommand::Exit => return LoopControl::Exit,
                SpecialCommand::Say(text) => self.classify(&text).await,
                SpecialCommand::None => self.classify(trimmed).await,
            }

            self.render_pending();
            LoopControl::Continue
        }

        /// Wait for background refreshes and render what they produced
        pub async fn finish(&mut self) {
            self.conversation.join_background().await;
            self.render_pending();
        }

        async fn classify(&mut self, text: &str) {
            let Some(pending) = self.conversation.begin_submit(text) else {
                return;
            };
            // Shows the indicator while the request is in flight
            self.render_pending();

            let router = Arc::clone(self.conversation.router());
            let outcome = router.classify(pending.prompt()).await;
            self.conversation.finish_submit(pending, outcome);
        }
    }

    struct Renderer {
        show_welcome: bool,
        show_sidebar: bool,
        /// Print the next snapshot even with the sidebar off
        stats_requested: bool,
        verdicts: usize,
    }

    impl Renderer {
        fn drain(&mut self, events: &mut UnboundedReceiver<ConversationEvent>) {
            while let Ok(event) = events.try_recv() {
                self.render(event);
            }
        }

        fn render(&mut self, event: ConversationEvent) {
            match event {
                ConversationEvent::MessageAppended { index, message } => {
                    // The user's own line is already on screen
                    if message.role == Role::User {
                        return;
                    }
                    if index == 0 && message.classification_id.is_none() && !self.show_welcome {
                        return;
                    }
                    let number = if message.is_flaggable() {
                        self.verdicts += 1;
                        Some(self.verdicts)
                    } else {
                        None
                    };
                    print_message(&message, number);
                    println!();
                }
                ConversationEvent::StateChanged(ConversationState::AwaitingClassification) => {
                    use colored::Colorize;
                    println!("{}", "Classifying...".dimmed());
                }
                ConversationEvent::StateChanged(ConversationState::Idle) => {}
                ConversationEvent::StatsUpdated(stats) => {
                    if self.show_sidebar || self.stats_requested {
                        print_stats(&stats);
                    }
                    self.stats_requested = false;
                }
                ConversationEvent::Notice(notice) => print_notice(&notice),
            }
        }
    }

    fn print_banner(conversation: &Conversation) {
        use colored::Colorize;

        let descriptor = conversation.router().descriptor();
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║           Guardchat - AI Guardrail Classification            ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");
        match descriptor.fallback() {
            Some(fallback) => println!(
                "Transport: {} (fallback: {})",
                descriptor.primary().to_string().bold(),
                fallback
            ),
            None => println!("Transport: {}", descriptor.primary().to_string().bold()),
        }
        println!("Type '/help' for available commands, 'exit' to quit\n");
    }

    fn print_history(messages: &[Message]) {
        let mut verdicts = 0;
        for message in messages {
            let number = if message.is_flaggable() {
                verdicts += 1;
                Some(verdicts)
            } else {
                None
            };
            print_message(message, number);
        }
        println!();
    }
}

// One-shot classification
pub mod classify {
    //! Classify a single prompt and print the verdict.

    use super::*;
    use crate::error::GuardchatError;

    /// Classify `prompt` and print the rendered verdict
    ///
    /// # Errors
    ///
    /// Returns error if the prompt is blank or every transport failed
    pub async fn run_classify(router: Arc<FallbackRouter>, prompt: &str) -> Result<()> {
        if prompt.trim().is_empty() {
            return Err(GuardchatError::Config("Prompt must not be empty".to_string()).into());
        }

        let result = router.classify(prompt).await?;
        print_verdict(&result);
        Ok(())
    }
}

// Stats snapshot
pub mod stats {
    //! Print the usage statistics snapshot.

    use super::*;
    use crate::error::GuardchatError;

    /// Fetch stats and print them, as JSON when `json` is set
    pub async fn run_stats(router: Arc<FallbackRouter>, json: bool) -> Result<()> {
        let stats = router.fetch_stats().await?;
        if json {
            println!(
                "{}",
                serde_json::to_string_pretty(&stats).map_err(GuardchatError::from)?
            );
        } else {
            println!("{}", format_stats(&stats));
        }
        Ok(())
    }
}

// Flag a classification
pub mod flag {
    //! Flag a classification id as incorrect.

    use super::*;
    use crate::conversation::FLAG_CONFIRMATION_TEXT;

    /// Flag `id` and print a confirmation
    pub async fn run_flag(router: Arc<FallbackRouter>, id: &str) -> Result<()> {
        router.flag(id).await?;
        print_notice(&Notice::Confirmation(FLAG_CONFIRMATION_TEXT.to_string()));
        Ok(())
    }
}

// Resolved transport
pub mod transport {
    //! Print the resolved transport descriptor.

    use crate::transport::TransportDescriptor;

    /// Print which transports are in use; the API key is masked
    pub fn run_transport(descriptor: &TransportDescriptor) {
        println!("{}", descriptor);
    }
}
