//! Interactive terminal chat.
//!
//! Drives a [`ChatShell`] from stdin lines. Each submitted message runs as a
//! server-side turn through the same path the SSE endpoint uses, so rate
//! limits, chat creation and persistence behave identically. Ctrl+C stops the
//! running turn; Ctrl+D or `/exit` leaves the session.

use std::future::Future;
use std::io::Write;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::io::{AsyncBufReadExt, BufReader};
use uuid::Uuid;

use parley_core::auth::provider::AuthProvider;
use parley_core::shell::{ChatShell, ShellOptions};
use parley_core::turn::task::TurnOutcome;
use parley_types::chat::{MessagePart, MessageRole, Visibility};
use parley_types::page::PageRequest;
use parley_types::turn::{TurnChunk, UiMessage};
use parley_types::user::User;

use crate::cli::chats::format_relative_time;
use crate::state::AppState;
use crate::turn_runner;

/// Slash commands understood by the chat prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
enum SlashCommand {
    Help,
    Exit,
    History,
    Visibility(Visibility),
    Unknown(String),
}

fn parse_command(line: &str) -> Option<SlashCommand> {
    let rest = line.strip_prefix('/')?;
    let mut words = rest.split_whitespace();
    let command = match words.next().unwrap_or_default() {
        "help" | "?" => SlashCommand::Help,
        "exit" | "quit" => SlashCommand::Exit,
        "history" => SlashCommand::History,
        "public" => SlashCommand::Visibility(Visibility::Public),
        "private" => SlashCommand::Visibility(Visibility::Private),
        other => SlashCommand::Unknown(other.to_string()),
    };
    Some(command)
}

fn message_text(message: &UiMessage) -> String {
    message
        .parts
        .iter()
        .filter_map(|part| match part {
            MessagePart::Text { text } => Some(text.as_str()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Run an interactive chat session.
pub async fn run_chat(state: &AppState, chat: Option<Uuid>, user: Option<Uuid>) -> Result<()> {
    let user = resolve_user(state, user).await?;
    let mut shell = open_shell(state, &user, chat).await?;

    print_banner(&shell, &user);
    for message in shell.messages() {
        print_message(message);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("{} ", style("you>").green().bold());
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            println!();
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(command) = parse_command(line) {
            match command {
                SlashCommand::Help => print_help(),
                SlashCommand::Exit => break,
                SlashCommand::History => {
                    if let Err(e) = print_history(state, &user).await {
                        println!("  {} {e}", style("✗").red().bold());
                    }
                }
                SlashCommand::Visibility(visibility) => {
                    if let Err(e) = set_visibility(state, &mut shell, &user, visibility).await {
                        println!("  {} {e}", style("✗").red().bold());
                    }
                }
                SlashCommand::Unknown(name) => {
                    println!(
                        "  {} Unknown command '/{name}'. Type /help for commands.",
                        style("!").yellow().bold()
                    );
                }
            }
            continue;
        }

        shell.set_input(line);
        run_turn(state, &mut shell, &user, async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    }

    println!("  {}", style("Goodbye.").dim());
    Ok(())
}

async fn resolve_user(state: &AppState, id: Option<Uuid>) -> Result<User> {
    match id {
        Some(id) => state
            .auth
            .find_user(&id)
            .await?
            .ok_or_else(|| anyhow!("user {id} not found")),
        None => {
            let issued = state
                .auth
                .sign_in_anonymously()
                .await
                .context("failed to create a guest user")?;
            Ok(issued.user)
        }
    }
}

async fn open_shell(state: &AppState, user: &User, chat: Option<Uuid>) -> Result<ChatShell> {
    let Some(id) = chat else {
        return Ok(ChatShell::new(
            ShellOptions {
                chat_id: Uuid::now_v7(),
                selected_chat_model: state.config.default_chat_model.clone(),
                visibility: Visibility::Private,
                is_readonly: false,
                user_type: user.user_type(),
            },
            Vec::new(),
        ));
    };

    let (chat, access) = state
        .chat_service
        .get_chat_for_viewer(&id, Some(&user.id))
        .await?;
    let messages = state.chat_service.get_messages_by_chat_id(&chat.id).await?;
    let mut shell = ChatShell::new(
        ShellOptions {
            chat_id: chat.id,
            selected_chat_model: state.config.default_chat_model.clone(),
            visibility: chat.visibility,
            is_readonly: access.is_readonly(),
            user_type: user.user_type(),
        },
        messages.iter().map(UiMessage::from).collect(),
    );
    if !access.is_readonly() {
        shell.set_votes(
            state
                .chat_service
                .get_votes_by_chat_id(&chat.id, &user.id)
                .await?,
        );
    }
    Ok(shell)
}

/// Submit the shell's draft and stream the reply until it ends or `stop` resolves.
///
/// Returns `None` when the shell refused the submit or the server refused the turn.
async fn run_turn(
    state: &AppState,
    shell: &mut ChatShell,
    user: &User,
    stop: impl Future<Output = ()>,
) -> Result<Option<TurnOutcome>> {
    let request = match shell.submit() {
        Ok(request) => request,
        Err(e) => {
            println!("  {} {e}", style("!").yellow().bold());
            return Ok(None);
        }
    };

    let mut started =
        match turn_runner::start_turn(state, user, request, shell.options().visibility).await {
            Ok(started) => started,
            Err(e) => {
                shell.fail(e.to_string());
                print_toasts(shell);
                return Ok(None);
            }
        };

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}")?);
    spinner.set_message("thinking...");
    spinner.enable_steady_tick(Duration::from_millis(80));

    let mut first_token = true;
    if let Some(mut chunks) = started.handle.chunks() {
        tokio::pin!(stop);
        let mut stopping = false;
        loop {
            tokio::select! {
                chunk = chunks.recv() => {
                    let Some(chunk) = chunk else { break };
                    shell.apply_chunk(&chunk);
                    if let TurnChunk::TextDelta { text_delta } = &chunk {
                        if first_token {
                            spinner.finish_and_clear();
                            print!("{} ", style("bot>").cyan().bold());
                            first_token = false;
                        }
                        print!("{text_delta}");
                        std::io::stdout().flush()?;
                    }
                }
                _ = &mut stop, if !stopping => {
                    started.handle.cancel();
                    shell.stop();
                    stopping = true;
                }
            }
        }
    }
    spinner.finish_and_clear();
    if !first_token {
        println!();
    }

    let outcome = match started.finish(state).await {
        Ok(outcome) => outcome,
        Err(e) => {
            shell.fail(e.to_string());
            print_toasts(shell);
            return Ok(None);
        }
    };
    shell.finish();
    if matches!(outcome, TurnOutcome::Cancelled { .. }) {
        println!("  {}", style("(stopped)").dim());
    }
    print_toasts(shell);
    Ok(Some(outcome))
}

async fn set_visibility(
    state: &AppState,
    shell: &mut ChatShell,
    user: &User,
    visibility: Visibility,
) -> Result<()> {
    if shell.options().is_readonly {
        return Err(anyhow!("this chat is read-only"));
    }
    // A chat is stored on its first turn; before that only the draft changes.
    if state.chat_service.get_chat(&shell.chat_id()).await?.is_some() {
        state
            .chat_service
            .update_visibility(&shell.chat_id(), &user.id, visibility)
            .await?;
    }
    shell.set_visibility(visibility);
    println!(
        "  {} Chat is now {visibility}.",
        style("✓").green().bold()
    );
    Ok(())
}

async fn print_history(state: &AppState, user: &User) -> Result<()> {
    let page = state
        .chat_service
        .list_chats(&user.id, &PageRequest::first(state.config.web.history_page_size))
        .await?;
    if page.chats.is_empty() {
        println!("  {} No chats yet.", style("i").blue().bold());
        return Ok(());
    }
    for chat in &page.chats {
        println!(
            "  {}  {}  {}",
            style(chat.id).dim(),
            style(&chat.title).cyan(),
            style(format_relative_time(&chat.created_at)).dim()
        );
    }
    if page.has_more {
        println!("  {}", style("...").dim());
    }
    Ok(())
}

fn print_toasts(shell: &mut ChatShell) {
    for toast in shell.drain_toasts() {
        println!("  {} {}", style("✗").red().bold(), toast.description);
    }
}

fn print_message(message: &UiMessage) {
    let label = match message.role {
        MessageRole::User => style("you>").green().bold(),
        _ => style("bot>").cyan().bold(),
    };
    println!("{label} {}", message_text(message));
}

fn print_banner(shell: &ChatShell, user: &User) {
    let options = shell.options();
    println!();
    println!("  {}", style("Parley").cyan().bold());
    println!();
    println!(
        "  {}  {}",
        style("Model:").bold(),
        style(&options.selected_chat_model).dim()
    );
    println!("  {}  {}", style("Chat:").bold(), style(options.chat_id).dim());
    println!(
        "  {}  {} ({:?})",
        style("User:").bold(),
        style(user.id).dim(),
        options.user_type
    );
    if options.is_readonly {
        println!("  {}", style("Read-only: this chat belongs to someone else.").yellow());
    }
    println!();
    println!(
        "  {}",
        style("Type /help for commands, Ctrl+C to stop a reply, Ctrl+D to exit").dim()
    );
    println!("  {}", style("---").dim());
    println!();
}

fn print_help() {
    println!();
    println!("  {}", style("Commands").bold());
    println!("    /help      Show this help");
    println!("    /history   List your recent chats");
    println!("    /public    Make this chat public");
    println!("    /private   Make this chat private");
    println!("    /exit      Leave the chat");
    println!();
}
