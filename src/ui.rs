use std::error::Error;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{ AsyncBufReadExt, AsyncWriteExt, BufReader, Stdout };
use tokio::sync::Mutex;
use tokio::time::interval;
use uuid::Uuid;

use crate::cli::Args;
use crate::models::chat::{ Conversation, Role };
use crate::reveal::Typewriter;
use crate::session::{ Session, SubmitHandle };

/// Plain-terminal front end: read a query, submit it, and repaint the
/// conversation while the thinking trace and the answer reveal at their own
/// rates. One query at a time; the prompt only returns once the in-flight
/// stream has closed and both reveals have caught up.
pub async fn chat_loop(session: Session, args: &Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    stdout.write_all(
        b"CyberMind AI - your intelligent search companion. Type a question, or 'quit' to leave.\n"
    ).await?;

    loop {
        stdout.write_all(b"\n> ").await?;
        stdout.flush().await?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let query = line.trim();
        if query.is_empty() {
            continue;
        }
        if query == "quit" || query == "exit" {
            break;
        }

        match session.submit(query).await {
            Ok(handle) => {
                render_response(&session, handle, args, &mut stdout).await?;
            }
            Err(e) => {
                stdout.write_all(format!("{}\n", e).as_bytes()).await?;
            }
        }
    }

    Ok(())
}

async fn render_response(
    session: &Session,
    handle: SubmitHandle,
    args: &Args,
    stdout: &mut Stdout
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let conversation = session.conversation();
    let id = handle.assistant_id;

    // Two independent schedulers per message: thinking reveals fast, the
    // answer more deliberately.
    let mut thinking_tw = Typewriter::new("", 1);
    let mut content_tw = Typewriter::new("", 1);
    let mut thinking_ticker = interval(Duration::from_millis(args.thinking_reveal_ms.max(1)));
    let mut content_ticker = interval(Duration::from_millis(args.content_reveal_ms.max(1)));

    loop {
        if handle.is_finished() {
            let (thinking, content) = snapshot(&conversation, id).await;
            thinking_tw.set_text(&thinking);
            content_tw.set_text(&content);
            if thinking_tw.is_complete() && content_tw.is_complete() {
                break;
            }
        }

        tokio::select! {
            _ = thinking_ticker.tick() => {
                let (thinking, _) = snapshot(&conversation, id).await;
                thinking_tw.set_text(&thinking);
                if thinking_tw.tick().is_some() {
                    draw(stdout, &conversation, id, thinking_tw.revealed(), content_tw.revealed()).await?;
                }
            }
            _ = content_ticker.tick() => {
                let (_, content) = snapshot(&conversation, id).await;
                content_tw.set_text(&content);
                if content_tw.tick().is_some() {
                    draw(stdout, &conversation, id, thinking_tw.revealed(), content_tw.revealed()).await?;
                }
            }
        }
    }

    draw(stdout, &conversation, id, thinking_tw.revealed(), content_tw.revealed()).await?;
    stdout.write_all(b"\n").await?;
    handle.wait().await;
    Ok(())
}

async fn snapshot(conversation: &Arc<Mutex<Conversation>>, id: Uuid) -> (String, String) {
    let guard = conversation.lock().await;
    match guard.get(id) {
        Some(message) => (message.thinking.clone(), message.content.clone()),
        None => (String::new(), String::new()),
    }
}

async fn draw(
    stdout: &mut Stdout,
    conversation: &Arc<Mutex<Conversation>>,
    id: Uuid,
    thinking: &str,
    content: &str
) -> std::io::Result<()> {
    let mut out = String::from("\x1b[2J\x1b[H");

    let guard = conversation.lock().await;
    for message in &guard.messages {
        if message.id == id {
            break;
        }
        match message.role {
            Role::User => out.push_str(&format!("You: {}\n\n", message.content)),
            Role::Assistant => out.push_str(&format!("CyberMind: {}\n\n", message.content)),
        }
    }

    out.push_str("--- AI Thinking Process ---\n");
    out.push_str(thinking);
    out.push('\n');

    if let Some(message) = guard.get(id) {
        if !message.sources.is_empty() {
            out.push_str("\n--- Sources & References ---\n");
            for (i, source) in message.sources.iter().enumerate() {
                out.push_str(&format!("[{}] {} ({})\n", i + 1, source.title, source.url));
            }
        }
    }
    drop(guard);

    out.push_str("\n--- Answer ---\n");
    out.push_str(content);

    stdout.write_all(out.as_bytes()).await?;
    stdout.flush().await
}
