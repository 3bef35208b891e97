//! Terminal REPL — stdin/stdout conversation for local testing.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use uuid::Uuid;

use crate::error::Result;
use crate::session::RegistrationService;

const QUIT: &str = "/quit";

/// Run one registration conversation over stdin/stdout.
pub async fn run(service: &RegistrationService) -> Result<()> {
    let session_key = format!("cli-{}", Uuid::new_v4());
    let stdin = BufReader::new(tokio::io::stdin());
    let stdout = tokio::io::stdout();
    converse(service, &session_key, stdin, stdout).await
}

/// Greet, then answer each input line until the session finishes, the input
/// ends, or the user types `/quit`.
pub async fn converse<R, W>(
    service: &RegistrationService,
    session_key: &str,
    input: R,
    mut output: W,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    tracing::info!(session = session_key, "Starting CLI session");

    let greeting = service.start_session(session_key).await?;
    print_replies(&mut output, &greeting.responses).await;

    let mut lines = input.lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break, // EOF
            Err(e) => {
                tracing::error!("Error reading stdin: {}", e);
                break;
            }
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == QUIT {
            break;
        }

        let reply = service.process_turn(session_key, line).await?;
        print_replies(&mut output, &reply.responses).await;
        if reply.finished {
            tracing::info!(session = session_key, "Registration finished");
            break;
        }
    }
    Ok(())
}

async fn print_replies<W: AsyncWrite + Unpin>(output: &mut W, replies: &[String]) {
    for reply in replies {
        let line = format!("BOT: {reply}\n");
        if let Err(e) = output.write_all(line.as_bytes()).await {
            tracing::error!("Error writing to stdout: {}", e);
            return;
        }
    }
    let _ = output.flush().await;
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::RegistrationConfig;
    use crate::llm::mock::ScriptedLlm;
    use crate::session::InMemorySessionStore;

    fn build(llm: ScriptedLlm) -> RegistrationService {
        RegistrationService::from_provider(
            Arc::new(llm),
            &RegistrationConfig::default(),
            Arc::new(InMemorySessionStore::new()),
        )
    }

    #[tokio::test]
    async fn stops_when_registration_finishes() {
        let service = build(ScriptedLlm::new([
            "Hello, your name?",
            r#"{"name": "Maria"}"#,
            "Your email?",
            r#"{"email": "maria@example.com"}"#,
            "Is this correct?",
            r#"{}"#,
        ]));
        let input: &[u8] = b"I am Maria\n\nmaria@example.com\nyes\nignored after finish\n";
        let mut output = Vec::new();

        converse(&service, "cli-test", input, &mut output).await.unwrap();

        let printed = String::from_utf8(output).unwrap();
        let lines: Vec<&str> = printed.lines().collect();
        assert_eq!(lines.first(), Some(&"BOT: Hello, your name?"));
        assert_eq!(lines.len(), 4);
        assert!(lines[3].starts_with("BOT: Thank you, Maria."));
    }

    #[tokio::test]
    async fn quit_ends_session_early() {
        let service = build(ScriptedLlm::new(["Hello, your name?"]));
        let input: &[u8] = b"/quit\nI am Maria\n";
        let mut output = Vec::new();

        converse(&service, "cli-test", input, &mut output).await.unwrap();

        let state = service.session("cli-test").await.unwrap();
        assert_eq!(state.history.len(), 1);
    }
}
