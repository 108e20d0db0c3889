use std::sync::Arc;

use buddy_stream::http::BuddyApiClient;
use buddy_stream::prelude::*;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), BuddyError> {
    let assistant = Assistant::builder()
        .transport(Arc::new(BuddyApiClient::from_env()?))
        .build()?;

    let mut conversation = assistant.conversation(ConversationConfig::named("stream"));
    let mut turn = conversation
        .turn(Feature::Chat)
        .query("Tell me about Hanoi")
        .start_stream()
        .await?;

    while let Some(event) = turn.next_event().await {
        match event {
            TurnEvent::Progress { text, .. } => eprintln!("[{text}]"),
            TurnEvent::AnswerDelta { fragment, .. } => print!("{fragment}"),
            TurnEvent::Completed { .. } => println!(),
            TurnEvent::Error { failure, .. } => eprintln!("turn error: {failure}"),
            TurnEvent::TurnStarted { .. } => {}
        }
    }

    let outcome = turn.finish().await?;
    conversation.resume_from(&outcome);
    for suggestion in &outcome.suggestions {
        eprintln!("try next: {suggestion}");
    }
    Ok(())
}
