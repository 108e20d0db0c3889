use std::sync::Arc;

use buddy_stream::http::BuddyApiClient;
use buddy_stream::prelude::*;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), BuddyError> {
    let assistant = Assistant::builder()
        .transport(Arc::new(BuddyApiClient::from_env()?))
        .build()?;

    let answer = assistant
        .conversation(ConversationConfig::named("collect"))
        .turn(Feature::Story)
        .query("Draft a short story for a street-food tour in Hanoi")
        .filter("experience_id", "exp-123")
        .collect_answer()
        .await?;

    println!("{answer}");
    Ok(())
}
