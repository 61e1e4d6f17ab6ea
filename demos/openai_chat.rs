//! Stream a chat generation from any OpenAI-compatible vendor.
//!
//! Credentials come from the environment (or a `.env` file):
//!
//! ```bash
//! export OPENAI_API_KEY=your_api_key_here
//! # or e.g. CHATGEN_DIALECT=groq OPENAI_API_KEY=gsk_... OPENAI_API_HOST=https://api.groq.com/openai
//! cargo run --example openai_chat -- gpt-4o-mini "Tell me a short story about a robot learning to paint."
//! ```

use std::io::Write;
use std::sync::Arc;

use chatgen::{
    Access, CancellationToken, ChatGenerateRequest, ChatGenerator, Context, ContextName, Error,
    GenerateOutcome, GenerateSettings, ModelDescriptor, StaticModelRegistry, TransportFactory,
    UsageCounter,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Error> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let mut args = std::env::args().skip(1);
    let model_ref = args.next().unwrap_or_else(|| "gpt-4o-mini".to_string());
    let prompt = args
        .next()
        .unwrap_or_else(|| "What is the capital of France?".to_string());

    let access = Access::from_env()?;
    let dialect = access.dialect();
    println!("Using the {dialect} dialect with model {model_ref}");

    let model = ModelDescriptor::new("demo-model", dialect.as_str(), "env", model_ref);
    let registry = StaticModelRegistry::new()
        .with_service("env", access)
        .with_model(model);
    let generator = ChatGenerator::new(
        Arc::new(registry),
        Arc::new(TransportFactory::new()?),
        Arc::new(UsageCounter::new()),
    )
    .with_settings(GenerateSettings::from_env()?);

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    let mut printed = 0;
    let outcome = generator
        .generate(
            "demo-model",
            ChatGenerateRequest::system("You are a helpful assistant that responds concisely.")
                .with_user(prompt),
            Context::chat_stream(ContextName::Conversation, "demo"),
            true,
            cancel,
            |accumulator, done| {
                let text = accumulator.text_content();
                if let Some(fresh) = text.get(printed..) {
                    print!("{fresh}");
                    std::io::stdout().flush().ok();
                    printed = text.len();
                }
                if done {
                    println!();
                }
            },
        )
        .await?;

    match outcome {
        GenerateOutcome::Success => println!("Done."),
        GenerateOutcome::Aborted => println!("Stopped."),
        GenerateOutcome::Errored { error_message } => eprintln!("Failed: {error_message}"),
    }
    Ok(())
}
