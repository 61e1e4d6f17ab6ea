//! Drive a chat generation against an in-memory paced transport.
//!
//! Shows the throttled update cadence without touching the network:
//!
//! ```bash
//! RUST_LOG=chatgen=debug cargo run --example mock_stream
//! CHATGEN_THROTTLE_THREADS=0 cargo run --example mock_stream
//! ```

use std::sync::Arc;
use std::time::Duration;

use chatgen::{
    particle_stream, Access, CancellationToken, ChatGenerateMetrics, ChatGenerateRequest,
    ChatGenerator, ChatPricing, Context, ContextName, DispatchRequest, Error, GenerateSettings,
    ModelDescriptor, OpenAIAccess, Particle, ParticleStream, ParticleTransport,
    StaticModelRegistry, TokenStopReason, UsageCounter,
};
use futures::StreamExt;
use tracing_subscriber::EnvFilter;

/// Replays canned particles with a fixed delay before each one.
struct PacedTransport {
    particles: Vec<Particle>,
    delay: Duration,
}

#[async_trait::async_trait]
impl ParticleTransport for PacedTransport {
    async fn chat_generate(&self, _request: DispatchRequest) -> Result<ParticleStream, Error> {
        let delay = self.delay;
        Ok(particle_stream(
            futures::stream::iter(self.particles.clone()).then(move |particle| async move {
                tokio::time::sleep(delay).await;
                Ok(particle)
            }),
        ))
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut particles: Vec<Particle> = "Rust makes streaming reassembly pleasant to write."
        .split_inclusive(' ')
        .map(Particle::text)
        .collect();
    particles.push(Particle::SetStopReason {
        reason: TokenStopReason::Ok,
    });
    particles.push(Particle::SetMetrics {
        metrics: ChatGenerateMetrics {
            t_in: Some(42),
            t_out: Some(9),
            ..Default::default()
        },
    });

    let model = ModelDescriptor::new("mock-gpt", "openai", "mock", "gpt-4o-mini")
        .with_pricing(ChatPricing::new(0.15, 0.6));
    let registry = StaticModelRegistry::new()
        .with_service("mock", Access::OpenAI(OpenAIAccess::new("unused")))
        .with_model(model);
    let usage = Arc::new(UsageCounter::new());
    let generator = ChatGenerator::new(
        Arc::new(registry),
        Arc::new(PacedTransport {
            particles,
            delay: Duration::from_millis(40),
        }),
        usage.clone(),
    )
    .with_settings(GenerateSettings::from_env()?);

    println!(
        "Throttle level {}",
        generator.settings().throttle_parallel_threads
    );

    let mut updates = 0;
    let outcome = generator
        .generate(
            "mock-gpt",
            ChatGenerateRequest::system("You are terse.").with_user("Say something about Rust."),
            Context::chat_stream(ContextName::Conversation, "demo"),
            true,
            CancellationToken::new(),
            |accumulator, done| {
                updates += 1;
                let marker = if done { "done" } else { "...." };
                println!("[{marker}] {}", accumulator.text_content());
            },
        )
        .await?;

    println!("\nOutcome: {outcome:?} after {updates} updates");
    let totals = usage.snapshot();
    println!(
        "Usage: {} generations, {} in, {} out, ${:.8}",
        totals.generations, totals.input_tokens, totals.output_tokens, totals.cost_usd
    );
    Ok(())
}
