//! Vendor-agnostic chat generation.
//!
//! A caller asks for a chat generation against any configured model and gets
//! back one canonical, incrementally updated accumulator regardless of the
//! vendor behind it. Vendor transports produce [`Particle`] streams, which the
//! [`ChatGenerator`] folds through a [`ContentReassembler`] and a load-adaptive
//! [`Throttle`] before they reach the caller's observer.

pub mod accumulator;
pub mod error;
pub mod factory;
pub mod generate;
pub mod metrics;
pub mod model;
pub mod provider;
pub mod providers;
pub mod registry;
pub mod response;
pub mod sse_stream;
pub mod throttle;
pub mod types;
pub mod wire;

pub use accumulator::ContentReassembler;
pub use error::Error;
pub use factory::{GenerateSettings, TransportFactory};
pub use generate::ChatGenerator;
pub use metrics::{
    compute_chat_generation_costs, ChatGenerateCosts, ChatGenerateMetrics, ChatPricing,
    MetricsSink, UsageCounter, UsageTotals,
};
pub use model::{apply_preflight_hotfixes, ModelDescriptor, ModelInterface, ModelOptions};
pub use provider::ParticleTransport;
pub use providers::OpenAIChatTransport;
pub use registry::{
    ChatRateLimiter, MinIntervalRateLimiter, ModelResolver, ResolvedModel, StaticModelRegistry,
};
pub use response::*;
pub use sse_stream::SseFrame;
pub use throttle::Throttle;
pub use types::*;
pub use wire::{decode_access, decode_chat_message, decode_dispatch_request, decode_request, decode_tool};

/// Cancellation handle accepted by [`ChatGenerator::generate`].
pub use tokio_util::sync::CancellationToken;
