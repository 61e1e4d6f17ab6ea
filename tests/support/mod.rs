//! Shared helpers for the integration tests.
#![allow(dead_code)]

mod scripted;

use std::sync::{Arc, Mutex};

use chatgen::{
    Access, ChatGenerateCosts, GenerateAccumulator, MetricsSink, ModelDescriptor, OpenAIAccess,
    StaticModelRegistry,
};

pub use scripted::{ScriptStep, ScriptedTransport};

pub const MODEL_ID: &str = "openai-gpt-4o-mini";

pub fn model() -> ModelDescriptor {
    ModelDescriptor::new(MODEL_ID, "openai", "openai-1", "gpt-4o-mini")
}

pub fn registry_with(model: ModelDescriptor, access: Access) -> StaticModelRegistry {
    StaticModelRegistry::new()
        .with_service(model.service_id.clone(), access)
        .with_model(model)
}

pub fn registry() -> StaticModelRegistry {
    registry_with(model(), Access::OpenAI(OpenAIAccess::new("sk-test")))
}

/// One entry per `add_chat_generate` call.
#[derive(Debug, Clone, PartialEq)]
pub struct SinkEntry {
    pub model_id: String,
    pub costs: ChatGenerateCosts,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

#[derive(Debug, Default)]
pub struct RecordingSink {
    entries: Mutex<Vec<SinkEntry>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn entries(&self) -> Vec<SinkEntry> {
        self.entries.lock().unwrap().clone()
    }
}

impl MetricsSink for RecordingSink {
    fn add_chat_generate(
        &self,
        costs: &ChatGenerateCosts,
        model: &ModelDescriptor,
        input_tokens: u64,
        output_tokens: u64,
    ) {
        self.entries.lock().unwrap().push(SinkEntry {
            model_id: model.id.clone(),
            costs: costs.clone(),
            input_tokens,
            output_tokens,
        });
    }
}

/// Every notification a generation produced, in order.
#[derive(Debug, Default)]
pub struct Updates {
    pub seen: Vec<(GenerateAccumulator, bool)>,
}

impl Updates {
    pub fn record(&mut self, accumulator: &GenerateAccumulator, done: bool) {
        self.seen.push((accumulator.clone(), done));
    }

    pub fn last(&self) -> &GenerateAccumulator {
        &self.seen.last().expect("no notifications").0
    }

    pub fn done_count(&self) -> usize {
        self.seen.iter().filter(|(_, done)| *done).count()
    }

    pub fn intermediate_count(&self) -> usize {
        self.seen.len() - self.done_count()
    }

    /// Exactly one terminal notification, and it is the last one.
    pub fn assert_terminated(&self) {
        assert_eq!(self.done_count(), 1, "expected exactly one terminal update");
        let (last, done) = self.seen.last().expect("no notifications");
        assert!(*done, "terminal update must come last");
        assert!(!last.pending_incomplete);
    }
}
