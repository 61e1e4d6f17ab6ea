//! Particle reassembly into a [`GenerateAccumulator`].

use crate::response::{Fragment, GenerateAccumulator, Generator, TextFragment, TextStyle};
use crate::types::{
    CodeExecutionInvocation, CodeExecutionResponse, FunctionCallInvocation, Particle,
    TokenStopReason, ToolInvocation, ToolInvocationPart, ToolResponse, ToolResponseError,
    ToolResponsePart,
};

/// Folds an ordered particle sequence into a single accumulator.
///
/// Particles are applied strictly in arrival order. The only merging is
/// extending the last fragment when a delta continues it.
#[derive(Debug)]
pub struct ContentReassembler {
    accumulator: GenerateAccumulator,
    particles: usize,
    finalized: bool,
    terminating_issue: Option<String>,
}

impl ContentReassembler {
    /// Create a reassembler over an empty accumulator.
    pub fn new(generator: Generator) -> Self {
        Self {
            accumulator: GenerateAccumulator::new(generator),
            particles: 0,
            finalized: false,
            terminating_issue: None,
        }
    }

    pub fn accumulator(&self) -> &GenerateAccumulator {
        &self.accumulator
    }

    pub(crate) fn accumulator_mut(&mut self) -> &mut GenerateAccumulator {
        &mut self.accumulator
    }

    pub fn into_accumulator(self) -> GenerateAccumulator {
        self.accumulator
    }

    /// Number of particles folded so far.
    pub fn particle_count(&self) -> usize {
        self.particles
    }

    /// The in-band issue that ended the stream, if any.
    pub fn terminating_issue(&self) -> Option<&str> {
        self.terminating_issue.as_deref()
    }

    /// Apply one particle.
    pub fn reassemble_particle(&mut self, particle: Particle) {
        if self.finalized {
            tracing::warn!(?particle, "particle received after finalize, ignoring");
            return;
        }
        if self.terminating_issue.is_some() {
            tracing::warn!(?particle, "particle received after an upstream issue, ignoring");
            return;
        }
        self.particles += 1;

        let fragments = &mut self.accumulator.fragments;
        let generator = &mut self.accumulator.generator;

        match particle {
            Particle::Text { delta } => match fragments.last_mut() {
                // extend the current text, but never an error
                Some(Fragment::Text(TextFragment { text, style: None })) => text.push_str(&delta),
                _ => fragments.push(Fragment::text(delta)),
            },
            Particle::FunctionCallStart { id, name, args } => {
                fragments.push(Fragment::ToolCall(ToolInvocationPart {
                    id,
                    call: ToolInvocation::FunctionCall(FunctionCallInvocation {
                        name,
                        args: Some(args.unwrap_or_default()),
                    }),
                }));
            }
            Particle::FunctionCallArgs { delta } => match fragments.last_mut() {
                Some(Fragment::ToolCall(ToolInvocationPart {
                    call: ToolInvocation::FunctionCall(call),
                    ..
                })) => call.args.get_or_insert_with(String::new).push_str(&delta),
                _ => tracing::warn!("function call arguments without a function call in progress"),
            },
            Particle::CodeExecutionCall { id, language, code } => {
                fragments.push(Fragment::ToolCall(ToolInvocationPart {
                    id,
                    call: ToolInvocation::CodeExecution(CodeExecutionInvocation {
                        variant: None,
                        language,
                        code,
                    }),
                }));
            }
            Particle::CodeExecutionResponse { id, result, error } => {
                fragments.push(Fragment::ToolResponse(ToolResponsePart {
                    id,
                    response: ToolResponse::CodeExecution(CodeExecutionResponse { result }),
                    error: error.map(ToolResponseError::Message),
                }));
            }
            Particle::SetModel { name } => generator.name = name,
            Particle::SetMetrics { metrics } => generator.metrics = Some(metrics),
            Particle::SetStopReason { reason } => generator.token_stop_reason = Some(reason),
            Particle::Issue { issue, text } => {
                tracing::warn!(?issue, %text, "upstream issue reported in-band");
                self.append_error(&text);
                self.terminating_issue = Some(text);
            }
        }
    }

    /// The stream failed with a non-abort error: append it as content.
    ///
    /// An in-band issue already rendered its own fragment and is not repeated.
    pub fn reassemble_except_error(&mut self, message: &str) {
        if self.terminating_issue.is_some() {
            return;
        }
        self.append_error(message);
    }

    /// The stream was cancelled: leave the content exactly as it is.
    pub fn reassemble_except_user_abort(&mut self) {
        tracing::debug!(
            particles = self.particles,
            fragments = self.accumulator.fragments.len(),
            "generation aborted"
        );
    }

    /// Flush in-progress parts and mark the accumulator complete. Safe to repeat.
    pub fn reassemble_finalize(&mut self) {
        if self.finalized {
            return;
        }
        self.finalized = true;

        for fragment in &mut self.accumulator.fragments {
            if let Fragment::ToolCall(ToolInvocationPart {
                call: ToolInvocation::FunctionCall(call),
                ..
            }) = fragment
            {
                if call.args.as_deref().is_some_and(str::is_empty) {
                    call.args = None;
                }
            }
        }
        self.accumulator.pending_incomplete = false;
    }

    fn append_error(&mut self, message: &str) {
        // emphasize when it follows real content
        let style = if self.accumulator.fragments.is_empty() {
            TextStyle::Plain
        } else {
            TextStyle::Bold
        };
        self.accumulator.fragments.push(Fragment::error(message, style));
        self.accumulator.generator.token_stop_reason = Some(TokenStopReason::Issue);
    }
}
