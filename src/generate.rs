//! The chat generation orchestrator.

use std::sync::Arc;

use futures_util::StreamExt;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::accumulator::ContentReassembler;
use crate::factory::GenerateSettings;
use crate::metrics::{compute_chat_generation_costs, MetricsSink};
use crate::model::apply_preflight_hotfixes;
use crate::provider::ParticleTransport;
use crate::registry::{ModelResolver, ResolvedModel};
use crate::response::{GenerateAccumulator, GenerateOutcome, Generator, ParticleStream};
use crate::throttle::Throttle;
use crate::types::{ChatGenerateRequest, ConnectionOptions, Context, DispatchRequest};
use crate::Error;

/// Ties model resolution, dispatch, reassembly, throttling and cost
/// accounting into one operation.
///
/// Many generations may run concurrently on one generator; each call owns
/// its accumulator, reassembler and throttle.
pub struct ChatGenerator {
    resolver: Arc<dyn ModelResolver>,
    transport: Arc<dyn ParticleTransport>,
    sink: Arc<dyn MetricsSink>,
    settings: GenerateSettings,
}

impl ChatGenerator {
    pub fn new(
        resolver: Arc<dyn ModelResolver>,
        transport: Arc<dyn ParticleTransport>,
        sink: Arc<dyn MetricsSink>,
    ) -> Self {
        Self {
            resolver,
            transport,
            sink,
            settings: GenerateSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: GenerateSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &GenerateSettings {
        &self.settings
    }

    /// Run one chat generation.
    ///
    /// `on_update` receives the accumulator with `false` any number of times
    /// and exactly once, last, with `true`. Only configuration problems are
    /// returned as `Err`, before any notification; every later failure is
    /// folded into the returned outcome and rendered into the content.
    pub async fn generate<F>(
        &self,
        model_id: &str,
        mut request: ChatGenerateRequest,
        context: Context,
        streaming: bool,
        cancel: CancellationToken,
        mut on_update: F,
    ) -> Result<GenerateOutcome, Error>
    where
        F: FnMut(&GenerateAccumulator, bool) + Send,
    {
        let ResolvedModel {
            model,
            access,
            rate_limiter,
        } = self.resolver.resolve(model_id).await?;
        let dialect = access.dialect();
        if !self.transport.supports(dialect) {
            return Err(Error::config(format!(
                "No transport available for the {dialect} dialect of model {model_id}"
            )));
        }
        let model_config = model.model_config()?;
        request.validate()?;

        let streaming = apply_preflight_hotfixes(
            &model,
            &mut request,
            streaming && !self.settings.dev_no_streaming,
        );

        let mut reassembler = ContentReassembler::new(Generator {
            name: model.id.clone(),
            vendor_id: model.vendor_id.clone(),
            model_id: model.id.clone(),
            metrics: None,
            token_stop_reason: None,
        });
        let mut throttle = Throttle::new(self.settings.throttle_parallel_threads);

        let mut aborted_early = false;
        if let Some(limiter) = &rate_limiter {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => aborted_early = true,
                _ = limiter.acquire(&model) => {}
            }
        }

        let failure = if aborted_early {
            Some(Error::Aborted)
        } else {
            on_update(reassembler.accumulator(), false);

            let dispatch = DispatchRequest {
                access,
                model: model_config,
                chat_generate: request,
                context,
                streaming,
                connection_options: self.settings.debug_dispatch_request_body.then(|| {
                    ConnectionOptions {
                        debug_dispatch_request_body: Some(true),
                    }
                }),
            };
            tracing::debug!(model = %model.id, %dialect, streaming, "dispatching chat generation");

            let dispatched = tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(Error::Aborted),
                result = self.transport.chat_generate(dispatch) => result,
            };
            match dispatched {
                Ok(stream) => {
                    consume(stream, &mut reassembler, &mut throttle, &cancel, &mut on_update).await
                }
                Err(error) => Some(error),
            }
        };

        let outcome = match failure {
            None => GenerateOutcome::Success,
            Some(error) => {
                let by_token = cancel.is_cancelled();
                let by_error = error.is_abort();
                if by_token != by_error {
                    tracing::debug!(by_token, by_error, %error, "abort signals disagree");
                }
                if by_token || by_error {
                    reassembler.reassemble_except_user_abort();
                    GenerateOutcome::Aborted
                } else {
                    let error_message = error.to_string();
                    tracing::error!(model = %model.id, error = %error_message, "chat generation failed");
                    reassembler.reassemble_except_error(&error_message);
                    GenerateOutcome::Errored { error_message }
                }
            }
        };
        reassembler.reassemble_finalize();

        let generator = &mut reassembler.accumulator_mut().generator;
        if let Some(metrics) = generator.metrics.as_mut() {
            if let Some(costs) = compute_chat_generation_costs(Some(&*metrics), model.pricing.as_ref()) {
                if outcome.is_success() {
                    self.sink.add_chat_generate(
                        &costs,
                        &model,
                        metrics.total_input_tokens(),
                        metrics.total_output_tokens(),
                    );
                }
                metrics.costs = Some(costs);
            }
        }

        throttle.finalize(|| on_update(reassembler.accumulator(), true));
        tracing::debug!(model = %model.id, ?outcome, "chat generation done");
        Ok(outcome)
    }
}

/// Drive the particle stream until it ends, fails, or is cancelled.
///
/// Returns the error that stopped it, if any. An in-band issue particle
/// stops it too; the rest of the stream is dropped unread.
async fn consume<F>(
    mut stream: ParticleStream,
    reassembler: &mut ContentReassembler,
    throttle: &mut Throttle,
    cancel: &CancellationToken,
    on_update: &mut F,
) -> Option<Error>
where
    F: FnMut(&GenerateAccumulator, bool) + Send,
{
    loop {
        let deadline = throttle.pending_deadline();
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Some(Error::Aborted),
            _ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                throttle.flush(|| on_update(reassembler.accumulator(), false));
            }
            next = stream.next() => match next {
                Some(Ok(particle)) => {
                    tracing::trace!(?particle, "particle");
                    reassembler.reassemble_particle(particle);
                    if let Some(issue) = reassembler.terminating_issue() {
                        return Some(Error::transport(issue));
                    }
                    throttle.decimate(|| on_update(reassembler.accumulator(), false));
                }
                Some(Err(error)) => return Some(error),
                None => return None,
            },
        }
    }
}
