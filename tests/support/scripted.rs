//! An in-memory transport replaying a fixed script.

use std::sync::Mutex;
use std::time::Duration;

use chatgen::{particle_stream, DispatchRequest, Error, Particle, ParticleStream, ParticleTransport};
use futures::stream;

/// One step of a [`ScriptedTransport`] stream.
#[derive(Debug, Clone)]
pub enum ScriptStep {
    Emit(Particle),
    Pause(Duration),
    /// Yield a transport error with this message.
    Fail(String),
    /// Never produce anything again, until cancelled.
    Hang,
}

/// Records every request it receives.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    script: Vec<ScriptStep>,
    dispatch_error: Option<String>,
    requests: Mutex<Vec<DispatchRequest>>,
}

impl ScriptedTransport {
    pub fn new(script: Vec<ScriptStep>) -> Self {
        Self {
            script,
            ..Self::default()
        }
    }

    /// A script that emits the given particles and ends.
    pub fn particles(particles: impl IntoIterator<Item = Particle>) -> Self {
        Self::new(particles.into_iter().map(ScriptStep::Emit).collect())
    }

    /// A transport whose dispatch itself fails.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            dispatch_error: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn requests(&self) -> Vec<DispatchRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl ParticleTransport for ScriptedTransport {
    async fn chat_generate(&self, request: DispatchRequest) -> Result<ParticleStream, Error> {
        self.requests.lock().unwrap().push(request);
        if let Some(message) = &self.dispatch_error {
            return Err(Error::transport(message.clone()));
        }

        let steps = self.script.clone().into_iter();
        Ok(particle_stream(stream::unfold(steps, |mut steps| async move {
            loop {
                match steps.next()? {
                    ScriptStep::Emit(particle) => return Some((Ok(particle), steps)),
                    ScriptStep::Pause(duration) => tokio::time::sleep(duration).await,
                    ScriptStep::Fail(message) => {
                        return Some((Err(Error::transport(message)), steps))
                    }
                    ScriptStep::Hang => futures::future::pending::<()>().await,
                }
            }
        })))
    }
}
