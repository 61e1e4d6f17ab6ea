use crate::response::ParticleStream;
use crate::types::{Dialect, DispatchRequest};
use crate::Error;

/// Something that can turn a dispatch request into a particle stream.
///
/// Implementations own the HTTP plumbing and vendor translation. The stream
/// ends when the generation is done; dropping it cancels the request.
#[async_trait::async_trait]
pub trait ParticleTransport: Send + Sync + 'static {
    /// Dispatch a request. Errors returned here happen before any particle.
    async fn chat_generate(&self, request: DispatchRequest) -> Result<ParticleStream, Error>;

    /// Whether this transport can serve the given dialect.
    fn supports(&self, _dialect: Dialect) -> bool {
        true
    }
}
