//! Per-call customization hooks.

use std::fmt;
use std::sync::Arc;

use crate::codec::{JsonDecoder, JsonEncoder};
use crate::error::HttpError;
use crate::request::RequestDescriptor;
use crate::response::Response;

type RequestTuner = Arc<dyn Fn(&mut RequestDescriptor) + Send + Sync>;
type ResponseTuner = Arc<dyn Fn(&Response) -> Result<(), HttpError> + Send + Sync>;
type EncoderTuner = Arc<dyn Fn(&mut JsonEncoder) + Send + Sync>;
type DecoderTuner = Arc<dyn Fn(&mut JsonDecoder) + Send + Sync>;
type ErrorTuner = Arc<dyn Fn(&HttpError) -> bool + Send + Sync>;

/// Optional hooks applied to a single call.
///
/// Each extension point holds at most one callback; setting a hook twice
/// replaces the earlier one. `Tuners::default()` means "no customization".
#[derive(Clone, Default)]
pub struct Tuners {
    request: Option<RequestTuner>,
    response: Option<ResponseTuner>,
    encoder: Option<EncoderTuner>,
    decoder: Option<DecoderTuner>,
    error: Option<ErrorTuner>,
}

impl Tuners {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adjust the built request. Runs after every default has been applied.
    pub fn request(mut self, f: impl Fn(&mut RequestDescriptor) + Send + Sync + 'static) -> Self {
        self.request = Some(Arc::new(f));
        self
    }

    /// Inspect a validated response before decoding; an error fails the call.
    pub fn response(
        mut self,
        f: impl Fn(&Response) -> Result<(), HttpError> + Send + Sync + 'static,
    ) -> Self {
        self.response = Some(Arc::new(f));
        self
    }

    pub fn encoder(mut self, f: impl Fn(&mut JsonEncoder) + Send + Sync + 'static) -> Self {
        self.encoder = Some(Arc::new(f));
        self
    }

    pub fn decoder(mut self, f: impl Fn(&mut JsonDecoder) + Send + Sync + 'static) -> Self {
        self.decoder = Some(Arc::new(f));
        self
    }

    /// Accept a failed validation as success when `f` returns true.
    ///
    /// Only validation failures reach this hook; transport failures have no
    /// response to continue with.
    pub fn error(mut self, f: impl Fn(&HttpError) -> bool + Send + Sync + 'static) -> Self {
        self.error = Some(Arc::new(f));
        self
    }

    pub fn tune_request(&self, request: &mut RequestDescriptor) {
        if let Some(tuner) = &self.request {
            tuner(request);
        }
    }

    pub fn tune_response(&self, response: &Response) -> Result<(), HttpError> {
        match &self.response {
            Some(tuner) => tuner(response),
            None => Ok(()),
        }
    }

    pub fn tune_encoder(&self, encoder: &mut JsonEncoder) {
        if let Some(tuner) = &self.encoder {
            tuner(encoder);
        }
    }

    pub fn tune_decoder(&self, decoder: &mut JsonDecoder) {
        if let Some(tuner) = &self.decoder {
            tuner(decoder);
        }
    }

    /// Whether `error` should be treated as success.
    pub fn remaps(&self, error: &HttpError) -> bool {
        self.error.as_ref().map_or(false, |tuner| tuner(error))
    }
}

impl fmt::Debug for Tuners {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tuners")
            .field("request", &self.request.is_some())
            .field("response", &self.response.is_some())
            .field("encoder", &self.encoder.is_some())
            .field("decoder", &self.decoder.is_some())
            .field("error", &self.error.is_some())
            .finish()
    }
}
