//! Generation gateway: credential resolution, prompt composition, one provider call.

use crate::error::{RenderError, Result};
use crate::image::SourceImage;
use crate::materials::MaterialMapping;
use crate::prompt::compose;
use crate::provider::{ProviderInput, RenderProvider};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Message carried by [`RenderError::MissingCredential`].
pub const MISSING_CREDENTIAL_HINT: &str =
    "Please add it to .env.local or provide it in the settings.";

/// One render request. Never persisted.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// Free-text style instruction.
    pub style_text: String,
    /// Snapshot of the material mapping at request time.
    pub materials: MaterialMapping,
    /// Source image as a data URI.
    pub source_image: SourceImage,
    /// User-supplied API token, used when no operator token is configured.
    pub credential: Option<String>,
}

impl GenerationRequest {
    /// Creates a request with the given style, materials, and image.
    pub fn new(
        style_text: impl Into<String>,
        materials: MaterialMapping,
        source_image: SourceImage,
    ) -> Self {
        Self {
            style_text: style_text.into(),
            materials,
            source_image,
            credential: None,
        }
    }

    /// Sets the request-scoped credential.
    pub fn with_credential(mut self, credential: impl Into<String>) -> Self {
        self.credential = Some(credential.into());
        self
    }

    /// Returns the composed provider instruction for this request.
    pub fn instruction(&self) -> String {
        compose(&self.style_text, &self.materials)
    }
}

/// Submits [`GenerationRequest`]s to a [`RenderProvider`].
///
/// Holds no mutable state; calls from different callers can run concurrently.
#[derive(Clone)]
pub struct GenerationGateway {
    provider: Arc<dyn RenderProvider>,
    operator_credential: Option<String>,
    timeout: Option<Duration>,
}

impl GenerationGateway {
    /// Creates a gateway over the given provider, with no operator credential
    /// and no caller-side timeout.
    pub fn new(provider: Arc<dyn RenderProvider>) -> Self {
        Self {
            provider,
            operator_credential: None,
            timeout: None,
        }
    }

    /// Sets the operator credential, which takes precedence over request
    /// credentials. Blank values are ignored.
    pub fn with_operator_credential(mut self, credential: Option<String>) -> Self {
        self.operator_credential = credential
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());
        self
    }

    /// Bounds how long a single generation may take.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Returns true if an operator credential is configured.
    pub fn has_operator_credential(&self) -> bool {
        self.operator_credential.is_some()
    }

    /// Returns the credential to use for a request: operator first, then the
    /// request's own.
    pub fn resolve_credential<'a>(&'a self, request: &'a GenerationRequest) -> Result<&'a str> {
        self.resolve_token(request.credential.as_deref())
    }

    /// Resolves a credential from the operator setting or a caller-supplied
    /// token, without needing a full request.
    pub fn resolve_token<'a>(&'a self, request_credential: Option<&'a str>) -> Result<&'a str> {
        self.operator_credential
            .as_deref()
            .or_else(|| request_credential.map(str::trim).filter(|c| !c.is_empty()))
            .ok_or_else(|| RenderError::MissingCredential(MISSING_CREDENTIAL_HINT.into()))
    }

    /// Generates one render and returns its result URL.
    ///
    /// The credential is checked before any network activity. The provider is
    /// called exactly once; there are no retries.
    pub async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        let token = self.resolve_credential(request)?;

        let prompt = request.instruction();
        tracing::debug!(
            provider = self.provider.name(),
            materials = request.materials.len(),
            prompt = %prompt,
            "generating render"
        );

        let input = ProviderInput::new(request.source_image.clone(), prompt);
        let start = Instant::now();

        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, self.provider.run(&input, token))
                .await
                .map_err(|_| RenderError::Timeout(limit))??,
            None => self.provider.run(&input, token).await?,
        };

        let locator = output.into_locator()?;
        tracing::info!(
            duration_ms = start.elapsed().as_millis() as u64,
            result_url = %locator,
            "render generated"
        );
        Ok(locator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::materials::MaterialRecord;
    use crate::provider::ProviderOutput;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Provider stub that records every call.
    struct StubProvider {
        output: Mutex<Option<Result<ProviderOutput>>>,
        delay: Option<Duration>,
        calls: Mutex<Vec<(ProviderInput, String)>>,
    }

    impl StubProvider {
        fn returning(output: Result<ProviderOutput>) -> Arc<Self> {
            Arc::new(Self {
                output: Mutex::new(Some(output)),
                delay: None,
                calls: Mutex::new(Vec::new()),
            })
        }

        fn slow(delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                output: Mutex::new(Some(Ok(ProviderOutput::Single("late".into())))),
                delay: Some(delay),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl RenderProvider for StubProvider {
        async fn run(&self, input: &ProviderInput, token: &str) -> Result<ProviderOutput> {
            self.calls
                .lock()
                .unwrap()
                .push((input.clone(), token.to_string()));
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.output
                .lock()
                .unwrap()
                .take()
                .expect("stub called more than once")
        }

        fn name(&self) -> &str {
            "stub"
        }
    }

    fn image() -> SourceImage {
        SourceImage::from_data_uri("data:image/png;base64,iVBORw0KGgo=").unwrap()
    }

    fn yellow_mapping() -> MaterialMapping {
        [MaterialRecord::new("yellow", "#FFD700")
            .with_material("Matte White Sprayed MDF")
            .with_finish("Matte")]
        .into_iter()
        .collect()
    }

    fn request() -> GenerationRequest {
        GenerationRequest::new("Modern", yellow_mapping(), image())
    }

    #[tokio::test]
    async fn test_missing_credential_never_calls_provider() {
        let stub = StubProvider::returning(Ok(ProviderOutput::Single("x".into())));
        let gateway = GenerationGateway::new(stub.clone());

        let err = gateway.generate(&request()).await.unwrap_err();
        assert!(matches!(err, RenderError::MissingCredential(_)));
        assert!(err.is_credential_error());
        assert_eq!(stub.call_count(), 0);
    }

    #[tokio::test]
    async fn test_blank_credentials_count_as_missing() {
        let stub = StubProvider::returning(Ok(ProviderOutput::Single("x".into())));
        let gateway =
            GenerationGateway::new(stub.clone()).with_operator_credential(Some("  ".into()));

        let err = gateway
            .generate(&request().with_credential(""))
            .await
            .unwrap_err();
        assert!(matches!(err, RenderError::MissingCredential(_)));
        assert_eq!(stub.call_count(), 0);
    }

    #[tokio::test]
    async fn test_list_output_yields_first_url() {
        let stub = StubProvider::returning(Ok(ProviderOutput::Many(vec![
            "urlA".into(),
            "urlB".into(),
        ])));
        let gateway = GenerationGateway::new(stub.clone());

        let url = gateway
            .generate(&request().with_credential("r8_user"))
            .await
            .unwrap();
        assert_eq!(url, "urlA");
        assert_eq!(stub.call_count(), 1);
    }

    #[tokio::test]
    async fn test_scalar_output_is_the_url() {
        let stub = StubProvider::returning(Ok(ProviderOutput::Single("urlC".into())));
        let gateway = GenerationGateway::new(stub.clone());

        let url = gateway
            .generate(&request().with_credential("r8_user"))
            .await
            .unwrap();
        assert_eq!(url, "urlC");
    }

    #[tokio::test]
    async fn test_operator_credential_wins() {
        let stub = StubProvider::returning(Ok(ProviderOutput::Single("u".into())));
        let gateway = GenerationGateway::new(stub.clone())
            .with_operator_credential(Some("r8_operator".into()));

        gateway
            .generate(&request().with_credential("r8_user"))
            .await
            .unwrap();
        let calls = stub.calls.lock().unwrap();
        assert_eq!(calls[0].1, "r8_operator");
    }

    #[test]
    fn test_resolve_token() {
        let stub = StubProvider::returning(Ok(ProviderOutput::Single("u".into())));
        let gateway = GenerationGateway::new(stub.clone());
        assert_eq!(gateway.resolve_token(Some(" r8_user ")).unwrap(), "r8_user");
        assert!(gateway.resolve_token(Some("  ")).unwrap_err().is_credential_error());
        assert!(gateway.resolve_token(None).unwrap_err().is_credential_error());

        let gateway = gateway.with_operator_credential(Some("r8_operator".into()));
        assert_eq!(gateway.resolve_token(None).unwrap(), "r8_operator");
    }

    #[tokio::test]
    async fn test_provider_receives_composed_prompt_and_fixed_parameters() {
        let stub = StubProvider::returning(Ok(ProviderOutput::Single("u".into())));
        let gateway = GenerationGateway::new(stub.clone());
        let request = request().with_credential("r8_user");

        gateway.generate(&request).await.unwrap();

        let calls = stub.calls.lock().unwrap();
        let (input, token) = &calls[0];
        assert_eq!(token, "r8_user");
        assert_eq!(input.prompt, request.instruction());
        assert!(input.prompt.contains("#FFD700"));
        assert!(input.prompt.contains("Matte White Sprayed MDF"));
        assert_eq!(input.image, image());
        assert_eq!(input.negative_prompt, crate::provider::NEGATIVE_PROMPT);
        assert_eq!(input.num_inference_steps, 30);
    }

    #[tokio::test]
    async fn test_provider_error_is_surfaced() {
        let stub = StubProvider::returning(Err(RenderError::Api {
            status: 422,
            message: "invalid image".into(),
        }));
        let gateway = GenerationGateway::new(stub.clone());

        let err = gateway
            .generate(&request().with_credential("r8_user"))
            .await
            .unwrap_err();
        assert!(err.is_provider_error());
        assert!(err.to_string().contains("invalid image"));
        assert_eq!(stub.call_count(), 1);
    }

    #[tokio::test]
    async fn test_empty_output_is_an_error() {
        let stub = StubProvider::returning(Ok(ProviderOutput::Many(vec![])));
        let gateway = GenerationGateway::new(stub.clone());

        let err = gateway
            .generate(&request().with_credential("r8_user"))
            .await
            .unwrap_err();
        assert!(matches!(err, RenderError::UnexpectedResponse(_)));
    }

    #[tokio::test]
    async fn test_timeout() {
        let stub = StubProvider::slow(Duration::from_secs(5));
        let gateway =
            GenerationGateway::new(stub.clone()).with_timeout(Duration::from_millis(20));

        let err = gateway
            .generate(&request().with_credential("r8_user"))
            .await
            .unwrap_err();
        assert!(matches!(err, RenderError::Timeout(_)));
    }
}
