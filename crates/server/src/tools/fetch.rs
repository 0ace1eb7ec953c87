//! sw_fetch tool implementation.
//!
//! Dispatches a request through the controller's fetch interceptor, exactly as
//! a page request would be.

use acqua_client::{CacheController, FetchOutcome, NAVIGATION_ACCEPT};
use acqua_core::{Destination, Request, RequestMode};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{ResponseView, json_result};

/// Input parameters for the sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchParams {
    /// Absolute URL of the request.
    pub url: String,

    /// HTTP method (default: GET). Anything else is passed through untouched.
    #[serde(default = "default_method")]
    pub method: String,

    /// Request destination: "document", "image", "style", "script",
    /// "manifest", "font", or empty for script-initiated fetches.
    #[serde(default)]
    pub destination: Option<String>,

    /// Accept header. Navigations without one get the browser default.
    #[serde(default)]
    pub accept: Option<String>,

    /// Request mode: "navigate", "same-origin", "no-cors", or "cors" (default).
    #[serde(default)]
    pub mode: Option<String>,
}

fn default_method() -> String {
    "GET".into()
}

/// Output structure for the sw_fetch tool.
#[derive(Debug, Clone, Serialize)]
pub struct SwFetchOutput {
    /// False when the controller left the request to default networking.
    pub intercepted: bool,
    /// Why the request was not intercepted.
    pub passthrough: Option<&'static str>,
    /// "cache", "network", or "fallback".
    pub source: Option<&'static str>,
    pub response: Option<ResponseView>,
}

fn build_request(params: &SwFetchParams) -> Result<Request, acqua_core::Error> {
    let mut request = Request::parse(&params.url)?.with_method(&params.method);

    if let Some(destination) = &params.destination {
        request = request.with_destination(Destination::parse(destination));
    }
    if let Some(mode) = &params.mode {
        request = request.with_mode(RequestMode::parse(mode)?);
    }
    match &params.accept {
        Some(accept) => request = request.with_header("Accept", accept),
        None if request.mode == RequestMode::Navigate || request.destination == Destination::Document => {
            request = request.with_header("Accept", NAVIGATION_ACCEPT);
        }
        None => {}
    }

    Ok(request)
}

/// Implementation of the sw_fetch tool.
pub async fn fetch_impl(controller: &CacheController, params: SwFetchParams) -> Result<CallToolResult, McpError> {
    let request = build_request(&params)?;
    let outcome = controller.handle_fetch(&request).await?;

    let output = match outcome {
        FetchOutcome::Passthrough(reason) => SwFetchOutput {
            intercepted: false,
            passthrough: Some(reason.as_str()),
            source: None,
            response: None,
        },
        FetchOutcome::Respond { response, source } => SwFetchOutput {
            intercepted: true,
            passthrough: None,
            source: Some(source.as_str()),
            response: Some(ResponseView::from(&response)),
        },
    };

    json_result(&output)
}
