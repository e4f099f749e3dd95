//! MCP (Model Context Protocol) server interface for watch checks.
//!
//! Exposes the pipeline as MCP tools for AI agents via stdio transport.

use std::sync::Arc;

use rmcp::{
    ErrorData as McpError, ServerHandler, ServiceExt,
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{
        CallToolResult, Content, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo,
    },
    tool, tool_handler, tool_router,
    transport::stdio,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::WatchCheckError;
use crate::pipeline::WatchCheck;

// ============================================================================
// Tool Input Schemas
// ============================================================================

/// Parameters for a watch check.
#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct CheckParams {
    /// Free-text title, optionally with season/episode (e.g. "The Office S03E10").
    pub query: String,
}

/// Parameters for a candidate search.
#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct SearchParams {
    /// Free-text title to look up.
    pub query: String,
}

// ============================================================================
// MCP Server
// ============================================================================

/// MCP server exposing the watch-check pipeline as tools.
#[derive(Clone)]
pub struct WatchCheckServer {
    pipeline: Arc<WatchCheck>,
    tool_router: ToolRouter<Self>,
}

impl WatchCheckServer {
    pub fn new(pipeline: WatchCheck) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            tool_router: Self::tool_router(),
        }
    }
}

fn to_mcp_error(err: WatchCheckError) -> McpError {
    match err {
        WatchCheckError::InvalidQuery(msg) => McpError::invalid_params(msg, None),
        WatchCheckError::Internal(msg) => McpError::internal_error(msg, None),
    }
}

fn json_content<T: Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    let text = serde_json::to_string_pretty(value).map_err(|e| {
        to_mcp_error(WatchCheckError::Internal(format!(
            "JSON serialization error: {e}"
        )))
    })?;
    Ok(CallToolResult::success(vec![Content::text(text)]))
}

#[tool_handler(router = self.tool_router)]
impl ServerHandler for WatchCheckServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "watch-check".into(),
                title: Some("Watch Check".into()),
                version: env!("CARGO_PKG_VERSION").into(),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Checks whether watching a movie or TV episode risks a holiday song challenge \
                 knockout (Whamageddon, Little Drummer Boy). Use 'watch_check' for a verdict and \
                 'media_search' to see which titles a query resolves to."
                    .into(),
            ),
        }
    }
}

#[tool_router(router = tool_router)]
impl WatchCheckServer {
    /// Assess a title for knockout-song risk.
    #[tool(
        name = "watch_check",
        description = "Resolve a movie/TV title and assess whether watching it risks hearing a holiday challenge knockout song"
    )]
    async fn watch_check(
        &self,
        Parameters(params): Parameters<CheckParams>,
    ) -> Result<CallToolResult, McpError> {
        let result = self
            .pipeline
            .check(&params.query)
            .await
            .map_err(to_mcp_error)?;
        json_content(&result)
    }

    /// List the candidates a query resolves to.
    #[tool(
        name = "media_search",
        description = "List up to 8 ranked movie/TV candidates for a free-text title query"
    )]
    async fn media_search(
        &self,
        Parameters(params): Parameters<SearchParams>,
    ) -> Result<CallToolResult, McpError> {
        let candidates = self
            .pipeline
            .search(&params.query)
            .await
            .map_err(to_mcp_error)?;
        json_content(&candidates)
    }
}

// ============================================================================
// Entry Point
// ============================================================================

/// Run the MCP server on stdio transport.
pub async fn run_mcp_server(pipeline: WatchCheck) -> Result<(), Box<dyn std::error::Error>> {
    let server = WatchCheckServer::new(pipeline);
    let service = server.serve(stdio()).await.map_err(|e| e.to_string())?;
    service.waiting().await.map_err(|e| e.to_string())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assess::AssessmentEngine;
    use crate::candidate::{AssessmentResult, AssessmentSource, MediaCandidate, MediaKind};
    use crate::catalog::mock::{MockPrimary, MockSecondary};
    use crate::diagnostics::NoopDiagnostics;
    use crate::resolver::CandidateResolver;
    use rmcp::model::ErrorCode;

    fn elf() -> MediaCandidate {
        MediaCandidate {
            id: "10719".into(),
            title: "Elf".into(),
            year: "2003".into(),
            kind: MediaKind::Movie,
            artwork_url: "https://image.tmdb.org/t/p/w154/elf.jpg".into(),
            backdrop_url: None,
            description: None,
            source: Some("https://www.themoviedb.org/movie/10719".into()),
            season_number: None,
            episode_number: None,
            original_query: Some("elf".into()),
        }
    }

    fn setup_server(primary: Vec<MediaCandidate>) -> WatchCheckServer {
        let resolver = CandidateResolver::new(
            Arc::new(MockPrimary::new(primary)),
            Arc::new(MockSecondary::default()),
        );
        let engine = AssessmentEngine::new(None, Arc::new(NoopDiagnostics));
        WatchCheckServer::new(WatchCheck::new(resolver, engine))
    }

    fn text_of(result: &CallToolResult) -> String {
        result.content[0].raw.as_text().unwrap().text.clone()
    }

    #[tokio::test]
    async fn test_watch_check_returns_result_json() {
        let server = setup_server(vec![elf()]);

        let result = server
            .watch_check(Parameters(CheckParams {
                query: "elf".into(),
            }))
            .await
            .unwrap();

        let parsed: AssessmentResult = serde_json::from_str(&text_of(&result)).unwrap();
        assert_eq!(parsed.matched.id, "10719");
        assert_eq!(parsed.source, AssessmentSource::Fallback);
        assert!(text_of(&result).contains("\"match\""));
    }

    #[tokio::test]
    async fn test_watch_check_rejects_blank_query() {
        let server = setup_server(vec![]);

        let err = server
            .watch_check(Parameters(CheckParams {
                query: "  ".into(),
            }))
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::INVALID_PARAMS);
        assert!(err.message.contains("Query is required"));
    }

    #[tokio::test]
    async fn test_media_search_lists_candidates() {
        let server = setup_server(vec![elf()]);

        let result = server
            .media_search(Parameters(SearchParams {
                query: "elf".into(),
            }))
            .await
            .unwrap();

        let parsed: Vec<MediaCandidate> = serde_json::from_str(&text_of(&result)).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].title, "Elf");
    }

    #[test]
    fn test_internal_error_mapping() {
        let err = to_mcp_error(WatchCheckError::Internal("boom".into()));
        assert_eq!(err.code, ErrorCode::INTERNAL_ERROR);
        assert_eq!(err.message, "boom");
    }

    #[test]
    fn test_server_info_enables_tools() {
        let info = setup_server(vec![]).get_info();
        assert_eq!(info.server_info.name, "watch-check");
        assert!(info.capabilities.tools.is_some());
    }
}
