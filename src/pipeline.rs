//! Content pipeline: crew run, then extraction into the response body.
//!
//! A crew that failed to build leaves the pipeline unavailable; requests
//! still get a well-formed error response.

use std::collections::HashMap;
use std::sync::Arc;

use crate::crew::Crew;
use crate::crews::graph::CrewConfigError;
use crate::llms::base_llm::{BaseLLM, LLMConfig};
use crate::project::{CrewBuilder, CrewDefinition};
use crate::tools::registry::ToolRegistry;
use crate::types::api::{BlogRequest, BlogResponse};
use crate::utilities::converter::extract_blog_record;

#[derive(Debug)]
pub struct ContentPipeline {
    crew: Result<Crew, CrewConfigError>,
}

impl ContentPipeline {
    pub fn new(crew: Crew) -> Self {
        Self { crew: Ok(crew) }
    }

    /// Build the crew from `definition`; a configuration error is logged and
    /// kept so every request answers with the failure response.
    pub fn from_definition(
        definition: &CrewDefinition,
        tools: &ToolRegistry,
        llm: Arc<dyn BaseLLM>,
        llm_config: LLMConfig,
    ) -> Self {
        let crew = CrewBuilder::new(definition, tools, llm, llm_config).build();
        match &crew {
            Ok(crew) => log::info!("Crew initialized with layers {:?}", crew.graph().layer_names()),
            Err(e) => log::error!("Failed to initialize crew: {e}"),
        }
        Self { crew }
    }

    pub fn is_ready(&self) -> bool {
        self.crew.is_ok()
    }

    /// Template inputs for a request.
    pub fn inputs(request: &BlogRequest) -> HashMap<String, String> {
        HashMap::from([
            ("topic".to_string(), request.topic.trim().to_string()),
            ("tone".to_string(), request.tone.to_string()),
            ("platform_guidelines".to_string(), request.platform_guidelines.clone()),
        ])
    }

    /// Run the crew for `request`. Never fails: errors become the generic
    /// failure response.
    pub async fn generate(&self, request: &BlogRequest) -> BlogResponse {
        let crew = match &self.crew {
            Ok(crew) => crew,
            Err(e) => {
                log::error!("Content pipeline unavailable: {e}");
                return BlogResponse::failure();
            }
        };

        match crew.kickoff(&Self::inputs(request)).await {
            Ok(output) => {
                log::info!("Crew pipeline completed successfully");
                let extraction = extract_blog_record(&output.to_value());
                log::debug!("Blog record extracted at stage {:?}", extraction.stage);
                BlogResponse::success(extraction.record)
            }
            Err(e) => {
                log::error!("Crew pipeline failed: {e}");
                BlogResponse::failure()
            }
        }
    }
}
