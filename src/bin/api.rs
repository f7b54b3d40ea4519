use flight_agent_orchestrator::{
    agent::Orchestrator,
    api::start_server,
    audit::RequestLog,
    classifier::RuleClassifier,
    config::{FlightApiConfig, RetryPolicy},
    explainer::ExplainerAgent,
    flight_api::{FlightApi, HttpFlightApi, StaticFlightApi},
    query::QueryAgent,
};
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    // Load environment variables
    dotenv::dotenv().ok();

    let api_port: u16 = std::env::var("PORT")
        .or_else(|_| std::env::var("API_PORT"))
        .unwrap_or_else(|_| "8080".to_string())
        .parse()?;

    info!("Flight Agent Orchestrator - API Server");
    info!("Port: {}", api_port);

    // Transport: real client when configured, fixture otherwise
    let flight_api: Arc<dyn FlightApi> = match FlightApiConfig::from_env() {
        Some(config) => {
            info!(base_url = %config.base_url, "Using HTTP flight API client");
            Arc::new(HttpFlightApi::new(config))
        }
        None => {
            warn!("FLIGHT_API_* not set - falling back to fixture flight data");
            Arc::new(StaticFlightApi::with_sample_offers())
        }
    };

    // Create components
    let classifier = Box::new(RuleClassifier::new());
    let query_agent = QueryAgent::with_policy(flight_api, RetryPolicy::from_env());
    let explainer = ExplainerAgent::new();

    let orchestrator = Arc::new(Orchestrator::new(classifier, query_agent, explainer));
    let request_log = Arc::new(RequestLog::new());

    info!("Orchestrator initialized");
    info!("Starting API server...");

    start_server(orchestrator, request_log, api_port).await?;

    Ok(())
}
