use flight_agent_orchestrator::{
    agent::Orchestrator,
    classifier::RuleClassifier,
    explainer::ExplainerAgent,
    flight_api::StaticFlightApi,
    models::Request,
    query::QueryAgent,
};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    info!("Flight Agent Orchestrator starting");

    // Create components against the fixture transport
    let classifier = Box::new(RuleClassifier::new());
    let query_agent = QueryAgent::new(Arc::new(StaticFlightApi::with_sample_offers()));
    let explainer = ExplainerAgent::new();

    let orchestrator = Orchestrator::new(classifier, query_agent, explainer);

    let samples = [
        "Find flights from ARN to LHR tomorrow",
        "book a flight",
        "what's the weather",
    ];

    for text in samples {
        let request = Request {
            query_text: text.to_string(),
            requester_id: "demo-user".to_string(),
            conversation_id: Uuid::new_v4().to_string(),
        };

        info!(query = %request.query_text, "Running orchestrator");

        println!("\n=== QUERY: {} ===", request.query_text);
        match orchestrator.handle(&request).await {
            Ok(explanation) => {
                println!("{}", explanation.text);
                if !explanation.follow_ups.is_empty() {
                    println!("\nYou could also:");
                    for follow_up in &explanation.follow_ups {
                        println!("  - {}", follow_up);
                    }
                }
            }
            Err(report) => {
                println!("({:?}) {}", report.kind, report.message);
            }
        }
    }

    Ok(())
}
