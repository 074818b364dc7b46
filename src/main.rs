//! Corrida de demostración: ejecuta el pipeline estándar contra dos
//! escenarios (maíz en suelo pobre, arroz orgánico) y un fallo controlado.

use agro_agents::standard_pipeline;
use agro_core::{AnalysisRequest, InMemoryRunHistory, Orchestrator, RunHistory};

fn main() {
    let _ = dotenvy::dotenv();
    env_logger::init();

    let definition = match standard_pipeline() {
        Ok(d) => d,
        Err(e) => {
            eprintln!("[demo] pipeline definition error: {e}");
            std::process::exit(5);
        }
    };
    println!("pipeline hash: {}", definition.definition_hash);
    let mut orchestrator = Orchestrator::new(definition, InMemoryRunHistory::new());

    // Escenario 1: maíz en suelo empobrecido.
    let corn = AnalysisRequest { location: "Mueang Phrae, Phrae Province".to_string(),
                                 target_crop: "Corn".to_string(),
                                 ph: 6.2,
                                 nitrogen: 10.0,
                                 phosphorus: 8.0,
                                 potassium: 40.0,
                                 field_size_rai: 2.0,
                                 texture: "silty clay loam".to_string(),
                                 planting_date: Some("2026-06-15".to_string()),
                                 ..AnalysisRequest::default() };
    run_scenario(&mut orchestrator, "corn on depleted soil", &corn);

    // Escenario 2: arroz riceberry orgánico en temporada de lluvias.
    let rice = AnalysisRequest { target_crop: "Riceberry Rice".to_string(),
                                 ph: 5.8,
                                 prefer_organic: true,
                                 field_size_rai: 5.0,
                                 planting_date: Some("2026-05-15".to_string()),
                                 ..AnalysisRequest::default() };
    run_scenario(&mut orchestrator, "organic riceberry", &rice);

    // Escenario 3: cultivo desconocido, el pipeline se detiene en biología.
    let unknown = AnalysisRequest { target_crop: "Durian".to_string(),
                                    ..AnalysisRequest::default() };
    println!("\n=== scenario: unknown crop (expected halt) ===");
    match orchestrator.run(&unknown) {
        Ok(_) => eprintln!("[demo] unexpected success"),
        Err(envelope) => {
            println!("halted: {envelope}");
            println!("observations before the halt: {}",
                     envelope.observations_collected.len());
        }
    }

    println!("\nruns kept in history: {}", orchestrator.history().len());
}

fn run_scenario(orchestrator: &mut Orchestrator<InMemoryRunHistory>, label: &str,
                request: &AnalysisRequest) {
    println!("\n=== scenario: {label} ===");
    match orchestrator.run(request) {
        Ok(report) => {
            println!("session {} / sample {}", report.session_id, report.sample_id);
            for obs in &report.observations {
                println!("  [{}] {}", obs.stage_id, obs.observation);
            }
            if let Some(score) = report.report
                                       .path("executive_summary.overall_score")
                                       .and_then(|v| v.as_f64())
            {
                println!("  overall score: {score:.1}/100");
            }
        }
        Err(envelope) => eprintln!("[demo] {label} failed: {envelope}"),
    }
}
