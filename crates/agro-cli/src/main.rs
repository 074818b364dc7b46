//! CLI mínima del pipeline agronómico.
//!
//! Uso:
//!   agro analyze [--crop <NAME>] [--location <TXT>] [--ph <F>] [--n <F>]
//!                [--p <F>] [--k <F>] [--size <RAI>] [--budget <THB>]
//!                [--planting <YYYY-MM-DD>] [--organic] [--json]
//!   agro quick <ph> <n> <p> <k> [--crop <NAME>] [--size <RAI>]

use agro_agents::standard_pipeline;
use agro_core::{AnalysisRequest, FinalReport, InMemoryRunHistory, Orchestrator};

fn main() {
    let _ = dotenvy::dotenv();
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        usage();
        std::process::exit(2);
    }

    let definition = match standard_pipeline() {
        Ok(d) => d,
        Err(e) => {
            eprintln!("[agro] pipeline definition error: {e}");
            std::process::exit(5);
        }
    };
    let mut orchestrator = Orchestrator::new(definition, InMemoryRunHistory::new());

    match args[1].as_str() {
        "analyze" => {
            let mut request = AnalysisRequest::default();
            let mut as_json = false;
            let mut i = 2;
            while i < args.len() {
                match args[i].as_str() {
                    "--crop" => { i += 1; if i < args.len() { request.target_crop = args[i].clone(); } }
                    "--location" => { i += 1; if i < args.len() { request.location = args[i].clone(); } }
                    "--ph" => { i += 1; if i < args.len() { if let Ok(v) = args[i].parse() { request.ph = v; } } }
                    "--n" => { i += 1; if i < args.len() { if let Ok(v) = args[i].parse() { request.nitrogen = v; } } }
                    "--p" => { i += 1; if i < args.len() { if let Ok(v) = args[i].parse() { request.phosphorus = v; } } }
                    "--k" => { i += 1; if i < args.len() { if let Ok(v) = args[i].parse() { request.potassium = v; } } }
                    "--size" => { i += 1; if i < args.len() { if let Ok(v) = args[i].parse() { request.field_size_rai = v; } } }
                    "--budget" => { i += 1; if i < args.len() { request.budget_thb = args[i].parse().ok(); } }
                    "--planting" => { i += 1; if i < args.len() { request.planting_date = Some(args[i].clone()); } }
                    "--texture" => { i += 1; if i < args.len() { request.texture = args[i].clone(); } }
                    "--organic" => { request.prefer_organic = true; }
                    "--json" => { as_json = true; }
                    _ => {}
                }
                i += 1;
            }

            match orchestrator.run(&request) {
                Ok(report) => {
                    if as_json {
                        print_json(&report);
                    } else {
                        print_summary(&report);
                    }
                }
                Err(envelope) => {
                    eprintln!("[agro analyze] {envelope}");
                    for obs in &envelope.observations_collected {
                        eprintln!("  [{}] {}", obs.stage_id, obs.observation);
                    }
                    std::process::exit(4);
                }
            }
        }
        "quick" => {
            if args.len() < 6 {
                eprintln!("Usage: agro quick <ph> <n> <p> <k> [--crop <NAME>] [--size <RAI>]");
                std::process::exit(2);
            }
            let parse = |s: &str| -> f64 {
                s.parse().unwrap_or_else(|_| {
                    eprintln!("[agro quick] not a number: {s}");
                    std::process::exit(2);
                })
            };
            let (ph, n, p, k) = (parse(&args[2]), parse(&args[3]), parse(&args[4]), parse(&args[5]));
            let mut crop: Option<String> = None;
            let mut size = 1.0;
            let mut i = 6;
            while i < args.len() {
                match args[i].as_str() {
                    "--crop" => { i += 1; if i < args.len() { crop = Some(args[i].clone()); } }
                    "--size" => { i += 1; if i < args.len() { if let Ok(v) = args[i].parse() { size = v; } } }
                    _ => {}
                }
                i += 1;
            }

            match orchestrator.quick_run(ph, n, p, k, crop.as_deref(), size) {
                Ok(report) => print_summary(&report),
                Err(envelope) => {
                    eprintln!("[agro quick] {envelope}");
                    std::process::exit(4);
                }
            }
        }
        _ => {
            usage();
            std::process::exit(2);
        }
    }
}

fn usage() {
    eprintln!("Usage: agro <analyze|quick> [options]");
    eprintln!("  agro analyze --crop Corn --ph 6.2 --n 10 --p 8 --k 40 --size 2 --json");
    eprintln!("  agro quick 6.5 25 20 120 --crop \"Riceberry Rice\" --size 3");
}

fn print_json(report: &FinalReport) {
    match serde_json::to_string_pretty(report) {
        Ok(s) => println!("{s}"),
        Err(e) => {
            eprintln!("[agro] serialization error: {e}");
            std::process::exit(5);
        }
    }
}

fn print_summary(report: &FinalReport) {
    println!("session  : {}", report.session_id);
    println!("sample   : {}", report.sample_id);
    println!("pipeline : {}", report.pipeline_hash);
    println!();
    for obs in &report.observations {
        println!("[{}] {}", obs.stage_id, obs.observation);
    }
    println!();
    if let Some(status) = report.report.path("executive_summary.overall_status") {
        let score = report.report
                          .path("executive_summary.overall_score")
                          .and_then(|v| v.as_f64())
                          .unwrap_or(0.0);
        println!("overall  : {} ({score:.0}/100)", status.as_str().unwrap_or("?"));
    }
    if let Some(bottom) = report.report.path("executive_summary.bottom_line") {
        println!("verdict  : {}", bottom.as_str().unwrap_or(""));
    }
}
