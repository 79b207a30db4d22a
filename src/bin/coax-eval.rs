//! Scenario-batch evaluation runner.
//!
//! Runs the fixed example requests against a local text-generation model
//! and prints per-request outcome and elapsed time. The exit code does not
//! distinguish outcomes; the output is the report.

use std::process;
use std::time::{Duration, Instant};

use clap::Parser;

use coax::generate::ModelRunner;
use coax::pipeline::{Outcome, Pipeline};
use coax::retrieval::SnippetStore;

#[derive(Parser, Debug)]
#[command(
    name = "coax-eval",
    about = "Run the fixed evaluation scenarios against a local text-generation model"
)]
struct Args {
    /// Model name passed to the generation executable
    #[arg(long)]
    model: String,

    /// Generation executable to invoke (receives `run <model>` and the
    /// prompt on stdin)
    #[arg(long, default_value = "ollama")]
    executable: String,

    /// Per-request generation timeout in seconds
    #[arg(long, default_value_t = 180)]
    timeout_secs: u64,

    /// Number of schema snippets to retrieve per request
    #[arg(long, default_value_t = 8)]
    top_k: usize,
}

const SCENARIOS: &[(&str, &str)] = &[
    (
        "S1_cluster",
        "Create a CPU cluster named C1 with frequency 2000 MHz and 4 cores per cluster.",
    ),
    (
        "S2_chiplet",
        "Add a GPU chiplet G1 with AXI bus width 64 bytes, frequency 1000000 Hz, ethernet \
         interface simulated, and ucie interface in host mode.",
    ),
    (
        "S3_cluster",
        "Create another CPU cluster named C2 with frequency 1500 MHz and 2 cores per cluster.",
    ),
    (
        "S4_chiplet_multi",
        "Create an NPU chiplet N1 with AXI bus width 128 bytes, frequency 2000000 Hz, ethernet \
         disabled, and ucie in endpoint mode.",
    ),
];

fn main() {
    env_logger::init();
    let args = Args::parse();

    let runner = match ModelRunner::with_executable(
        &args.executable,
        vec!["run".to_string(), args.model.clone()],
    ) {
        Ok(runner) => runner,
        Err(e) => {
            // no generator, no run
            eprintln!("{e}");
            process::exit(2);
        }
    };

    let pipeline = Pipeline::new(SnippetStore::with_builtin_docs(), runner)
        .with_timeout(Duration::from_secs(args.timeout_secs))
        .with_top_k(args.top_k);

    println!("Testing model: {}\n", args.model);
    for (label, query) in SCENARIOS {
        println!("--- {label} ---");
        let started = Instant::now();
        match pipeline.run(query) {
            Ok(Outcome::Validated { type_name, record }) => {
                println!("Validated -> {type_name}");
                println!(
                    "{}",
                    serde_json::to_string_pretty(&record).unwrap_or_else(|_| record.to_string())
                );
            }
            Ok(Outcome::Unvalidated { raw }) => {
                println!("Validation failed, raw data:");
                println!(
                    "{}",
                    serde_json::to_string_pretty(&raw).unwrap_or_else(|_| raw.to_string())
                );
            }
            Err(e) => println!("Request failed: {e}"),
        }
        println!("Time: {:.2}s\n", started.elapsed().as_secs_f64());
    }
}
