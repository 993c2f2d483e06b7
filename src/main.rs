use std::{env, io, process};

use client_sampler::simulation::{self, RunSpec};
use log::info;

fn main() -> io::Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <run.json>", args[0]);
        process::exit(1);
    }

    let spec = RunSpec::load(&args[1])?;
    let mut sampler = simulation::build_sampler(&spec)?;
    let reports = simulation::simulate(&spec, &mut sampler)?;

    info!("finished {} rounds", reports.len());

    let summary = serde_json::json!({
        "rounds": reports,
        "data_info": sampler.data_info(),
        "metrics": sampler.all_metrics(),
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(())
}
