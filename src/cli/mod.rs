use std::fs::canonicalize;
use std::path::PathBuf;

use clap::Parser;

use crate::blocks::ladder::parse_ladder_config;
use crate::cli::args::Args;
use crate::cli::progress::StepContext;
use crate::plan::{execute_plan, generate_plan, ExecutePlanParams, TaskKey};

pub mod args;
pub mod progress;

pub const BANNER: &str = r"
       _               _           _     _
  _ __(_)_ __   __ _  | | __ _  __| | __| | ___ _ __
 | '__| | '_ \ / _` | | |/ _` |/ _` |/ _` |/ _ \ '__|
 | |  | | | | | (_| | | | (_| | (_| | (_| |  __/ |
 |_|  |_|_| |_|\__, | |_|\__,_|\__,_|\__,_|\___|_|
               |___/

RINGLADDER v0.1
";

pub fn run() -> anyhow::Result<()> {
    let args = Args::parse();

    let config_path = canonicalize(&args.config)?;

    println!("{BANNER}");

    println!("Reading configuration file...\n");
    let config = parse_ladder_config(&config_path)?;

    println!("Configuration file: {:?}", &config_path);
    println!("Ladder parameters:");
    println!("\tName: {}", config.name);
    println!("\tRadii: {:?}", config.radii);
    println!("\tGaps: {:?}", config.gaps);
    println!("\tStage distance: {}", config.stage_distance);
    println!("\tPads: {}", config.num_pads);

    let mut ctx = StepContext::new();

    let plan = ctx.check(generate_plan(&config))?;
    ctx.finish(TaskKey::GeneratePlan);

    let work_dir = if let Some(output_dir) = args.output_dir {
        output_dir
    } else {
        PathBuf::from(plan.ladder_params.name.as_str())
    };
    std::fs::create_dir_all(&work_dir)?;
    let work_dir = canonicalize(work_dir)?;

    let res = execute_plan(ExecutePlanParams {
        work_dir: &work_dir,
        plan: &plan,
        pretty: !args.compact,
        ctx: Some(&mut ctx),
    });

    let layout_path = ctx.check(res)?;
    println!("Layout saved to: {:?}\n", &layout_path);

    Ok(())
}
