use clap::Parser;
use insight_graph::cli::{run_analyst, Args};
use insight_graph::config::PipelineConfig;

fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let args = Args::parse();
    let config = PipelineConfig::from_env()?;

    let message = run_analyst(&config, &args.question)?;
    println!("\n=== Agent Reply ===\n{}", message);
    Ok(())
}
