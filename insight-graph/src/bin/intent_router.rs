use clap::Parser;
use insight_graph::cli::{run_router, RouterArgs};

fn main() -> anyhow::Result<()> {
    let args = RouterArgs::parse();

    for (question, answer) in run_router(&args.questions())? {
        println!("Q: {}\nA: {}\n", question, answer);
    }
    Ok(())
}
