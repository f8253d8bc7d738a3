use clap::Parser;
use env_logger::{Builder, Env};
use log::debug;

use saheart_logreg::cli::HeartAppArgs;
use saheart_logreg::pipeline;
use saheart_logreg::HeartAppError;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), HeartAppError> {
    let cli = HeartAppArgs::parse();

    let env = Env::new().filter("CHD_LOG");
    Builder::new()
        .filter(Some("saheart_logreg"), cli.log_level())
        .parse_env(env)
        .init();

    debug!("Arguments {:#?}", cli);

    let report = pipeline::run(cli.into_config()?).await?;
    for line in report.summary_lines() {
        println!("{}", line);
    }

    println!("Time elapsed: {} ms", report.elapsed_ms);
    println!("Memory used: {} bytes", report.memory_bytes);
    debug!("Resident memory: {} bytes", report.resident_bytes);

    Ok(())
}
