//! fbcorpus CLI: single-thread smoke run of the extraction pipeline.
//!
//! Seeds one thread URL, runs the extract, slice, build and QA stages in
//! order, and reports how many rows the corpus ended up with.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;
use fbcorpus_shared::FbCorpusError;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);

    if let Err(report) = commands::run(cli).await {
        // Stage failures exit with the stage's own code.
        let code = report
            .downcast_ref::<FbCorpusError>()
            .map(FbCorpusError::exit_code)
            .unwrap_or(1);
        eprintln!("Error: {report:?}");
        std::process::exit(code);
    }

    Ok(())
}
