mod availability;
mod console;
mod error;
mod flows;
mod store;
#[cfg(test)]
mod testutils;
mod types;
mod validators;
mod workbook;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use dotenvy::dotenv;
use tracing_subscriber::EnvFilter;

use crate::console::Console;
use crate::flows::FlowController;
use crate::workbook::SpaWorkbook;

#[derive(Debug, Parser)]
#[command(name = "spa_booking", about = "Interactive booking assistant for the spa")]
struct Args {
    /// Directory holding the spa_info and booking_data worksheets
    #[arg(long, env = "SPA_DATA_DIR", default_value = "data")]
    data_dir: PathBuf,
}

fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let workbook = SpaWorkbook::open(&args.data_dir)?;
    let mut controller = FlowController::new(workbook, Console::stdio());
    controller.run()?;
    Ok(())
}
