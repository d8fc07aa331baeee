use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::{error, info};
use raii_file_handle::{ResourceHandle, Result};

/// Walk a file handle through open, read, write and ownership transfer
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// File to open in read + append mode
    #[arg(long, env = "RAII_DEMO_FILE", default_value = "read.txt")]
    file: PathBuf,

    /// Line written through the first handle
    #[arg(long, default_value = "Hello, my friend!")]
    message: String,

    /// Line written through the handle that took ownership
    #[arg(long, default_value = "I'm writing a new line through a new handle!")]
    second_message: String,

    /// Move ownership back into the first handle at the end
    #[arg(long)]
    assign_back: bool,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<()> {
    let mut first = ResourceHandle::try_open(&args.file)?;
    first.read_all()?;
    first.write_line(&args.message)?;

    info!("Moving ownership into a new handle");
    let mut second = ResourceHandle::transfer_from(&mut first);
    second.read_all()?;
    second.write_line(&args.second_message)?;
    second.read_all()?;

    // The emptied handle only reports that it has nothing.
    first.read_all()?;

    if args.assign_back {
        info!("Assigning ownership back to the first handle");
        first.assign_from(&mut second);
        first.read_all()?;
        second.read_all()?;
    }

    info!(
        "Leaving scope: handle [{}] is {:?}, handle [{}] is {:?}",
        first.id(),
        first.state(),
        second.id(),
        second.state()
    );
    Ok(())
}
