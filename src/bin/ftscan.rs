use anyhow::Result;
use clap::Parser;
use filetrack::cli::ScanCli;

fn main() -> Result<()> {
    ScanCli::parse().run()
}
