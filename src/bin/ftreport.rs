use anyhow::Result;
use clap::Parser;
use filetrack::cli::ReportCli;

fn main() -> Result<()> {
    ReportCli::parse().run()
}
