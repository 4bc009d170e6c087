use anyhow::Result;
use clap::Parser;
use filetrack::cli::FindCli;

fn main() -> Result<()> {
    FindCli::parse().run()
}
