// crates.io
use clap::Parser;
// self
use strand_eval::Args;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;
	let args = Args::parse();
	strand_eval::run(args).await
}
