use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = strand_api::Args::parse();

	strand_api::run(args).await
}
