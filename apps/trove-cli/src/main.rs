use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = trove_cli::Args::parse();

	trove_cli::run(args).await
}
