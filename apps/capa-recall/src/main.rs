use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = capa_recall::Args::parse();

	capa_recall::run(args).await
}
