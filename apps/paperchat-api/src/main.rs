use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;
	let args = paperchat_api::Args::parse();
	paperchat_api::run(args).await
}
