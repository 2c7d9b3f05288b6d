use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;
	let args = paperchat_worker::Args::parse();
	paperchat_worker::run(args).await
}
