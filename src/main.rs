use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    emotion_kiosk_lib::run(emotion_kiosk_lib::cli::Args::parse()).await
}
