// This main function is the entry point when running `cargo run -p web-server`.
// It serves the API with the configuration from the working directory.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = configuration::load_settings(None)?;
    let _guard = configuration::init_tracing(&settings.logging)?;
    web_server::run_server(&settings).await
}
