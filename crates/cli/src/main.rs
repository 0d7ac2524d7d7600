mod app;
mod logging;
mod strings;

use anyhow::Result;
use providers::copilot::GatewayConfig;
use providers::Gateway;

#[tokio::main]
async fn main() -> Result<()> {
    let _guard = logging::init()?;
    let cfg = GatewayConfig::from_env_and_file()?;
    let gateway = Gateway::from_config(&cfg)?;
    let mut app = app::App::new(cfg);
    app.run(&gateway).await
}
