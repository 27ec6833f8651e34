use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use memberhub::{Environment, ProxyConfig};

fn main() -> anyhow::Result<()> {
    // Init logging
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;
    fmt().with_env_filter(filter).init();

    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "<unset>".to_string());
    let config = ProxyConfig::from_env()?;
    info!(
        target: "memberhub",
        "memberhub starting: RUST_LOG='{}', locale={}, storage_dir='{}', internal_access={}",
        rust_log, config.locale, config.storage_dir.display(), config.internal_access
    );

    let env = Environment::from_config(config)?;
    println!("realm: {}", env.backend.realm());
    for op in env.backend.operations() {
        let d = op.descriptor();
        let exposure = match (d.public, d.internal) {
            (false, _) => "private",
            (true, true) => "internal",
            (true, false) => "public",
        };
        println!("  {:<28} {}", op.name(), exposure);
    }
    for name in &env.config.passthrough {
        let present = env.backend.utility(name).is_some();
        println!("  {:<28} passthrough{}", name, if present { "" } else { " (not registered)" });
    }
    Ok(())
}
