use std::path::PathBuf;
use std::sync::Arc;

use gridgate::{server, tasks, AppState, ProxyConfig};
use gridgate_rpc::{GridConscience, GridContainer, GridDirectory, RpcChannel};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = match ProxyConfig::load(config_path.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "configuration failure");
            std::process::exit(1);
        }
    };
    tracing::info!(
        ns = %config.namespace,
        conscience = %config.conscience,
        "resolver limits high[{}/{}] low[{}/{}]",
        config.high_max,
        config.high_ttl_secs,
        config.low_max,
        config.low_ttl_secs,
    );

    let channel = Arc::new(RpcChannel::new(config.rpc_timeouts()));
    let conscience = Arc::new(GridConscience::new(&config.conscience, channel.clone()));
    let directory = Arc::new(GridDirectory::new(channel.clone()));
    let container = Arc::new(GridContainer::new(channel));
    let state = AppState::new(config, conscience, directory, container);

    // Populate caches and snapshots before the first request.
    let queues = tasks::build(&state);
    queues.fire().await;
    let handles = queues.run();

    let served = tokio::select! {
        r = server::serve(state) => r,
        _ = tokio::signal::ctrl_c() => Ok(()),
    };

    for handle in &handles {
        handle.stop();
    }
    for handle in handles {
        handle.join().await;
    }

    if let Err(e) = served {
        tracing::error!(error = %e, "server failure");
        std::process::exit(1);
    }
}
