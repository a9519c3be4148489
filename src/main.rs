use mintwatch::application::owner_worker::OwnerWorkers;
use mintwatch::application::pipeline::{InboundEvent, SignalPipeline};
use mintwatch::config::Config;
use mintwatch::domain::services::autobuy::AutobuyEngine;
use mintwatch::domain::services::custody::WalletCustodyManager;
use mintwatch::domain::services::fee_collector::FeeCollector;
use mintwatch::domain::services::ledger::PositionLedger;
use mintwatch::domain::services::policy_store::PolicyStore;
use mintwatch::domain::services::swap_engine::SwapExecutor;
use mintwatch::domain::services::tracker::SubscriptionTracker;
use mintwatch::infrastructure::jupiter::JupiterClient;
use mintwatch::infrastructure::keystore::Keystore;
use mintwatch::infrastructure::market_data::DexScreenerClient;
use mintwatch::infrastructure::notifier::{LogNotifier, RetryingNotifier};
use mintwatch::infrastructure::solana_rpc::SolanaRpcClient;
use mintwatch::persistence::store::JsonStore;
use mintwatch::secrets;
use serde::Deserialize;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Wire shape of one inbound chat message on stdin, one JSON object per line.
#[derive(Deserialize)]
struct InboundLine {
    group_id: i64,
    sender: String,
    text: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mintwatch=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    info!(rpc = %config.rpc_url, data_dir = %config.data_dir.display(), "mintwatch starting");

    // The wallet key guards every custodial secret at rest. Refusing to start
    // without it beats silently orphaning previously sealed wallets.
    let key_material = secrets::load_wallet_key()?;
    let keystore = Arc::new(Keystore::from_key_material(&key_material)?);
    drop(key_material);

    tokio::fs::create_dir_all(&config.data_dir).await?;
    let subscriptions_store = JsonStore::new(config.data_dir.join("subscriptions.json"));
    let wallets_store = JsonStore::new(config.data_dir.join("wallets.json"));
    let policies_store = JsonStore::new(config.data_dir.join("autobuy.json"));
    let positions_store = JsonStore::new(config.data_dir.join("positions.json"));

    let rpc = Arc::new(SolanaRpcClient::new(config.rpc_url.clone()));
    let custody = Arc::new(
        WalletCustodyManager::load(wallets_store, keystore, rpc.clone()).await?,
    );
    let ledger = Arc::new(PositionLedger::load(positions_store).await?);
    let policies = Arc::new(PolicyStore::load(policies_store).await?);
    let tracker = Arc::new(SubscriptionTracker::load(subscriptions_store).await?);

    let aggregator = Arc::new(JupiterClient::new(
        config.aggregator_url.clone(),
        config.retry.clone(),
    ));
    let market_data = Arc::new(DexScreenerClient::new(
        config.market_data_url.clone(),
        config.retry.clone(),
    ));
    let notifier = Arc::new(RetryingNotifier::new(
        LogNotifier,
        config.notifier_sends_per_minute,
        config.retry.clone(),
    ));

    let swaps = Arc::new(SwapExecutor::new(
        custody.clone(),
        aggregator,
        rpc.clone(),
        ledger.clone(),
    ));
    let fees = Arc::new(FeeCollector::new(
        custody.clone(),
        rpc,
        ledger,
        config.fee.clone(),
    ));
    let engine = Arc::new(AutobuyEngine::new(
        policies.clone(),
        custody,
        swaps,
        fees,
        config.limits.clone(),
    ));
    let workers = Arc::new(OwnerWorkers::new(engine));
    let pipeline = Arc::new(SignalPipeline::new(
        tracker,
        market_data,
        notifier,
        policies,
        workers.clone(),
    ));

    info!("mintwatch ready, reading inbound events from stdin");

    // Inbound source stand-in: one JSON event per line. The real chat
    // transport plugs in here and feeds the same pipeline.
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line? {
                    Some(raw) if !raw.trim().is_empty() => {
                        let parsed: InboundLine = match serde_json::from_str(&raw) {
                            Ok(parsed) => parsed,
                            Err(e) => {
                                warn!(error = %e, "malformed inbound line, skipping");
                                continue;
                            }
                        };
                        let event = InboundEvent {
                            group_id: parsed.group_id,
                            sender_identity: parsed.sender,
                            text: parsed.text,
                        };
                        let pipeline = pipeline.clone();
                        tokio::spawn(async move {
                            pipeline.handle_event(event).await;
                        });
                    }
                    Some(_) => continue,
                    None => break,
                }
            }
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    error!(error = %e, "failed to listen for shutdown signal");
                }
                break;
            }
        }
    }

    info!("mintwatch shutting down");
    workers.shutdown().await;
    Ok(())
}
