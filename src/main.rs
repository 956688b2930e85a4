//! transfer_replay
//!
//! Replays a JSON array of transfer bundles into a wallet and prints the
//! resulting transfers, their directed amounts and the wallet balance.
//!
//! ```text
//! transfer_replay --env dev --bundles fixtures/bundles.json [--address <addr>]... [--json]
//! ```

use anyhow::{Context, bail};
use std::fs;

use wallet_transfer_core::config::AppConfig;
use wallet_transfer_core::logging::init_logging;
use wallet_transfer_core::{TransferBundle, WalletRegistry};

// ============================================================
// ARGUMENTS
// ============================================================

fn get_arg(name: &str, short: Option<&str>) -> Option<String> {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if (args[i] == name || Some(args[i].as_str()) == short) && i + 1 < args.len() {
            return Some(args[i + 1].clone());
        }
    }
    None
}

fn get_all_args(name: &str) -> Vec<String> {
    let args: Vec<String> = std::env::args().collect();
    args.windows(2)
        .filter(|pair| pair[0] == name)
        .map(|pair| pair[1].clone())
        .collect()
}

fn use_json_output() -> bool {
    std::env::args().any(|a| a == "--json")
}

// ============================================================
// MAIN
// ============================================================

fn main() -> anyhow::Result<()> {
    let env = get_arg("--env", Some("-e")).unwrap_or_else(|| "dev".to_string());
    let app_config = AppConfig::load(&env)?;
    let _log_guard = init_logging(&app_config);

    tracing::info!(
        env = %env,
        policy = app_config.transfer.transition_policy.as_str(),
        "Starting transfer replay"
    );

    let Some(bundles_path) = get_arg("--bundles", Some("-b")) else {
        bail!("missing --bundles <file>");
    };
    let content = fs::read_to_string(&bundles_path)
        .with_context(|| format!("Failed to read bundles: {}", bundles_path))?;
    let bundles: Vec<TransferBundle> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse bundles: {}", bundles_path))?;

    let (registry, events) = WalletRegistry::from_config(&app_config.transfer);
    let wallet = registry.create_wallet(app_config.wallet.units.clone());
    for address in app_config
        .wallet
        .addresses
        .iter()
        .cloned()
        .chain(get_all_args("--address"))
    {
        wallet.add_address(address);
    }

    let mut skipped = 0usize;
    for bundle in &bundles {
        if let Err(e) = wallet.recover_transfer(bundle) {
            if e.is_fatal() {
                tracing::error!(hash = %bundle.hash, code = e.code(), error = %e, "Bundle rejected");
            } else {
                tracing::warn!(hash = %bundle.hash, code = e.code(), error = %e, "Bundle skipped");
            }
            skipped += 1;
        }
    }

    let json = use_json_output();
    for transfer in wallet.transfers() {
        let state = transfer.state();
        if json {
            let line = serde_json::json!({
                "id": transfer.id().to_string(),
                "hash": transfer.hash().map(|h| h.to_string()),
                "direction": transfer.direction(),
                "amount_directed": transfer.amount_directed().to_string(),
                "state": &*state,
                "block_time": state.included_info().and_then(|info| info.block_time()),
            });
            println!("{}", line);
        } else {
            println!(
                "{:<26} {:<9} {:>24} {}",
                transfer.id(),
                transfer.direction(),
                transfer.amount_directed().to_string(),
                state
            );
        }
    }

    let balance = wallet.balance()?;
    let drained = events.drain();
    tracing::info!(
        bundles = bundles.len(),
        skipped,
        transfers = wallet.transfer_count(),
        events = drained.len(),
        dropped_events = events.dropped(),
        "Replay finished"
    );
    println!("balance: {}", balance);

    Ok(())
}
