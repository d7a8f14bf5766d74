//! Deploy a safety module to Casper livenet/testnet using Odra livenet environment.
//!
//! Usage:
//!   cargo run --bin deploy_livenet --release
//!
//! Requires .env file with:
//!   ODRA_CASPER_LIVENET_SECRET_KEY_PATH=/path/to/secret_key.pem
//!   ODRA_CASPER_LIVENET_NODE_ADDRESS=https://node.testnet.casper.network
//!   ODRA_CASPER_LIVENET_CHAIN_NAME=casper-test
//!   ODRA_CASPER_LIVENET_PAYMENT_AMOUNT=200000000000
//!   SAFETY_MODULE_RESERVE_ASSET=hash-...        (CEP-18 reserve asset)
//!   SAFETY_MODULE_TRIGGER=hash-...              (trigger contract)
//!   SAFETY_MODULE_PAYOUT_HANDLER=account-hash-...
//!
//! Optional:
//!   SAFETY_MODULE_PAUSER (defaults to the deployer)
//!   SAFETY_MODULE_DRIP_RATE_ZOC (defaults to 500, 5% per year)
//!   SAFETY_MODULE_DEPLOYMENT_FILE (defaults to deployment.json)

use std::str::FromStr;

use odra::host::{Deployer, HostRef};
use odra::prelude::*;
use serde::Serialize;

use safety_module_contracts::drip_model::{LinearDripModel, LinearDripModelInitArgs};
use safety_module_contracts::manager::{SafetyModuleManager, SafetyModuleManagerInitArgs};
use safety_module_contracts::math::wad;
use safety_module_contracts::safety_module::{SafetyModule, SafetyModuleInitArgs};
use safety_module_contracts::types::{Delays, ReservePoolConfig, TriggerConfig, UpdateConfigsParams};

/// Written next to the binary once every contract is live
#[derive(Serialize)]
struct DeploymentRecord {
    deployer: String,
    drip_model: String,
    manager: String,
    safety_module: String,
    reserve_asset: String,
    trigger: String,
    payout_handler: String,
}

fn env_address(name: &str) -> Option<Address> {
    std::env::var(name).ok().and_then(|v| Address::from_str(&v).ok())
}

fn required_address(name: &str) -> Address {
    match env_address(name) {
        Some(address) => address,
        None => panic!("{} must be set to a valid address", name),
    }
}

fn main() {
    // Load environment from .env file
    dotenv::dotenv().ok();

    println!("=== Safety Module Livenet Deployment ===");
    println!();

    // Initialize Odra livenet environment
    let env = odra_casper_livenet_env::env();

    // Configure payment amount for deployments/calls (required for Casper 2.0 txs)
    let payment_amount: u64 = std::env::var("ODRA_CASPER_LIVENET_PAYMENT_AMOUNT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(200_000_000_000);
    env.set_gas(payment_amount);

    let deployer = env.caller();
    println!("Deployer: {:?}", deployer);
    println!();

    let reserve_asset = required_address("SAFETY_MODULE_RESERVE_ASSET");
    let trigger = required_address("SAFETY_MODULE_TRIGGER");
    let payout_handler = required_address("SAFETY_MODULE_PAYOUT_HANDLER");
    let pauser = env_address("SAFETY_MODULE_PAUSER").unwrap_or(deployer);
    let drip_rate_zoc: u32 = std::env::var("SAFETY_MODULE_DRIP_RATE_ZOC")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(500);

    // Module parameters
    let allowed_reserve_pools: u32 = 8;
    let delays = Delays {
        config_update_delay: 2 * 24 * 60 * 60,       // 2 days
        config_update_grace_period: 24 * 60 * 60,     // 1 day
        withdraw_delay: 7 * 24 * 60 * 60,             // 7 days
    };

    // ==================== Phase 1: Shared Contracts ====================
    println!("=== Phase 1: Deploying Shared Contracts ===");
    println!();

    println!("Deploying LinearDripModel...");
    let drip_model = LinearDripModel::deploy(
        &env,
        LinearDripModelInitArgs {
            annual_rate_zoc: drip_rate_zoc,
        },
    );
    let drip_model_addr = drip_model.address().clone();
    println!("LinearDripModel deployed at: {:?}", drip_model_addr);

    println!("Deploying SafetyModuleManager...");
    let mut manager = SafetyModuleManager::deploy(
        &env,
        SafetyModuleManagerInitArgs {
            owner: deployer,
            pauser,
        },
    );
    let manager_addr = manager.address().clone();
    println!("SafetyModuleManager deployed at: {:?}", manager_addr);
    println!();

    // ==================== Phase 2: Safety Module ====================
    println!("=== Phase 2: Deploying Safety Module ===");
    println!();

    let configs = UpdateConfigsParams {
        reserve_pool_configs: vec![ReservePoolConfig {
            max_slash_percentage: wad() / 2, // 50%
            asset: reserve_asset,
        }],
        trigger_config_updates: vec![TriggerConfig {
            trigger,
            payout_handler,
            exists: true,
        }],
        delays_config: delays,
    };

    println!("Deploying SafetyModule...");
    let safety_module = SafetyModule::deploy(
        &env,
        SafetyModuleInitArgs {
            manager: manager_addr,
            owner: deployer,
            pauser,
            fee_drip_model: drip_model_addr,
            allowed_reserve_pools,
            configs,
        },
    );
    let safety_module_addr = safety_module.address().clone();
    println!("SafetyModule deployed at: {:?}", safety_module_addr);

    println!("Registering SafetyModule with manager...");
    manager.register_safety_module(safety_module_addr);
    println!("Done.");

    println!();
    println!("=== Deployment Complete ===");
    println!();
    println!("Contract Addresses:");
    println!("  LinearDripModel:     {:?}", drip_model_addr);
    println!("  SafetyModuleManager: {:?}", manager_addr);
    println!("  SafetyModule:        {:?}", safety_module_addr);

    let record = DeploymentRecord {
        deployer: format!("{:?}", deployer),
        drip_model: format!("{:?}", drip_model_addr),
        manager: format!("{:?}", manager_addr),
        safety_module: format!("{:?}", safety_module_addr),
        reserve_asset: format!("{:?}", reserve_asset),
        trigger: format!("{:?}", trigger),
        payout_handler: format!("{:?}", payout_handler),
    };
    let path = std::env::var("SAFETY_MODULE_DEPLOYMENT_FILE").unwrap_or_else(|_| String::from("deployment.json"));
    match serde_json::to_string_pretty(&record) {
        Ok(json) => match std::fs::write(&path, json) {
            Ok(()) => println!("Deployment record written to {}", path),
            Err(err) => println!("Could not write {}: {}", path, err),
        },
        Err(err) => println!("Could not serialize deployment record: {}", err),
    }
}
