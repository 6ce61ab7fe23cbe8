//! walletcore 演示入口
//! 创建账户与钱包凭证簇，列出可添加的链并绑定第一条

use std::sync::Arc;

use anyhow::Result;
use walletcore::{
    config::Config,
    domain::{AddressRole, ChainRegistry},
    infrastructure::logging,
    repository::InMemoryEngine,
    AppState,
};

#[tokio::main]
async fn main() -> Result<()> {
    // 1. 加载环境变量与配置文件
    dotenvy::dotenv().ok();
    let config = Config::from_env_and_file(std::env::var("CONFIG_PATH").ok())?;
    config.validate()?;

    // 2. 初始化日志
    if let Err(e) = logging::init_logging(&config.logging) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    // 3. 组装 Engine 与服务
    let registry = ChainRegistry::from_config(&config.engine);
    if let Err(errors) = registry.validate_configs() {
        anyhow::bail!("Invalid chain catalog: {:?}", errors);
    }
    let engine = Arc::new(InMemoryEngine::new(registry));
    let account = engine.create_account("Main").await;
    let cluster = engine
        .create_cluster(&account.id, AddressRole::Wallet, None)
        .await?;

    let state = AppState::new(config, engine.clone()).await;
    // 第一条可用的链（目录可能通过配置禁用了任意链）
    let wallet = state.binding.bind_default_chain(&cluster.id).await?;

    // 4. "添加链"流程
    let candidates = state.chains.list_eth_chains(&wallet.id).await?;
    for chain in &candidates {
        tracing::info!(chain_id = chain.chain_id, name = %chain.display_name, "Chain available");
    }
    let added = state
        .binding
        .add_selected_chain(&wallet.id, candidates.first().map(|c| c.chain_id))
        .await?;
    if let Some(address) = added {
        tracing::info!(address = %address.address, chain = %address.chain_display_name, "Chain added");
    }

    for address in state.projection.wallets(&account.id).await? {
        println!("{}\t{}\t{}", address.chain_display_name, address.address, address.id);
    }

    Ok(())
}
