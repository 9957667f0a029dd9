use cucumber::given;
use farmgate_engine::SettlementConfig;

use crate::cucumber::{SettlementSystem, SettlementWorld};

#[given("a fresh install")]
async fn fresh_database(world: &mut SettlementWorld) {
    let system = SettlementSystem::new(SettlementConfig::default()).await;
    world.system = Some(system);
}

#[given("a fresh install in test mode")]
async fn fresh_database_test_mode(world: &mut SettlementWorld) {
    let config = SettlementConfig { test_mode: true, ..Default::default() };
    let system = SettlementSystem::new(config).await;
    world.system = Some(system);
}
