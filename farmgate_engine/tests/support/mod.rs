#![allow(dead_code)]
use farmgate_engine::{
    events::EventProducers,
    test_utils::{prepare_test_env, random_db_path, Marketplace, ScriptedGateway},
    SettlementApi,
    SettlementConfig,
    SettlementDatabase,
    SqliteDatabase,
};
use log::*;
use sqlx::{migrate::MigrateDatabase, Sqlite};

pub type TestApi = SettlementApi<SqliteDatabase, ScriptedGateway>;

pub struct TestSystem {
    pub api: TestApi,
    pub gateway: ScriptedGateway,
    pub market: Marketplace,
}

pub async fn setup() -> TestSystem {
    setup_with(SettlementConfig::default(), EventProducers::default()).await
}

pub async fn setup_with(config: SettlementConfig, producers: EventProducers) -> TestSystem {
    let url = random_db_path();
    prepare_test_env(&url).await;
    let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database");
    let market = Marketplace::new(db.clone()).await;
    let gateway = ScriptedGateway::new();
    let api = SettlementApi::new(db, gateway.clone(), config, producers);
    TestSystem { api, gateway, market }
}

pub async fn tear_down(system: TestSystem) {
    let db = system.api.db().clone();
    drop(system);
    remove_database(db).await;
}

pub async fn remove_database(mut db: SqliteDatabase) {
    let url = db.url().to_string();
    if let Err(e) = db.close().await {
        error!("🚀️ Failed to close database: {e}");
    }
    if let Err(e) = Sqlite::drop_database(&url).await {
        warn!("🚀️ Could not remove test database {url}: {e}");
    }
}

pub async fn count_commissions(db: &SqliteDatabase) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM commissions").fetch_one(db.pool()).await.expect("Error counting commissions")
}
