use std::collections::HashMap;

use cucumber::World;
use farmgate_engine::{
    db_types::{Listing, Partner, User},
    events::EventProducers,
    test_utils::{create_database, random_db_path, run_migrations, Marketplace, ScriptedGateway, SeededOrder},
    SettlementApi,
    SettlementConfig,
    SettlementError,
    SettlementResult,
    SqliteDatabase,
};
use log::*;

#[derive(Default, Debug, World)]
pub struct SettlementWorld {
    pub system: Option<SettlementSystem>,
    pub farmers: HashMap<String, User>,
    pub partners: HashMap<String, Partner>,
    pub listings: HashMap<String, Listing>,
    pub orders: HashMap<String, SeededOrder>,
    pub results: Vec<Result<SettlementResult, SettlementError>>,
}

#[derive(Debug)]
pub struct SettlementSystem {
    pub db_path: String,
    pub api: SettlementApi<SqliteDatabase, ScriptedGateway>,
    pub gateway: ScriptedGateway,
    pub market: Marketplace,
}

impl SettlementWorld {
    pub fn system(&self) -> &SettlementSystem {
        self.system.as_ref().expect("Settlement system not initialised")
    }

    pub fn system_mut(&mut self) -> &mut SettlementSystem {
        self.system.as_mut().expect("Settlement system not initialised")
    }

    pub fn api(&self) -> &SettlementApi<SqliteDatabase, ScriptedGateway> {
        &self.system().api
    }

    pub fn farmer(&self, name: &str) -> &User {
        self.farmers.get(name).unwrap_or_else(|| panic!("No farmer called {name}"))
    }

    pub fn partner(&self, name: &str) -> &Partner {
        self.partners.get(name).unwrap_or_else(|| panic!("No partner called {name}"))
    }

    pub fn listing(&self, name: &str) -> &Listing {
        self.listings.get(name).unwrap_or_else(|| panic!("No listing called {name}"))
    }

    pub fn order(&self, name: &str) -> &SeededOrder {
        self.orders.get(name).unwrap_or_else(|| panic!("No order called {name}"))
    }
}

impl SettlementSystem {
    pub async fn new(config: SettlementConfig) -> Self {
        let url = prepare_test_env().await;
        let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating connection to database");
        debug!("Created database: {url}");
        let market = Marketplace::new(db.clone()).await;
        let gateway = ScriptedGateway::new();
        let api = SettlementApi::new(db, gateway.clone(), config, EventProducers::default());
        Self { db_path: url, api, gateway, market }
    }
}

pub async fn prepare_test_env() -> String {
    let path = random_db_path();
    create_database(&path).await;
    run_migrations(&path).await;
    path
}
