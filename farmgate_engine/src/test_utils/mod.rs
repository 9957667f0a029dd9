mod faulty_db;
mod prepare_env;
mod scripted_gateway;
mod seed;

pub use faulty_db::{Fault, FaultyDatabase};
pub use prepare_env::{create_database, prepare_test_env, random_db_path, run_migrations};
pub use scripted_gateway::ScriptedGateway;
pub use seed::{Marketplace, SeededOrder};
