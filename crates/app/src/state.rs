//! Application state: configuration, database, and catalog seeding

use std::path::{Path, PathBuf};

use splitroom_core::{CatalogRepository, Config, Database, Result, RoomManager};
use tracing::info;

/// Everything the server needs to start
pub struct AppState {
    pub config: Config,
    pub db_path: PathBuf,
    pub db: Database,
}

impl AppState {
    /// Load configuration, open the database, and seed the catalog
    pub fn new(config_path: Option<&Path>) -> Result<Self> {
        let config = load_config(config_path)?;
        let db_path = config.database_path()?;

        // Ensure parent directory exists
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = Database::open(&db_path)?;
        seed_catalog(&db, &config)?;

        Ok(Self {
            config,
            db_path,
            db,
        })
    }

    /// Hand the database to a room manager configured from `[rooms]`
    pub fn into_manager(self) -> (Config, RoomManager<Database>) {
        let manager = RoomManager::new(self.db, &self.config.rooms);
        (self.config, manager)
    }
}

/// Explicit path, else the default file if present, else built-in defaults
fn load_config(path: Option<&Path>) -> Result<Config> {
    if let Some(path) = path {
        return Config::load(path);
    }

    let default_path = Config::default_path()?;
    if default_path.exists() {
        Config::load(&default_path)
    } else {
        Ok(Config::default())
    }
}

/// Upsert configured services and plans; returns how many services were seeded
fn seed_catalog(db: &Database, config: &Config) -> Result<usize> {
    for service in &config.catalog.services {
        db.upsert_service(service)?;
    }
    let count = config.catalog.services.len();
    info!(services = count, "Catalog seeded");
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use splitroom_core::PlanKey;

    fn write_config(dir: &Path) -> PathBuf {
        let db_path = dir.join("data").join("rooms.db");
        let config_path = dir.join("splitroom.toml");
        let content = format!(
            r#"
            [database]
            path = '{}'

            [[catalog.services]]
            id = 1
            name = "Streamflix"

            [[catalog.services.plans]]
            name = "family"
            cost = 17000
            max_count = 4
            "#,
            db_path.display()
        );
        std::fs::write(&config_path, content).unwrap();
        config_path
    }

    #[test]
    fn test_state_seeds_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = write_config(dir.path());

        let state = AppState::new(Some(&config_path)).unwrap();
        assert!(state.db_path.exists());

        let ceiling = state
            .db
            .plan_ceiling(&PlanKey::new(1, "family"))
            .unwrap();
        assert_eq!(ceiling, Some(4));
    }

    #[test]
    fn test_reseeding_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = write_config(dir.path());

        drop(AppState::new(Some(&config_path)).unwrap());
        let state = AppState::new(Some(&config_path)).unwrap();

        assert_eq!(state.db.list_services().unwrap().len(), 1);
    }

    #[test]
    fn test_missing_config_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(AppState::new(Some(&dir.path().join("absent.toml"))).is_err());
    }
}
