// src/config.rs

use std::{env, sync::Arc, time::Duration};

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    common::i18n::I18nStore,
    db::{InMemoryCatalog, InMemoryStore, PgCatalog, PgWorkflowStore},
    services::workflow::WorkflowCoordinator,
};

const DEFAULT_SERVER_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Configuração lida do ambiente (e do `.env`, se existir).
#[derive(Debug, Clone)]
pub struct Config {
    /// Sem URL o servidor sobe com o armazenamento em memória
    pub database_url: Option<String>,
    pub server_addr: String,
    pub db_max_connections: u32,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").ok().filter(|v| !v.trim().is_empty());
        let server_addr =
            env::var("SERVER_ADDR").unwrap_or_else(|_| DEFAULT_SERVER_ADDR.to_string());
        let db_max_connections = match env::var("DB_MAX_CONNECTIONS") {
            Ok(v) => v
                .parse()
                .with_context(|| format!("DB_MAX_CONNECTIONS inválido: {v}"))?,
            Err(_) => DEFAULT_MAX_CONNECTIONS,
        };

        Ok(Self {
            database_url,
            server_addr,
            db_max_connections,
        })
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db_pool: Option<PgPool>,
    pub coordinator: WorkflowCoordinator,
    pub i18n_store: Arc<I18nStore>,
}

impl AppState {
    pub async fn new(config: &Config) -> anyhow::Result<Self> {
        let Some(database_url) = config.database_url.as_deref() else {
            tracing::warn!("⚠️ DATABASE_URL não definida: usando armazenamento em memória");
            return Ok(Self::in_memory());
        };

        let db_pool = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(database_url)
            .await
            .context("Falha ao conectar ao banco de dados")?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        // --- Monta o gráfico de dependências ---
        let catalog = Arc::new(PgCatalog::new(db_pool.clone()));
        let coordinator = WorkflowCoordinator::new(
            Arc::new(PgWorkflowStore::new(db_pool.clone())),
            catalog.clone(),
            catalog,
        );

        Ok(Self {
            db_pool: Some(db_pool),
            coordinator,
            i18n_store: Arc::new(I18nStore::default()),
        })
    }

    pub fn in_memory() -> Self {
        Self::with_catalog(InMemoryCatalog::new())
    }

    /// Estado em memória com um catálogo já preenchido (testes de HTTP).
    pub fn with_catalog(catalog: InMemoryCatalog) -> Self {
        let catalog = Arc::new(catalog);
        let coordinator =
            WorkflowCoordinator::new(Arc::new(InMemoryStore::new()), catalog.clone(), catalog);

        Self {
            db_pool: None,
            coordinator,
            i18n_store: Arc::new(I18nStore::default()),
        }
    }
}
