//! Application state wiring all services together.
//!
//! AppState holds the concrete service instances used by both CLI and REST API.
//! Services are generic over repository traits, but AppState pins them to the
//! concrete SQLite implementations.

use std::sync::Arc;

use parley_core::chat::service::ChatService;
use parley_core::document::service::DocumentService;
use parley_core::turn::registry::TurnRegistry;
use parley_core::turn::transport::TurnTransport;
use parley_infra::config::{load_config, resolve_data_dir, turn_api_key};
use parley_infra::sqlite::auth::SqliteAuthProvider;
use parley_infra::sqlite::chat::SqliteChatRepository;
use parley_infra::sqlite::document::SqliteDocumentRepository;
use parley_infra::sqlite::message::SqliteMessageRepository;
use parley_infra::sqlite::pool::{DatabasePool, default_database_url};
use parley_infra::sqlite::vote::SqliteVoteRepository;
use parley_infra::turn::transport_from_config;
use parley_types::config::AppConfig;

/// Concrete type aliases for the service generics pinned to infra implementations.
pub type ConcreteChatService =
    ChatService<SqliteChatRepository, SqliteMessageRepository, SqliteVoteRepository>;

pub type ConcreteDocumentService = DocumentService<SqliteDocumentRepository>;

/// Shared application state holding all services.
///
/// Used by both CLI commands and REST API handlers.
#[derive(Clone)]
pub struct AppState {
    pub chat_service: Arc<ConcreteChatService>,
    pub document_service: Arc<ConcreteDocumentService>,
    pub auth: Arc<SqliteAuthProvider>,
    pub transport: Arc<dyn TurnTransport>,
    pub turns: TurnRegistry,
    pub config: Arc<AppConfig>,
}

impl AppState {
    /// Initialize the application state: load config, connect to DB, wire services.
    pub async fn init() -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();
        tokio::fs::create_dir_all(&data_dir).await?;

        let config = load_config(&data_dir).await;

        let db_pool = DatabasePool::new(&default_database_url()).await?;

        let transport = transport_from_config(&config.turn, turn_api_key())?;

        Ok(Self::from_parts(db_pool, config, transport))
    }

    /// Wire services over an already opened pool.
    pub fn from_parts(
        db_pool: DatabasePool,
        config: AppConfig,
        transport: Arc<dyn TurnTransport>,
    ) -> Self {
        let chat_service = ChatService::new(
            SqliteChatRepository::new(db_pool.clone()),
            SqliteMessageRepository::new(db_pool.clone()),
            SqliteVoteRepository::new(db_pool.clone()),
            config.max_page_limit,
            config.entitlements.clone(),
        );
        let document_service = DocumentService::new(SqliteDocumentRepository::new(db_pool.clone()));
        let auth = SqliteAuthProvider::new(db_pool.clone(), config.session_ttl_hours);

        Self {
            chat_service: Arc::new(chat_service),
            document_service: Arc::new(document_service),
            auth: Arc::new(auth),
            transport,
            turns: TurnRegistry::new(),
            config: Arc::new(config),
        }
    }
}
