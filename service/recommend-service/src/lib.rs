//! Recommendation session service: configuration, logging, per-session
//! retrieval and presentation of the top product.

pub mod assets;
pub mod config;
pub mod error;
pub mod logging;
pub mod present;
pub mod session;

pub use assets::{AssetNotFoundError, AssetResolver};
pub use config::{ConfigError, EmbedderChoice, ServiceConfig};
pub use error::{error_message, ServiceError, COMMON_ERROR_MESSAGE};
pub use logging::{init_logging, LogConfig};
pub use present::{display_product, present, write_greeting, write_panel, ProductCard, ProductPanel, RenderError};
pub use session::{ChatTurn, DenseStatus, Role, Session, SessionId, TurnContent};
