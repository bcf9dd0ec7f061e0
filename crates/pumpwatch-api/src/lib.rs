// pumpwatch-api: Async Rust client for the station monitoring backend (REST + push hub)

pub mod client;
pub mod error;
pub mod hub;
pub mod models;
pub mod transport;

pub use client::StationClient;
pub use error::Error;
pub use hub::{HubConnectionState, HubEvent, HubHandle, ReconnectConfig};
pub use models::{
    AttendantDto, FuelingTransactionDto, NozzleStatusDto, PresetWithTagRequest, ProductPriceDto,
    TransactionQuery, VisualizationDto,
};
pub use transport::{TlsMode, TransportConfig};
