pub mod account_projection;
pub mod address_binding;
pub mod chain_registry_service;
pub mod dapp_connection;

pub use account_projection::{AccountProjectionService, ProjectionInvalidationHandler};
pub use address_binding::AddressBindingService;
pub use chain_registry_service::{ChainRegistryService, CompatibleChains};
pub use dapp_connection::DappConnectionService;
