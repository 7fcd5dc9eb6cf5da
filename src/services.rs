pub mod inventory_csv;
pub mod inventory_service;
pub use inventory_service::InventoryService;
pub mod loan_service;
pub use loan_service::LoanService;
pub mod ping_service;
pub use ping_service::PingService;
pub mod read_service;
pub use read_service::ReadService;
pub mod tag_service;
pub use tag_service::TagService;
