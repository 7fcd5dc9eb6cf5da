pub mod inventory_repo;
pub use inventory_repo::InventoryRepository;
pub mod loan_repo;
pub use loan_repo::LoanRepository;
pub mod ping_repo;
pub use ping_repo::PingRepository;
pub mod read_repo;
pub use read_repo::ReadRepository;
pub mod tag_repo;
pub use tag_repo::TagRepository;
