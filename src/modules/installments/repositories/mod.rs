pub mod installment_repository;
pub mod installment_store;

pub use installment_repository::InstallmentRepository;
pub use installment_store::InstallmentStore;
