// Repositories module - data access layer

pub mod booking_repository;
pub mod dynamodb;
pub mod id_sequence;
pub mod memory;
pub mod menu_repository;
pub mod table_manager;
pub mod user_repository;

#[cfg(test)]
mod tests;

pub use booking_repository::{BookingRepository, DynamoDbBookingRepository};
pub use id_sequence::{DynamoDbIdSequence, IdSequence};
pub use memory::InMemoryStore;
pub use menu_repository::{DynamoDbMenuRepository, MenuRepository};
pub use table_manager::{TableManager, TableNames};
pub use user_repository::{DynamoDbUserRepository, UserRepository};
