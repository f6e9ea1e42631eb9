pub mod calculations;
pub mod db;
pub mod models;

pub use db::repository::{AgroRepository, RepositoryError, load_reference_data};
pub use models::*;
