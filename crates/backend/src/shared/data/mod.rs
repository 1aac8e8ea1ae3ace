pub mod db;
#[cfg(test)]
pub mod memory_store;
pub mod sqlite_store;
pub mod store;
