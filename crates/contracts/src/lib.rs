//! Общие типы данных и чистая логика CRM
//!
//! Используется бэкендом, ввода-вывода не содержит.

pub mod domain;
pub mod shared;
pub mod system;
