pub mod cache;
pub mod datetime;
pub mod db_utils;
pub mod error;
pub mod rfid;
pub mod stats;
