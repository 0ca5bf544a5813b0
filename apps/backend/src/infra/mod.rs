//! Infrastructure layer - database bootstrap.

pub mod db;
