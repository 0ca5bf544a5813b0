pub mod syncmap;

pub use syncmap::SyncMap;
