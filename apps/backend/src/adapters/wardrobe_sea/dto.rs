//! DTOs for wardrobe_sea adapter.

use uuid::Uuid;

/// Column values for a new row; the adapter stamps id and timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct WardrobeCreate {
    pub name: String,
    pub color: String,
    pub size: String,
    pub price: f64,
    pub stock: i32,
}

/// Full replacement of the editable columns of row `id`.
#[derive(Debug, Clone, PartialEq)]
pub struct WardrobeUpdate {
    pub id: Uuid,
    pub name: String,
    pub color: String,
    pub size: String,
    pub price: f64,
    pub stock: i32,
}

/// Equality filters; `None` leaves the column unfiltered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WardrobeSearch {
    pub color: Option<String>,
    pub size: Option<String>,
}
