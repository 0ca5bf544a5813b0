pub mod wardrobe;

pub use wardrobe::Entity as Wardrobes;
pub use wardrobe::Model as WardrobeModel;
