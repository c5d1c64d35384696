pub mod models;
pub mod shape;

pub use models::{ModelError, ModelSource};
pub use shape::Shape;

use crate::types::Location;
use std::borrow::Cow;

/// Anything that occupies space on the board and can be collided with.
pub trait SimObject {
    /// Collision region in the object's own frame
    fn collision(&self) -> &Shape;

    fn location(&self) -> &Location;

    /// Collision region placed at the object's location
    fn transformed_collision(&self) -> Cow<'_, Shape> {
        Cow::Owned(self.collision().transformed(self.location()))
    }

    /// Direction along which a mover may slide after hitting this object.
    /// `None` stops the mover outright.
    fn hit_direction(&self) -> Option<Location> {
        None
    }
}
