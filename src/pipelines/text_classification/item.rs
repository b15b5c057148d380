use std::fmt::Debug;

/// A trait for items that can be used for text classification
pub trait Item: Send + Sync + Clone + Debug {
    /// Returns the input text for the item
    fn text(&self) -> &str;

    /// Returns the class id for the item
    fn class_id(&self) -> usize;
}
