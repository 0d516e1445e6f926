pub mod directory;
pub mod feedback;
pub mod lifecycle;
pub mod matching;
pub mod queries;
