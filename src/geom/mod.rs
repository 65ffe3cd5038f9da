mod dissolve;

pub use dissolve::{dissolve, make_valid, part_count, patch};
