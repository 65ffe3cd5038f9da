mod queue;

pub use queue::ElectorateChangeQueue;
