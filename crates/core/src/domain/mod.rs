pub mod interaction;
pub mod item;
pub mod order;
pub mod requester;
