mod account;
mod candidate;
mod election;
mod tally;
mod vote;
mod voter;

pub use account::*;
pub use candidate::*;
pub use election::*;
pub use tally::*;
pub use vote::*;
pub use voter::*;
