mod business;
mod card;
mod card_ledger;
mod error;
mod money;
mod settings;

pub use business::*;
pub use card::*;
pub use card_ledger::*;
pub use error::*;
pub use money::*;
pub use settings::*;
