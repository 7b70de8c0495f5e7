mod rupiah;

pub mod op;
mod secret;

pub use rupiah::{Rupiah, RupiahConversionError, IDR_CURRENCY_CODE};
pub use secret::Secret;
