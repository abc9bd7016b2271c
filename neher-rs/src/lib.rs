pub mod epidemic;
pub mod error;
pub mod input;
pub mod params;
pub mod prelude;
pub mod sim;
pub mod utils;

#[cfg(test)]
mod testing;
