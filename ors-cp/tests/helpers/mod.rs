#[cfg(test)]
#[macro_use]
pub mod macros;
