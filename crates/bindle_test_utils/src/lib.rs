mod test_config;
pub use test_config::*;
mod tester;
pub use tester::*;

#[macro_export]
macro_rules! impl_serde_default {
  ($name:ident) => {
    impl Default for $name {
      fn default() -> Self {
        serde_json::from_str("{}").expect("empty object deserializes")
      }
    }
  };
}
