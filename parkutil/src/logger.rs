/// Intercept messages using the `log` crate and print them to STDERR. Defaults to `info`, which
/// `RUST_LOG` can override. Safe to call more than once.
pub fn setup() {
    use env_logger::{Builder, Env};
    let _ = Builder::from_env(Env::default().default_filter_or("info")).try_init();
}
