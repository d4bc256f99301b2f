/// Intercept messages from the `log` crate and print them to STDOUT.
/// Libraries only use the facade; binaries and integration tests that want
/// output call this once.
pub fn setup() {
    use env_logger::{Builder, Env};
    Builder::from_env(Env::default().default_filter_or("info"))
        .is_test(false)
        .try_init()
        .ok();
}
