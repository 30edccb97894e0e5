fn main() {
    // Host builds (tests) have no ESP-IDF environment to forward.
    #[cfg(feature = "esp")]
    if std::env::var_os("CARGO_FEATURE_ESP").is_some() {
        embuild::espidf::sysenv::output();
    }
}
