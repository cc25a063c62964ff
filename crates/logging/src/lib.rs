//! Helpers for logging.

/// Route `log` output to stderr.
///
/// Level defaults to debug and can be overridden through `RUST_LOG`.  If called multiple times in
/// the same process, only the first call applies, so every test can call this unconditionally.
pub fn log_to_stderr() {
    static ONCE: std::sync::Once = std::sync::Once::new();

    ONCE.call_once(|| {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug"))
            .format(|buf, record| {
                use std::io::Write;

                writeln!(
                    buf,
                    "{} target={} {}",
                    record.level(),
                    record.target(),
                    record.args()
                )
            })
            .init();
    });
}
