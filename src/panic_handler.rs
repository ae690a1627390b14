use log::error;
use std::io::{self, Write};
use std::panic;

pub fn initialize_panic_handler() {
    better_panic::install();

    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        error!("Panic: {panic_info}");
        log::logger().flush();
        flush_output();

        default_hook(panic_info);

        std::process::exit(1);
    }));
}

/// Flush buffered stdout so partial JSON output is not interleaved with the
/// panic report
pub fn flush_output() {
    let _ = io::stdout().flush();
    let _ = writeln!(io::stderr());
}
