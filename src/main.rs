use specpulse::context::Environment;
use specpulse::status::ExitStatus;
use specpulse::{core, signals};
use std::sync::atomic::{AtomicBool, Ordering};

/// Entry point - catches Ctrl+C and calls core::run()
///
/// Returns ExitStatus directly, which implements std::process::Termination.
fn main() -> ExitStatus {
    // Set a flag instead of exiting so the current prompt or call can unwind
    ctrlc::set_handler(move || {
        signals::set_interrupted();
        eprintln!("\nInterrupted");

        // On second Ctrl+C, force exit
        static SECOND_CTRL_C: AtomicBool = AtomicBool::new(false);
        if SECOND_CTRL_C.swap(true, Ordering::SeqCst) {
            std::process::exit(ExitStatus::Interrupted as i32);
        }
    })
    .ok();

    let args: Vec<String> = std::env::args().collect();
    let env = Environment::init();

    let status = core::run(args, env);

    if signals::was_interrupted() {
        return ExitStatus::Interrupted;
    }

    status
}
