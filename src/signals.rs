use signal_hook::{
    consts::{SIGINT, SIGTERM},
    iterator::Signals,
};

/// What should we do when the user stops this program?
///
/// As PID 1 inside a container the kernel ignores SIGINT and SIGTERM unless
/// a handler is installed, so `docker stop` would have to wait for SIGKILL.
/// Nothing in flight is worth finishing: exit right away.
pub fn handle_termination() -> std::io::Result<()> {
    let mut signals = Signals::new([SIGINT, SIGTERM])?;

    std::thread::spawn(move || {
        if let Some(signal) = signals.forever().next() {
            let _ = sd_notify::notify(true, &[sd_notify::NotifyState::Stopping]);
            log::warn!("Received signal {signal}, exiting");
            std::process::exit(0);
        }
    });

    Ok(())
}
