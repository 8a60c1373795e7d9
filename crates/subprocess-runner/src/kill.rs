use std::time::Duration;

use tokio::process::Child;
use tokio::time::timeout;
use tracing::debug;

/// SIGTERM the child, then SIGKILL if it is still alive 5 s later.
///
/// On non-Unix platforms there is no SIGTERM equivalent worth distinguishing;
/// `Child::start_kill` is the only lever, so escalation collapses to an
/// immediate kill.
pub async fn escalating_kill(child: &mut Child) {
    escalating_kill_inner(child, false).await
}

/// Same escalation, but signals the child's process group (negative pid)
/// rather than the child alone, for supervisors that spawn with
/// `process_group(0)` and want to reap any descendants too.
pub async fn escalating_kill_group(child: &mut Child) {
    escalating_kill_inner(child, true).await
}

async fn escalating_kill_inner(child: &mut Child, group: bool) {
    #[cfg(unix)]
    {
        if let Some(pid) = child.id() {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;
            let target = if group { -(pid as i32) } else { pid as i32 };
            let _ = kill(Pid::from_raw(target), Signal::SIGTERM);
        }
    }
    #[cfg(not(unix))]
    {
        let _ = child.start_kill();
    }

    if timeout(Duration::from_secs(5), child.wait()).await.is_ok() {
        return;
    }

    debug!("child still alive 5s after SIGTERM; escalating to SIGKILL");
    #[cfg(unix)]
    {
        if group {
            if let Some(pid) = child.id() {
                use nix::sys::signal::{kill, Signal};
                use nix::unistd::Pid;
                let _ = kill(Pid::from_raw(-(pid as i32)), Signal::SIGKILL);
            }
        } else {
            let _ = child.start_kill();
        }
    }
    #[cfg(not(unix))]
    {
        let _ = child.start_kill();
    }
    let _ = child.wait().await;
}
