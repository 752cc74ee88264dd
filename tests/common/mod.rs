#![allow(dead_code)]

pub use dtm_test_utils::builders;
pub use dtm_test_utils::{init_tracing, with_timeout};

use std::path::{Path, PathBuf};

/// Create `count` real work directories under `root`, in order.
pub fn make_work_dirs(root: &Path, count: usize) -> Vec<PathBuf> {
    (0..count)
        .map(|i| {
            let dir = root.join(format!("case_{i:02}"));
            std::fs::create_dir_all(&dir).expect("create work dir");
            dir
        })
        .collect()
}

/// Whether `pid` still refers to a live (non-zombie) process.
#[cfg(unix)]
pub fn process_alive(pid: u32) -> bool {
    if let Ok(stat) = std::fs::read_to_string(format!("/proc/{pid}/stat")) {
        // Format: "pid (comm) state ...". comm may contain spaces, so split
        // after the last ')'.
        return match stat.rsplit_once(')') {
            Some((_, rest)) => !rest.trim_start().starts_with('Z'),
            None => true,
        };
    }
    if Path::new("/proc/self").exists() {
        // procfs is mounted and the entry is gone.
        return false;
    }
    nix::sys::signal::kill(nix::unistd::Pid::from_raw(pid as i32), None).is_ok()
}
