pub mod fake_api;
pub mod project;

pub use fake_api::FakeStreamingApi;
pub use project::TestProject;

use once_cell::sync::Lazy;
use std::env;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// Global mutex to serialize tests that modify the process working directory
/// or environment. Changing either concurrently leads to nondeterministic failures.
pub static TEST_MUTEX: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

fn lock() -> MutexGuard<'static, ()> {
    TEST_MUTEX.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

struct Reset(PathBuf);

impl Drop for Reset {
    fn drop(&mut self) {
        let _ = env::set_current_dir(&self.0);
    }
}

/// Temporarily change the current working directory for the duration of the closure.
/// Guards against concurrent `chdir` calls by taking the global `TEST_MUTEX` lock.
/// Always restores the original directory, even if the closure panics.
pub fn with_chdir<F, T>(target: impl AsRef<Path>, f: F) -> std::io::Result<T>
where
    F: FnOnce() -> T,
{
    let _lock = lock();

    let original = env::current_dir()?;
    env::set_current_dir(target.as_ref())?;
    let _guard = Reset(original);

    Ok(f())
}

pub async fn with_chdir_async<F, Fut, T>(target: impl AsRef<Path>, f: F) -> std::io::Result<T>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = T>,
{
    let _lock = lock();

    let original = env::current_dir()?;
    env::set_current_dir(target.as_ref())?;
    let _guard = Reset(original);

    Ok(f().await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chdir_is_restored() {
        let before = env::current_dir().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let inside = with_chdir(dir.path(), || env::current_dir().unwrap()).unwrap();
        assert_eq!(
            inside.canonicalize().unwrap(),
            dir.path().canonicalize().unwrap()
        );
        assert_eq!(env::current_dir().unwrap(), before);
    }
}
