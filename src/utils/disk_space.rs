//! Free disk space check via `statvfs` on the filesystem backing a
//! download directory.

use std::ffi::CString;
use std::path::Path;

/// Bytes free on the filesystem containing `path`. Returns `None` if the
/// path can't be stat'd (e.g. doesn't exist yet, non-UTF8, non-unix).
#[must_use]
pub fn available_bytes(path: &Path) -> Option<u64> {
    let c_path = CString::new(path.to_str()?).ok()?;
    let mut stat: libc::statvfs = unsafe { std::mem::zeroed() };
    let rc = unsafe { libc::statvfs(c_path.as_ptr(), &mut stat) };
    if rc != 0 {
        return None;
    }
    Some(stat.f_bavail as u64 * stat.f_frsize as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn available_bytes_reports_something_for_tmp() {
        let bytes = available_bytes(Path::new("/tmp"));
        assert!(bytes.is_some());
        assert!(bytes.unwrap() > 0);
    }

    #[test]
    fn available_bytes_none_for_nonexistent_path() {
        assert!(available_bytes(Path::new("/no/such/path/at/all")).is_none());
    }
}
