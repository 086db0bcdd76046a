use std::path::{Path, PathBuf};

pub fn out_json(work_dir: impl AsRef<Path>, name: &str) -> PathBuf {
    PathBuf::from(work_dir.as_ref()).join(format!("{name}.layout.json"))
}
