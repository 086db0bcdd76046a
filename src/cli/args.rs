use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about,
    long_about,
    help_template(
        "{before-help}{name} {version}\n{author-with-newline}{about-with-newline}\n{usage-heading} {usage}\n\n{all-args}{after-help}"
    )
)]
pub struct Args {
    /// Path to TOML configuration file.
    #[arg(short, long, default_value = "ringladder.toml")]
    pub config: PathBuf,

    /// Directory to which output files should be saved.
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Write compact rather than indented JSON.
    #[arg(long)]
    pub compact: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_to_working_directory() {
        let args = Args::parse_from(["ringladder"]);
        assert_eq!(args.config, PathBuf::from("ringladder.toml"));
        assert!(args.output_dir.is_none());
        assert!(!args.compact);
    }

    #[test]
    fn output_dir_is_parsed() {
        let args = Args::parse_from(["ringladder", "-c", "a.toml", "-o", "out"]);
        assert_eq!(args.config, PathBuf::from("a.toml"));
        assert_eq!(args.output_dir, Some(PathBuf::from("out")));
    }
}
