use clap::{ArgAction, Parser};
use std::path::PathBuf;
use std::time::Duration;

use crate::config::LoaderConfig;

#[derive(Parser, Debug)]
#[command(
    name = "page-loader",
    about = "Download a web page for offline viewing",
    version,
    long_about = "Downloads a single page together with its same-site images, stylesheets \
                  and scripts. References to the downloaded files are rewritten so the \
                  saved copy opens without the network."
)]
pub struct LoadCommand {
    /// The URL of the page to download
    #[arg(required = true)]
    pub url: String,

    /// Output directory where the page is saved
    #[arg(
        short,
        long,
        visible_alias = "out",
        default_value = ".",
        env = "PAGE_LOADER_OUTPUT"
    )]
    pub output: PathBuf,

    /// Maximum concurrent asset downloads
    #[arg(short = 'c', long, default_value = "8", value_parser = parse_positive)]
    pub max_concurrent: usize,

    /// User agent string to use for requests
    #[arg(long, default_value = "PageLoader/1.0", env = "PAGE_LOADER_USER_AGENT")]
    pub user_agent: String,

    /// Timeout for each request in seconds
    #[arg(long, default_value = "30")]
    pub timeout: u64,

    /// Follow redirects
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub follow_redirects: bool,

    /// Give up on outstanding asset downloads after this many seconds
    #[arg(long)]
    pub deadline: Option<u64>,

    /// Print a JSON report instead of the saved path
    #[arg(long)]
    pub json: bool,

    /// More log output on stderr (repeat for more)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl LoadCommand {
    pub fn loader_config(&self) -> LoaderConfig {
        LoaderConfig {
            max_concurrent: self.max_concurrent,
            user_agent: self.user_agent.clone(),
            timeout: Duration::from_secs(self.timeout),
            follow_redirects: self.follow_redirects,
            deadline: self.deadline.map(Duration::from_secs),
        }
    }
}

fn parse_positive(value: &str) -> Result<usize, String> {
    match value.parse::<usize>() {
        Ok(0) => Err("must be at least 1".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic_args() {
        let args = LoadCommand::try_parse_from([
            "page-loader",
            "https://example.com",
            "-o", "./output",
        ]).unwrap();

        assert_eq!(args.url, "https://example.com");
        assert_eq!(args.output, PathBuf::from("./output"));
        assert_eq!(args.max_concurrent, 8);
        assert!(args.follow_redirects);
        assert_eq!(args.deadline, None);
        assert!(!args.json);
        assert_eq!(args.verbose, 0);
    }

    #[test]
    fn test_parse_all_args() {
        let args = LoadCommand::try_parse_from([
            "page-loader",
            "example.com/docs",
            "--output", "/tmp/pages",
            "-c", "20",
            "--user-agent", "Test/2.0",
            "--timeout", "5",
            "--follow-redirects", "false",
            "--deadline", "60",
            "--json",
            "-vv",
        ]).unwrap();

        assert_eq!(args.url, "example.com/docs");
        assert_eq!(args.output, PathBuf::from("/tmp/pages"));
        assert_eq!(args.max_concurrent, 20);
        assert!(!args.follow_redirects);
        assert!(args.json);
        assert_eq!(args.verbose, 2);

        let config = args.loader_config();
        assert_eq!(config.user_agent, "Test/2.0");
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.deadline, Some(Duration::from_secs(60)));
        assert_eq!(config.max_concurrent, 20);
    }

    #[test]
    fn test_parse_out_alias() {
        let args = LoadCommand::try_parse_from([
            "page-loader",
            "--out", "./saved",
            "https://example.com",
        ]).unwrap();

        assert_eq!(args.output, PathBuf::from("./saved"));
    }

    #[test]
    fn test_parse_missing_url() {
        let result = LoadCommand::try_parse_from(["page-loader", "-o", "./output"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_invalid_concurrent() {
        let result = LoadCommand::try_parse_from([
            "page-loader",
            "https://example.com",
            "-c", "0",
        ]);
        assert!(result.is_err());
    }
}
