use clap::Parser;

use gocryptfs_webui::cli::{report_error, run, Cli};

fn main() {
    let cli = Cli::parse();
    let error_format = cli.error_format;
    match run(cli) {
        Ok(code) => std::process::exit(code),
        Err(error) => {
            report_error(&error, error_format);
            std::process::exit(1);
        }
    }
}
