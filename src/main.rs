mod archive;
mod cli;
mod command;
mod completion;
mod engine;
mod error;
mod registry;
mod sink;
mod utils;

fn main() {
    match crate::cli::main() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            crate::cli::report_error(&mut std::io::stderr(), &err).ok();
            std::process::exit(1);
        }
    }
}
