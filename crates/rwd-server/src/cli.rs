//! Command line

use clap::{value_parser, Arg, ArgMatches, Command};

/// Command definition: `rwd-server [PORT]`
#[must_use]
pub fn command() -> Command {
    Command::new("rwd-server")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Session-isolated in-memory RealWorld API backend")
        .arg(
            Arg::new("port")
                .value_name("PORT")
                .env("PORT")
                .value_parser(value_parser!(u16))
                .help("Port to listen on (default 8000)"),
        )
}

/// Port given on the command line or in `PORT`
#[must_use]
pub fn port(matches: &ArgMatches) -> Option<u16> {
    matches.get_one::<u16>("port").copied()
}
