use crate::api::DEFAULT_API_URL;
use crate::login::{valid_country_code, DEFAULT_COUNTRY_CODE, DEFAULT_FIREBASE_URL};
use clap::{
    builder::{
        styling::{AnsiColor, Effects, Styles},
        ValueParser,
    },
    Arg, ArgAction, ColorChoice, Command,
};

pub fn validator_log_level() -> ValueParser {
    ValueParser::from(move |level: &str| -> std::result::Result<u8, String> {
        if let Ok(parsed) = level.parse::<u8>() {
            // Successfully parsed as a number
            if parsed <= 5 {
                return Ok(parsed);
            }
        }

        match level.to_lowercase().as_str() {
            "error" => Ok(0),
            "warn" => Ok(1),
            "info" => Ok(2),
            "debug" => Ok(3),
            "trace" => Ok(4),
            _ => Err("invalid log level".to_string()),
        }
    })
}

pub fn validator_country_code() -> ValueParser {
    ValueParser::from(move |code: &str| -> std::result::Result<String, String> {
        let code = code.trim();
        if valid_country_code(code) {
            Ok(code.to_string())
        } else {
            Err("country code must look like +380".to_string())
        }
    })
}

fn guid_arg() -> Arg {
    Arg::new("guid")
        .help("Job identifier returned when the photo was uploaded")
        .required(true)
}

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let long_version: &'static str = Box::leak(
        format!("{} - {}", env!("CARGO_PKG_VERSION"), crate::GIT_COMMIT_HASH).into_boxed_str(),
    );

    Command::new("identigraf")
        .about("Identigraf phone login and face-search client")
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .subcommand_required(true)
        .arg(
            Arg::new("api-url")
                .long("api-url")
                .help("Identigraf API origin")
                .default_value(DEFAULT_API_URL)
                .env("IDENTIGRAF_API_URL")
                .global(true),
        )
        .arg(
            Arg::new("country-code")
                .long("country-code")
                .help("Country code prefixed to entered phone numbers")
                .default_value(DEFAULT_COUNTRY_CODE)
                .env("IDENTIGRAF_COUNTRY_CODE")
                .global(true)
                .value_parser(validator_country_code()),
        )
        .arg(
            Arg::new("verbosity")
                .short('v')
                .long("verbose")
                .help("Verbosity level: ERROR, WARN, INFO, DEBUG, TRACE (default: ERROR)")
                .env("IDENTIGRAF_LOG_LEVEL")
                .global(true)
                .action(ArgAction::Count)
                .value_parser(validator_log_level()),
        )
        .subcommand(
            Command::new("login")
                .about("Log in with a phone number and a one-time code")
                .arg(
                    Arg::new("phone")
                        .short('p')
                        .long("phone")
                        .help("Phone number; prompted for when missing")
                        .env("IDENTIGRAF_PHONE"),
                )
                .arg(
                    Arg::new("firebase-api-key")
                        .long("firebase-api-key")
                        .help("Web API key of the Firebase project")
                        .env("IDENTIGRAF_FIREBASE_API_KEY")
                        .hide_env_values(true)
                        .required(true),
                )
                .arg(
                    Arg::new("firebase-url")
                        .long("firebase-url")
                        .help("Identity Toolkit origin, e.g. http://localhost:9099/identitytoolkit.googleapis.com for the emulator")
                        .default_value(DEFAULT_FIREBASE_URL)
                        .env("IDENTIGRAF_FIREBASE_URL"),
                )
                .arg(
                    Arg::new("recaptcha-token")
                        .long("recaptcha-token")
                        .help("reCAPTCHA token attached to the code request")
                        .env("IDENTIGRAF_RECAPTCHA_TOKEN")
                        .hide_env_values(true),
                )
                .arg(
                    Arg::new("print-token")
                        .long("print-token")
                        .help("Print the identity token after a successful login")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("compare-status")
                .about("Show the status of a face comparison job")
                .arg(guid_arg()),
        )
        .subcommand(
            Command::new("search-status")
                .about("Show the status of a face search job")
                .arg(guid_arg()),
        )
        .subcommand(
            Command::new("matches")
                .about("List the first matches for one detected face of a search")
                .arg(guid_arg())
                .arg(
                    Arg::new("face")
                        .help("Index of the detected face")
                        .required(true)
                        .value_parser(clap::value_parser!(u32)),
                ),
        )
}
