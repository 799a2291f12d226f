use crate::cli::{actions::Action, globals::GlobalArgs};
use crate::login::DEFAULT_COUNTRY_CODE;
use anyhow::{anyhow, Context, Result};
use secrecy::SecretString;

fn required(matches: &clap::ArgMatches, name: &str) -> Result<String> {
    matches
        .get_one::<String>(name)
        .cloned()
        .ok_or_else(|| anyhow!("missing required argument: --{name}"))
}

/// Build the action and the global settings from the parsed arguments
pub fn handler(matches: &clap::ArgMatches) -> Result<(Action, GlobalArgs)> {
    let (name, sub_m) = matches.subcommand().context("missing subcommand")?;

    let mut globals = GlobalArgs::new(required(sub_m, "api-url")?);
    globals.set_country_code(
        sub_m
            .get_one::<String>("country-code")
            .cloned()
            .unwrap_or_else(|| DEFAULT_COUNTRY_CODE.to_string()),
    );

    let action = match name {
        "login" => Action::Login {
            phone: sub_m
                .get_one::<String>("phone")
                .map(|phone| phone.trim().to_string())
                .filter(|phone| !phone.is_empty()),
            firebase_url: required(sub_m, "firebase-url")?,
            firebase_api_key: SecretString::from(required(sub_m, "firebase-api-key")?),
            recaptcha_token: sub_m.get_one::<String>("recaptcha-token").cloned(),
            print_token: sub_m.get_flag("print-token"),
        },
        "compare-status" => Action::CompareStatus {
            guid: required(sub_m, "guid")?,
        },
        "search-status" => Action::SearchStatus {
            guid: required(sub_m, "guid")?,
        },
        "matches" => Action::Matches {
            guid: required(sub_m, "guid")?,
            face: sub_m
                .get_one::<u32>("face")
                .copied()
                .context("missing required argument: face")?,
        },
        _ => return Err(anyhow!("unknown subcommand: {name}")),
    };

    Ok((action, globals))
}
